use std::str::FromStr;

use actix_web::{web, HttpResponse};
use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::domain::auth::RoleRequirement;
use crate::domain::catalog::{CategoryView, ImageView, NewProduct, ProductFilter, ProductPatch, ProductView};
use crate::errors::AppError;
use crate::state::AppState;

use super::{blocking, Authenticated, MaybeAuthenticated};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
pub struct CategoryResponse {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ImageResponse {
    pub id: Uuid,
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    /// Decimal price as a string, e.g. "9.99"
    pub price: String,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub images: Vec<ImageResponse>,
    pub categories: Vec<CategoryResponse>,
    /// Whether the caller liked the product; absent for anonymous callers.
    pub liked: Option<bool>,
}

impl From<CategoryView> for CategoryResponse {
    fn from(c: CategoryView) -> Self {
        Self {
            id: c.id,
            name: c.name,
        }
    }
}

impl From<ImageView> for ImageResponse {
    fn from(i: ImageView) -> Self {
        Self { id: i.id, url: i.url }
    }
}

impl From<ProductView> for ProductResponse {
    fn from(p: ProductView) -> Self {
        Self {
            id: p.id,
            name: p.name,
            description: p.description,
            price: p.price.to_string(),
            stock: p.stock,
            is_active: p.is_active,
            created_at: p.created_at,
            updated_at: p.updated_at,
            images: p.images.into_iter().map(Into::into).collect(),
            categories: p.categories.into_iter().map(Into::into).collect(),
            liked: p.liked,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListProductsParams {
    /// Case-insensitive substring of the product name.
    pub search_by_name: Option<String>,
    /// Category name.
    pub category: Option<String>,
    /// Only products the caller liked; ignored for anonymous callers.
    pub liked_only: Option<bool>,
    /// Page number (1-based). Defaults to 1.
    pub page: Option<i64>,
    /// Number of items per page. Defaults to 10, maximum 100.
    pub limit: Option<i64>,
}

impl From<ListProductsParams> for ProductFilter {
    fn from(p: ListProductsParams) -> Self {
        ProductFilter {
            search_by_name: p.search_by_name,
            category: p.category,
            liked_only: p.liked_only.unwrap_or(false),
            page: p.page,
            limit: p.limit,
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub description: Option<String>,
    /// Decimal price as a string to avoid floating-point issues, e.g. "9.99"
    pub price: String,
    pub stock: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub category_ids: Vec<i32>,
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<String>,
    pub stock: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AttachImageRequest {
    pub url: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct LikeResponse {
    pub liked: bool,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct CategoryRequest {
    pub name: String,
}

fn parse_price(raw: &str) -> Result<BigDecimal, AppError> {
    BigDecimal::from_str(raw.trim())
        .map_err(|_| AppError::BadRequest(format!("Invalid price '{raw}'")))
}

fn products_json(products: Vec<ProductView>) -> HttpResponse {
    HttpResponse::Ok().json(
        products
            .into_iter()
            .map(ProductResponse::from)
            .collect::<Vec<_>>(),
    )
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/products")
            .route("", web::get().to(list_products))
            .route("", web::post().to(create_product))
            .route("/{id}", web::get().to(get_product))
            .route("/{id}", web::patch().to(update_product))
            .route("/{id}", web::delete().to(delete_product))
            .route("/{id}/images", web::post().to(attach_image))
            .route("/{id}/like", web::post().to(toggle_like)),
    )
    .service(
        web::scope("/categories")
            .route("", web::get().to(list_categories))
            .route("", web::post().to(create_category))
            .route("/{id}", web::get().to(get_category))
            .route("/{id}", web::patch().to(rename_category))
            .route("/{id}", web::delete().to(delete_category)),
    );
}

// ── Products ─────────────────────────────────────────────────────────────────

/// GET /products
///
/// Anonymous callers and clients only see active products.
#[utoipa::path(
    get,
    path = "/products",
    params(ListProductsParams),
    responses(
        (status = 200, description = "Page of products", body = Vec<ProductResponse>),
        (status = 401, description = "Invalid access token"),
    ),
    tag = "catalog"
)]
pub async fn list_products(
    state: web::Data<AppState>,
    viewer: MaybeAuthenticated,
    query: web::Query<ListProductsParams>,
) -> Result<HttpResponse, AppError> {
    let filter = ProductFilter::from(query.into_inner());
    let products =
        blocking(move || state.catalog.list_products(filter, viewer.0.as_ref())).await?;
    Ok(products_json(products))
}

/// GET /products/{id}
#[utoipa::path(
    get,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Product found", body = ProductResponse),
        (status = 403, description = "Product is inactive"),
        (status = 404, description = "Product not found"),
    ),
    tag = "catalog"
)]
pub async fn get_product(
    state: web::Data<AppState>,
    viewer: MaybeAuthenticated,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let product = blocking(move || state.catalog.get_product(id, viewer.0.as_ref())).await?;
    Ok(HttpResponse::Ok().json(ProductResponse::from(product)))
}

#[utoipa::path(
    post,
    path = "/products",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Product created", body = ProductResponse),
        (status = 400, description = "Invalid product"),
        (status = 403, description = "Caller is not a manager"),
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn create_product(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    body: web::Json<CreateProductRequest>,
) -> Result<HttpResponse, AppError> {
    RoleRequirement::MANAGER.check(&user)?;
    let body = body.into_inner();
    let product = NewProduct {
        price: parse_price(&body.price)?,
        name: body.name,
        description: body.description,
        stock: body.stock,
        is_active: body.is_active,
        category_ids: body.category_ids,
    };

    let created = blocking(move || state.catalog.create_product(product)).await?;
    Ok(HttpResponse::Created().json(ProductResponse::from(created)))
}

#[utoipa::path(
    patch,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Product updated", body = ProductResponse),
        (status = 400, description = "Invalid change"),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn update_product(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<UpdateProductRequest>,
) -> Result<HttpResponse, AppError> {
    RoleRequirement::MANAGER.check(&user)?;
    let id = path.into_inner();
    let body = body.into_inner();
    let patch = ProductPatch {
        price: body.price.as_deref().map(parse_price).transpose()?,
        name: body.name,
        description: body.description,
        stock: body.stock,
        is_active: body.is_active,
    };

    let updated = blocking(move || state.catalog.update_product(id, patch)).await?;
    Ok(HttpResponse::Ok().json(ProductResponse::from(updated)))
}

#[utoipa::path(
    delete,
    path = "/products/{id}",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Removed product", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn delete_product(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    RoleRequirement::MANAGER.check(&user)?;
    let id = path.into_inner();
    let removed = blocking(move || state.catalog.remove_product(id)).await?;
    Ok(HttpResponse::Ok().json(ProductResponse::from(removed)))
}

#[utoipa::path(
    post,
    path = "/products/{id}/images",
    params(("id" = Uuid, Path, description = "Product UUID")),
    request_body = AttachImageRequest,
    responses(
        (status = 201, description = "Image attached", body = ProductResponse),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn attach_image(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<AttachImageRequest>,
) -> Result<HttpResponse, AppError> {
    RoleRequirement::MANAGER.check(&user)?;
    let id = path.into_inner();
    let url = body.into_inner().url;
    let product = blocking(move || state.catalog.attach_image(id, url)).await?;
    Ok(HttpResponse::Created().json(ProductResponse::from(product)))
}

/// POST /products/{id}/like
///
/// Flips the caller's like and returns the new state.
#[utoipa::path(
    post,
    path = "/products/{id}/like",
    params(("id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Like toggled", body = LikeResponse),
        (status = 404, description = "Product not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn toggle_like(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    RoleRequirement::CLIENT.check(&user)?;
    let id = path.into_inner();
    let liked = blocking(move || state.catalog.toggle_like(id, &user)).await?;
    Ok(HttpResponse::Ok().json(LikeResponse { liked }))
}

// ── Categories ───────────────────────────────────────────────────────────────

#[utoipa::path(
    get,
    path = "/categories",
    responses((status = 200, description = "All categories", body = Vec<CategoryResponse>)),
    tag = "catalog"
)]
pub async fn list_categories(state: web::Data<AppState>) -> Result<HttpResponse, AppError> {
    let categories = blocking(move || state.catalog.list_categories()).await?;
    Ok(HttpResponse::Ok().json(
        categories
            .into_iter()
            .map(CategoryResponse::from)
            .collect::<Vec<_>>(),
    ))
}

#[utoipa::path(
    get,
    path = "/categories/{id}",
    params(("id" = i32, Path, description = "Category id")),
    responses(
        (status = 200, description = "Category found", body = CategoryResponse),
        (status = 404, description = "Category not found"),
    ),
    tag = "catalog"
)]
pub async fn get_category(
    state: web::Data<AppState>,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let category = blocking(move || state.catalog.get_category(id)).await?;
    Ok(HttpResponse::Ok().json(CategoryResponse::from(category)))
}

#[utoipa::path(
    post,
    path = "/categories",
    request_body = CategoryRequest,
    responses(
        (status = 201, description = "Category created", body = CategoryResponse),
        (status = 409, description = "Category name already taken"),
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn create_category(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    body: web::Json<CategoryRequest>,
) -> Result<HttpResponse, AppError> {
    RoleRequirement::MANAGER.check(&user)?;
    let name = body.into_inner().name;
    let category = blocking(move || state.catalog.create_category(name)).await?;
    Ok(HttpResponse::Created().json(CategoryResponse::from(category)))
}

#[utoipa::path(
    patch,
    path = "/categories/{id}",
    params(("id" = i32, Path, description = "Category id")),
    request_body = CategoryRequest,
    responses(
        (status = 200, description = "Category renamed", body = CategoryResponse),
        (status = 404, description = "Category not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn rename_category(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    path: web::Path<i32>,
    body: web::Json<CategoryRequest>,
) -> Result<HttpResponse, AppError> {
    RoleRequirement::MANAGER.check(&user)?;
    let id = path.into_inner();
    let name = body.into_inner().name;
    let category = blocking(move || state.catalog.rename_category(id, name)).await?;
    Ok(HttpResponse::Ok().json(CategoryResponse::from(category)))
}

#[utoipa::path(
    delete,
    path = "/categories/{id}",
    params(("id" = i32, Path, description = "Category id")),
    responses(
        (status = 200, description = "Removed category", body = CategoryResponse),
        (status = 404, description = "Category not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "catalog"
)]
pub async fn delete_category(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    path: web::Path<i32>,
) -> Result<HttpResponse, AppError> {
    RoleRequirement::MANAGER.check(&user)?;
    let id = path.into_inner();
    let category = blocking(move || state.catalog.remove_category(id)).await?;
    Ok(HttpResponse::Ok().json(CategoryResponse::from(category)))
}
