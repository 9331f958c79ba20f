use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::auth::RoleRequirement;
use crate::domain::cart::{CartLine, CartView};
use crate::errors::AppError;
use crate::state::AppState;

use super::catalog::ProductResponse;
use super::{blocking, Authenticated};

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartItemResponse {
    pub product: ProductResponse,
    pub quantity: i32,
    /// Current unit price times quantity, as a decimal string.
    pub item_total: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CartResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub items: Vec<CartItemResponse>,
    pub total_amount: String,
}

impl From<CartLine> for CartItemResponse {
    fn from(line: CartLine) -> Self {
        Self {
            item_total: line.item_total().to_string(),
            quantity: line.quantity,
            product: line.product.into(),
        }
    }
}

impl From<CartView> for CartResponse {
    fn from(cart: CartView) -> Self {
        Self {
            total_amount: cart.total_amount().to_string(),
            id: cart.id,
            user_id: cart.user_id,
            created_at: cart.created_at,
            items: cart.items.into_iter().map(Into::into).collect(),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    /// New quantity; 0 removes the product from the cart.
    pub quantity: i32,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/cart")
            .route("", web::get().to(get_cart))
            .route("", web::delete().to(clear_cart))
            .route("/items/{product_id}", web::put().to(update_item))
            .route("/items/{product_id}", web::delete().to(remove_item)),
    );
}

#[utoipa::path(
    get,
    path = "/cart",
    responses(
        (status = 200, description = "The caller's cart", body = CartResponse),
        (status = 403, description = "Caller is not a client"),
    ),
    security(("bearer_auth" = [])),
    tag = "cart"
)]
pub async fn get_cart(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
) -> Result<HttpResponse, AppError> {
    RoleRequirement::CLIENT.check(&user)?;
    let cart = blocking(move || state.carts.get_cart(&user)).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

/// PUT /cart/items/{product_id}
///
/// Sets the quantity of one product; 0 removes it.
#[utoipa::path(
    put,
    path = "/cart/items/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product UUID")),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 400, description = "Negative quantity or unavailable product"),
    ),
    security(("bearer_auth" = [])),
    tag = "cart"
)]
pub async fn update_item(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<UpdateCartItemRequest>,
) -> Result<HttpResponse, AppError> {
    RoleRequirement::CLIENT.check(&user)?;
    let product_id = path.into_inner();
    let quantity = body.quantity;
    let cart = blocking(move || state.carts.update_item(&user, product_id, quantity)).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

#[utoipa::path(
    delete,
    path = "/cart/items/{product_id}",
    params(("product_id" = Uuid, Path, description = "Product UUID")),
    responses(
        (status = 200, description = "Updated cart", body = CartResponse),
        (status = 404, description = "Product inactive, missing or not in the cart"),
    ),
    security(("bearer_auth" = [])),
    tag = "cart"
)]
pub async fn remove_item(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    RoleRequirement::CLIENT.check(&user)?;
    let product_id = path.into_inner();
    let cart = blocking(move || state.carts.remove_item(&user, product_id)).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}

#[utoipa::path(
    delete,
    path = "/cart",
    responses((status = 200, description = "Emptied cart", body = CartResponse)),
    security(("bearer_auth" = [])),
    tag = "cart"
)]
pub async fn clear_cart(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
) -> Result<HttpResponse, AppError> {
    RoleRequirement::CLIENT.check(&user)?;
    let cart = blocking(move || state.carts.clear(&user)).await?;
    Ok(HttpResponse::Ok().json(CartResponse::from(cart)))
}
