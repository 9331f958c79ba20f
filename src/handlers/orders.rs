use actix_web::{web, HttpResponse};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::auth::RoleRequirement;
use crate::domain::order::{OrderDetailView, OrderStatus, OrderView};
use crate::domain::payment::{PaymentIntentView, PaymentView};
use crate::errors::AppError;
use crate::state::AppState;

use super::{blocking, Authenticated};

// ── Request / response DTOs ──────────────────────────────────────────────────

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderDetailResponse {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    /// Price per unit frozen when the order was placed.
    pub unit_price: String,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentIntentResponse {
    pub id: Uuid,
    pub payment_intent_id: String,
    /// PENDING, SUCCESSFUL or FAILED
    pub status: String,
    pub status_info: Option<String>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: Uuid,
    pub amount_in_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub intents: Vec<PaymentIntentResponse>,
}

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub customer_id: Uuid,
    /// PENDING, SHIPPED or CANCELLED
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub details: Vec<OrderDetailResponse>,
    pub total_amount: String,
    pub payment: Option<PaymentResponse>,
}

impl From<OrderDetailView> for OrderDetailResponse {
    fn from(d: OrderDetailView) -> Self {
        Self {
            product_id: d.product_id,
            product_name: d.product_name,
            quantity: d.quantity,
            unit_price: d.unit_price.to_string(),
        }
    }
}

impl From<PaymentIntentView> for PaymentIntentResponse {
    fn from(i: PaymentIntentView) -> Self {
        Self {
            id: i.id,
            payment_intent_id: i.gateway_ref,
            status: i.status.to_string(),
            status_info: i.status_info,
            updated_at: i.updated_at,
        }
    }
}

impl From<PaymentView> for PaymentResponse {
    fn from(p: PaymentView) -> Self {
        Self {
            id: p.id,
            amount_in_cents: p.amount_in_cents,
            currency: p.currency,
            created_at: p.created_at,
            intents: p.intents.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<OrderView> for OrderResponse {
    fn from(o: OrderView) -> Self {
        Self {
            total_amount: o.total().to_string(),
            id: o.id,
            customer_id: o.customer_id,
            status: o.status.to_string(),
            created_at: o.created_at,
            updated_at: o.updated_at,
            details: o.details.into_iter().map(Into::into).collect(),
            payment: o.payment.map(Into::into),
        }
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    /// PENDING, SHIPPED or CANCELLED
    pub status: String,
}

fn orders_json(orders: Vec<OrderView>) -> HttpResponse {
    HttpResponse::Ok().json(orders.into_iter().map(OrderResponse::from).collect::<Vec<_>>())
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    // `/mine` is registered before `/{id}` so it is not read as an id.
    cfg.service(
        web::scope("/orders")
            .route("", web::get().to(list_orders))
            .route("/mine", web::get().to(my_orders))
            .route("/{id}", web::get().to(get_order))
            .route("/{id}/status", web::patch().to(update_order_status)),
    );
}

// ── Handlers ─────────────────────────────────────────────────────────────────

/// GET /orders
///
/// Every order in the shop, newest first.
#[utoipa::path(
    get,
    path = "/orders",
    responses(
        (status = 200, description = "All orders", body = Vec<OrderResponse>),
        (status = 403, description = "Caller is not a manager"),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn list_orders(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
) -> Result<HttpResponse, AppError> {
    RoleRequirement::MANAGER.check(&user)?;
    let orders = blocking(move || state.orders.find_all(None)).await?;
    Ok(orders_json(orders))
}

/// GET /orders/mine
#[utoipa::path(
    get,
    path = "/orders/mine",
    responses(
        (status = 200, description = "The caller's orders", body = Vec<OrderResponse>),
        (status = 403, description = "Caller is not a client"),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn my_orders(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
) -> Result<HttpResponse, AppError> {
    RoleRequirement::CLIENT.check(&user)?;
    let orders = blocking(move || state.orders.find_all(Some(user.user_id))).await?;
    Ok(orders_json(orders))
}

/// GET /orders/{id}
///
/// Clients may only read their own orders.
#[utoipa::path(
    get,
    path = "/orders/{id}",
    params(("id" = Uuid, Path, description = "Order UUID")),
    responses(
        (status = 200, description = "Order found", body = OrderResponse),
        (status = 403, description = "Order belongs to another customer"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn get_order(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, AppError> {
    RoleRequirement::ANY.check(&user)?;
    let order_id = path.into_inner();
    let order = blocking(move || state.orders.find_one(order_id, &user)).await?;
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}

/// PATCH /orders/{id}/status
///
/// Administrative override; the lifecycle is not enforced here.
#[utoipa::path(
    patch,
    path = "/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order UUID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Status updated", body = OrderResponse),
        (status = 400, description = "Unknown status"),
        (status = 404, description = "Order not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "orders"
)]
pub async fn update_order_status(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
    path: web::Path<Uuid>,
    body: web::Json<UpdateOrderStatusRequest>,
) -> Result<HttpResponse, AppError> {
    RoleRequirement::MANAGER.check(&user)?;
    let order_id = path.into_inner();
    let status: OrderStatus = body.status.parse()?;

    let order = blocking(move || state.orders.update_status(order_id, status)).await?;
    log::info!("Order {} set to {} by {}", order.id, order.status, user.user_id);
    Ok(HttpResponse::Ok().json(OrderResponse::from(order)))
}
