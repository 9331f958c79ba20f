use actix_web::{web, HttpRequest, HttpResponse};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::auth::RoleRequirement;
use crate::domain::payment::CheckoutSession;
use crate::errors::AppError;
use crate::state::AppState;

use super::orders::OrderResponse;
use super::{blocking, Authenticated};

pub const SIGNATURE_HEADER: &str = "Stripe-Signature";

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutResponse {
    /// Secret the browser hands to the payment widget.
    pub client_secret: String,
    pub payment_intent_id: String,
    pub order_summary: OrderResponse,
    pub total_amount: String,
}

impl From<CheckoutSession> for CheckoutResponse {
    fn from(s: CheckoutSession) -> Self {
        Self {
            client_secret: s.client_secret,
            payment_intent_id: s.payment_intent_id,
            order_summary: s.order_summary.into(),
            total_amount: s.total.to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct WebhookAck {
    pub received: bool,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/payments", web::post().to(create_payment))
        .route("/payment-webhook", web::post().to(payment_webhook));
}

/// POST /payments
///
/// Turns the caller's cart into an order and opens a payment intent for it.
#[utoipa::path(
    post,
    path = "/payments",
    responses(
        (status = 201, description = "Order placed and payment intent opened", body = CheckoutResponse),
        (status = 400, description = "Cart is empty"),
        (status = 409, description = "Not enough stock for a cart line"),
        (status = 502, description = "Payment gateway failed"),
    ),
    security(("bearer_auth" = [])),
    tag = "payments"
)]
pub async fn create_payment(
    state: web::Data<AppState>,
    Authenticated(user): Authenticated,
) -> Result<HttpResponse, AppError> {
    RoleRequirement::CLIENT.check(&user)?;
    let session = blocking(move || state.payments.create(user.user_id)).await?;
    Ok(HttpResponse::Created().json(CheckoutResponse::from(session)))
}

/// POST /payment-webhook
///
/// The body must be the exact bytes the gateway signed.
#[utoipa::path(
    post,
    path = "/payment-webhook",
    request_body(content = String, description = "Raw gateway event", content_type = "application/json"),
    params(("Stripe-Signature" = String, Header, description = "Gateway signature header")),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 401, description = "Signature missing or invalid"),
    ),
    tag = "payments"
)]
pub async fn payment_webhook(
    state: web::Data<AppState>,
    req: HttpRequest,
    body: web::Bytes,
) -> Result<HttpResponse, AppError> {
    let signature = req
        .headers()
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("Missing {SIGNATURE_HEADER} header")))?;

    let event = state.webhooks.construct_event(&body, signature).map_err(|e| {
        log::warn!("Rejected payment webhook: {}", e);
        AppError::from(e)
    })?;
    log::debug!("Payment webhook {:?} for {}", event.kind, event.intent_id);

    blocking(move || state.payments.reconcile(&event)).await?;
    Ok(HttpResponse::Ok().json(WebhookAck { received: true }))
}
