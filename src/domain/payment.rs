use std::fmt;
use std::str::FromStr;

use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::DomainError;
use super::order::OrderView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentIntentStatus {
    Pending,
    Successful,
    Failed,
}

impl PaymentIntentStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentIntentStatus::Pending => "PENDING",
            PaymentIntentStatus::Successful => "SUCCESSFUL",
            PaymentIntentStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for PaymentIntentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentIntentStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(PaymentIntentStatus::Pending),
            "SUCCESSFUL" => Ok(PaymentIntentStatus::Successful),
            "FAILED" => Ok(PaymentIntentStatus::Failed),
            other => Err(DomainError::Internal(format!(
                "unknown payment intent status '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentIntentView {
    pub id: Uuid,
    pub gateway_ref: String,
    pub status: PaymentIntentStatus,
    pub status_info: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct PaymentView {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount_in_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub intents: Vec<PaymentIntentView>,
}

#[derive(Debug, Clone)]
pub struct NewPayment {
    pub order_id: Uuid,
    pub amount_in_cents: i64,
    pub currency: String,
    pub gateway_ref: String,
}

/// Metadata attached to a gateway payment intent and echoed back in webhooks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentMetadata {
    pub customer_id: Uuid,
    pub order_id: Uuid,
}

/// A payment intent as created by the gateway.
#[derive(Debug, Clone)]
pub struct GatewayIntent {
    pub id: String,
    pub client_secret: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayEventKind {
    Succeeded,
    Failed,
    Canceled,
    Other(String),
}

impl GatewayEventKind {
    pub fn from_type(event_type: &str) -> Self {
        match event_type {
            "payment_intent.succeeded" => GatewayEventKind::Succeeded,
            "payment_intent.payment_failed" => GatewayEventKind::Failed,
            "payment_intent.canceled" => GatewayEventKind::Canceled,
            other => GatewayEventKind::Other(other.to_string()),
        }
    }
}

/// A verified webhook event about one payment intent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GatewayEvent {
    pub kind: GatewayEventKind,
    pub intent_id: String,
    pub order_id: Option<Uuid>,
}

impl GatewayEvent {
    pub fn require_order_id(&self) -> Result<Uuid, DomainError> {
        self.order_id.ok_or_else(|| {
            DomainError::invalid(format!(
                "payment intent {} carries no orderId metadata",
                self.intent_id
            ))
        })
    }
}

/// What a reconciled webhook event did to local state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Completed,
    Failed,
    Cancelled,
    AlreadyCancelled,
    Ignored,
}

#[derive(Debug, Clone)]
pub struct CheckoutSession {
    pub client_secret: String,
    pub payment_intent_id: String,
    pub order_summary: OrderView,
    pub total: BigDecimal,
}

/// Converts a decimal amount in major units into integer minor units (x100).
pub fn to_minor_units(amount: &BigDecimal) -> Result<i64, DomainError> {
    (amount * BigDecimal::from(100))
        .round(0)
        .to_i64()
        .ok_or_else(|| DomainError::invalid(format!("amount {amount} is out of range")))
}
