//! Stripe payment intents and webhook signature verification.

use std::collections::HashMap;
use std::time::Duration;

use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::blocking::Client;
use serde::Deserialize;
use sha2::Sha256;
use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::payment::{GatewayEvent, GatewayEventKind, GatewayIntent, PaymentMetadata};
use crate::domain::ports::PaymentGateway;

/// Signed webhooks older than this are rejected as replays.
pub const WEBHOOK_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, Deserialize)]
struct IntentResponse {
    id: String,
    client_secret: String,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// Creates payment intents through the Stripe REST API.
///
/// Uses the blocking client, so it must be constructed outside the async
/// runtime and only called from `web::block`.
pub struct StripeGateway {
    client: Client,
    api_base: String,
    api_key: String,
}

impl StripeGateway {
    pub fn new(api_base: &str, api_key: &str) -> Result<Self, DomainError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| DomainError::Internal(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }
}

impl PaymentGateway for StripeGateway {
    fn create_payment_intent(
        &self,
        amount_in_cents: i64,
        currency: &str,
        metadata: &PaymentMetadata,
    ) -> Result<GatewayIntent, DomainError> {
        let form = [
            ("amount", amount_in_cents.to_string()),
            ("currency", currency.to_string()),
            ("metadata[customerId]", metadata.customer_id.to_string()),
            ("metadata[orderId]", metadata.order_id.to_string()),
        ];

        let resp = self
            .client
            .post(format!("{}/v1/payment_intents", self.api_base))
            .bearer_auth(&self.api_key)
            .form(&form)
            .send()
            .map_err(|e| DomainError::Gateway(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp
                .json::<ErrorResponse>()
                .map(|e| e.error.message)
                .unwrap_or_else(|_| format!("unexpected status {status}"));
            return Err(DomainError::Gateway(message));
        }

        let intent: IntentResponse = resp
            .json()
            .map_err(|e| DomainError::Gateway(format!("malformed payment intent: {e}")))?;
        Ok(GatewayIntent {
            id: intent.id,
            client_secret: intent.client_secret,
        })
    }
}

#[derive(Debug, Deserialize)]
struct WebhookPayload {
    #[serde(rename = "type")]
    event_type: String,
    data: WebhookData,
}

#[derive(Debug, Deserialize)]
struct WebhookData {
    object: IntentObject,
}

#[derive(Debug, Deserialize)]
struct IntentObject {
    id: String,
    #[serde(default)]
    metadata: HashMap<String, String>,
}

pub struct StripeWebhookVerifier {
    secret: String,
}

impl StripeWebhookVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            secret: secret.to_string(),
        }
    }

    /// Verifies the `Stripe-Signature` header against the raw body and
    /// decodes the event.
    pub fn construct_event(
        &self,
        payload: &[u8],
        signature_header: &str,
    ) -> Result<GatewayEvent, DomainError> {
        self.construct_event_at(payload, signature_header, Utc::now().timestamp())
    }

    fn construct_event_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<GatewayEvent, DomainError> {
        let rejected = |why: &str| DomainError::Unauthorized(format!("Webhook signature rejected: {why}"));

        let mut timestamp = None;
        let mut signatures = Vec::new();
        for part in signature_header.split(',') {
            match part.trim().split_once('=') {
                Some(("t", value)) => timestamp = value.parse::<i64>().ok(),
                Some(("v1", value)) => signatures.push(value),
                _ => {}
            }
        }
        let timestamp = timestamp.ok_or_else(|| rejected("missing timestamp"))?;
        if signatures.is_empty() {
            return Err(rejected("missing v1 signature"));
        }
        if (now - timestamp).abs() > WEBHOOK_TOLERANCE_SECS {
            return Err(rejected("timestamp outside tolerance"));
        }

        let mut mac = Hmac::<Sha256>::new_from_slice(self.secret.as_bytes())
            .map_err(|e| DomainError::Internal(e.to_string()))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);

        let matched = signatures.iter().any(|candidate| {
            hex::decode(candidate)
                .map(|bytes| mac.clone().verify_slice(&bytes).is_ok())
                .unwrap_or(false)
        });
        if !matched {
            return Err(rejected("no matching signature"));
        }

        let event: WebhookPayload = serde_json::from_slice(payload)
            .map_err(|e| DomainError::invalid(format!("malformed webhook payload: {e}")))?;
        Ok(GatewayEvent {
            kind: GatewayEventKind::from_type(&event.event_type),
            order_id: event
                .data
                .object
                .metadata
                .get("orderId")
                .and_then(|id| Uuid::parse_str(id).ok()),
            intent_id: event.data.object.id,
        })
    }
}
