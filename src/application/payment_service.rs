use std::sync::Arc;

use uuid::Uuid;

use crate::domain::errors::DomainError;
use crate::domain::order::OrderStatus;
use crate::domain::payment::{
    to_minor_units, CheckoutSession, GatewayEvent, GatewayEventKind, NewPayment,
    PaymentIntentStatus, PaymentMetadata, ReconcileOutcome,
};
use crate::domain::ports::{PaymentGateway, PaymentRepository};

use super::order_service::OrderService;

#[derive(Clone)]
pub struct PaymentService {
    orders: OrderService,
    payments: Arc<dyn PaymentRepository>,
    gateway: Arc<dyn PaymentGateway>,
    currency: String,
}

impl PaymentService {
    pub fn new(
        orders: OrderService,
        payments: Arc<dyn PaymentRepository>,
        gateway: Arc<dyn PaymentGateway>,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            orders,
            payments,
            gateway,
            currency: currency.into(),
        }
    }

    /// Places an order from the customer's cart and opens a gateway payment
    /// intent for its total.
    ///
    /// If the gateway call fails the order stays PENDING without a payment.
    pub fn create(&self, customer_id: Uuid) -> Result<CheckoutSession, DomainError> {
        let placed = self.orders.create(customer_id)?;
        let order_id = placed.order.id;
        let amount_in_cents = to_minor_units(&placed.total)?;

        let metadata = PaymentMetadata {
            customer_id,
            order_id,
        };
        let intent = self
            .gateway
            .create_payment_intent(amount_in_cents, &self.currency, &metadata)
            .map_err(|e| {
                log::error!(
                    "Payment intent creation failed, order {} left pending without payment: {}",
                    order_id,
                    e
                );
                e
            })?;

        self.payments.create(NewPayment {
            order_id,
            amount_in_cents,
            currency: self.currency.clone(),
            gateway_ref: intent.id.clone(),
        })?;
        log::info!(
            "Opened payment intent {} for order {} ({} {})",
            intent.id,
            order_id,
            amount_in_cents,
            self.currency
        );

        Ok(CheckoutSession {
            client_secret: intent.client_secret,
            payment_intent_id: intent.id,
            order_summary: placed.order,
            total: placed.total,
        })
    }

    /// Applies a verified gateway event to local payment and order state.
    pub fn reconcile(&self, event: &GatewayEvent) -> Result<ReconcileOutcome, DomainError> {
        let outcome = match &event.kind {
            GatewayEventKind::Succeeded => self.complete(event)?,
            GatewayEventKind::Failed => {
                self.payments
                    .set_intent_status(&event.intent_id, PaymentIntentStatus::Failed)?;
                ReconcileOutcome::Failed
            }
            GatewayEventKind::Canceled => self.cancel(event)?,
            GatewayEventKind::Other(kind) => {
                log::debug!("Ignoring gateway event {} for {}", kind, event.intent_id);
                ReconcileOutcome::Ignored
            }
        };
        log::info!(
            "Reconciled payment intent {}: {:?}",
            event.intent_id,
            outcome
        );
        Ok(outcome)
    }

    fn complete(&self, event: &GatewayEvent) -> Result<ReconcileOutcome, DomainError> {
        let order_id = event.require_order_id()?;
        self.payments
            .set_intent_status(&event.intent_id, PaymentIntentStatus::Successful)?;
        let current = self.orders.status_of(order_id)?;
        self.transition(order_id, current, OrderStatus::Shipped)?;
        Ok(ReconcileOutcome::Completed)
    }

    fn cancel(&self, event: &GatewayEvent) -> Result<ReconcileOutcome, DomainError> {
        let order_id = event.require_order_id()?;
        self.payments
            .set_intent_status(&event.intent_id, PaymentIntentStatus::Failed)?;

        let Some(previous) = self.orders.cancel_and_restock(order_id)? else {
            log::warn!(
                "Order {} is already cancelled, not restocking again",
                order_id
            );
            return Ok(ReconcileOutcome::AlreadyCancelled);
        };
        warn_off_lifecycle(order_id, previous, OrderStatus::Cancelled);
        Ok(ReconcileOutcome::Cancelled)
    }

    /// Status updates from the gateway are applied even when they do not
    /// follow the PENDING -> SHIPPED | CANCELLED graph, but they are logged.
    fn transition(
        &self,
        order_id: Uuid,
        current: OrderStatus,
        next: OrderStatus,
    ) -> Result<(), DomainError> {
        warn_off_lifecycle(order_id, current, next);
        self.orders.update_status(order_id, next)?;
        Ok(())
    }
}

fn warn_off_lifecycle(order_id: Uuid, current: OrderStatus, next: OrderStatus) {
    if current != next && !current.can_transition_to(next) {
        log::warn!(
            "Order {} moves from {} to {} outside the expected lifecycle",
            order_id,
            current,
            next
        );
    }
}
