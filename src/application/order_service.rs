use std::sync::Arc;

use uuid::Uuid;

use crate::domain::auth::Principal;
use crate::domain::errors::DomainError;
use crate::domain::order::{order_total, OrderLineInput, OrderStatus, OrderView, PlacedOrder};
use crate::domain::ports::{CartRepository, OrderRepository};

#[derive(Clone)]
pub struct OrderService {
    repo: Arc<dyn OrderRepository>,
    carts: Arc<dyn CartRepository>,
}

impl OrderService {
    pub fn new(repo: Arc<dyn OrderRepository>, carts: Arc<dyn CartRepository>) -> Self {
        Self { repo, carts }
    }

    /// Turns the customer's cart into a PENDING order.
    ///
    /// Stock is checked against the cart snapshot before anything is written,
    /// then decremented conditionally inside the order transaction, so a
    /// concurrent purchase that drains a product still aborts the whole order.
    /// The cart is cleared only after the order is committed; a failure there
    /// is logged and does not undo the order.
    pub fn create(&self, customer_id: Uuid) -> Result<PlacedOrder, DomainError> {
        let items = self
            .carts
            .find_by_user(customer_id)?
            .map(|cart| cart.items)
            .unwrap_or_default();

        let lines = OrderLineInput::from_cart(&items)?;
        let total = order_total(&lines);
        let order = self.repo.place(customer_id, &lines)?;
        log::info!(
            "Placed order {} for customer {} ({} lines, total {})",
            order.id,
            customer_id,
            lines.len(),
            total
        );

        if let Err(e) = self.carts.clear(customer_id) {
            log::warn!(
                "Order {} committed but clearing the cart of customer {} failed: {}",
                order.id,
                customer_id,
                e
            );
        }

        Ok(PlacedOrder { order, total })
    }

    pub fn find_all(&self, customer_id: Option<Uuid>) -> Result<Vec<OrderView>, DomainError> {
        self.repo.list(customer_id)
    }

    pub fn find_one(&self, id: Uuid, requester: &Principal) -> Result<OrderView, DomainError> {
        let order = self
            .repo
            .find_by_id(id)?
            .ok_or_else(|| DomainError::not_found("Order"))?;

        if !requester.can_access_owned_by(order.customer_id) {
            return Err(DomainError::Forbidden(
                "Do not have permission to request order.".to_string(),
            ));
        }
        Ok(order)
    }

    pub fn status_of(&self, id: Uuid) -> Result<OrderStatus, DomainError> {
        self.repo
            .find_by_id(id)?
            .map(|order| order.status)
            .ok_or_else(|| DomainError::not_found("Order"))
    }

    /// Overwrites the status without checking the transition graph.
    pub fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderView, DomainError> {
        self.repo.update_status(id, status)
    }

    pub fn restock_products(&self, id: Uuid) -> Result<(), DomainError> {
        self.repo.restock(id)?;
        log::info!("Restocked products of order {}", id);
        Ok(())
    }

    /// Cancels the order and restocks it, unless it is already cancelled.
    /// Returns the status the order had before.
    pub fn cancel_and_restock(&self, id: Uuid) -> Result<Option<OrderStatus>, DomainError> {
        let previous = self.repo.cancel_and_restock(id)?;
        if previous.is_some() {
            log::info!("Cancelled order {} and restocked its products", id);
        }
        Ok(previous)
    }
}
