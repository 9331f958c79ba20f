use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::catalog::ProductView;

#[derive(Debug, Clone)]
pub struct CartLine {
    pub product: ProductView,
    pub quantity: i32,
}

impl CartLine {
    pub fn item_total(&self) -> BigDecimal {
        &self.product.price * BigDecimal::from(self.quantity)
    }
}

#[derive(Debug, Clone)]
pub struct CartView {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub items: Vec<CartLine>,
}

impl CartView {
    pub fn total_amount(&self) -> BigDecimal {
        self.items
            .iter()
            .fold(BigDecimal::from(0), |acc, line| acc + line.item_total())
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}
