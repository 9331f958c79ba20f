use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::cart::CartLine;
use super::errors::DomainError;
use super::payment::PaymentView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,
    Shipped,
    Cancelled,
}

impl OrderStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Shipped => "SHIPPED",
            OrderStatus::Cancelled => "CANCELLED",
        }
    }

    /// PENDING may move to SHIPPED or CANCELLED; both are terminal.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        matches!(
            (self, next),
            (OrderStatus::Pending, OrderStatus::Shipped)
                | (OrderStatus::Pending, OrderStatus::Cancelled)
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(OrderStatus::Pending),
            "SHIPPED" => Ok(OrderStatus::Shipped),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            other => Err(DomainError::invalid(format!("unknown order status '{other}'"))),
        }
    }
}

/// A line to be written into a new order. The unit price is the product's
/// price when the order was placed and never changes afterwards.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderLineInput {
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

impl OrderLineInput {
    /// Freezes the cart into order lines, failing before any mutation if a
    /// line asks for more than the product has in stock.
    pub fn from_cart(items: &[CartLine]) -> Result<Vec<OrderLineInput>, DomainError> {
        if items.is_empty() {
            return Err(DomainError::EmptyCart);
        }
        items
            .iter()
            .map(|item| {
                if item.quantity > item.product.stock {
                    return Err(DomainError::InsufficientStock {
                        product_id: item.product.id,
                    });
                }
                Ok(OrderLineInput {
                    product_id: item.product.id,
                    quantity: item.quantity,
                    unit_price: item.product.price.clone(),
                })
            })
            .collect()
    }

    pub fn line_total(&self) -> BigDecimal {
        &self.unit_price * BigDecimal::from(self.quantity)
    }
}

pub fn order_total(lines: &[OrderLineInput]) -> BigDecimal {
    lines
        .iter()
        .fold(BigDecimal::from(0), |acc, line| acc + line.line_total())
}

#[derive(Debug, Clone)]
pub struct OrderDetailView {
    pub product_id: Uuid,
    pub product_name: String,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct OrderView {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub details: Vec<OrderDetailView>,
    pub payment: Option<PaymentView>,
}

impl OrderView {
    pub fn total(&self) -> BigDecimal {
        self.details.iter().fold(BigDecimal::from(0), |acc, d| {
            acc + &d.unit_price * BigDecimal::from(d.quantity)
        })
    }
}

/// Result of placing an order: the stored order plus the amount owed.
#[derive(Debug, Clone)]
pub struct PlacedOrder {
    pub order: OrderView,
    pub total: BigDecimal,
}
