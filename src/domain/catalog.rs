use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::auth::{Principal, Role};
use super::errors::DomainError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_LIMIT: i64 = 10;
pub const MAX_LIMIT: i64 = 100;
const MAX_NAME_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq)]
pub struct CategoryView {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageView {
    pub id: Uuid,
    pub url: String,
}

#[derive(Debug, Clone)]
pub struct ProductView {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub images: Vec<ImageView>,
    pub categories: Vec<CategoryView>,
    /// Whether the viewing user liked the product; `None` for anonymous viewers.
    pub liked: Option<bool>,
}

/// Caller-supplied catalog filters, before access rules are applied.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub search_by_name: Option<String>,
    pub category: Option<String>,
    pub liked_only: bool,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// A fully composed catalog query, ready for a repository.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductQuery {
    pub name_contains: Option<String>,
    pub category: Option<String>,
    pub liked_by: Option<Uuid>,
    pub active_only: bool,
    pub viewer: Option<Uuid>,
    pub limit: i64,
    pub offset: i64,
}

impl ProductFilter {
    pub fn compose(self, viewer: Option<&Principal>) -> ProductQuery {
        let page = self.page.unwrap_or(DEFAULT_PAGE).max(1);
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, MAX_LIMIT);

        ProductQuery {
            name_contains: self.search_by_name.filter(|s| !s.trim().is_empty()),
            category: self.category.filter(|s| !s.trim().is_empty()),
            liked_by: viewer.filter(|_| self.liked_only).map(|p| p.user_id),
            active_only: viewer.map_or(true, |p| p.role == Role::Client),
            viewer: viewer.map(|p| p.user_id),
            limit,
            offset: (page - 1).saturating_mul(limit),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewProduct {
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub is_active: bool,
    pub category_ids: Vec<i32>,
}

#[derive(Debug, Clone, Default)]
pub struct ProductPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub stock: Option<i32>,
    pub is_active: Option<bool>,
}

fn validate_name(name: &str) -> Result<(), DomainError> {
    if name.trim().is_empty() {
        return Err(DomainError::invalid("name must not be empty"));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(DomainError::invalid(format!(
            "name must be at most {MAX_NAME_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_price(price: &BigDecimal) -> Result<(), DomainError> {
    if *price <= BigDecimal::from(0) {
        return Err(DomainError::invalid("price must be positive"));
    }
    let (_, scale) = price.normalized().as_bigint_and_exponent();
    if scale > 2 {
        return Err(DomainError::invalid("price must have at most 2 decimal digits"));
    }
    Ok(())
}

fn validate_stock(stock: i32) -> Result<(), DomainError> {
    if stock <= 0 {
        return Err(DomainError::invalid("stock must be positive"));
    }
    Ok(())
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), DomainError> {
        validate_name(&self.name)?;
        validate_price(&self.price)?;
        validate_stock(self.stock)
    }
}

impl ProductPatch {
    pub fn validate(&self) -> Result<(), DomainError> {
        if let Some(name) = &self.name {
            validate_name(name)?;
        }
        if let Some(price) = &self.price {
            validate_price(price)?;
        }
        match self.stock {
            Some(stock) if stock < 0 => Err(DomainError::invalid("stock must not be negative")),
            _ => Ok(()),
        }
    }
}

pub fn validate_category_name(name: &str) -> Result<(), DomainError> {
    validate_name(name)
}
