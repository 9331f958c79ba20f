use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::domain::catalog::{CategoryView, ImageView};
use crate::domain::order::OrderDetailView;
use crate::domain::payment::PaymentIntentView;
use crate::schema::{
    cart_items, carts, categories, likes, order_details, order_headers, payment_intents,
    payments, product_categories, product_images, products, users,
};

// ── Catalog ──────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = products)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = products)]
pub struct NewProductRow {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: BigDecimal,
    pub stock: i32,
    pub is_active: bool,
}

/// Only the `Some` fields are written.
#[derive(Debug, AsChangeset)]
#[diesel(table_name = products)]
pub struct ProductChangeset {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<BigDecimal>,
    pub stock: Option<i32>,
    pub is_active: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = product_images)]
#[diesel(belongs_to(ProductRow, foreign_key = product_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ImageRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub url: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = product_images)]
pub struct NewImageRow {
    pub id: Uuid,
    pub product_id: Uuid,
    pub url: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = categories)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CategoryRow {
    pub id: i32,
    pub name: String,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = categories)]
pub struct NewCategoryRow {
    pub name: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Identifiable, Associations)]
#[diesel(table_name = product_categories)]
#[diesel(primary_key(product_id, category_id))]
#[diesel(belongs_to(ProductRow, foreign_key = product_id))]
#[diesel(belongs_to(CategoryRow, foreign_key = category_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct ProductCategoryRow {
    pub product_id: Uuid,
    pub category_id: i32,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = likes)]
pub struct NewLikeRow {
    pub user_id: Uuid,
    pub product_id: Uuid,
}

impl From<CategoryRow> for CategoryView {
    fn from(row: CategoryRow) -> Self {
        CategoryView {
            id: row.id,
            name: row.name,
        }
    }
}

impl From<ImageRow> for ImageView {
    fn from(row: ImageRow) -> Self {
        ImageView {
            id: row.id,
            url: row.url,
        }
    }
}

// ── Carts ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = carts)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = carts)]
pub struct NewCartRow {
    pub id: Uuid,
    pub user_id: Uuid,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = cart_items)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct CartItemRow {
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
}

// ── Orders ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = order_headers)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderHeaderRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = order_headers)]
pub struct NewOrderHeaderRow {
    pub id: Uuid,
    pub customer_id: Uuid,
    pub status: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable, Identifiable, Associations)]
#[diesel(table_name = order_details)]
#[diesel(primary_key(order_id, product_id))]
#[diesel(belongs_to(OrderHeaderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct OrderDetailRow {
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: BigDecimal,
}

impl OrderDetailRow {
    pub fn into_view(self, product_name: String) -> OrderDetailView {
        OrderDetailView {
            product_id: self.product_id,
            product_name,
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}

// ── Payments ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = payments)]
#[diesel(belongs_to(OrderHeaderRow, foreign_key = order_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount_in_cents: i64,
    pub currency: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = payments)]
pub struct NewPaymentRow {
    pub id: Uuid,
    pub order_id: Uuid,
    pub amount_in_cents: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Queryable, Selectable, Identifiable, Associations)]
#[diesel(table_name = payment_intents)]
#[diesel(belongs_to(PaymentRow, foreign_key = payment_id))]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct PaymentIntentRow {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub stripe_payment_id: String,
    pub status: String,
    pub status_info: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = payment_intents)]
pub struct NewPaymentIntentRow {
    pub id: Uuid,
    pub payment_id: Uuid,
    pub stripe_payment_id: String,
    pub status: String,
}

impl PaymentIntentRow {
    pub fn into_view(self) -> Result<PaymentIntentView, crate::domain::errors::DomainError> {
        Ok(PaymentIntentView {
            id: self.id,
            gateway_ref: self.stripe_payment_id,
            status: self.status.parse()?,
            status_info: self.status_info,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

// ── Users ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Queryable, Selectable, Identifiable)]
#[diesel(table_name = users)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub struct UserRow {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role_id: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Insertable)]
#[diesel(table_name = users)]
pub struct NewUserRow {
    pub id: Uuid,
    pub email: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub role_id: i32,
}

#[cfg(test)]
mod tests {
    use diesel::debug_query;
    use diesel::pg::Pg;

    use super::*;

    fn product() -> ProductRow {
        ProductRow {
            id: Uuid::new_v4(),
            name: "Lamp".to_string(),
            description: None,
            price: BigDecimal::from(12),
            stock: 3,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    fn header() -> OrderHeaderRow {
        OrderHeaderRow {
            id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            status: "PENDING".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn category_links_load_by_product() {
        let products = vec![product(), product()];
        let sql = debug_query::<Pg, _>(&ProductCategoryRow::belonging_to(&products)).to_string();

        assert!(sql.contains("FROM \"product_categories\""), "{sql}");
        assert!(sql.contains("\"product_categories\".\"product_id\""), "{sql}");
    }

    #[test]
    fn order_details_load_by_header() {
        let headers = vec![header()];
        let sql = debug_query::<Pg, _>(&OrderDetailRow::belonging_to(&headers)).to_string();

        assert!(sql.contains("FROM \"order_details\""), "{sql}");
        assert!(sql.contains("\"order_details\".\"order_id\""), "{sql}");
    }

    #[test]
    fn details_group_under_their_header() {
        let headers = vec![header(), header()];
        let detail = |order_id| OrderDetailRow {
            order_id,
            product_id: Uuid::new_v4(),
            quantity: 1,
            unit_price: BigDecimal::from(5),
        };
        let rows = vec![detail(headers[1].id), detail(headers[0].id), detail(headers[1].id)];

        let grouped = rows.grouped_by(&headers);

        assert_eq!(grouped[0].len(), 1);
        assert_eq!(grouped[1].len(), 2);
    }
}
