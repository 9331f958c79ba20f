use std::collections::HashMap;

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::order::{OrderLineInput, OrderStatus, OrderView};
use crate::domain::payment::PaymentView;
use crate::domain::ports::OrderRepository;
use crate::schema::{order_details, order_headers, products};

use super::models::{NewOrderHeaderRow, OrderDetailRow, OrderHeaderRow};
use super::payment_repo::load_payments;

/// Attaches details (with product names) and payments to order headers.
fn hydrate_orders(
    conn: &mut PgConnection,
    headers: Vec<OrderHeaderRow>,
) -> Result<Vec<OrderView>, DomainError> {
    if headers.is_empty() {
        return Ok(vec![]);
    }

    let details: Vec<(OrderDetailRow, String)> = OrderDetailRow::belonging_to(&headers)
        .inner_join(products::table)
        .select((OrderDetailRow::as_select(), products::name))
        .order(products::name.asc())
        .load(conn)?;
    let details = details.grouped_by(&headers);

    let mut payments: HashMap<Uuid, PaymentView> = load_payments(conn, &headers)?
        .into_iter()
        .map(|p| (p.order_id, p))
        .collect();

    headers
        .into_iter()
        .zip(details)
        .map(|(header, details)| {
            Ok(OrderView {
                status: header.status.parse::<OrderStatus>()?,
                payment: payments.remove(&header.id),
                id: header.id,
                customer_id: header.customer_id,
                created_at: header.created_at,
                updated_at: header.updated_at,
                details: details
                    .into_iter()
                    .map(|(row, name)| row.into_view(name))
                    .collect(),
            })
        })
        .collect()
}

fn load_order(conn: &mut PgConnection, id: Uuid) -> Result<Option<OrderView>, DomainError> {
    let header = order_headers::table
        .find(id)
        .select(OrderHeaderRow::as_select())
        .first(conn)
        .optional()?;
    match header {
        Some(header) => Ok(hydrate_orders(conn, vec![header])?.pop()),
        None => Ok(None),
    }
}

pub struct DieselOrderRepository {
    pool: DbPool,
}

impl DieselOrderRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl OrderRepository for DieselOrderRepository {
    fn place(&self, customer_id: Uuid, lines: &[OrderLineInput]) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // 1. Insert the order header
            let order_id = Uuid::new_v4();
            diesel::insert_into(order_headers::table)
                .values(&NewOrderHeaderRow {
                    id: order_id,
                    customer_id,
                    status: OrderStatus::Pending.to_string(),
                })
                .execute(conn)?;

            // 2. Reserve stock; the row-level predicate closes the race with
            //    concurrent orders for the same product.
            let now = Utc::now();
            for line in lines {
                let reserved = diesel::update(
                    products::table
                        .filter(products::id.eq(line.product_id))
                        .filter(products::stock.ge(line.quantity)),
                )
                .set((
                    products::stock.eq(products::stock - line.quantity),
                    products::updated_at.eq(now),
                ))
                .execute(conn)?;
                if reserved == 0 {
                    return Err(DomainError::InsufficientStock {
                        product_id: line.product_id,
                    });
                }
            }

            // 3. Snapshot the lines with their frozen unit prices
            let details: Vec<OrderDetailRow> = lines
                .iter()
                .map(|l| OrderDetailRow {
                    order_id,
                    product_id: l.product_id,
                    quantity: l.quantity,
                    unit_price: l.unit_price.clone(),
                })
                .collect();
            diesel::insert_into(order_details::table)
                .values(&details)
                .execute(conn)?;

            load_order(conn, order_id)?.ok_or_else(|| DomainError::not_found("Order"))
        })
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;
        load_order(&mut conn, id)
    }

    fn list(&self, customer_id: Option<Uuid>) -> Result<Vec<OrderView>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut q = order_headers::table.into_boxed();
        if let Some(customer_id) = customer_id {
            q = q.filter(order_headers::customer_id.eq(customer_id));
        }
        let headers = q
            .select(OrderHeaderRow::as_select())
            .order(order_headers::created_at.desc())
            .load(&mut conn)?;

        hydrate_orders(&mut conn, headers)
    }

    fn update_status(&self, id: Uuid, status: OrderStatus) -> Result<OrderView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let header = diesel::update(order_headers::table.find(id))
                .set((
                    order_headers::status.eq(status.as_str()),
                    order_headers::updated_at.eq(Utc::now()),
                ))
                .returning(OrderHeaderRow::as_returning())
                .get_result(conn)?;

            hydrate_orders(conn, vec![header])?
                .pop()
                .ok_or_else(|| DomainError::not_found("Order"))
        })
    }

    fn restock(&self, id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        conn.transaction::<_, DomainError, _>(|conn| restock_details(conn, id))
    }

    fn cancel_and_restock(&self, id: Uuid) -> Result<Option<OrderStatus>, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            // Row lock serializes concurrent deliveries of the same cancel event.
            let previous: String = order_headers::table
                .find(id)
                .select(order_headers::status)
                .for_update()
                .first(conn)
                .optional()?
                .ok_or_else(|| DomainError::not_found("Order"))?;
            let previous = previous.parse::<OrderStatus>()?;

            let cancelled = OrderStatus::Cancelled.as_str();
            let updated = diesel::update(
                order_headers::table
                    .filter(order_headers::id.eq(id))
                    .filter(order_headers::status.ne(cancelled)),
            )
            .set((
                order_headers::status.eq(cancelled),
                order_headers::updated_at.eq(Utc::now()),
            ))
            .execute(conn)?;

            if updated != 1 {
                return Ok(None);
            }
            restock_details(conn, id)?;
            Ok(Some(previous))
        })
    }
}

/// Adds every detail quantity of the order back to its product. Must run
/// inside the caller's transaction.
fn restock_details(conn: &mut PgConnection, order_id: Uuid) -> Result<(), DomainError> {
    let details = order_details::table
        .filter(order_details::order_id.eq(order_id))
        .select(OrderDetailRow::as_select())
        .load(conn)?;

    let now = Utc::now();
    for detail in details {
        diesel::update(products::table.find(detail.product_id))
            .set((
                products::stock.eq(products::stock + detail.quantity),
                products::updated_at.eq(now),
            ))
            .execute(conn)?;
    }
    Ok(())
}
