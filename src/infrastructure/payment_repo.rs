use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::errors::DomainError;
use crate::domain::payment::{NewPayment, PaymentIntentStatus, PaymentView};
use crate::domain::ports::PaymentRepository;
use crate::schema::{payment_intents, payments};

use super::models::{
    NewPaymentIntentRow, NewPaymentRow, OrderHeaderRow, PaymentIntentRow, PaymentRow,
};

fn hydrate_payments(
    conn: &mut PgConnection,
    rows: Vec<PaymentRow>,
) -> Result<Vec<PaymentView>, DomainError> {
    let intents: Vec<PaymentIntentRow> = PaymentIntentRow::belonging_to(&rows)
        .select(PaymentIntentRow::as_select())
        .order(payment_intents::created_at.asc())
        .load(conn)?;
    let intents = intents.grouped_by(&rows);

    rows.into_iter()
        .zip(intents)
        .map(|(row, intents)| {
            Ok(PaymentView {
                id: row.id,
                order_id: row.order_id,
                amount_in_cents: row.amount_in_cents,
                currency: row.currency,
                created_at: row.created_at,
                updated_at: row.updated_at,
                intents: intents
                    .into_iter()
                    .map(PaymentIntentRow::into_view)
                    .collect::<Result<_, _>>()?,
            })
        })
        .collect()
}

/// Payments, with their intent history, for a set of orders.
pub(super) fn load_payments(
    conn: &mut PgConnection,
    orders: &[OrderHeaderRow],
) -> Result<Vec<PaymentView>, DomainError> {
    let rows = PaymentRow::belonging_to(orders)
        .select(PaymentRow::as_select())
        .load(conn)?;
    hydrate_payments(conn, rows)
}

pub struct DieselPaymentRepository {
    pool: DbPool,
}

impl DieselPaymentRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl PaymentRepository for DieselPaymentRepository {
    fn create(&self, payment: NewPayment) -> Result<PaymentView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let row = diesel::insert_into(payments::table)
                .values(&NewPaymentRow {
                    id: Uuid::new_v4(),
                    order_id: payment.order_id,
                    amount_in_cents: payment.amount_in_cents,
                    currency: payment.currency,
                })
                .returning(PaymentRow::as_returning())
                .get_result(conn)?;

            diesel::insert_into(payment_intents::table)
                .values(&NewPaymentIntentRow {
                    id: Uuid::new_v4(),
                    payment_id: row.id,
                    stripe_payment_id: payment.gateway_ref,
                    status: PaymentIntentStatus::Pending.to_string(),
                })
                .execute(conn)?;

            hydrate_payments(conn, vec![row])?
                .pop()
                .ok_or_else(|| DomainError::not_found("Payment"))
        })
    }

    fn set_intent_status(
        &self,
        gateway_ref: &str,
        status: PaymentIntentStatus,
    ) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        let updated = diesel::update(
            payment_intents::table.filter(payment_intents::stripe_payment_id.eq(gateway_ref)),
        )
        .set((
            payment_intents::status.eq(status.as_str()),
            payment_intents::updated_at.eq(Utc::now()),
        ))
        .execute(&mut conn)?;

        if updated == 0 {
            return Err(DomainError::not_found("Payment intent"));
        }
        Ok(())
    }
}
