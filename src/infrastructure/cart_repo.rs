use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::cart::{CartLine, CartView};
use crate::domain::errors::DomainError;
use crate::domain::ports::CartRepository;
use crate::schema::{cart_items, carts, products};

use super::catalog_repo::hydrate_products;
use super::models::{CartItemRow, CartRow, NewCartRow, ProductRow};

pub struct DieselCartRepository {
    pool: DbPool,
}

impl DieselCartRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

fn find_cart(conn: &mut PgConnection, user_id: Uuid) -> Result<Option<CartRow>, DomainError> {
    Ok(carts::table
        .filter(carts::user_id.eq(user_id))
        .select(CartRow::as_select())
        .first(conn)
        .optional()?)
}

/// Carts are created at signup; this covers users that predate that.
fn find_or_create_cart(conn: &mut PgConnection, user_id: Uuid) -> Result<CartRow, DomainError> {
    if let Some(cart) = find_cart(conn, user_id)? {
        return Ok(cart);
    }
    Ok(diesel::insert_into(carts::table)
        .values(&NewCartRow {
            id: Uuid::new_v4(),
            user_id,
        })
        .returning(CartRow::as_returning())
        .get_result(conn)?)
}

impl CartRepository for DieselCartRepository {
    fn find_by_user(&self, user_id: Uuid) -> Result<Option<CartView>, DomainError> {
        let mut conn = self.pool.get()?;

        let Some(cart) = find_cart(&mut conn, user_id)? else {
            return Ok(None);
        };

        let rows: Vec<(CartItemRow, ProductRow)> = cart_items::table
            .inner_join(products::table)
            .filter(cart_items::cart_id.eq(cart.id))
            .select((CartItemRow::as_select(), ProductRow::as_select()))
            .order(products::name.asc())
            .load(&mut conn)?;

        let (items, product_rows): (Vec<CartItemRow>, Vec<ProductRow>) = rows.into_iter().unzip();
        let products = hydrate_products(&mut conn, product_rows, Some(user_id))?;

        Ok(Some(CartView {
            id: cart.id,
            user_id,
            created_at: cart.created_at,
            items: items
                .into_iter()
                .zip(products)
                .map(|(item, product)| CartLine {
                    product,
                    quantity: item.quantity,
                })
                .collect(),
        }))
    }

    fn set_quantity(&self, user_id: Uuid, product_id: Uuid, quantity: i32) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let cart = find_or_create_cart(conn, user_id)?;
            diesel::insert_into(cart_items::table)
                .values(&CartItemRow {
                    cart_id: cart.id,
                    product_id,
                    quantity,
                })
                .on_conflict((cart_items::cart_id, cart_items::product_id))
                .do_update()
                .set(cart_items::quantity.eq(quantity))
                .execute(conn)?;
            Ok(())
        })
    }

    fn remove_item(&self, user_id: Uuid, product_id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        let Some(cart) = find_cart(&mut conn, user_id)? else {
            return Ok(false);
        };
        let removed = diesel::delete(
            cart_items::table
                .filter(cart_items::cart_id.eq(cart.id))
                .filter(cart_items::product_id.eq(product_id)),
        )
        .execute(&mut conn)?;
        Ok(removed > 0)
    }

    fn clear(&self, user_id: Uuid) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;

        diesel::delete(
            cart_items::table.filter(
                cart_items::cart_id.eq_any(
                    carts::table
                        .filter(carts::user_id.eq(user_id))
                        .select(carts::id),
                ),
            ),
        )
        .execute(&mut conn)?;
        Ok(())
    }
}
