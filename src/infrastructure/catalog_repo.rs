use std::collections::HashSet;

use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::catalog::{CategoryView, NewProduct, ProductPatch, ProductQuery, ProductView};
use crate::domain::errors::DomainError;
use crate::domain::ports::{CatalogRepository, CategoryRepository};
use crate::schema::{categories, likes, product_categories, product_images, products};

use super::models::{
    CategoryRow, ImageRow, NewCategoryRow, NewImageRow, NewLikeRow, NewProductRow,
    ProductCategoryRow, ProductChangeset, ProductRow,
};

/// Loads images, categories and the viewer's likes for a page of products
/// with one query each, preserving the order of `rows`.
pub(super) fn hydrate_products(
    conn: &mut PgConnection,
    rows: Vec<ProductRow>,
    viewer: Option<Uuid>,
) -> Result<Vec<ProductView>, DomainError> {
    if rows.is_empty() {
        return Ok(vec![]);
    }

    let images: Vec<ImageRow> = ImageRow::belonging_to(&rows)
        .select(ImageRow::as_select())
        .order(product_images::created_at.asc())
        .load(conn)?;

    let product_cats: Vec<(ProductCategoryRow, CategoryRow)> =
        ProductCategoryRow::belonging_to(&rows)
            .inner_join(categories::table)
            .select((ProductCategoryRow::as_select(), CategoryRow::as_select()))
            .order(categories::name.asc())
            .load(conn)?;

    let liked: HashSet<Uuid> = match viewer {
        Some(user_id) => {
            let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
            likes::table
                .filter(likes::user_id.eq(user_id))
                .filter(likes::product_id.eq_any(ids))
                .select(likes::product_id)
                .load::<Uuid>(conn)?
                .into_iter()
                .collect()
        }
        None => HashSet::new(),
    };

    let images = images.grouped_by(&rows);
    let product_cats = product_cats.grouped_by(&rows);

    Ok(rows
        .into_iter()
        .zip(images)
        .zip(product_cats)
        .map(|((row, images), cats)| ProductView {
            liked: viewer.map(|_| liked.contains(&row.id)),
            id: row.id,
            name: row.name,
            description: row.description,
            price: row.price,
            stock: row.stock,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
            images: images.into_iter().map(Into::into).collect(),
            categories: cats.into_iter().map(|(_, c)| c.into()).collect(),
        })
        .collect())
}

fn load_one(
    conn: &mut PgConnection,
    id: Uuid,
    viewer: Option<Uuid>,
) -> Result<Option<ProductView>, DomainError> {
    let row = products::table
        .find(id)
        .select(ProductRow::as_select())
        .first(conn)
        .optional()?;
    match row {
        Some(row) => Ok(hydrate_products(conn, vec![row], viewer)?.pop()),
        None => Ok(None),
    }
}

fn require_one(conn: &mut PgConnection, id: Uuid) -> Result<ProductView, DomainError> {
    load_one(conn, id, None)?.ok_or_else(|| DomainError::not_found("Product"))
}

/// ILIKE pattern matching `needle` literally anywhere in the value.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub struct DieselCatalogRepository {
    pool: DbPool,
}

impl DieselCatalogRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CatalogRepository for DieselCatalogRepository {
    fn list(&self, query: &ProductQuery) -> Result<Vec<ProductView>, DomainError> {
        let mut conn = self.pool.get()?;

        let mut q = products::table.into_boxed();
        if query.active_only {
            q = q.filter(products::is_active.eq(true));
        }
        if let Some(name) = &query.name_contains {
            q = q.filter(products::name.ilike(contains_pattern(name)));
        }
        if let Some(category) = &query.category {
            q = q.filter(
                products::id.eq_any(
                    product_categories::table
                        .inner_join(categories::table)
                        .filter(categories::name.eq(category.clone()))
                        .select(product_categories::product_id),
                ),
            );
        }
        if let Some(user_id) = query.liked_by {
            q = q.filter(
                products::id.eq_any(
                    likes::table
                        .filter(likes::user_id.eq(user_id))
                        .select(likes::product_id),
                ),
            );
        }

        let rows = q
            .select(ProductRow::as_select())
            .order((products::name.asc(), products::id.asc()))
            .limit(query.limit)
            .offset(query.offset)
            .load(&mut conn)?;

        hydrate_products(&mut conn, rows, query.viewer)
    }

    fn find_by_id(&self, id: Uuid, viewer: Option<Uuid>) -> Result<Option<ProductView>, DomainError> {
        let mut conn = self.pool.get()?;
        load_one(&mut conn, id, viewer)
    }

    fn create(&self, product: NewProduct) -> Result<ProductView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let id = Uuid::new_v4();
            diesel::insert_into(products::table)
                .values(&NewProductRow {
                    id,
                    name: product.name,
                    description: product.description,
                    price: product.price,
                    stock: product.stock,
                    is_active: product.is_active,
                })
                .execute(conn)?;

            let links: Vec<ProductCategoryRow> = product
                .category_ids
                .iter()
                .map(|&category_id| ProductCategoryRow {
                    product_id: id,
                    category_id,
                })
                .collect();
            if !links.is_empty() {
                diesel::insert_into(product_categories::table)
                    .values(&links)
                    .on_conflict_do_nothing()
                    .execute(conn)?;
            }

            require_one(conn, id)
        })
    }

    fn update(&self, id: Uuid, patch: ProductPatch) -> Result<ProductView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::update(products::table.find(id))
                .set(&ProductChangeset {
                    name: patch.name,
                    description: patch.description,
                    price: patch.price,
                    stock: patch.stock,
                    is_active: patch.is_active,
                    updated_at: Utc::now(),
                })
                .returning(products::id)
                .get_result::<Uuid>(conn)?;

            require_one(conn, id)
        })
    }

    fn delete(&self, id: Uuid) -> Result<ProductView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let product = require_one(conn, id)?;
            diesel::delete(products::table.find(id)).execute(conn)?;
            Ok(product)
        })
    }

    fn attach_image(&self, product_id: Uuid, url: String) -> Result<ProductView, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            diesel::insert_into(product_images::table)
                .values(&NewImageRow {
                    id: Uuid::new_v4(),
                    product_id,
                    url,
                })
                .execute(conn)?;
            require_one(conn, product_id)
        })
    }

    fn toggle_like(&self, product_id: Uuid, user_id: Uuid) -> Result<bool, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let removed = diesel::delete(
                likes::table
                    .filter(likes::user_id.eq(user_id))
                    .filter(likes::product_id.eq(product_id)),
            )
            .execute(conn)?;
            if removed > 0 {
                return Ok(false);
            }

            diesel::insert_into(likes::table)
                .values(&NewLikeRow {
                    user_id,
                    product_id,
                })
                .execute(conn)?;
            Ok(true)
        })
    }
}

pub struct DieselCategoryRepository {
    pool: DbPool,
}

impl DieselCategoryRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl CategoryRepository for DieselCategoryRepository {
    fn list(&self) -> Result<Vec<CategoryView>, DomainError> {
        let mut conn = self.pool.get()?;
        let rows = categories::table
            .select(CategoryRow::as_select())
            .order(categories::name.asc())
            .load(&mut conn)?;
        Ok(rows.into_iter().map(Into::into).collect())
    }

    fn find_by_id(&self, id: i32) -> Result<Option<CategoryView>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = categories::table
            .find(id)
            .select(CategoryRow::as_select())
            .first(&mut conn)
            .optional()?;
        Ok(row.map(Into::into))
    }

    fn create(&self, name: String) -> Result<CategoryView, DomainError> {
        let mut conn = self.pool.get()?;
        let row = diesel::insert_into(categories::table)
            .values(&NewCategoryRow { name })
            .returning(CategoryRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn rename(&self, id: i32, name: String) -> Result<CategoryView, DomainError> {
        let mut conn = self.pool.get()?;
        let row = diesel::update(categories::table.find(id))
            .set(categories::name.eq(name))
            .returning(CategoryRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }

    fn delete(&self, id: i32) -> Result<CategoryView, DomainError> {
        let mut conn = self.pool.get()?;
        let row = diesel::delete(categories::table.find(id))
            .returning(CategoryRow::as_returning())
            .get_result(&mut conn)?;
        Ok(row.into())
    }
}
