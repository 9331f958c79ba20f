use chrono::Utc;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use crate::db::DbPool;
use crate::domain::auth::Role;
use crate::domain::errors::DomainError;
use crate::domain::ports::UserRepository;
use crate::domain::user::{NewUser, UserRecord};
use crate::schema::{carts, roles, users};

use super::models::{NewCartRow, NewUserRow, UserRow};

fn into_record(conn: &mut PgConnection, row: UserRow) -> Result<UserRecord, DomainError> {
    let role: String = roles::table
        .find(row.role_id)
        .select(roles::role)
        .first(conn)?;
    let cart_id = carts::table
        .filter(carts::user_id.eq(row.id))
        .select(carts::id)
        .first::<Uuid>(conn)
        .optional()?;

    Ok(UserRecord {
        id: row.id,
        email: row.email,
        password_hash: row.password,
        first_name: row.first_name,
        last_name: row.last_name,
        phone: row.phone,
        role: role.parse::<Role>()?,
        cart_id,
        created_at: row.created_at,
    })
}

pub struct DieselUserRepository {
    pool: DbPool,
}

impl DieselUserRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl UserRepository for DieselUserRepository {
    fn create(&self, user: NewUser) -> Result<UserRecord, DomainError> {
        let mut conn = self.pool.get()?;

        conn.transaction::<_, DomainError, _>(|conn| {
            let role_id: i32 = roles::table
                .filter(roles::role.eq(user.role.as_str()))
                .select(roles::id)
                .first(conn)?;

            let row = diesel::insert_into(users::table)
                .values(&NewUserRow {
                    id: Uuid::new_v4(),
                    email: user.email,
                    password: user.password_hash,
                    first_name: user.first_name,
                    last_name: user.last_name,
                    phone: user.phone,
                    role_id,
                })
                .returning(UserRow::as_returning())
                .get_result(conn)?;

            diesel::insert_into(carts::table)
                .values(&NewCartRow {
                    id: Uuid::new_v4(),
                    user_id: row.id,
                })
                .execute(conn)?;

            into_record(conn, row)
        })
    }

    fn find_by_email(&self, email: &str) -> Result<Option<UserRecord>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = users::table
            .filter(users::email.eq(email))
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;
        row.map(|row| into_record(&mut conn, row)).transpose()
    }

    fn find_by_id(&self, id: Uuid) -> Result<Option<UserRecord>, DomainError> {
        let mut conn = self.pool.get()?;
        let row = users::table
            .find(id)
            .select(UserRow::as_select())
            .first(&mut conn)
            .optional()?;
        row.map(|row| into_record(&mut conn, row)).transpose()
    }

    fn update_password(&self, id: Uuid, password_hash: String) -> Result<(), DomainError> {
        let mut conn = self.pool.get()?;
        let updated = diesel::update(users::table.find(id))
            .set((
                users::password.eq(password_hash),
                users::updated_at.eq(Utc::now()),
            ))
            .execute(&mut conn)?;
        if updated == 0 {
            return Err(DomainError::not_found("User"));
        }
        Ok(())
    }
}
