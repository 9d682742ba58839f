//! User repository

use anyhow::{Context, Result};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::db::{new_id, now_timestamp, parse_db_timestamp};
use crate::models::{CreateUserRequest, Role, User};

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    email: String,
    name: Option<String>,
    role: String,
    created_at: String,
    updated_at: String,
}

pub struct UserRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> UserRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<User>> {
        fetch_user(self.pool, id).await
    }

    pub async fn create(&self, req: &CreateUserRequest) -> Result<User> {
        self.create_with_id(&new_id(), req).await
    }

    /// Create a user with a caller-chosen id (ids are issued by the identity provider)
    pub async fn create_with_id(&self, id: &str, req: &CreateUserRequest) -> Result<User> {
        let now = now_timestamp();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, name, role, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id)
        .bind(&req.email)
        .bind(&req.name)
        .bind(req.role.as_str())
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .context("Failed to create user")?;

        self.get_by_id(id)
            .await?
            .context("Failed to retrieve created user")
    }

    pub async fn update_role(&self, id: &str, role: Role) -> Result<Option<User>> {
        let result = sqlx::query("UPDATE users SET role = ?, updated_at = ? WHERE id = ?")
            .bind(role.as_str())
            .bind(now_timestamp())
            .bind(id)
            .execute(self.pool)
            .await
            .context("Failed to update user role")?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .context("Failed to delete user")?;

        Ok(result.rows_affected() > 0)
    }
}

/// Look up a user on any executor (pool or open transaction)
pub async fn fetch_user<'e, E>(executor: E, id: &str) -> Result<Option<User>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, UserRow>(
        r#"
        SELECT id, email, name, role, created_at, updated_at
        FROM users
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("Failed to get user")?;

    Ok(row.map(row_to_user))
}

fn row_to_user(row: UserRow) -> User {
    let role = row.role.parse::<Role>().unwrap_or_else(|_| {
        tracing::warn!(user_id = %row.id, role = %row.role, "Unknown role in users table, treating as USER");
        Role::User
    });

    User {
        id: row.id,
        email: row.email,
        name: row.name,
        role,
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}
