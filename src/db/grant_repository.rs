//! Grant repository
//!
//! One set of queries serves the three grant tables; the table and entity
//! column come from [`GrantKind`]. Only client tables carry `granted_by_id`.

use anyhow::{Context, Result};
use sqlx::{Executor, Sqlite, SqliteConnection, SqlitePool};

use crate::db::{new_id, now_timestamp, parse_db_timestamp};
use crate::models::{AccessLevel, Grant, GrantKind};

#[derive(Debug, sqlx::FromRow)]
struct GrantRow {
    id: String,
    entity_id: String,
    user_id: String,
    access_level: String,
    granted_by_id: Option<String>,
    created_at: String,
    updated_at: String,
}

pub struct GrantRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> GrantRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn find(
        &self,
        kind: GrantKind,
        entity_id: &str,
        user_id: &str,
    ) -> Result<Option<Grant>> {
        fetch_grant(self.pool, kind, entity_id, user_id).await
    }

    pub async fn list_for_entity(&self, kind: GrantKind, entity_id: &str) -> Result<Vec<Grant>> {
        fetch_grants_for_entity(self.pool, kind, entity_id).await
    }

    /// Ids of every entity `user_id` holds a grant of this kind on
    pub async fn entity_ids_for_user(&self, kind: GrantKind, user_id: &str) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT {} FROM {} WHERE user_id = ?",
            kind.entity_column(),
            kind.table()
        );

        let ids = sqlx::query_scalar::<_, String>(&sql)
            .bind(user_id)
            .fetch_all(self.pool)
            .await
            .with_context(|| format!("Failed to list {} ids for user", kind.table()))?;
        Ok(ids)
    }
}

fn select_sql(kind: GrantKind) -> String {
    let granted_by = if kind.tracks_grantor() {
        "granted_by_id"
    } else {
        "NULL"
    };
    format!(
        "SELECT id, {} AS entity_id, user_id, access_level, {} AS granted_by_id, created_at, updated_at FROM {}",
        kind.entity_column(),
        granted_by,
        kind.table()
    )
}

/// Look up the grant for one (entity, user) pair
pub async fn fetch_grant<'e, E>(
    executor: E,
    kind: GrantKind,
    entity_id: &str,
    user_id: &str,
) -> Result<Option<Grant>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "{} WHERE {} = ? AND user_id = ?",
        select_sql(kind),
        kind.entity_column()
    );

    let row = sqlx::query_as::<_, GrantRow>(&sql)
        .bind(entity_id)
        .bind(user_id)
        .fetch_optional(executor)
        .await
        .with_context(|| format!("Failed to get {} grant", kind.table()))?;

    Ok(row.map(|r| row_to_grant(kind, r)))
}

pub async fn fetch_grants_for_entity<'e, E>(
    executor: E,
    kind: GrantKind,
    entity_id: &str,
) -> Result<Vec<Grant>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "{} WHERE {} = ? ORDER BY created_at, user_id",
        select_sql(kind),
        kind.entity_column()
    );

    let rows = sqlx::query_as::<_, GrantRow>(&sql)
        .bind(entity_id)
        .fetch_all(executor)
        .await
        .with_context(|| format!("Failed to list {} grants", kind.table()))?;

    Ok(rows.into_iter().map(|r| row_to_grant(kind, r)).collect())
}

/// Insert or overwrite the grant for an (entity, user) pair.
///
/// The unique key on (entity, user) makes concurrent writers converge on a
/// single row; the last write wins.
pub async fn upsert_grant<'e, E>(
    executor: E,
    kind: GrantKind,
    entity_id: &str,
    user_id: &str,
    access_level: AccessLevel,
    granted_by_id: Option<&str>,
) -> Result<Grant>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = now_timestamp();
    let column = kind.entity_column();

    let sql = if kind.tracks_grantor() {
        format!(
            r#"
            INSERT INTO {table} (id, {column}, user_id, access_level, granted_by_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT ({column}, user_id) DO UPDATE SET
                access_level = excluded.access_level,
                granted_by_id = excluded.granted_by_id,
                updated_at = excluded.updated_at
            RETURNING id, {column} AS entity_id, user_id, access_level, granted_by_id, created_at, updated_at
            "#,
            table = kind.table(),
        )
    } else {
        format!(
            r#"
            INSERT INTO {table} (id, {column}, user_id, access_level, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT ({column}, user_id) DO UPDATE SET
                access_level = excluded.access_level,
                updated_at = excluded.updated_at
            RETURNING id, {column} AS entity_id, user_id, access_level, NULL AS granted_by_id, created_at, updated_at
            "#,
            table = kind.table(),
        )
    };

    let mut query = sqlx::query_as::<_, GrantRow>(&sql)
        .bind(new_id())
        .bind(entity_id)
        .bind(user_id)
        .bind(access_level.as_str());
    if kind.tracks_grantor() {
        query = query.bind(granted_by_id);
    }

    let row = query
        .bind(&now)
        .bind(&now)
        .fetch_one(executor)
        .await
        .with_context(|| format!("Failed to upsert {} grant", kind.table()))?;

    Ok(row_to_grant(kind, row))
}

/// Remove the grant for an (entity, user) pair; returns whether a row existed
pub async fn delete_grant<'e, E>(
    executor: E,
    kind: GrantKind,
    entity_id: &str,
    user_id: &str,
) -> Result<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!(
        "DELETE FROM {} WHERE {} = ? AND user_id = ?",
        kind.table(),
        kind.entity_column()
    );

    let result = sqlx::query(&sql)
        .bind(entity_id)
        .bind(user_id)
        .execute(executor)
        .await
        .with_context(|| format!("Failed to delete {} grant", kind.table()))?;

    Ok(result.rows_affected() > 0)
}

/// Take the database write lock at the start of a transaction.
///
/// SQLite transactions begin deferred; one that reads before writing can be
/// refused the upgrade when another writer commits in between. A no-op
/// write as the first statement takes the lock (waiting on the busy timeout)
/// before any snapshot is read.
pub async fn lock_for_write(conn: &mut SqliteConnection, kind: GrantKind) -> Result<()> {
    let sql = format!("UPDATE {} SET updated_at = updated_at WHERE 0", kind.table());
    sqlx::query(&sql)
        .execute(conn)
        .await
        .context("Failed to acquire write lock")?;
    Ok(())
}

fn row_to_grant(kind: GrantKind, row: GrantRow) -> Grant {
    let access_level = row.access_level.parse::<AccessLevel>().unwrap_or_else(|_| {
        tracing::warn!(
            grant_id = %row.id,
            access_level = %row.access_level,
            "Unknown access level in grant table, treating as READ"
        );
        AccessLevel::Read
    });

    Grant {
        id: row.id,
        kind,
        entity_id: row.entity_id,
        user_id: row.user_id,
        access_level,
        granted_by_id: row.granted_by_id,
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}
