//! Audit log repository
//!
//! The table is append-only: there is no update or delete here, and the
//! schema rejects both with triggers.

use anyhow::{Context, Result};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::db::{new_id, now_timestamp, parse_db_timestamp};
use crate::models::{AuditLogEntry, AuditLogQuery, AuditMetadata};

/// Default page size when a query sets no limit
pub const DEFAULT_AUDIT_LIMIT: u32 = 100;

#[derive(Debug, sqlx::FromRow)]
struct AuditRow {
    id: String,
    action: String,
    entity_type: String,
    entity_id: String,
    user_id: Option<String>,
    user_email: Option<String>,
    user_name: Option<String>,
    user_role: Option<String>,
    metadata: Option<String>,
    old_value: Option<String>,
    new_value: Option<String>,
    description: String,
    created_at: String,
}

/// A fully prepared audit row, ready to persist
#[derive(Debug, Clone)]
pub struct NewAuditLog {
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub user_role: Option<String>,
    pub metadata: Option<AuditMetadata>,
    pub old_value: Option<serde_json::Value>,
    pub new_value: Option<serde_json::Value>,
    pub description: String,
}

pub struct AuditRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AuditRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<AuditLogEntry>> {
        let row = sqlx::query_as::<_, AuditRow>(&format!("{} WHERE id = ?", SELECT_AUDIT))
            .bind(id)
            .fetch_optional(self.pool)
            .await
            .context("Failed to get audit log entry")?;

        Ok(row.map(row_to_audit))
    }

    /// Newest first. Filters combine with AND.
    pub async fn list(&self, query: &AuditLogQuery) -> Result<Vec<AuditLogEntry>> {
        let mut sql = format!("{} WHERE 1 = 1", SELECT_AUDIT);

        if query.entity_type.is_some() {
            sql.push_str(" AND entity_type = ?");
        }
        if query.entity_id.is_some() {
            sql.push_str(" AND entity_id = ?");
        }
        if query.user_id.is_some() {
            sql.push_str(" AND user_id = ?");
        }
        if query.action.is_some() {
            sql.push_str(" AND action = ?");
        }

        sql.push_str(" ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?");

        let mut q = sqlx::query_as::<_, AuditRow>(&sql);
        if let Some(ref entity_type) = query.entity_type {
            q = q.bind(entity_type);
        }
        if let Some(ref entity_id) = query.entity_id {
            q = q.bind(entity_id);
        }
        if let Some(ref user_id) = query.user_id {
            q = q.bind(user_id);
        }
        if let Some(ref action) = query.action {
            q = q.bind(action);
        }
        q = q
            .bind(query.limit.unwrap_or(DEFAULT_AUDIT_LIMIT) as i64)
            .bind(query.offset.unwrap_or(0) as i64);

        let rows = q
            .fetch_all(self.pool)
            .await
            .context("Failed to list audit logs")?;

        Ok(rows.into_iter().map(row_to_audit).collect())
    }

    pub async fn count(&self) -> Result<i64> {
        let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM audit_logs")
            .fetch_one(self.pool)
            .await
            .context("Failed to count audit logs")?;
        Ok(count)
    }
}

const SELECT_AUDIT: &str = "SELECT id, action, entity_type, entity_id, user_id, user_email, \
     user_name, user_role, metadata, old_value, new_value, description, created_at \
     FROM audit_logs";

/// Insert one audit row on any executor (pool or open transaction)
pub async fn insert_audit_log<'e, E>(executor: E, log: &NewAuditLog) -> Result<AuditLogEntry>
where
    E: Executor<'e, Database = Sqlite>,
{
    let id = new_id();
    let created_at = now_timestamp();
    let metadata = log
        .metadata
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .context("Failed to serialize audit metadata")?;
    let old_value = log.old_value.as_ref().map(|v| v.to_string());
    let new_value = log.new_value.as_ref().map(|v| v.to_string());

    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, action, entity_type, entity_id, user_id, user_email,
                                user_name, user_role, metadata, old_value, new_value,
                                description, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(&log.action)
    .bind(&log.entity_type)
    .bind(&log.entity_id)
    .bind(&log.user_id)
    .bind(&log.user_email)
    .bind(&log.user_name)
    .bind(&log.user_role)
    .bind(&metadata)
    .bind(&old_value)
    .bind(&new_value)
    .bind(&log.description)
    .bind(&created_at)
    .execute(executor)
    .await
    .context("Failed to insert audit log entry")?;

    Ok(AuditLogEntry {
        id,
        action: log.action.clone().into(),
        entity_type: log.entity_type.clone().into(),
        entity_id: log.entity_id.clone(),
        user_id: log.user_id.clone(),
        user_email: log.user_email.clone(),
        user_name: log.user_name.clone(),
        user_role: log.user_role.clone(),
        metadata: log.metadata.clone(),
        old_value: log.old_value.clone(),
        new_value: log.new_value.clone(),
        description: log.description.clone(),
        created_at: parse_db_timestamp(&created_at),
    })
}

fn row_to_audit(row: AuditRow) -> AuditLogEntry {
    AuditLogEntry {
        id: row.id,
        action: row.action.into(),
        entity_type: row.entity_type.into(),
        entity_id: row.entity_id,
        user_id: row.user_id,
        user_email: row.user_email,
        user_name: row.user_name,
        user_role: row.user_role,
        metadata: row.metadata.and_then(|s| serde_json::from_str(&s).ok()),
        old_value: row.old_value.and_then(|s| serde_json::from_str(&s).ok()),
        new_value: row.new_value.and_then(|s| serde_json::from_str(&s).ok()),
        description: row.description,
        created_at: parse_db_timestamp(&row.created_at),
    }
}
