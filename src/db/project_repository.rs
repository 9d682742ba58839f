//! Project repository

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::db::{new_id, now_timestamp, parse_db_timestamp};
use crate::models::{CreateProjectRequest, Project, UpdateProjectRequest};

#[derive(Debug, sqlx::FromRow)]
struct ProjectRow {
    id: String,
    name: String,
    description: Option<String>,
    owner_id: String,
    created_at: String,
    updated_at: String,
}

pub struct ProjectRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProjectRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Bulk fetch by id; one query regardless of set size
    pub async fn list_by_ids(&self, ids: &BTreeSet<String>) -> Result<Vec<Project>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders: Vec<&str> = ids.iter().map(|_| "?").collect();
        let query = format!(
            "SELECT id, name, description, owner_id, created_at, updated_at
             FROM projects
             WHERE id IN ({})
             ORDER BY created_at DESC",
            placeholders.join(", ")
        );

        let mut query_builder = sqlx::query_as::<_, ProjectRow>(&query);
        for id in ids {
            query_builder = query_builder.bind(id);
        }

        let rows = query_builder
            .fetch_all(self.pool)
            .await
            .context("Failed to batch fetch projects")?;

        Ok(rows.into_iter().map(row_to_project).collect())
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Project>> {
        fetch_project(self.pool, id).await
    }

    pub async fn all_ids(&self) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM projects")
            .fetch_all(self.pool)
            .await
            .context("Failed to list project ids")?;
        Ok(ids)
    }

    pub async fn ids_owned_by(&self, owner_id: &str) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM projects WHERE owner_id = ?")
            .bind(owner_id)
            .fetch_all(self.pool)
            .await
            .context("Failed to list owned project ids")?;
        Ok(ids)
    }

    pub async fn create(&self, owner_id: &str, req: &CreateProjectRequest) -> Result<Project> {
        let id = new_id();
        let now = now_timestamp();

        sqlx::query(
            r#"
            INSERT INTO projects (id, name, description, owner_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&req.name)
        .bind(&req.description)
        .bind(owner_id)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .context("Failed to create project")?;

        self.get_by_id(&id)
            .await?
            .context("Failed to retrieve created project")
    }

    pub async fn update(&self, id: &str, req: &UpdateProjectRequest) -> Result<Option<Project>> {
        let Some(existing) = self.get_by_id(id).await? else {
            return Ok(None);
        };

        let name = req.name.clone().unwrap_or(existing.name);
        let description = req.description.clone().or(existing.description);

        sqlx::query(
            r#"
            UPDATE projects
            SET name = ?, description = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&name)
        .bind(&description)
        .bind(now_timestamp())
        .bind(id)
        .execute(self.pool)
        .await
        .context("Failed to update project")?;

        self.get_by_id(id).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM projects WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .context("Failed to delete project")?;

        Ok(result.rows_affected() > 0)
    }
}

/// Look up a project on any executor (pool or open transaction)
pub async fn fetch_project<'e, E>(executor: E, id: &str) -> Result<Option<Project>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, ProjectRow>(
        r#"
        SELECT id, name, description, owner_id, created_at, updated_at
        FROM projects
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("Failed to get project")?;

    Ok(row.map(row_to_project))
}

fn row_to_project(row: ProjectRow) -> Project {
    Project {
        id: row.id,
        name: row.name,
        description: row.description,
        owner_id: row.owner_id,
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}
