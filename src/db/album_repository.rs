//! Album repository

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use sqlx::{Executor, Sqlite, SqlitePool};

use crate::db::{new_id, now_timestamp, parse_db_timestamp};
use crate::models::{Album, CreateAlbumRequest};

#[derive(Debug, sqlx::FromRow)]
struct AlbumRow {
    id: String,
    name: String,
    owner_id: String,
    project_id: Option<String>,
    created_at: String,
    updated_at: String,
}

pub struct AlbumRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AlbumRepository<'a> {
    pub fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn get_by_id(&self, id: &str) -> Result<Option<Album>> {
        fetch_album(self.pool, id).await
    }

    /// Bulk fetch by id; one query regardless of set size
    pub async fn list_by_ids(&self, ids: &BTreeSet<String>) -> Result<Vec<Album>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders: Vec<&str> = ids.iter().map(|_| "?").collect();
        let query = format!(
            "SELECT id, name, owner_id, project_id, created_at, updated_at
             FROM albums
             WHERE id IN ({})
             ORDER BY created_at DESC",
            placeholders.join(", ")
        );

        let mut query_builder = sqlx::query_as::<_, AlbumRow>(&query);
        for id in ids {
            query_builder = query_builder.bind(id);
        }

        let rows = query_builder
            .fetch_all(self.pool)
            .await
            .context("Failed to batch fetch albums")?;

        Ok(rows.into_iter().map(row_to_album).collect())
    }

    pub async fn all_ids(&self) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>("SELECT id FROM albums")
            .fetch_all(self.pool)
            .await
            .context("Failed to list album ids")?;
        Ok(ids)
    }

    /// Ids of albums a non-admin user can see: owned, granted to them as a
    /// client, or inside a project they can see.
    pub async fn visible_ids_for(&self, user_id: &str) -> Result<Vec<String>> {
        let ids = sqlx::query_scalar::<_, String>(
            r#"
            SELECT a.id
            FROM albums a
            WHERE a.owner_id = ?1
               OR a.id IN (SELECT album_id FROM client_album_access WHERE user_id = ?1)
               OR a.project_id IN (
                    SELECT id FROM projects WHERE owner_id = ?1
                    UNION
                    SELECT project_id FROM project_access WHERE user_id = ?1
                    UNION
                    SELECT project_id FROM client_project_access WHERE user_id = ?1
               )
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await
        .context("Failed to list visible album ids")?;
        Ok(ids)
    }

    pub async fn create(&self, owner_id: &str, req: &CreateAlbumRequest) -> Result<Album> {
        let id = new_id();
        let now = now_timestamp();

        sqlx::query(
            r#"
            INSERT INTO albums (id, name, owner_id, project_id, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&req.name)
        .bind(owner_id)
        .bind(&req.project_id)
        .bind(&now)
        .bind(&now)
        .execute(self.pool)
        .await
        .context("Failed to create album")?;

        self.get_by_id(&id)
            .await?
            .context("Failed to retrieve created album")
    }

    pub async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM albums WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await
            .context("Failed to delete album")?;

        Ok(result.rows_affected() > 0)
    }
}

/// Look up an album on any executor (pool or open transaction)
pub async fn fetch_album<'e, E>(executor: E, id: &str) -> Result<Option<Album>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query_as::<_, AlbumRow>(
        r#"
        SELECT id, name, owner_id, project_id, created_at, updated_at
        FROM albums
        WHERE id = ?
        "#,
    )
    .bind(id)
    .fetch_optional(executor)
    .await
    .context("Failed to get album")?;

    Ok(row.map(row_to_album))
}

fn row_to_album(row: AlbumRow) -> Album {
    Album {
        id: row.id,
        name: row.name,
        owner_id: row.owner_id,
        project_id: row.project_id,
        created_at: parse_db_timestamp(&row.created_at),
        updated_at: parse_db_timestamp(&row.updated_at),
    }
}
