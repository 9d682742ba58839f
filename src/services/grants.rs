//! Grant mutations
//!
//! Every write runs in one transaction and records its audit rows on the same
//! connection, so grant changes and their audit trail commit or roll back
//! together. Hard store errors propagate to the caller.

use std::collections::{HashMap, HashSet};

use anyhow::{Context, Result};
use sqlx::{SqliteConnection, SqlitePool};
use thiserror::Error;
use tracing::{debug, info};

use crate::db::album_repository::fetch_album;
use crate::db::grant_repository::{
    delete_grant, fetch_grant, fetch_grants_for_entity, lock_for_write, upsert_grant,
};
use crate::db::project_repository::fetch_project;
use crate::db::user_repository::fetch_user;
use crate::db::GrantRepository;
use crate::models::{
    AccessEntry, AccessLevel, AccessListChanges, Actor, AuditMetadata, EntityKind, Grant,
    GrantChange, GrantKind, GrantOutcome, User,
};
use crate::services::audit::{grant_entity_metadata, grant_event, grant_modified_event};
use crate::services::AuditService;

/// Rejections raised before anything is written
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GrantError {
    #[error("{} not found", .0.display_name())]
    EntityNotFound(EntityKind),

    #[error("User {0} not found")]
    UserNotFound(String),

    #[error("User {0} appears more than once in the access list")]
    DuplicateUser(String),
}

#[derive(Clone)]
pub struct GrantService {
    pool: SqlitePool,
    audit: AuditService,
}

impl GrantService {
    pub fn new(pool: SqlitePool, audit: AuditService) -> Self {
        Self { pool, audit }
    }

    pub async fn list_grants(&self, kind: GrantKind, entity_id: &str) -> Result<Vec<Grant>> {
        GrantRepository::new(&self.pool)
            .list_for_entity(kind, entity_id)
            .await
    }

    pub async fn grant_project_access(
        &self,
        actor: &Actor,
        project_id: &str,
        user_id: &str,
        level: AccessLevel,
    ) -> Result<GrantOutcome> {
        self.grant(GrantKind::ProjectAccess, actor, project_id, user_id, level)
            .await
    }

    pub async fn revoke_project_access(
        &self,
        actor: &Actor,
        project_id: &str,
        user_id: &str,
    ) -> Result<bool> {
        self.revoke(GrantKind::ProjectAccess, actor, project_id, user_id)
            .await
    }

    pub async fn grant_client_project_access(
        &self,
        actor: &Actor,
        project_id: &str,
        user_id: &str,
        level: AccessLevel,
    ) -> Result<GrantOutcome> {
        self.grant(
            GrantKind::ClientProjectAccess,
            actor,
            project_id,
            user_id,
            level,
        )
        .await
    }

    pub async fn revoke_client_project_access(
        &self,
        actor: &Actor,
        project_id: &str,
        user_id: &str,
    ) -> Result<bool> {
        self.revoke(GrantKind::ClientProjectAccess, actor, project_id, user_id)
            .await
    }

    pub async fn grant_client_album_access(
        &self,
        actor: &Actor,
        album_id: &str,
        user_id: &str,
        level: AccessLevel,
    ) -> Result<GrantOutcome> {
        self.grant(GrantKind::ClientAlbumAccess, actor, album_id, user_id, level)
            .await
    }

    pub async fn revoke_client_album_access(
        &self,
        actor: &Actor,
        album_id: &str,
        user_id: &str,
    ) -> Result<bool> {
        self.revoke(GrantKind::ClientAlbumAccess, actor, album_id, user_id)
            .await
    }

    /// Make a project's internal access list exactly `entries`.
    ///
    /// The diff against the current list is applied as removals, then
    /// additions, then level changes, with one audit row per changed grant.
    /// Nothing is committed unless every write succeeds.
    pub async fn replace_project_access(
        &self,
        actor: &Actor,
        project_id: &str,
        entries: &[AccessEntry],
    ) -> Result<AccessListChanges> {
        let mut seen = HashSet::new();
        for entry in entries {
            if !seen.insert(entry.user_id.as_str()) {
                return Err(GrantError::DuplicateUser(entry.user_id.clone()).into());
            }
        }

        let kind = GrantKind::ProjectAccess;
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin access list transaction")?;
        lock_for_write(&mut tx, kind).await?;

        let project = fetch_project(&mut *tx, project_id)
            .await?
            .ok_or(GrantError::EntityNotFound(EntityKind::Project))?;
        let current = fetch_grants_for_entity(&mut *tx, kind, project_id).await?;

        let desired: HashMap<&str, AccessLevel> = entries
            .iter()
            .map(|e| (e.user_id.as_str(), e.access_level))
            .collect();
        let existing: HashMap<&str, &Grant> =
            current.iter().map(|g| (g.user_id.as_str(), g)).collect();

        let to_remove: Vec<&Grant> = current
            .iter()
            .filter(|g| !desired.contains_key(g.user_id.as_str()))
            .collect();
        let to_add: Vec<&AccessEntry> = entries
            .iter()
            .filter(|e| !existing.contains_key(e.user_id.as_str()))
            .collect();
        let to_update: Vec<(&Grant, AccessLevel)> = entries
            .iter()
            .filter_map(|e| {
                existing
                    .get(e.user_id.as_str())
                    .filter(|g| g.access_level != e.access_level)
                    .map(|g| (*g, e.access_level))
            })
            .collect();

        debug!(
            project_id = %project_id,
            remove = to_remove.len(),
            add = to_add.len(),
            update = to_update.len(),
            "Applying access list diff"
        );

        let mut changes = AccessListChanges::default();

        for grant in to_remove {
            delete_grant(&mut *tx, kind, project_id, &grant.user_id).await?;
            let target = fetch_user(&mut *tx, &grant.user_id).await?;
            let metadata = grant_metadata(kind, &project.name, target.as_ref());
            self.audit
                .record_in(
                    &mut tx,
                    grant_event(kind.revoked_action(), &actor.id, grant, metadata),
                )
                .await;
            changes.removed.push(grant.clone());
        }

        for entry in to_add {
            let target = require_user(&mut tx, &entry.user_id).await?;
            let grant = upsert_grant(
                &mut *tx,
                kind,
                project_id,
                &entry.user_id,
                entry.access_level,
                None,
            )
            .await?;
            let metadata = grant_metadata(kind, &project.name, Some(&target));
            self.audit
                .record_in(
                    &mut tx,
                    grant_event(kind.granted_action(), &actor.id, &grant, metadata),
                )
                .await;
            changes.added.push(grant);
        }

        for (before, level) in to_update {
            let after =
                upsert_grant(&mut *tx, kind, project_id, &before.user_id, level, None).await?;
            let target = fetch_user(&mut *tx, &before.user_id).await?;
            let metadata = grant_metadata(kind, &project.name, target.as_ref());
            self.audit
                .record_in(
                    &mut tx,
                    grant_modified_event(&actor.id, before, &after, metadata),
                )
                .await;
            changes.updated.push(GrantChange {
                before: before.clone(),
                after,
            });
        }

        tx.commit()
            .await
            .context("Failed to commit access list transaction")?;

        info!(
            project_id = %project_id,
            user_id = %actor.id,
            added = changes.added.len(),
            updated = changes.updated.len(),
            removed = changes.removed.len(),
            "Replaced project access list"
        );
        Ok(changes)
    }

    async fn grant(
        &self,
        kind: GrantKind,
        actor: &Actor,
        entity_id: &str,
        user_id: &str,
        level: AccessLevel,
    ) -> Result<GrantOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin grant transaction")?;
        lock_for_write(&mut tx, kind).await?;

        let entity_name = require_entity_name(&mut tx, kind, entity_id).await?;
        let target = require_user(&mut tx, user_id).await?;
        let metadata = grant_metadata(kind, &entity_name, Some(&target));
        let granted_by = kind.tracks_grantor().then_some(actor.id.as_str());

        let outcome = match fetch_grant(&mut *tx, kind, entity_id, user_id).await? {
            Some(before) if before.access_level == level => {
                GrantOutcome::Unchanged { grant: before }
            }
            Some(before) => {
                let after =
                    upsert_grant(&mut *tx, kind, entity_id, user_id, level, granted_by).await?;
                self.audit
                    .record_in(
                        &mut tx,
                        grant_modified_event(&actor.id, &before, &after, metadata),
                    )
                    .await;
                GrantOutcome::Updated {
                    change: GrantChange { before, after },
                }
            }
            None => {
                let grant =
                    upsert_grant(&mut *tx, kind, entity_id, user_id, level, granted_by).await?;
                self.audit
                    .record_in(
                        &mut tx,
                        grant_event(kind.granted_action(), &actor.id, &grant, metadata),
                    )
                    .await;
                GrantOutcome::Created { grant }
            }
        };

        tx.commit()
            .await
            .context("Failed to commit grant transaction")?;

        info!(
            grant_kind = kind.table(),
            entity_id = %entity_id,
            target_user_id = %user_id,
            access_level = %level,
            user_id = %actor.id,
            "Grant written"
        );
        Ok(outcome)
    }

    async fn revoke(
        &self,
        kind: GrantKind,
        actor: &Actor,
        entity_id: &str,
        user_id: &str,
    ) -> Result<bool> {
        let mut tx = self
            .pool
            .begin()
            .await
            .context("Failed to begin revoke transaction")?;
        lock_for_write(&mut tx, kind).await?;

        let Some(existing) = fetch_grant(&mut *tx, kind, entity_id, user_id).await? else {
            debug!(entity_id = %entity_id, target_user_id = %user_id, "No grant to revoke");
            return Ok(false);
        };

        delete_grant(&mut *tx, kind, entity_id, user_id).await?;

        let name = entity_name(&mut tx, kind, entity_id).await?;
        let target = fetch_user(&mut *tx, user_id).await?;
        let metadata = match name {
            Some(name) => grant_metadata(kind, &name, target.as_ref()),
            None => target_metadata(AuditMetadata::new(), target.as_ref()),
        };
        self.audit
            .record_in(
                &mut tx,
                grant_event(kind.revoked_action(), &actor.id, &existing, metadata),
            )
            .await;

        tx.commit()
            .await
            .context("Failed to commit revoke transaction")?;

        info!(
            grant_kind = kind.table(),
            entity_id = %entity_id,
            target_user_id = %user_id,
            user_id = %actor.id,
            "Grant revoked"
        );
        Ok(true)
    }
}

async fn entity_name(
    conn: &mut SqliteConnection,
    kind: GrantKind,
    entity_id: &str,
) -> Result<Option<String>> {
    let name = match kind.entity_kind() {
        EntityKind::Project => fetch_project(&mut *conn, entity_id).await?.map(|p| p.name),
        EntityKind::Album => fetch_album(&mut *conn, entity_id).await?.map(|a| a.name),
    };
    Ok(name)
}

async fn require_entity_name(
    conn: &mut SqliteConnection,
    kind: GrantKind,
    entity_id: &str,
) -> Result<String> {
    entity_name(conn, kind, entity_id)
        .await?
        .ok_or_else(|| GrantError::EntityNotFound(kind.entity_kind()).into())
}

async fn require_user(conn: &mut SqliteConnection, user_id: &str) -> Result<User> {
    fetch_user(&mut *conn, user_id)
        .await?
        .ok_or_else(|| GrantError::UserNotFound(user_id.to_string()).into())
}

fn grant_metadata(kind: GrantKind, entity_name: &str, target: Option<&User>) -> AuditMetadata {
    target_metadata(grant_entity_metadata(kind, entity_name), target)
}

fn target_metadata(metadata: AuditMetadata, target: Option<&User>) -> AuditMetadata {
    match target {
        Some(user) => {
            let metadata = metadata.target_user_email(&user.email);
            match user.name.as_deref() {
                Some(name) => metadata.target_user_name(name),
                None => metadata,
            }
        }
        None => metadata,
    }
}
