//! Audit trail recorder
//!
//! Turns structured [`AuditEvent`]s into immutable `audit_logs` rows. The
//! recorder never fails its caller: lookup problems degrade to empty identity
//! fields and persistence problems are logged at `error` and dropped.

pub mod descriptions;

use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, error, warn};

use crate::db::audit_repository::insert_audit_log;
use crate::db::user_repository::fetch_user;
use crate::db::NewAuditLog;
use crate::models::{
    is_real_user_id, Album, AuditAction, AuditEntityType, AuditEvent, AuditMetadata, Grant,
    GrantKind, Project, Role, User,
};

/// Identity snapshot copied into an audit row
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActorSnapshot {
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<String>,
}

impl ActorSnapshot {
    fn from_user(user: User) -> Self {
        Self {
            user_id: Some(user.id),
            email: Some(user.email),
            name: user.name,
            role: Some(user.role.as_str().to_string()),
        }
    }

    /// Sentinel actors keep their label as the name but never a user id
    fn sentinel(label: &str) -> Self {
        Self {
            name: Some(label.to_string()),
            ..Self::default()
        }
    }
}

#[derive(Clone)]
pub struct AuditService {
    pool: SqlitePool,
}

impl AuditService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Record an event on its own pooled connection
    pub async fn record(&self, event: AuditEvent) {
        match self.pool.acquire().await {
            Ok(mut conn) => self.record_in(&mut conn, event).await,
            Err(e) => error!(
                action = %event.action,
                entity_type = %event.entity_type,
                entity_id = %event.entity_id,
                "Failed to acquire connection for audit log: {:#}",
                e
            ),
        }
    }

    /// Record an event on the caller's connection.
    ///
    /// Pass a transaction's connection to make the record commit or roll back
    /// together with the change it describes.
    pub async fn record_in(&self, conn: &mut SqliteConnection, event: AuditEvent) {
        let actor = snapshot_actor(conn, event.user_id.as_deref()).await;
        let log = build_log(event, actor);

        match insert_audit_log(&mut *conn, &log).await {
            Ok(entry) => debug!(
                audit_id = %entry.id,
                action = %entry.action,
                entity_id = %entry.entity_id,
                "Audit log recorded"
            ),
            Err(e) => error!(
                action = %log.action,
                entity_type = %log.entity_type,
                entity_id = %log.entity_id,
                "Failed to persist audit log: {:#}",
                e
            ),
        }
    }

    pub async fn log_project_created(&self, actor_id: &str, project: &Project) {
        let event = AuditEvent::new(
            AuditAction::ProjectCreated,
            AuditEntityType::Project,
            &project.id,
        )
        .by(actor_id)
        .with_metadata(AuditMetadata::new().project_name(&project.name))
        .with_new_value(project);
        self.record(event).await;
    }

    pub async fn log_project_updated(&self, actor_id: &str, before: &Project, after: &Project) {
        let event = AuditEvent::new(
            AuditAction::ProjectUpdated,
            AuditEntityType::Project,
            &after.id,
        )
        .by(actor_id)
        .with_metadata(AuditMetadata::new().project_name(&after.name))
        .with_old_value(before)
        .with_new_value(after);
        self.record(event).await;
    }

    pub async fn log_project_deleted(&self, actor_id: &str, project: &Project) {
        let event = AuditEvent::new(
            AuditAction::ProjectDeleted,
            AuditEntityType::Project,
            &project.id,
        )
        .by(actor_id)
        .with_metadata(AuditMetadata::new().project_name(&project.name))
        .with_old_value(project);
        self.record(event).await;
    }

    pub async fn log_album_created(
        &self,
        actor_id: &str,
        album: &Album,
        project_name: Option<&str>,
    ) {
        let mut metadata = AuditMetadata::new().album_name(&album.name);
        if let Some(name) = project_name {
            metadata = metadata.project_name(name);
        }
        let event = AuditEvent::new(AuditAction::AlbumCreated, AuditEntityType::Album, &album.id)
            .by(actor_id)
            .with_metadata(metadata)
            .with_new_value(album);
        self.record(event).await;
    }

    pub async fn log_album_deleted(&self, actor_id: &str, album: &Album) {
        let event = AuditEvent::new(AuditAction::AlbumDeleted, AuditEntityType::Album, &album.id)
            .by(actor_id)
            .with_metadata(AuditMetadata::new().album_name(&album.name))
            .with_old_value(album);
        self.record(event).await;
    }

    pub async fn log_image_uploaded(
        &self,
        actor_id: &str,
        image_id: &str,
        album: &Album,
        file_name: &str,
    ) {
        let event = AuditEvent::new(AuditAction::ImageUploaded, AuditEntityType::Image, image_id)
            .by(actor_id)
            .with_metadata(
                AuditMetadata::new()
                    .album_name(&album.name)
                    .file_name(file_name)
                    .image_count(1),
            );
        self.record(event).await;
    }

    pub async fn log_image_deleted(
        &self,
        actor_id: &str,
        image_id: &str,
        album: &Album,
        file_name: &str,
    ) {
        let event = AuditEvent::new(AuditAction::ImageDeleted, AuditEntityType::Image, image_id)
            .by(actor_id)
            .with_metadata(AuditMetadata::new().album_name(&album.name).file_name(file_name));
        self.record(event).await;
    }

    /// Record a client grant made outside [`GrantService`](crate::services::GrantService)
    pub async fn log_client_access_granted(
        &self,
        actor_id: &str,
        grant: &Grant,
        metadata: AuditMetadata,
    ) {
        self.record(grant_event(grant.kind.granted_action(), actor_id, grant, metadata))
            .await;
    }

    pub async fn log_client_access_revoked(
        &self,
        actor_id: &str,
        grant: &Grant,
        metadata: AuditMetadata,
    ) {
        self.record(grant_event(grant.kind.revoked_action(), actor_id, grant, metadata))
            .await;
    }

    pub async fn log_user_role_changed(&self, actor_id: &str, user: &User, previous: Role) {
        let event = AuditEvent::new(AuditAction::UserRoleChanged, AuditEntityType::User, &user.id)
            .by(actor_id)
            .with_metadata(
                AuditMetadata::new()
                    .target_user_id(&user.id)
                    .target_user_email(&user.email)
                    .role_change(previous.as_str(), user.role.as_str()),
            )
            .with_old_value(&serde_json::json!({ "role": previous }))
            .with_new_value(&serde_json::json!({ "role": user.role }));
        self.record(event).await;
    }
}

/// Build the event for a grant change.
///
/// The record's entity id is the project or album the grant applies to, so a
/// grant's history stays queryable per entity across revoke and re-grant.
/// Granted events carry the new row, revoked events the removed row. For a
/// modification use [`grant_modified_event`].
pub fn grant_event(
    action: AuditAction,
    actor_id: &str,
    grant: &Grant,
    metadata: AuditMetadata,
) -> AuditEvent {
    let revoked = action == grant.kind.revoked_action();
    let metadata = metadata
        .target_user_id(&grant.user_id)
        .access_level(grant.access_level);

    let event = AuditEvent::new(action, grant.kind.audit_entity_type(), &grant.entity_id)
        .by(actor_id)
        .with_metadata(metadata);

    if revoked {
        event.with_old_value(&grant.snapshot())
    } else {
        event.with_new_value(&grant.snapshot())
    }
}

pub fn grant_modified_event(
    actor_id: &str,
    before: &Grant,
    after: &Grant,
    metadata: AuditMetadata,
) -> AuditEvent {
    let metadata = metadata
        .target_user_id(&after.user_id)
        .access_level(after.access_level)
        .previous_access_level(before.access_level);

    AuditEvent::new(
        after.kind.modified_action(),
        after.kind.audit_entity_type(),
        &after.entity_id,
    )
    .by(actor_id)
    .with_metadata(metadata)
    .with_old_value(&before.snapshot())
    .with_new_value(&after.snapshot())
}

/// Metadata naming the entity a grant of `kind` applies to
pub fn grant_entity_metadata(kind: GrantKind, entity_name: &str) -> AuditMetadata {
    match kind {
        GrantKind::ProjectAccess | GrantKind::ClientProjectAccess => {
            AuditMetadata::new().project_name(entity_name)
        }
        GrantKind::ClientAlbumAccess => AuditMetadata::new().album_name(entity_name),
    }
}

async fn snapshot_actor(conn: &mut SqliteConnection, user_id: Option<&str>) -> ActorSnapshot {
    let Some(user_id) = user_id.filter(|id| !id.is_empty()) else {
        return ActorSnapshot::default();
    };
    if !is_real_user_id(user_id) {
        return ActorSnapshot::sentinel(user_id);
    }

    match fetch_user(&mut *conn, user_id).await {
        Ok(Some(user)) => ActorSnapshot::from_user(user),
        Ok(None) => {
            warn!(user_id = %user_id, "Audit actor not found, recording without user");
            ActorSnapshot::default()
        }
        Err(e) => {
            warn!(user_id = %user_id, "Audit actor lookup failed: {:#}", e);
            ActorSnapshot {
                user_id: Some(user_id.to_string()),
                ..ActorSnapshot::default()
            }
        }
    }
}

/// Assemble the row for an event; synthesizes the description if missing
pub fn build_log(event: AuditEvent, actor: ActorSnapshot) -> NewAuditLog {
    let description = event.description.clone().unwrap_or_else(|| {
        descriptions::describe(
            &event.action,
            &event.entity_type,
            event.metadata.as_ref(),
            event.old_value.as_ref(),
            event.new_value.as_ref(),
        )
    });

    NewAuditLog {
        action: event.action.into(),
        entity_type: event.entity_type.into(),
        entity_id: event.entity_id,
        user_id: actor.user_id,
        user_email: actor.email,
        user_name: actor.name,
        user_role: actor.role,
        metadata: event.metadata,
        old_value: event.old_value,
        new_value: event.new_value,
        description,
    }
}
