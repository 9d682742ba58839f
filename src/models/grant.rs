//! Grant relations: internal project access and client project/album access

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{AccessLevel, AuditAction, AuditEntityType, EntityKind};

/// The three grant relations.
///
/// They share one row shape; they are kept apart because client grants are
/// issued and revoked by PRO users or admins and carry `granted_by_id`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantKind {
    /// Internal collaborator on a project
    ProjectAccess,
    /// External client on a project
    ClientProjectAccess,
    /// External client on an album
    ClientAlbumAccess,
}

impl GrantKind {
    pub fn all() -> Vec<GrantKind> {
        vec![
            GrantKind::ProjectAccess,
            GrantKind::ClientProjectAccess,
            GrantKind::ClientAlbumAccess,
        ]
    }

    pub(crate) fn table(&self) -> &'static str {
        match self {
            GrantKind::ProjectAccess => "project_access",
            GrantKind::ClientProjectAccess => "client_project_access",
            GrantKind::ClientAlbumAccess => "client_album_access",
        }
    }

    pub(crate) fn entity_column(&self) -> &'static str {
        match self {
            GrantKind::ProjectAccess | GrantKind::ClientProjectAccess => "project_id",
            GrantKind::ClientAlbumAccess => "album_id",
        }
    }

    /// Kind of entity the grant applies to
    pub fn entity_kind(&self) -> EntityKind {
        match self {
            GrantKind::ProjectAccess | GrantKind::ClientProjectAccess => EntityKind::Project,
            GrantKind::ClientAlbumAccess => EntityKind::Album,
        }
    }

    /// Client grants record who issued them
    pub fn tracks_grantor(&self) -> bool {
        !matches!(self, GrantKind::ProjectAccess)
    }

    pub fn audit_entity_type(&self) -> AuditEntityType {
        match self {
            GrantKind::ProjectAccess => AuditEntityType::ProjectAccess,
            GrantKind::ClientProjectAccess => AuditEntityType::ClientProjectAccess,
            GrantKind::ClientAlbumAccess => AuditEntityType::ClientAlbumAccess,
        }
    }

    pub fn granted_action(&self) -> AuditAction {
        match self {
            GrantKind::ProjectAccess => AuditAction::ProjectAccessGranted,
            GrantKind::ClientProjectAccess => AuditAction::ClientAccessGranted,
            GrantKind::ClientAlbumAccess => AuditAction::AlbumAccessGranted,
        }
    }

    pub fn modified_action(&self) -> AuditAction {
        match self {
            GrantKind::ProjectAccess => AuditAction::ProjectAccessModified,
            GrantKind::ClientProjectAccess => AuditAction::ClientAccessModified,
            GrantKind::ClientAlbumAccess => AuditAction::AlbumAccessModified,
        }
    }

    pub fn revoked_action(&self) -> AuditAction {
        match self {
            GrantKind::ProjectAccess => AuditAction::ProjectAccessRevoked,
            GrantKind::ClientProjectAccess => AuditAction::ClientAccessRevoked,
            GrantKind::ClientAlbumAccess => AuditAction::AlbumAccessRevoked,
        }
    }
}

/// A persisted grant row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub id: String,
    pub kind: GrantKind,
    /// Project id, or album id for `ClientAlbumAccess`
    pub entity_id: String,
    pub user_id: String,
    pub access_level: AccessLevel,
    pub granted_by_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Grant {
    /// Before/after image stored in audit records
    pub fn snapshot(&self) -> GrantSnapshot {
        GrantSnapshot {
            entity_id: self.entity_id.clone(),
            user_id: self.user_id.clone(),
            access_level: self.access_level,
            granted_by_id: self.granted_by_id.clone(),
        }
    }
}

/// Audit snapshot of a grant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantSnapshot {
    pub entity_id: String,
    pub user_id: String,
    pub access_level: AccessLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granted_by_id: Option<String>,
}

/// One desired row of an access list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AccessEntry {
    #[validate(length(min = 1))]
    pub user_id: String,
    pub access_level: AccessLevel,
}

/// Request to replace a project's internal access list
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ReplaceAccessRequest {
    #[validate(nested)]
    pub entries: Vec<AccessEntry>,
}

/// Request to grant a client access to a project or album
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct GrantClientAccessRequest {
    #[validate(length(min = 1))]
    pub user_id: String,
    pub access_level: AccessLevel,
}

/// A grant whose level changed
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GrantChange {
    pub before: Grant,
    pub after: Grant,
}

/// What a grant write did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GrantOutcome {
    Created { grant: Grant },
    Updated { change: GrantChange },
    Unchanged { grant: Grant },
}

impl GrantOutcome {
    pub fn grant(&self) -> &Grant {
        match self {
            GrantOutcome::Created { grant } | GrantOutcome::Unchanged { grant } => grant,
            GrantOutcome::Updated { change } => &change.after,
        }
    }
}

/// Result of replacing an access list
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessListChanges {
    pub added: Vec<Grant>,
    pub updated: Vec<GrantChange>,
    pub removed: Vec<Grant>,
}

impl AccessListChanges {
    /// Number of rows changed, which equals the number of audit records written
    pub fn total(&self) -> usize {
        self.added.len() + self.updated.len() + self.removed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }
}
