//! Audit log models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::models::AccessLevel;

/// Kind of audited state change.
///
/// Unknown names read back from storage are kept as `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuditAction {
    ProjectCreated,
    ProjectUpdated,
    ProjectDeleted,
    AlbumCreated,
    AlbumUpdated,
    AlbumDeleted,
    ImageUploaded,
    ImageDeleted,
    ProjectAccessGranted,
    ProjectAccessModified,
    ProjectAccessRevoked,
    ClientAccessGranted,
    ClientAccessModified,
    ClientAccessRevoked,
    AlbumAccessGranted,
    AlbumAccessModified,
    AlbumAccessRevoked,
    UserCreated,
    UserUpdated,
    UserRoleChanged,
    UserDeleted,
    Other(String),
}

impl AuditAction {
    /// Every known action
    pub fn known() -> Vec<AuditAction> {
        vec![
            AuditAction::ProjectCreated,
            AuditAction::ProjectUpdated,
            AuditAction::ProjectDeleted,
            AuditAction::AlbumCreated,
            AuditAction::AlbumUpdated,
            AuditAction::AlbumDeleted,
            AuditAction::ImageUploaded,
            AuditAction::ImageDeleted,
            AuditAction::ProjectAccessGranted,
            AuditAction::ProjectAccessModified,
            AuditAction::ProjectAccessRevoked,
            AuditAction::ClientAccessGranted,
            AuditAction::ClientAccessModified,
            AuditAction::ClientAccessRevoked,
            AuditAction::AlbumAccessGranted,
            AuditAction::AlbumAccessModified,
            AuditAction::AlbumAccessRevoked,
            AuditAction::UserCreated,
            AuditAction::UserUpdated,
            AuditAction::UserRoleChanged,
            AuditAction::UserDeleted,
        ]
    }

    pub fn as_str(&self) -> &str {
        match self {
            AuditAction::ProjectCreated => "PROJECT_CREATED",
            AuditAction::ProjectUpdated => "PROJECT_UPDATED",
            AuditAction::ProjectDeleted => "PROJECT_DELETED",
            AuditAction::AlbumCreated => "ALBUM_CREATED",
            AuditAction::AlbumUpdated => "ALBUM_UPDATED",
            AuditAction::AlbumDeleted => "ALBUM_DELETED",
            AuditAction::ImageUploaded => "IMAGE_UPLOADED",
            AuditAction::ImageDeleted => "IMAGE_DELETED",
            AuditAction::ProjectAccessGranted => "PROJECT_ACCESS_GRANTED",
            AuditAction::ProjectAccessModified => "PROJECT_ACCESS_MODIFIED",
            AuditAction::ProjectAccessRevoked => "PROJECT_ACCESS_REVOKED",
            AuditAction::ClientAccessGranted => "CLIENT_ACCESS_GRANTED",
            AuditAction::ClientAccessModified => "CLIENT_ACCESS_MODIFIED",
            AuditAction::ClientAccessRevoked => "CLIENT_ACCESS_REVOKED",
            AuditAction::AlbumAccessGranted => "ALBUM_ACCESS_GRANTED",
            AuditAction::AlbumAccessModified => "ALBUM_ACCESS_MODIFIED",
            AuditAction::AlbumAccessRevoked => "ALBUM_ACCESS_REVOKED",
            AuditAction::UserCreated => "USER_CREATED",
            AuditAction::UserUpdated => "USER_UPDATED",
            AuditAction::UserRoleChanged => "USER_ROLE_CHANGED",
            AuditAction::UserDeleted => "USER_DELETED",
            AuditAction::Other(name) => name,
        }
    }
}

impl From<String> for AuditAction {
    fn from(s: String) -> Self {
        AuditAction::known()
            .into_iter()
            .find(|a| a.as_str() == s)
            .unwrap_or(AuditAction::Other(s))
    }
}

impl From<&str> for AuditAction {
    fn from(s: &str) -> Self {
        AuditAction::from(s.to_string())
    }
}

impl From<AuditAction> for String {
    fn from(action: AuditAction) -> Self {
        action.as_str().to_string()
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind of entity an audit record is about
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum AuditEntityType {
    Project,
    Album,
    Image,
    User,
    ProjectAccess,
    ClientProjectAccess,
    ClientAlbumAccess,
    Other(String),
}

impl AuditEntityType {
    pub fn known() -> Vec<AuditEntityType> {
        vec![
            AuditEntityType::Project,
            AuditEntityType::Album,
            AuditEntityType::Image,
            AuditEntityType::User,
            AuditEntityType::ProjectAccess,
            AuditEntityType::ClientProjectAccess,
            AuditEntityType::ClientAlbumAccess,
        ]
    }

    pub fn as_str(&self) -> &str {
        match self {
            AuditEntityType::Project => "PROJECT",
            AuditEntityType::Album => "ALBUM",
            AuditEntityType::Image => "IMAGE",
            AuditEntityType::User => "USER",
            AuditEntityType::ProjectAccess => "PROJECT_ACCESS",
            AuditEntityType::ClientProjectAccess => "CLIENT_PROJECT_ACCESS",
            AuditEntityType::ClientAlbumAccess => "CLIENT_ALBUM_ACCESS",
            AuditEntityType::Other(name) => name,
        }
    }

}

impl From<String> for AuditEntityType {
    fn from(s: String) -> Self {
        AuditEntityType::known()
            .into_iter()
            .find(|t| t.as_str() == s)
            .unwrap_or(AuditEntityType::Other(s))
    }
}

impl From<AuditEntityType> for String {
    fn from(entity_type: AuditEntityType) -> Self {
        entity_type.as_str().to_string()
    }
}

impl std::fmt::Display for AuditEntityType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Free-form context attached to an audit record.
///
/// Well-known keys are typed; anything else is carried through untouched in
/// `extra`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub album_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_level: Option<AccessLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_access_level: Option<AccessLevel>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_count: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_role: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_role: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AuditMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = Some(name.into());
        self
    }

    pub fn album_name(mut self, name: impl Into<String>) -> Self {
        self.album_name = Some(name.into());
        self
    }

    pub fn target_user_id(mut self, id: impl Into<String>) -> Self {
        self.target_user_id = Some(id.into());
        self
    }

    pub fn target_user_email(mut self, email: impl Into<String>) -> Self {
        self.target_user_email = Some(email.into());
        self
    }

    pub fn target_user_name(mut self, name: impl Into<String>) -> Self {
        self.target_user_name = Some(name.into());
        self
    }

    pub fn access_level(mut self, level: AccessLevel) -> Self {
        self.access_level = Some(level);
        self
    }

    pub fn previous_access_level(mut self, level: AccessLevel) -> Self {
        self.previous_access_level = Some(level);
        self
    }

    pub fn file_name(mut self, name: impl Into<String>) -> Self {
        self.file_name = Some(name.into());
        self
    }

    pub fn image_count(mut self, count: u32) -> Self {
        self.image_count = Some(count);
        self
    }

    pub fn role_change(mut self, previous: impl Into<String>, new: impl Into<String>) -> Self {
        self.previous_role = Some(previous.into());
        self.new_role = Some(new.into());
        self
    }

    /// Attach an opaque key
    pub fn extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    /// Best label for the grant target: name, then email, then id
    pub fn target_user_label(&self) -> Option<&str> {
        self.target_user_name
            .as_deref()
            .or(self.target_user_email.as_deref())
            .or(self.target_user_id.as_deref())
    }
}

/// An event handed to the audit recorder
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub action: AuditAction,
    pub entity_type: AuditEntityType,
    pub entity_id: String,
    pub user_id: Option<String>,
    pub metadata: Option<AuditMetadata>,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub description: Option<String>,
}

impl AuditEvent {
    pub fn new(
        action: AuditAction,
        entity_type: AuditEntityType,
        entity_id: impl Into<String>,
    ) -> Self {
        Self {
            action,
            entity_type,
            entity_id: entity_id.into(),
            user_id: None,
            metadata: None,
            old_value: None,
            new_value: None,
            description: None,
        }
    }

    /// Set the acting user
    pub fn by(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    pub fn with_metadata(mut self, metadata: AuditMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Attach the "before" snapshot; values that fail to serialize are dropped
    pub fn with_old_value<T: Serialize>(mut self, value: &T) -> Self {
        self.old_value = serde_json::to_value(value).ok();
        self
    }

    /// Attach the "after" snapshot; values that fail to serialize are dropped
    pub fn with_new_value<T: Serialize>(mut self, value: &T) -> Self {
        self.new_value = serde_json::to_value(value).ok();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// A persisted, immutable audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    pub action: AuditAction,
    pub entity_type: AuditEntityType,
    pub entity_id: String,
    pub user_id: Option<String>,
    pub user_email: Option<String>,
    pub user_name: Option<String>,
    pub user_role: Option<String>,
    pub metadata: Option<AuditMetadata>,
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogQuery {
    pub entity_type: Option<String>,
    pub entity_id: Option<String>,
    pub user_id: Option<String>,
    pub action: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}
