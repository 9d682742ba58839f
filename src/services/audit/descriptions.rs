//! Human-readable audit descriptions
//!
//! One template per known action. The match below has no wildcard arm, so a
//! new `AuditAction` variant will not compile until it gets a template.

use serde_json::Value;

use crate::models::{AccessLevel, AuditAction, AuditEntityType, AuditMetadata};

/// Build the description for an audit record
pub fn describe(
    action: &AuditAction,
    entity_type: &AuditEntityType,
    metadata: Option<&AuditMetadata>,
    old_value: Option<&Value>,
    new_value: Option<&Value>,
) -> String {
    let empty = AuditMetadata::default();
    let meta = metadata.unwrap_or(&empty);

    let project = named("project", meta.project_name.as_deref());
    let album = named("album", meta.album_name.as_deref());
    let target = meta.target_user_label().unwrap_or("a user");
    let level = meta
        .access_level
        .or_else(|| level_in(new_value))
        .map(|l| l.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    let previous = meta
        .previous_access_level
        .or_else(|| level_in(old_value))
        .map(|l| l.to_string())
        .unwrap_or_else(|| "unknown".to_string());

    match action {
        AuditAction::ProjectCreated => format!("Created {}", project),
        AuditAction::ProjectUpdated => format!("Updated {}", project),
        AuditAction::ProjectDeleted => format!("Deleted {}", project),
        AuditAction::AlbumCreated => match meta.project_name.as_deref() {
            Some(p) => format!("Created {} in project \"{}\"", album, p),
            None => format!("Created {}", album),
        },
        AuditAction::AlbumUpdated => format!("Updated {}", album),
        AuditAction::AlbumDeleted => format!("Deleted {}", album),
        AuditAction::ImageUploaded => match (meta.image_count, meta.file_name.as_deref()) {
            (Some(n), _) if n != 1 => format!("Uploaded {} images to {}", n, album),
            (_, Some(file)) => format!("Uploaded image \"{}\" to {}", file, album),
            _ => format!("Uploaded an image to {}", album),
        },
        AuditAction::ImageDeleted => match meta.file_name.as_deref() {
            Some(file) => format!("Deleted image \"{}\" from {}", file, album),
            None => format!("Deleted an image from {}", album),
        },
        AuditAction::ProjectAccessGranted => {
            format!("Granted {} access to {} on {}", level, target, project)
        }
        AuditAction::ProjectAccessModified => format!(
            "Changed {}'s access on {} from {} to {}",
            target, project, previous, level
        ),
        AuditAction::ProjectAccessRevoked => {
            format!("Revoked {}'s access to {}", target, project)
        }
        AuditAction::ClientAccessGranted => {
            format!("Granted client {} {} access to {}", target, level, project)
        }
        AuditAction::ClientAccessModified => format!(
            "Changed client {}'s access on {} from {} to {}",
            target, project, previous, level
        ),
        AuditAction::ClientAccessRevoked => {
            format!("Revoked client {}'s access to {}", target, project)
        }
        AuditAction::AlbumAccessGranted => {
            format!("Granted client {} {} access to {}", target, level, album)
        }
        AuditAction::AlbumAccessModified => format!(
            "Changed client {}'s access on {} from {} to {}",
            target, album, previous, level
        ),
        AuditAction::AlbumAccessRevoked => {
            format!("Revoked client {}'s access to {}", target, album)
        }
        AuditAction::UserCreated => format!("Created user {}", target),
        AuditAction::UserUpdated => format!("Updated user {}", target),
        AuditAction::UserRoleChanged => format!(
            "Changed {}'s role from {} to {}",
            target,
            meta.previous_role.as_deref().unwrap_or("unknown"),
            meta.new_role.as_deref().unwrap_or("unknown")
        ),
        AuditAction::UserDeleted => format!("Deleted user {}", target),
        AuditAction::Other(name) => format!("{} performed on {}", name, entity_type),
    }
}

/// `project "Wedding"`, or just `project` when the name is unknown
fn named(noun: &str, name: Option<&str>) -> String {
    match name {
        Some(name) => format!("{} \"{}\"", noun, name),
        None => noun.to_string(),
    }
}

fn level_in(value: Option<&Value>) -> Option<AccessLevel> {
    value
        .and_then(|v| v.get("accessLevel"))
        .and_then(|v| serde_json::from_value(v.clone()).ok())
}
