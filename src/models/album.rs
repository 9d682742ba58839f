//! Album models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::AccessCheck;

/// An album; standalone when `project_id` is `None`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Album {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub project_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create an album
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAlbumRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    pub project_id: Option<String>,
}

/// An album together with the caller's resolved access
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlbumWithAccess {
    #[serde(flatten)]
    pub album: Album,
    pub access: AccessCheck,
}
