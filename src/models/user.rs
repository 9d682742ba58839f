//! User model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::Role;

/// Identity sentinel for actions performed by the platform itself
pub const SYSTEM_USER_ID: &str = "system";

/// Identity sentinel for unauthenticated actions
pub const ANONYMOUS_USER_ID: &str = "anonymous";

/// Whether `user_id` names a real user rather than a sentinel
pub fn is_real_user_id(user_id: &str) -> bool {
    !user_id.is_empty() && user_id != SYSTEM_USER_ID && user_id != ANONYMOUS_USER_ID
}

/// User entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Request to create a user
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub email: String,
    pub name: Option<String>,
    #[serde(default)]
    pub role: Role,
}
