//! Actor roles and the administrator classifier

use serde::{Deserialize, Serialize};

use crate::models::AccessLevel;

/// Role carried by every authenticated actor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    /// Regular account
    #[default]
    User,
    /// Paid tier; can own projects and invite collaborators and clients
    Pro,
    /// External client of a PRO user
    Client,
    /// Administrator
    Admin,
    /// Administrator that can also manage other administrators
    SuperAdmin,
}

impl Role {
    /// Get all roles
    pub fn all() -> Vec<Role> {
        vec![
            Role::User,
            Role::Pro,
            Role::Client,
            Role::Admin,
            Role::SuperAdmin,
        ]
    }

    /// Get the string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Pro => "PRO",
            Role::Client => "CLIENT",
            Role::Admin => "ADMIN",
            Role::SuperAdmin => "SUPERADMIN",
        }
    }

    /// Whether this role bypasses all grant checks
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::SuperAdmin)
    }

    /// Access level a role receives without any grant
    pub fn default_access_level(&self) -> Option<AccessLevel> {
        if self.is_admin() {
            Some(AccessLevel::Full)
        } else {
            None
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Exact match only; role strings are stored and signed upper-case
        match s {
            "USER" => Ok(Role::User),
            "PRO" => Ok(Role::Pro),
            "CLIENT" => Ok(Role::Client),
            "ADMIN" => Ok(Role::Admin),
            "SUPERADMIN" => Ok(Role::SuperAdmin),
            _ => Err(format!("Invalid role: {}", s)),
        }
    }
}

/// Classify a raw role string.
///
/// Total: only the exact strings `ADMIN` and `SUPERADMIN` are administrators;
/// anything else, including other spellings of those, is not.
pub fn is_admin(role: &str) -> bool {
    matches!(role, "ADMIN" | "SUPERADMIN")
}
