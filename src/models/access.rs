//! Access levels, actors and resolution outcomes

use serde::{Deserialize, Serialize};

use crate::models::Role;

/// Ordinal permission tier.
///
/// Variants are declared from least to most access so the derived `Ord`
/// gives `Read < Write < Full`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(rename_all = "UPPERCASE")]
pub enum AccessLevel {
    Read,
    Write,
    Full,
}

impl AccessLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessLevel::Read => "READ",
            AccessLevel::Write => "WRITE",
            AccessLevel::Full => "FULL",
        }
    }

    /// Whether this level satisfies `required`
    pub fn satisfies(&self, required: AccessLevel) -> bool {
        *self >= required
    }
}

impl std::fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AccessLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "READ" => Ok(AccessLevel::Read),
            "WRITE" => Ok(AccessLevel::Write),
            "FULL" => Ok(AccessLevel::Full),
            _ => Err(format!("Invalid access level: {}", s)),
        }
    }
}

/// Highest of two optional levels
pub fn max_level(a: Option<AccessLevel>, b: Option<AccessLevel>) -> Option<AccessLevel> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, None) => a,
        (None, b) => b,
    }
}

/// Kind of protected entity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Project,
    Album,
}

impl EntityKind {
    /// Display name used in "not found" reasons
    pub fn display_name(&self) -> &'static str {
        match self {
            EntityKind::Project => "Project",
            EntityKind::Album => "Album",
        }
    }

    pub fn not_found_reason(&self) -> String {
        format!("{} not found", self.display_name())
    }
}

/// The authenticated identity performing an action
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub role: Role,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: Role) -> Self {
        Self {
            id: id.into(),
            role,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

pub const ACCESS_DENIED_REASON: &str = "Access denied";

/// Outcome of resolving one (entity, actor) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccessDecision {
    Granted { level: AccessLevel },
    Denied { reason: String },
    NotFound { reason: String },
}

impl AccessDecision {
    pub fn granted(level: AccessLevel) -> Self {
        AccessDecision::Granted { level }
    }

    pub fn denied() -> Self {
        AccessDecision::Denied {
            reason: ACCESS_DENIED_REASON.to_string(),
        }
    }

    pub fn not_found(kind: EntityKind) -> Self {
        AccessDecision::NotFound {
            reason: kind.not_found_reason(),
        }
    }

    pub fn has_access(&self) -> bool {
        matches!(self, AccessDecision::Granted { .. })
    }

    pub fn access_level(&self) -> Option<AccessLevel> {
        match self {
            AccessDecision::Granted { level } => Some(*level),
            _ => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            AccessDecision::Granted { .. } => None,
            AccessDecision::Denied { reason } | AccessDecision::NotFound { reason } => {
                Some(reason)
            }
        }
    }

    /// Whether the decision grants at least `required`
    pub fn allows(&self, required: AccessLevel) -> bool {
        self.access_level()
            .map(|level| level.satisfies(required))
            .unwrap_or(false)
    }
}

/// Wire shape of an access decision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessCheck {
    pub has_access: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_level: Option<AccessLevel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl From<&AccessDecision> for AccessCheck {
    fn from(decision: &AccessDecision) -> Self {
        Self {
            has_access: decision.has_access(),
            access_level: decision.access_level(),
            reason: decision.reason().map(str::to_string),
        }
    }
}

impl From<AccessDecision> for AccessCheck {
    fn from(decision: AccessDecision) -> Self {
        AccessCheck::from(&decision)
    }
}
