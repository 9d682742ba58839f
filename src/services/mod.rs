//! Business logic services

pub mod access;
pub mod audit;
pub mod grants;

pub use access::AccessService;
pub use audit::AuditService;
pub use grants::{GrantError, GrantService};
