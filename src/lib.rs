//! MediaHub library
//!
//! Access control and audit trail for a multi-tenant media backend: who may
//! see or change a project or album, which projects and albums an actor can
//! list, and an append-only record of every state change.

pub mod api;
pub mod config;
pub mod db;
pub mod middleware;
pub mod models;
pub mod services;
pub mod utils;

pub use config::AppConfig;
pub use db::DbPool;
pub use middleware::{auth_middleware, Claims};
pub use services::{AccessService, AuditService, GrantService};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// Database connection pool
    pub db: DbPool,
    pub access: AccessService,
    pub audit: AuditService,
    pub grants: GrantService,
}

impl AppState {
    /// Wire the services around one pool
    pub fn new(config: AppConfig, db: DbPool) -> Self {
        let audit = AuditService::new(db.clone());
        let access = AccessService::new(db.clone());
        let grants = GrantService::new(db.clone(), audit.clone());
        Self {
            config,
            db,
            access,
            audit,
            grants,
        }
    }
}
