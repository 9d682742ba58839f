//! Test world for Cucumber scenarios

use std::collections::HashMap;
use std::fmt;

use cucumber::World;
use uuid::Uuid;

use mediahub::{
    config::AppConfig,
    db,
    models::{AccessDecision, AccessListChanges, Actor, Role},
    AppState,
};

/// Test world that maintains state across scenario steps
#[derive(Default, World)]
pub struct TestWorld {
    /// Application state backed by a per-scenario database
    state: Option<AppState>,

    /// Roles of seeded users, by id
    pub user_roles: HashMap<String, Role>,

    /// Scenario labels ("P1", "A1") to stored ids
    pub projects: HashMap<String, String>,
    pub albums: HashMap<String, String>,

    /// Outcome of the last access check
    pub last_decision: Option<AccessDecision>,

    /// Outcome of the last access list replace
    pub last_changes: Option<Result<AccessListChanges, String>>,
}

impl fmt::Debug for TestWorld {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestWorld")
            .field("user_roles", &self.user_roles)
            .field("projects", &self.projects)
            .field("albums", &self.albums)
            .field("last_decision", &self.last_decision)
            .finish_non_exhaustive()
    }
}

impl TestWorld {
    /// Start the scenario on an empty, migrated database
    pub async fn reset(&mut self) {
        let mut config = AppConfig::default();
        let db_path = std::env::temp_dir().join(format!(
            "mediahub_bdd_{}.db",
            Uuid::new_v4().simple()
        ));
        config.database.url = format!("sqlite://{}?mode=rwc", db_path.display());

        let pool = db::init_pool(&config.database)
            .await
            .expect("Failed to initialize scenario database");
        self.state = Some(AppState::new(config, pool));
    }

    pub fn state(&self) -> &AppState {
        self.state
            .as_ref()
            .expect("Scenario must start with 'Given a fresh media store'")
    }

    /// Actor for a seeded user, or an arbitrary actor for unknown ids
    pub fn actor(&self, user_id: &str, role: Role) -> Actor {
        Actor::new(user_id, role)
    }

    pub fn project_id(&self, label: &str) -> String {
        self.projects
            .get(label)
            .cloned()
            .unwrap_or_else(|| label.to_string())
    }

    pub fn album_id(&self, label: &str) -> String {
        self.albums
            .get(label)
            .cloned()
            .unwrap_or_else(|| label.to_string())
    }
}
