//! Access resolution for projects and albums
//!
//! Decisions are recomputed on every call. Nothing is cached between
//! requests because grants can change at any time.
//!
//! Precedence, first match wins:
//! 1. administrators get `FULL` without touching the store
//! 2. a missing entity is `NotFound`
//! 3. the owner gets `FULL`
//! 4. internal and client grants are combined with `max`
//! 5. an album inside a project also takes the project's level (the higher
//!    of album grant and project level wins)
//! 6. anything else is `Denied`

use std::collections::BTreeSet;

use anyhow::Result;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::db::album_repository::fetch_album;
use crate::db::grant_repository::fetch_grant;
use crate::db::project_repository::fetch_project;
use crate::db::{AlbumRepository, GrantRepository, ProjectRepository};
use crate::models::{
    max_level, AccessDecision, AccessLevel, Actor, EntityKind, GrantKind, Project,
};

#[derive(Clone)]
pub struct AccessService {
    pool: SqlitePool,
}

impl AccessService {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Resolve access to either kind of entity
    pub async fn resolve(
        &self,
        kind: EntityKind,
        entity_id: &str,
        actor: &Actor,
    ) -> Result<AccessDecision> {
        match kind {
            EntityKind::Project => self.check_project_access(entity_id, actor).await,
            EntityKind::Album => self.check_album_access(entity_id, actor).await,
        }
    }

    pub async fn check_project_access(
        &self,
        project_id: &str,
        actor: &Actor,
    ) -> Result<AccessDecision> {
        if actor.is_admin() {
            return Ok(AccessDecision::granted(AccessLevel::Full));
        }

        let Some(project) = fetch_project(&self.pool, project_id).await? else {
            debug!(project_id = %project_id, "Access check on missing project");
            return Ok(AccessDecision::not_found(EntityKind::Project));
        };

        let decision = match self.project_level(&project, actor).await? {
            Some(level) => AccessDecision::granted(level),
            None => AccessDecision::denied(),
        };
        log_decision(EntityKind::Project, project_id, actor, &decision);
        Ok(decision)
    }

    pub async fn check_album_access(&self, album_id: &str, actor: &Actor) -> Result<AccessDecision> {
        if actor.is_admin() {
            return Ok(AccessDecision::granted(AccessLevel::Full));
        }

        let Some(album) = fetch_album(&self.pool, album_id).await? else {
            debug!(album_id = %album_id, "Access check on missing album");
            return Ok(AccessDecision::not_found(EntityKind::Album));
        };

        if album.owner_id == actor.id {
            return Ok(AccessDecision::granted(AccessLevel::Full));
        }

        // No internal grant table exists for albums; only client grants apply
        let direct = fetch_grant(&self.pool, GrantKind::ClientAlbumAccess, album_id, &actor.id)
            .await?
            .map(|g| g.access_level);

        let inherited = match album.project_id.as_deref() {
            Some(project_id) => match fetch_project(&self.pool, project_id).await? {
                Some(project) => self.project_level(&project, actor).await?,
                None => {
                    debug!(album_id = %album_id, project_id = %project_id, "Album points at a missing project");
                    None
                }
            },
            None => None,
        };

        let decision = match max_level(direct, inherited) {
            Some(level) => AccessDecision::granted(level),
            None => AccessDecision::denied(),
        };
        log_decision(EntityKind::Album, album_id, actor, &decision);
        Ok(decision)
    }

    /// Level a non-admin actor holds on an existing project, if any
    async fn project_level(&self, project: &Project, actor: &Actor) -> Result<Option<AccessLevel>> {
        if project.owner_id == actor.id {
            return Ok(Some(AccessLevel::Full));
        }

        let internal = fetch_grant(&self.pool, GrantKind::ProjectAccess, &project.id, &actor.id)
            .await?
            .map(|g| g.access_level);
        let client = fetch_grant(
            &self.pool,
            GrantKind::ClientProjectAccess,
            &project.id,
            &actor.id,
        )
        .await?
        .map(|g| g.access_level);

        Ok(max_level(internal, client))
    }

    /// Every project id the actor can see.
    ///
    /// One query for administrators, three otherwise, whatever the number of
    /// projects.
    pub async fn accessible_project_ids(&self, actor: &Actor) -> Result<BTreeSet<String>> {
        let projects = ProjectRepository::new(&self.pool);

        if actor.is_admin() {
            return Ok(projects.all_ids().await?.into_iter().collect());
        }

        let grants = GrantRepository::new(&self.pool);
        let mut ids: BTreeSet<String> = projects.ids_owned_by(&actor.id).await?.into_iter().collect();
        ids.extend(
            grants
                .entity_ids_for_user(GrantKind::ProjectAccess, &actor.id)
                .await?,
        );
        ids.extend(
            grants
                .entity_ids_for_user(GrantKind::ClientProjectAccess, &actor.id)
                .await?,
        );

        debug!(user_id = %actor.id, count = ids.len(), "Resolved accessible projects");
        Ok(ids)
    }

    /// Every album id the actor can see, in a single query
    pub async fn accessible_album_ids(&self, actor: &Actor) -> Result<BTreeSet<String>> {
        let albums = AlbumRepository::new(&self.pool);

        let ids: BTreeSet<String> = if actor.is_admin() {
            albums.all_ids().await?.into_iter().collect()
        } else {
            albums.visible_ids_for(&actor.id).await?.into_iter().collect()
        };

        debug!(user_id = %actor.id, count = ids.len(), "Resolved accessible albums");
        Ok(ids)
    }
}

fn log_decision(kind: EntityKind, entity_id: &str, actor: &Actor, decision: &AccessDecision) {
    match decision {
        AccessDecision::Granted { level } => debug!(
            entity = kind.display_name(),
            entity_id = %entity_id,
            user_id = %actor.id,
            access_level = %level,
            "Access granted"
        ),
        AccessDecision::Denied { reason } => warn!(
            entity = kind.display_name(),
            entity_id = %entity_id,
            user_id = %actor.id,
            role = %actor.role,
            "{}",
            reason
        ),
        AccessDecision::NotFound { .. } => {}
    }
}
