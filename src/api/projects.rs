//! Project API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use validator::Validate;

use crate::{
    api::require_access,
    db::ProjectRepository,
    models::{
        AccessCheck, AccessLevel, AccessListChanges, Actor, CreateProjectRequest, EntityKind,
        Grant, GrantClientAccessRequest, GrantKind, GrantOutcome, Project, ProjectWithAccess,
        ReplaceAccessRequest, Role, UpdateProjectRequest,
    },
    utils::AppError,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_projects).post(create_project))
        .route(
            "/{id}",
            get(get_project).put(update_project).delete(delete_project),
        )
        .route("/{id}/access", get(list_access).put(replace_access))
        .route("/{id}/clients", post(grant_client_access))
        .route("/{id}/clients/{user_id}", delete(revoke_client_access))
}

async fn list_projects(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<Project>>, AppError> {
    let ids = state
        .access
        .accessible_project_ids(&actor)
        .await
        .map_err(|e| {
            tracing::error!("Failed to resolve accessible projects: {:#}", e);
            AppError::internal("Failed to list projects")
        })?;

    let repo = ProjectRepository::new(&state.db);
    let projects = repo.list_by_ids(&ids).await.map_err(|e| {
        tracing::error!("Failed to list projects: {:#}", e);
        AppError::internal("Failed to list projects")
    })?;

    Ok(Json(projects))
}

async fn create_project(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateProjectRequest>,
) -> Result<(StatusCode, Json<Project>), AppError> {
    if actor.role == Role::Client {
        return Err(AppError::forbidden("Clients cannot create projects"));
    }
    payload.validate()?;

    let repo = ProjectRepository::new(&state.db);
    let project = repo.create(&actor.id, &payload).await.map_err(|e| {
        tracing::error!("Failed to create project: {:#}", e);
        AppError::internal("Failed to create project")
    })?;

    tracing::info!(project_id = %project.id, owner_id = %actor.id, "Created project");
    state.audit.log_project_created(&actor.id, &project).await;

    Ok((StatusCode::CREATED, Json(project)))
}

async fn get_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<ProjectWithAccess>, AppError> {
    let decision = require_access(&state, EntityKind::Project, &id, &actor, AccessLevel::Read).await?;

    let repo = ProjectRepository::new(&state.db);
    let project = repo
        .get_by_id(&id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get project: {:#}", e);
            AppError::internal("Failed to get project")
        })?
        .ok_or_else(|| AppError::not_found(EntityKind::Project.not_found_reason()))?;

    Ok(Json(ProjectWithAccess {
        project,
        access: AccessCheck::from(&decision),
    }))
}

async fn update_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(payload): Json<UpdateProjectRequest>,
) -> Result<Json<Project>, AppError> {
    payload.validate()?;
    require_access(&state, EntityKind::Project, &id, &actor, AccessLevel::Write).await?;

    let repo = ProjectRepository::new(&state.db);
    let before = repo
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(EntityKind::Project.not_found_reason()))?;
    let after = repo
        .update(&id, &payload)
        .await
        .map_err(|e| {
            tracing::error!("Failed to update project: {:#}", e);
            AppError::internal("Failed to update project")
        })?
        .ok_or_else(|| AppError::not_found(EntityKind::Project.not_found_reason()))?;

    state.audit.log_project_updated(&actor.id, &before, &after).await;

    Ok(Json(after))
}

async fn delete_project(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    require_access(&state, EntityKind::Project, &id, &actor, AccessLevel::Full).await?;

    let repo = ProjectRepository::new(&state.db);
    let project = repo
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(EntityKind::Project.not_found_reason()))?;

    let deleted = repo.delete(&id).await.map_err(|e| {
        tracing::error!("Failed to delete project: {:#}", e);
        AppError::internal("Failed to delete project")
    })?;
    if !deleted {
        return Err(AppError::not_found(EntityKind::Project.not_found_reason()));
    }

    tracing::info!(project_id = %id, user_id = %actor.id, "Deleted project");
    state.audit.log_project_deleted(&actor.id, &project).await;

    Ok(StatusCode::NO_CONTENT)
}

async fn list_access(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<Vec<Grant>>, AppError> {
    require_access(&state, EntityKind::Project, &id, &actor, AccessLevel::Full).await?;

    let grants = state
        .grants
        .list_grants(GrantKind::ProjectAccess, &id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list project access: {:#}", e);
            AppError::internal("Failed to list project access")
        })?;

    Ok(Json(grants))
}

async fn replace_access(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(payload): Json<ReplaceAccessRequest>,
) -> Result<Json<AccessListChanges>, AppError> {
    payload.validate()?;
    require_access(&state, EntityKind::Project, &id, &actor, AccessLevel::Full).await?;

    let changes = state
        .grants
        .replace_project_access(&actor, &id, &payload.entries)
        .await
        .inspect_err(|e| tracing::warn!(project_id = %id, "Access list replace failed: {:#}", e))?;

    tracing::info!(
        project_id = %id,
        added = changes.added.len(),
        updated = changes.updated.len(),
        removed = changes.removed.len(),
        "Replaced project access list"
    );

    Ok(Json(changes))
}

async fn grant_client_access(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(payload): Json<GrantClientAccessRequest>,
) -> Result<(StatusCode, Json<GrantOutcome>), AppError> {
    payload.validate()?;
    require_access(&state, EntityKind::Project, &id, &actor, AccessLevel::Full).await?;

    let outcome = state
        .grants
        .grant_client_project_access(&actor, &id, &payload.user_id, payload.access_level)
        .await?;

    let status = match outcome {
        GrantOutcome::Created { .. } => StatusCode::CREATED,
        _ => StatusCode::OK,
    };
    Ok((status, Json(outcome)))
}

async fn revoke_client_access(
    State(state): State<AppState>,
    actor: Actor,
    Path((id, user_id)): Path<(String, String)>,
) -> Result<StatusCode, AppError> {
    require_access(&state, EntityKind::Project, &id, &actor, AccessLevel::Full).await?;

    let removed = state
        .grants
        .revoke_client_project_access(&actor, &id, &user_id)
        .await?;

    if removed {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Client access not found"))
    }
}
