//! Album API endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use validator::Validate;

use crate::{
    api::require_access,
    db::{AlbumRepository, ProjectRepository},
    models::{
        AccessCheck, AccessLevel, Actor, Album, AlbumWithAccess, CreateAlbumRequest, EntityKind,
        GrantClientAccessRequest, GrantOutcome, Role,
    },
    utils::AppError,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/", get(list_albums).post(create_album))
        .route("/{id}", get(get_album).delete(delete_album))
        .route("/{id}/clients", post(grant_client_access))
        .route("/{id}/clients/{user_id}", delete(revoke_client_access))
}

async fn list_albums(
    State(state): State<AppState>,
    actor: Actor,
) -> Result<Json<Vec<Album>>, AppError> {
    let ids = state.access.accessible_album_ids(&actor).await.map_err(|e| {
        tracing::error!("Failed to resolve accessible albums: {:#}", e);
        AppError::internal("Failed to list albums")
    })?;

    let repo = AlbumRepository::new(&state.db);
    let albums = repo.list_by_ids(&ids).await.map_err(|e| {
        tracing::error!("Failed to list albums: {:#}", e);
        AppError::internal("Failed to list albums")
    })?;

    Ok(Json(albums))
}

async fn create_album(
    State(state): State<AppState>,
    actor: Actor,
    Json(payload): Json<CreateAlbumRequest>,
) -> Result<(StatusCode, Json<Album>), AppError> {
    payload.validate()?;

    // Inside a project the project grant decides; standalone albums are owner-made
    let project_name = match payload.project_id.as_deref() {
        Some(project_id) => {
            require_access(
                &state,
                EntityKind::Project,
                project_id,
                &actor,
                AccessLevel::Write,
            )
            .await?;
            ProjectRepository::new(&state.db)
                .get_by_id(project_id)
                .await?
                .map(|p| p.name)
        }
        None if actor.role == Role::Client => {
            return Err(AppError::forbidden("Clients cannot create albums"));
        }
        None => None,
    };

    let repo = AlbumRepository::new(&state.db);
    let album = repo.create(&actor.id, &payload).await.map_err(|e| {
        tracing::error!("Failed to create album: {:#}", e);
        AppError::internal("Failed to create album")
    })?;

    tracing::info!(album_id = %album.id, owner_id = %actor.id, "Created album");
    state
        .audit
        .log_album_created(&actor.id, &album, project_name.as_deref())
        .await;

    Ok((StatusCode::CREATED, Json(album)))
}

async fn get_album(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<Json<AlbumWithAccess>, AppError> {
    let decision = require_access(&state, EntityKind::Album, &id, &actor, AccessLevel::Read).await?;

    let repo = AlbumRepository::new(&state.db);
    let album = repo
        .get_by_id(&id)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get album: {:#}", e);
            AppError::internal("Failed to get album")
        })?
        .ok_or_else(|| AppError::not_found(EntityKind::Album.not_found_reason()))?;

    Ok(Json(AlbumWithAccess {
        album,
        access: AccessCheck::from(&decision),
    }))
}

async fn delete_album(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    require_access(&state, EntityKind::Album, &id, &actor, AccessLevel::Full).await?;

    let repo = AlbumRepository::new(&state.db);
    let album = repo
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(EntityKind::Album.not_found_reason()))?;

    if !repo.delete(&id).await? {
        return Err(AppError::not_found(EntityKind::Album.not_found_reason()));
    }

    tracing::info!(album_id = %id, user_id = %actor.id, "Deleted album");
    state.audit.log_album_deleted(&actor.id, &album).await;

    Ok(StatusCode::NO_CONTENT)
}

async fn grant_client_access(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<String>,
    Json(payload): Json<GrantClientAccessRequest>,
) -> Result<(StatusCode, Json<GrantOutcome>), AppError> {
    payload.validate()?;
    require_access(&state, EntityKind::Album, &id, &actor, AccessLevel::Full).await?;

    let outcome = state
        .grants
        .grant_client_album_access(&actor, &id, &payload.user_id, payload.access_level)
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
    require_access(&state, EntityKind::Album, &id, &actor, AccessLevel::Full).await?;

    if state
        .grants
        .revoke_client_album_access(&actor, &id, &user_id)
        .await?
    {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found("Client access not found"))
    }
}
