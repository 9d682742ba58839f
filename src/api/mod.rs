//! API routes and handlers
//!
//! This module defines all API endpoints and their routing.

use axum::{routing::get, Router};

use crate::{
    middleware::auth::auth_middleware,
    models::{AccessDecision, AccessLevel, Actor, EntityKind},
    utils::AppError,
    AppState,
};

mod albums;
mod audit_logs;
mod health;
mod projects;

pub use health::*;

/// Public API routes (no authentication required)
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health_check))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness))
}

/// Protected API routes (authentication required)
pub fn protected_routes() -> Router<AppState> {
    Router::new()
        .nest("/projects", projects::routes())
        .nest("/albums", albums::routes())
        .nest("/audit-logs", audit_logs::routes())
}

/// All API routes, with the auth layer applied to the protected ones
pub fn routes(state: AppState) -> Router<AppState> {
    let protected = protected_routes().layer(axum::middleware::from_fn_with_state(
        state,
        auth_middleware,
    ));

    Router::new().merge(public_routes()).merge(protected)
}

/// The versioned application router without transport layers
pub fn app(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", routes(state.clone()))
        .with_state(state)
}

/// Resolve access and require at least `required`.
///
/// Missing entities become 404 and refusals 403, with the resolver's reason
/// as the message.
pub(crate) async fn require_access(
    state: &AppState,
    kind: EntityKind,
    entity_id: &str,
    actor: &Actor,
    required: AccessLevel,
) -> Result<AccessDecision, AppError> {
    let decision = state
        .access
        .resolve(kind, entity_id, actor)
        .await
        .map_err(|e| {
            tracing::error!("Failed to resolve access: {:#}", e);
            AppError::internal("Failed to resolve access")
        })?;

    if let Some(err) = AppError::from_decision(&decision) {
        return Err(err);
    }

    if !decision.allows(required) {
        tracing::warn!(
            entity = kind.display_name(),
            entity_id = %entity_id,
            user_id = %actor.id,
            required = %required,
            "Insufficient access level"
        );
        return Err(AppError::forbidden(format!(
            "{} access required",
            required.as_str()
        )));
    }

    Ok(decision)
}
