//! Audit log API endpoints

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};

use crate::{
    db::AuditRepository,
    models::{Actor, AuditLogEntry, AuditLogQuery},
    utils::AppError,
    AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new().route("/", get(list_audit_logs))
}

async fn list_audit_logs(
    State(state): State<AppState>,
    actor: Actor,
    Query(mut query): Query<AuditLogQuery>,
) -> Result<Json<Vec<AuditLogEntry>>, AppError> {
    if !actor.is_admin() {
        tracing::warn!(user_id = %actor.id, role = %actor.role, "Audit log access refused");
        return Err(AppError::forbidden("Not allowed to view audit logs"));
    }

    query.limit = Some(state.config.audit.page_size(query.limit));

    let repo = AuditRepository::new(&state.db);
    let logs = repo.list(&query).await.map_err(|e| {
        tracing::error!("Failed to list audit logs: {:#}", e);
        AppError::internal("Failed to list audit logs")
    })?;

    Ok(Json(logs))
}
