//! JWT authentication middleware
//!
//! Tokens are issued by the identity provider; this module only validates
//! them and turns the claims into an [`Actor`] request extension.

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header::AUTHORIZATION, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, TokenData, Validation};
use serde::{Deserialize, Serialize};

use crate::{
    models::{Actor, Role},
    utils::error::ErrorResponse,
    AppState,
};

/// JWT Claims structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    /// Role name, e.g. `PRO` or `CLIENT`
    pub role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub iat: i64,
    pub exp: i64,
    pub nbf: i64,
}

impl TryFrom<Claims> for Actor {
    type Error = AuthError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        if claims.sub.trim().is_empty() {
            return Err(AuthError::InvalidToken);
        }
        // Unknown roles are rejected rather than downgraded
        let role = claims
            .role
            .parse::<Role>()
            .map_err(|_| AuthError::InvalidRole)?;
        Ok(Actor::new(claims.sub, role))
    }
}

/// Extractor for the authenticated [`Actor`] after `auth_middleware` has run
impl<S> FromRequestParts<S> for Actor
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Actor>()
            .cloned()
            .ok_or(AuthError::MissingToken)
    }
}

/// Validate and decode a JWT token
pub fn validate_token(
    token: &str,
    secret: &str,
    leeway_secs: u64,
) -> Result<TokenData<Claims>, AuthError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;
    validation.validate_nbf = true;
    validation.leeway = leeway_secs;

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        jsonwebtoken::errors::ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
        _ => AuthError::InvalidToken,
    })
}

/// Authentication error types
#[derive(Debug, PartialEq, Eq)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    TokenExpired,
    TokenNotYetValid,
    InvalidRole,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingToken => "Missing authentication token",
            AuthError::InvalidToken => "Invalid authentication token",
            AuthError::TokenExpired => "Authentication token has expired",
            AuthError::TokenNotYetValid => "Authentication token is not yet valid",
            AuthError::InvalidRole => "Unknown role in authentication token",
        };

        let body = ErrorResponse::new("unauthorized", message);

        (StatusCode::UNAUTHORIZED, Json(body)).into_response()
    }
}

/// Extract bearer token from Authorization header
fn extract_bearer_token(auth_header: &str) -> Option<&str> {
    auth_header
        .strip_prefix("Bearer ")
        .or_else(|| auth_header.strip_prefix("bearer "))
}

/// Authentication middleware
///
/// Validates the bearer token and injects the [`Actor`] into request
/// extensions.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or(AuthError::MissingToken)
        .and_then(|h| extract_bearer_token(h).ok_or(AuthError::InvalidToken))?;

    let token_data = validate_token(
        token,
        &state.config.auth.jwt_secret,
        state.config.auth.leeway_secs,
    )
    .inspect_err(|e| tracing::debug!("Rejected token: {:?}", e))?;

    let actor = Actor::try_from(token_data.claims)?;
    tracing::debug!(user_id = %actor.id, role = %actor.role, "Authenticated request");

    request.extensions_mut().insert(actor);

    Ok(next.run(request).await)
}
