//! services/api/src/web/middleware.rs
//!
//! Authentication middleware for protecting the document-management routes.

use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::state::AppState;
use docchat_core::ports::{CredentialStore, PortError};

/// Pulls the token out of an `Authorization: Bearer <token>` header.
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .filter(|token| !token.is_empty())
}

/// Looks a token up and enforces its expiry. Expired tokens are deleted on
/// discovery so they cannot be replayed.
pub async fn validate_token(store: &dyn CredentialStore, token: &str) -> Result<Uuid, ApiError> {
    let record = match store.lookup_token(token).await {
        Ok(record) => record,
        Err(PortError::NotFound(_)) => return Err(ApiError::Auth("Invalid token".to_string())),
        Err(e) => return Err(e.into()),
    };
    if record.is_expired(Utc::now()) {
        store.revoke_token(token).await?;
        return Err(ApiError::Auth("Token expired".to_string()));
    }
    Ok(record.user_id)
}

/// Middleware that validates the bearer token and extracts the user id.
///
/// If valid, inserts the user id into request extensions for handlers to use.
/// If invalid or missing, returns 401 Unauthorized.
pub async fn require_auth(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let token = bearer_token(req.headers())
        .ok_or_else(|| ApiError::Auth("Missing bearer token".to_string()))?;

    let user_id = validate_token(state.credentials.as_ref(), &token).await?;

    req.extensions_mut().insert(user_id);
    Ok(next.run(req).await)
}
