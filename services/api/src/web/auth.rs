//! services/api/src/web/auth.rs
//!
//! Authentication endpoints for user registration, login, and logout.
//!
//! Registration conflicts and bad credentials are reported with
//! `success:false` in a 200 body rather than an error status; clients drive
//! off the `success` flag.

use axum::{extract::State, http::HeaderMap, Json};
use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::middleware::bearer_token;
use crate::web::state::AppState;
use docchat_core::domain::AuthToken;
use docchat_core::ports::{CredentialStore, PortError};

//=========================================================================================
// Request/Response Types
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
    pub user_id: Option<Uuid>,
}

#[derive(Deserialize, ToSchema)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize, ToSchema)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub access_token: Option<String>,
    pub user_id: Option<Uuid>,
    pub username: Option<String>,
}

#[derive(Serialize, ToSchema)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

impl LoginResponse {
    fn rejected() -> Self {
        Self {
            success: false,
            message: "Invalid username or password".to_string(),
            access_token: None,
            user_id: None,
            username: None,
        }
    }
}

/// Hashes a password with a fresh per-user salt.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
    let salt = SaltString::generate(&mut OsRng);
    Ok(Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| ApiError::Internal(format!("Failed to hash password: {e}")))?
        .to_string())
}

//=========================================================================================
// Handlers
//=========================================================================================

/// POST /auth/register - Create a new user account
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Registration outcome; success=false when the username is taken", body = RegisterResponse),
        (status = 400, description = "Blank username or password"),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    let username = req.username.trim();
    if username.is_empty() || req.password.is_empty() {
        return Err(ApiError::Validation(
            "Username and password must not be empty".to_string(),
        ));
    }

    let password_hash = hash_password(&req.password)?;

    match state.credentials.create_user(username, &password_hash).await {
        Ok(user) => {
            info!("Registered user '{}' ({})", user.username, user.id);
            Ok(Json(RegisterResponse {
                success: true,
                message: "User registered".to_string(),
                user_id: Some(user.id),
            }))
        }
        Err(PortError::Conflict(_)) => Ok(Json(RegisterResponse {
            success: false,
            message: "This username is already taken".to_string(),
            user_id: None,
        })),
        Err(e) => Err(e.into()),
    }
}

/// POST /auth/login - Exchange credentials for a bearer token
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login outcome; carries the access token on success", body = LoginResponse),
        (status = 500, description = "Internal server error")
    ),
    tag = "Auth"
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let creds = match state.credentials.get_user_by_username(req.username.trim()).await {
        Ok(creds) => creds,
        // Unknown usernames and bad passwords are indistinguishable to the caller.
        Err(PortError::NotFound(_)) => return Ok(Json(LoginResponse::rejected())),
        Err(e) => return Err(e.into()),
    };

    let parsed_hash = PasswordHash::new(&creds.password_hash)
        .map_err(|e| ApiError::Internal(format!("Failed to parse password hash: {e}")))?;
    if Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .is_err()
    {
        return Ok(Json(LoginResponse::rejected()));
    }

    let issued_at = Utc::now();
    let token = AuthToken {
        token: Uuid::new_v4().to_string(),
        user_id: creds.id,
        issued_at,
        expires_at: issued_at + Duration::hours(state.config.token_ttl_hours),
    };
    state.credentials.insert_token(&token).await?;

    Ok(Json(LoginResponse {
        success: true,
        message: "Login successful".to_string(),
        access_token: Some(token.token),
        user_id: Some(creds.id),
        username: Some(creds.username),
    }))
}

/// POST /auth/logout - Revoke the presented bearer token
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    responses(
        (status = 200, description = "Token revoked (idempotent)", body = LogoutResponse),
        (status = 401, description = "No bearer token supplied")
    ),
    tag = "Auth"
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, ApiError> {
    let token =
        bearer_token(&headers).ok_or_else(|| ApiError::Auth("Missing bearer token".to_string()))?;

    // Revocation is idempotent: an unknown or already-revoked token still
    // logs out successfully.
    state.credentials.revoke_token(&token).await?;

    Ok(Json(LogoutResponse {
        success: true,
        message: "Logged out".to_string(),
    }))
}
