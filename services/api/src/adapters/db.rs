//! services/api/src/adapters/db.rs
//!
//! This module contains the database adapter, which is the concrete implementation
//! of the `CredentialStore` port from the `core` crate. It handles all interactions
//! with the SQLite database using `sqlx`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};
use uuid::Uuid;

use docchat_core::domain::{AuthToken, User, UserCredentials};
use docchat_core::ports::{CredentialStore, PortError, PortResult};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// A database adapter that implements the `CredentialStore` port.
#[derive(Clone)]
pub struct SqliteCredentialStore {
    pool: SqlitePool,
}

impl SqliteCredentialStore {
    /// Creates a new `SqliteCredentialStore`.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the schema at startup. Safe to call on every boot.
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS auth_tokens (
                token TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id),
                issued_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

//=========================================================================================
// "Impure" Database Record Structs
//=========================================================================================

#[derive(FromRow)]
struct CredentialsRecord {
    id: String,
    username: String,
    password_hash: String,
}

impl CredentialsRecord {
    fn to_domain(self) -> PortResult<UserCredentials> {
        Ok(UserCredentials {
            id: parse_uuid(&self.id)?,
            username: self.username,
            password_hash: self.password_hash,
        })
    }
}

#[derive(FromRow)]
struct TokenRecord {
    token: String,
    user_id: String,
    issued_at: String,
    expires_at: String,
}

impl TokenRecord {
    fn to_domain(self) -> PortResult<AuthToken> {
        Ok(AuthToken {
            token: self.token,
            user_id: parse_uuid(&self.user_id)?,
            issued_at: parse_timestamp(&self.issued_at)?,
            expires_at: parse_timestamp(&self.expires_at)?,
        })
    }
}

fn parse_uuid(raw: &str) -> PortResult<Uuid> {
    Uuid::parse_str(raw)
        .map_err(|e| PortError::Unexpected(format!("Corrupt id '{raw}' in database: {e}")))
}

fn parse_timestamp(raw: &str) -> PortResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PortError::Unexpected(format!("Corrupt timestamp '{raw}' in database: {e}")))
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    matches!(e, sqlx::Error::Database(db) if db.message().contains("UNIQUE constraint failed"))
}

//=========================================================================================
// `CredentialStore` Trait Implementation
//=========================================================================================

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn create_user(&self, username: &str, password_hash: &str) -> PortResult<User> {
        let id = Uuid::new_v4();
        let created_at = Utc::now();
        sqlx::query("INSERT INTO users (id, username, password_hash, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(id.to_string())
            .bind(username)
            .bind(password_hash)
            .bind(created_at.to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if is_unique_violation(&e) {
                    PortError::Conflict(format!("Username '{username}' is already taken"))
                } else {
                    PortError::Unexpected(e.to_string())
                }
            })?;

        Ok(User {
            id,
            username: username.to_string(),
            created_at,
        })
    }

    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials> {
        let record = sqlx::query_as::<_, CredentialsRecord>(
            "SELECT id, username, password_hash FROM users WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?
        .ok_or_else(|| PortError::NotFound(format!("User '{username}' not found")))?;

        record.to_domain()
    }

    async fn insert_token(&self, token: &AuthToken) -> PortResult<()> {
        sqlx::query(
            "INSERT INTO auth_tokens (token, user_id, issued_at, expires_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(&token.token)
        .bind(token.user_id.to_string())
        .bind(token.issued_at.to_rfc3339())
        .bind(token.expires_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }

    async fn lookup_token(&self, token: &str) -> PortResult<AuthToken> {
        let record = sqlx::query_as::<_, TokenRecord>(
            "SELECT token, user_id, issued_at, expires_at FROM auth_tokens WHERE token = ?1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| PortError::Unexpected(e.to_string()))?
        .ok_or_else(|| PortError::NotFound("Token not found".to_string()))?;

        record.to_domain()
    }

    async fn revoke_token(&self, token: &str) -> PortResult<()> {
        // Deleting a token that does not exist is a successful revocation.
        sqlx::query("DELETE FROM auth_tokens WHERE token = ?1")
            .bind(token)
            .execute(&self.pool)
            .await
            .map_err(|e| PortError::Unexpected(e.to_string()))?;
        Ok(())
    }
}
