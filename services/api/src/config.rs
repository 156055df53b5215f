//! services/api/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    pub openai_api_key: Option<String>,
    pub openai_api_base: String,
    pub chat_model: String,
    pub embedding_model: String,
    pub chroma_url: String,
    pub chroma_collection: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub min_score: Option<f32>,
    pub max_context_chars: usize,
    pub token_ttl_hours: i64,
    pub request_timeout: Duration,
    pub allowed_origins: Vec<String>,
    pub seed_test_user: bool,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| "sqlite://docchat.db".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        // --- Load Provider Settings ---
        let openai_api_key = std::env::var("OPENAI_API_KEY").ok();
        let openai_api_base = std::env::var("OPENAI_API_BASE")
            .unwrap_or_else(|_| "https://api.openai.com/v1".to_string());
        let chat_model =
            std::env::var("OPENAI_MODEL").unwrap_or_else(|_| "gpt-4o-mini".to_string());
        let embedding_model = std::env::var("EMBEDDING_MODEL")
            .unwrap_or_else(|_| "text-embedding-3-small".to_string());

        // --- Load Vector Store Settings ---
        let chroma_url =
            std::env::var("CHROMA_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
        let chroma_collection =
            std::env::var("CHROMA_COLLECTION_NAME").unwrap_or_else(|_| "docchat".to_string());

        // --- Load Chunking and Retrieval Settings ---
        let chunk_size = parse_var("CHUNK_SIZE", 1000usize)?;
        let chunk_overlap = parse_var("CHUNK_OVERLAP", 200usize)?;
        let top_k = parse_var("TOP_K_RESULTS", 3usize)?;
        let min_score = match std::env::var("MIN_SCORE") {
            Ok(raw) => Some(raw.parse::<f32>().map_err(|e| {
                ConfigError::InvalidValue("MIN_SCORE".to_string(), e.to_string())
            })?),
            Err(_) => None,
        };
        let max_context_chars = parse_var("MAX_CONTEXT_CHARS", 4000usize)?;

        // --- Load Auth and Transport Settings ---
        let token_ttl_hours = parse_var("TOKEN_TTL_HOURS", 24i64)?;
        let request_timeout = Duration::from_secs(parse_var("REQUEST_TIMEOUT_SECS", 30u64)?);
        let allowed_origins = std::env::var("ALLOWED_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173,http://localhost:3000".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        let seed_test_user = parse_var("SEED_TEST_USER", false)?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            openai_api_key,
            openai_api_base,
            chat_model,
            embedding_model,
            chroma_url,
            chroma_collection,
            chunk_size,
            chunk_overlap,
            top_k,
            min_score,
            max_context_chars,
            token_ttl_hours,
            request_timeout,
            allowed_origins,
            seed_test_user,
        })
    }
}

/// Parses an optional environment variable, falling back to `default` when unset.
fn parse_var<T>(name: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidValue(name.to_string(), e.to_string())),
        Err(_) => Ok(default),
    }
}
