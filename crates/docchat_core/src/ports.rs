//! crates/docchat_core/src/ports.rs
//!
//! Defines the service contracts (traits) for the application's core logic.
//! These traits form the boundary of the hexagonal architecture, allowing the core
//! to be independent of specific external implementations like databases, vector
//! stores, or model providers.

use async_trait::async_trait;

use crate::domain::{AuthToken, ChunkHit, IndexedChunk, Metadata, User, UserCredentials};

//=========================================================================================
// Generic Port Error and Result Types
//=========================================================================================

/// A generic error type for all port operations.
/// This abstracts away the specific errors from external services (e.g., database, network).
#[derive(Debug, thiserror::Error)]
pub enum PortError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Item not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Upstream dependency failed: {0}")]
    Dependency(String),
    #[error("Upstream call timed out: {0}")]
    Timeout(String),
    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

/// A convenience type alias for `Result<T, PortError>`.
pub type PortResult<T> = Result<T, PortError>;

//=========================================================================================
// Service Ports (Traits)
//=========================================================================================

/// Storage for user records and the bearer tokens bound to them.
///
/// Password hashing and token expiry policy live above this port; the store
/// only persists and retrieves records.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Persists a new user. Fails with `Conflict` when the username is taken.
    async fn create_user(&self, username: &str, password_hash: &str) -> PortResult<User>;

    /// Fails with `NotFound` for an unknown username.
    async fn get_user_by_username(&self, username: &str) -> PortResult<UserCredentials>;

    async fn insert_token(&self, token: &AuthToken) -> PortResult<()>;

    /// Fails with `NotFound` for a token that was never issued or has been revoked.
    async fn lookup_token(&self, token: &str) -> PortResult<AuthToken>;

    /// Revokes a token. Idempotent: revoking an unknown token is not an error.
    async fn revoke_token(&self, token: &str) -> PortResult<()>;
}

/// The external vector index holding document chunks.
///
/// The index owns no retrieval policy; it stores chunks with their embeddings
/// and answers similarity queries.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Writes chunks and their embeddings. `chunks` and `embeddings` are parallel slices.
    async fn add_chunks(
        &self,
        chunks: Vec<IndexedChunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> PortResult<()>;

    /// Returns the metadata of every stored chunk, in insertion order.
    async fn list_chunk_metadata(&self) -> PortResult<Vec<Metadata>>;

    /// Returns up to `limit` chunks most similar to the query embedding.
    async fn search(&self, query_embedding: &[f32], limit: usize) -> PortResult<Vec<ChunkHit>>;

    /// Removes every chunk. No partially-cleared state may be observable afterwards.
    async fn clear(&self) -> PortResult<()>;
}

/// Computes embedding vectors for a batch of texts.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    /// Returns one vector per input, in input order.
    async fn embed(&self, inputs: &[String]) -> PortResult<Vec<Vec<f32>>>;
}

/// Produces a natural-language answer from a question and retrieved context.
#[async_trait]
pub trait AnswerGeneration: Send + Sync {
    async fn generate(&self, question: &str, context: &str) -> PortResult<String>;
}
