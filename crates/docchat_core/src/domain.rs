//! crates/docchat_core/src/domain.rs
//!
//! Defines the pure, core data structures for the application.
//! These structs are independent of any database or serialization format.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Open key-value metadata attached to a document or chunk.
pub type Metadata = Map<String, Value>;

// Represents a user - safe to hand out, carries no credential material
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

// Only used internally for login - contains sensitive data
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
}

/// An opaque bearer token bound to a single user.
#[derive(Debug, Clone)]
pub struct AuthToken {
    pub token: String,
    pub user_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl AuthToken {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

/// A document as submitted by a client, before chunking.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub content: String,
    pub metadata: Option<Metadata>,
}

/// A document as reported back to clients.
#[derive(Debug, Clone)]
pub struct DocumentInfo {
    pub id: Uuid,
    pub content: String,
    pub metadata: Option<Metadata>,
    pub created_at: Option<DateTime<Utc>>,
}

/// One chunk of a document, the unit actually written to the vector index.
///
/// A document maps to one or more chunks. The first chunk of each document
/// carries the full document content under a reserved metadata key, so the
/// document can be reassembled without a second store.
#[derive(Debug, Clone)]
pub struct IndexedChunk {
    pub chunk_id: Uuid,
    pub text: String,
    pub metadata: Metadata,
}

/// A chunk returned from a similarity search.
#[derive(Debug, Clone)]
pub struct ChunkHit {
    pub text: String,
    /// Similarity score (higher = better).
    pub score: f32,
}
