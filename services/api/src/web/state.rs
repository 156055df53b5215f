//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use std::sync::Arc;

use crate::config::Config;
use crate::services::{DocumentService, RagService};
use docchat_core::ports::CredentialStore;

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub credentials: Arc<dyn CredentialStore>,
    pub documents: Arc<DocumentService>,
    pub rag: Arc<RagService>,
    pub config: Arc<Config>,
}
