pub mod auth;
pub mod middleware;
pub mod rest;
pub mod router;
pub mod state;

// Re-export the pieces the server binary wires together.
pub use middleware::require_auth;
pub use router::api_router;
pub use state::AppState;
