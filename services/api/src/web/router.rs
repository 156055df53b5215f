//! services/api/src/web/router.rs
//!
//! Assembles the application router. Kept in the library so integration tests
//! can build the exact same route tree as the server binary.

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
        HeaderValue, Method,
    },
    middleware as axum_middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};

use crate::config::Config;
use crate::web::auth::{login_handler, logout_handler, register_handler};
use crate::web::middleware::require_auth;
use crate::web::rest::{
    chat_handler, clear_documents_handler, get_document_handler, health_handler,
    list_documents_handler, upload_document_handler, upload_file_handler,
};
use crate::web::state::AppState;

/// Builds the full application router with CORS, body limits, and the
/// auth-guarded document routes. API routes live under `/api/v1`.
pub fn api_router(state: Arc<AppState>) -> Router {
    // Public routes (no auth required). Logout parses its own bearer header
    // so that revoking an already-dead token still succeeds.
    let public_routes = Router::new()
        .route("/auth/register", post(register_handler))
        .route("/auth/login", post(login_handler))
        .route("/auth/logout", post(logout_handler))
        .route("/chat", post(chat_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route(
            "/documents",
            post(upload_document_handler)
                .get(list_documents_handler)
                .delete(clear_documents_handler),
        )
        .route("/documents/file", post(upload_file_handler))
        .route("/documents/{document_id}", get(get_document_handler))
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            require_auth,
        ));

    let api = Router::new().merge(public_routes).merge(protected_routes);

    Router::new()
        .route("/health", get(health_handler))
        .nest("/api/v1", api)
        .layer(DefaultBodyLimit::max(10 * 1024 * 1024))
        .layer(cors_layer(&state.config))
        .with_state(state)
}

fn cors_layer(config: &Config) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| origin.parse().ok())
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE, ACCEPT])
}
