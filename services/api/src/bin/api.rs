//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{
        ChromaIndexAdapter, OpenAiChatAdapter, OpenAiEmbeddingAdapter, SqliteCredentialStore,
    },
    config::Config,
    error::ApiError,
    services::{DocumentService, RagService, RetrievalPolicy},
    text_split::TextSplitter,
    web::{api_router, auth::hash_password, rest::ApiDoc, AppState},
};
use async_openai::{config::OpenAIConfig, Client};
use axum::Router;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use docchat_core::ports::{CredentialStore, PortError};

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            config.log_level.to_string(),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to the Credential Database ---
    info!("Connecting to database...");
    let connect_options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let db_pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(connect_options)
        .await?;
    let credentials = Arc::new(SqliteCredentialStore::new(db_pool));
    credentials.init_schema().await?;
    info!("Database schema ready.");

    if config.seed_test_user {
        seed_test_user(credentials.as_ref()).await?;
    }

    // --- 3. Initialize External Adapters ---
    // One bounded HTTP client is shared by every outbound adapter.
    let http = reqwest::Client::builder()
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| ApiError::Internal(format!("Failed to build HTTP client: {e}")))?;

    info!("Connecting to vector store at {}...", config.chroma_url);
    let index = Arc::new(
        ChromaIndexAdapter::connect(http.clone(), &config.chroma_url, &config.chroma_collection)
            .await
            .map_err(ApiError::from)?,
    );

    let api_key = config
        .openai_api_key
        .clone()
        .ok_or_else(|| ApiError::Internal("OPENAI_API_KEY is required".to_string()))?;
    let embeddings = Arc::new(OpenAiEmbeddingAdapter::new(
        http.clone(),
        &config.openai_api_base,
        Some(api_key.clone()),
        config.embedding_model.clone(),
    ));

    let openai_config = OpenAIConfig::new()
        .with_api_key(&api_key)
        .with_api_base(&config.openai_api_base);
    let openai_client = Client::with_config(openai_config);
    let generator = Arc::new(OpenAiChatAdapter::new(
        openai_client,
        config.chat_model.clone(),
        config.request_timeout,
    ));

    // --- 4. Build the Services and Shared AppState ---
    let splitter = TextSplitter::new(config.chunk_size, config.chunk_overlap);
    let documents = Arc::new(DocumentService::new(
        index.clone(),
        embeddings.clone(),
        splitter,
    ));
    let policy = RetrievalPolicy {
        top_k: config.top_k,
        min_score: config.min_score,
        max_context_chars: config.max_context_chars,
    };
    let rag = Arc::new(RagService::new(index, embeddings, generator, policy));

    let app_state = Arc::new(AppState {
        credentials,
        documents,
        rag,
        config: config.clone(),
    });

    // --- 5. Create the Web Router ---
    // Merge the API router with the Swagger UI router for a complete application.
    let app = Router::new()
        .merge(api_router(app_state))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()));

    // --- 6. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Creates the well-known development login, if absent.
async fn seed_test_user(store: &dyn CredentialStore) -> Result<(), ApiError> {
    let password_hash = hash_password("password123")?;
    match store.create_user("testuser", &password_hash).await {
        Ok(user) => info!("Seeded development user 'testuser' ({})", user.id),
        Err(PortError::Conflict(_)) => {}
        Err(e) => return Err(e.into()),
    }
    Ok(())
}
