//! services/api/tests/api.rs
//!
//! Router-level tests exercising the HTTP contract end to end, with an
//! in-memory SQLite credential store and fake vector-index / embedding /
//! generation adapters behind the real services.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use chrono::Utc;
use serde_json::{json, Value};
use tower::ServiceExt;

use api_lib::adapters::SqliteCredentialStore;
use api_lib::config::Config;
use api_lib::services::{DocumentService, RagService, RetrievalPolicy};
use api_lib::text_split::TextSplitter;
use api_lib::web::{api_router, AppState};
use docchat_core::domain::{AuthToken, ChunkHit, IndexedChunk, Metadata};
use docchat_core::ports::{
    AnswerGeneration, CredentialStore, EmbeddingService, PortResult, VectorIndex,
};

//=========================================================================================
// Fake Adapters
//=========================================================================================

struct FakeIndex {
    chunks: Mutex<Vec<IndexedChunk>>,
}

#[async_trait]
impl VectorIndex for FakeIndex {
    async fn add_chunks(
        &self,
        chunks: Vec<IndexedChunk>,
        _embeddings: Vec<Vec<f32>>,
    ) -> PortResult<()> {
        self.chunks.lock().unwrap().extend(chunks);
        Ok(())
    }

    async fn list_chunk_metadata(&self) -> PortResult<Vec<Metadata>> {
        Ok(self
            .chunks
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.metadata.clone())
            .collect())
    }

    async fn search(&self, _query: &[f32], limit: usize) -> PortResult<Vec<ChunkHit>> {
        Ok(self
            .chunks
            .lock()
            .unwrap()
            .iter()
            .take(limit)
            .map(|c| ChunkHit {
                text: c.text.clone(),
                score: 1.0,
            })
            .collect())
    }

    async fn clear(&self) -> PortResult<()> {
        self.chunks.lock().unwrap().clear();
        Ok(())
    }
}

struct FakeEmbeddings;

#[async_trait]
impl EmbeddingService for FakeEmbeddings {
    async fn embed(&self, inputs: &[String]) -> PortResult<Vec<Vec<f32>>> {
        Ok(vec![vec![0.0, 1.0]; inputs.len()])
    }
}

struct FakeGenerator {
    calls: AtomicUsize,
    last_context: Mutex<String>,
}

#[async_trait]
impl AnswerGeneration for FakeGenerator {
    async fn generate(&self, question: &str, context: &str) -> PortResult<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last_context.lock().unwrap() = context.to_string();
        Ok(format!("answer to: {question}"))
    }
}

//=========================================================================================
// Test Harness
//=========================================================================================

struct TestApp {
    app: Router,
    credentials: Arc<SqliteCredentialStore>,
    generator: Arc<FakeGenerator>,
}

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "sqlite::memory:".to_string(),
        log_level: tracing::Level::INFO,
        openai_api_key: None,
        openai_api_base: "http://localhost:9".to_string(),
        chat_model: "test-chat".to_string(),
        embedding_model: "test-embed".to_string(),
        chroma_url: "http://localhost:9".to_string(),
        chroma_collection: "test".to_string(),
        chunk_size: 1000,
        chunk_overlap: 200,
        top_k: 3,
        min_score: None,
        max_context_chars: 4000,
        token_ttl_hours: 24,
        request_timeout: Duration::from_secs(5),
        allowed_origins: vec!["http://localhost:3000".to_string()],
        seed_test_user: false,
    }
}

async fn spawn_app() -> TestApp {
    // A single connection keeps every query on the same in-memory database.
    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    let credentials = Arc::new(SqliteCredentialStore::new(pool));
    credentials.init_schema().await.unwrap();

    let index = Arc::new(FakeIndex {
        chunks: Mutex::new(Vec::new()),
    });
    let embeddings = Arc::new(FakeEmbeddings);
    let generator = Arc::new(FakeGenerator {
        calls: AtomicUsize::new(0),
        last_context: Mutex::new(String::new()),
    });

    let config = Arc::new(test_config());
    let documents = Arc::new(DocumentService::new(
        index.clone(),
        embeddings.clone(),
        TextSplitter::new(config.chunk_size, config.chunk_overlap),
    ));
    let rag = Arc::new(RagService::new(
        index,
        embeddings,
        generator.clone(),
        RetrievalPolicy::default(),
    ));

    let state = Arc::new(AppState {
        credentials: credentials.clone(),
        documents,
        rag,
        config,
    });

    TestApp {
        app: api_router(state),
        credentials,
        generator,
    }
}

async fn request(
    app: &Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

async fn upload_file(
    app: &Router,
    token: &str,
    filename: &str,
    contents: &[u8],
) -> (StatusCode, Value) {
    let boundary = "test-boundary";
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; \
             filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(contents);
    body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/documents/file")
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={boundary}"),
        )
        .body(Body::from(body))
        .unwrap();

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

async fn register(app: &Router, username: &str, password: &str) -> Value {
    let (status, body) = request(
        app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    body
}

async fn login(app: &Router, username: &str, password: &str) -> String {
    let (status, body) = request(
        app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "username": username, "password": password })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    body["access_token"].as_str().unwrap().to_string()
}

//=========================================================================================
// Auth Properties
//=========================================================================================

#[tokio::test]
async fn register_then_login_succeeds_once_per_username() {
    let harness = spawn_app().await;

    let first = register(&harness.app, "alice", "pw123").await;
    assert_eq!(first["success"], json!(true));
    assert!(first["user_id"].is_string());

    let second = register(&harness.app, "alice", "other").await;
    assert_eq!(second["success"], json!(false));

    let token = login(&harness.app, "alice", "pw123").await;
    assert!(!token.is_empty());
}

#[tokio::test]
async fn login_rejects_bad_credentials_without_leaking_which_part_failed() {
    let harness = spawn_app().await;
    register(&harness.app, "alice", "pw123").await;

    let (status, wrong_password) = request(
        &harness.app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "username": "alice", "password": "nope" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(wrong_password["success"], json!(false));

    let (_, unknown_user) = request(
        &harness.app,
        Method::POST,
        "/api/v1/auth/login",
        None,
        Some(json!({ "username": "nobody", "password": "nope" })),
    )
    .await;
    assert_eq!(unknown_user["message"], wrong_password["message"]);
}

#[tokio::test]
async fn blank_credentials_are_a_validation_error() {
    let harness = spawn_app().await;
    let (status, body) = request(
        &harness.app,
        Method::POST,
        "/api/v1/auth/register",
        None,
        Some(json!({ "username": "  ", "password": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn token_validates_until_logout() {
    let harness = spawn_app().await;
    register(&harness.app, "alice", "pw123").await;
    let token = login(&harness.app, "alice", "pw123").await;

    let (status, _) = request(
        &harness.app,
        Method::GET,
        "/api/v1/documents",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = request(
        &harness.app,
        Method::POST,
        "/api/v1/auth/logout",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));

    let (status, _) = request(
        &harness.app,
        Method::GET,
        "/api/v1/documents",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    // Revoking an already-dead token still reports success.
    let (status, body) = request(
        &harness.app,
        Method::POST,
        "/api/v1/auth/logout",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn expired_tokens_are_rejected() {
    let harness = spawn_app().await;
    register(&harness.app, "alice", "pw123").await;
    let token = login(&harness.app, "alice", "pw123").await;

    // Age the token past its expiry directly in the store.
    let record = harness.credentials.lookup_token(&token).await.unwrap();
    harness.credentials.revoke_token(&token).await.unwrap();
    harness
        .credentials
        .insert_token(&AuthToken {
            expires_at: Utc::now() - chrono::Duration::minutes(1),
            ..record
        })
        .await
        .unwrap();

    let (status, body) = request(
        &harness.app,
        Method::GET,
        "/api/v1/documents",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["detail"], json!("Token expired"));
}

#[tokio::test]
async fn document_routes_require_a_token() {
    let harness = spawn_app().await;
    for (method, uri) in [
        (Method::GET, "/api/v1/documents"),
        (Method::POST, "/api/v1/documents"),
        (Method::DELETE, "/api/v1/documents"),
    ] {
        let (status, body) = request(&harness.app, method, uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "no token for {uri}");
        assert_eq!(body["detail"], json!("Missing bearer token"));
    }

    let (status, _) = request(
        &harness.app,
        Method::GET,
        "/api/v1/documents",
        Some("not-a-real-token"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

//=========================================================================================
// Document Properties
//=========================================================================================

#[tokio::test]
async fn upload_list_get_clear_round_trip() {
    let harness = spawn_app().await;
    register(&harness.app, "alice", "pw123").await;
    let token = login(&harness.app, "alice", "pw123").await;

    let (status, upload) = request(
        &harness.app,
        Method::POST,
        "/api/v1/documents",
        Some(&token),
        Some(json!({ "content": "hello world" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(upload["success"], json!(true));
    assert_eq!(upload["documents_count"], json!(1));

    let (_, listing) = request(
        &harness.app,
        Method::GET,
        "/api/v1/documents",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(listing["total_count"], json!(1));
    assert_eq!(listing["documents"][0]["content"], json!("hello world"));

    let id = listing["documents"][0]["id"].as_str().unwrap().to_string();
    let (status, detail) = request(
        &harness.app,
        Method::GET,
        &format!("/api/v1/documents/{id}"),
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["content"], json!("hello world"));
    assert_eq!(detail["id"], json!(id));

    let (status, cleared) = request(
        &harness.app,
        Method::DELETE,
        "/api/v1/documents",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["success"], json!(true));

    let (_, listing) = request(
        &harness.app,
        Method::GET,
        "/api/v1/documents",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(listing["total_count"], json!(0));
    assert_eq!(listing["documents"], json!([]));
}

#[tokio::test]
async fn blank_document_content_is_rejected() {
    let harness = spawn_app().await;
    register(&harness.app, "alice", "pw123").await;
    let token = login(&harness.app, "alice", "pw123").await;

    let (status, _) = request(
        &harness.app,
        Method::POST,
        "/api/v1/documents",
        Some(&token),
        Some(json!({ "content": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn unknown_document_id_is_a_404() {
    let harness = spawn_app().await;
    register(&harness.app, "alice", "pw123").await;
    let token = login(&harness.app, "alice", "pw123").await;

    let (status, body) = request(
        &harness.app,
        Method::GET,
        "/api/v1/documents/00000000-0000-0000-0000-000000000000",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn markdown_upload_is_indexed_and_exe_is_rejected() {
    let harness = spawn_app().await;
    register(&harness.app, "alice", "pw123").await;
    let token = login(&harness.app, "alice", "pw123").await;

    let (status, upload) =
        upload_file(&harness.app, &token, "notes.md", b"# Notes\n\nBody text.").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(upload["success"], json!(true));

    let (status, rejection) = upload_file(&harness.app, &token, "evil.exe", b"MZ").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(rejection["detail"]
        .as_str()
        .unwrap()
        .contains("Unsupported file type"));

    // The failed upload left the document set unchanged.
    let (_, listing) = request(
        &harness.app,
        Method::GET,
        "/api/v1/documents",
        Some(&token),
        None,
    )
    .await;
    assert_eq!(listing["total_count"], json!(1));
}

//=========================================================================================
// Chat Properties
//=========================================================================================

#[tokio::test]
async fn chat_is_open_and_uses_indexed_context() {
    let harness = spawn_app().await;
    register(&harness.app, "alice", "pw123").await;
    let token = login(&harness.app, "alice", "pw123").await;

    request(
        &harness.app,
        Method::POST,
        "/api/v1/documents",
        Some(&token),
        Some(json!({ "content": "hello world" })),
    )
    .await;

    // No bearer token on the chat call.
    let (status, body) = request(
        &harness.app,
        Method::POST,
        "/api/v1/chat",
        None,
        Some(json!({ "question": "what does the document say?" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["answer"], json!("answer to: what does the document say?"));
    assert!(harness
        .generator
        .last_context
        .lock()
        .unwrap()
        .contains("hello world"));
}

#[tokio::test]
async fn blank_chat_question_never_reaches_the_generator() {
    let harness = spawn_app().await;

    let (status, body) = request(
        &harness.app,
        Method::POST,
        "/api/v1/chat",
        None,
        Some(json!({ "question": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], json!("Question must not be empty"));
    assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn malformed_json_is_rejected_before_any_component() {
    let harness = spawn_app().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = harness.app.clone().oneshot(request).await.unwrap();
    assert!(response.status().is_client_error());
    assert_eq!(harness.generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn health_endpoint_reports_ok() {
    let harness = spawn_app().await;
    let (status, body) = request(&harness.app, Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("ok"));
}
