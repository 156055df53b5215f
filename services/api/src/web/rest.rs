//! services/api/src/web/rest.rs
//!
//! Contains the Axum handlers for the chat and document endpoints and the
//! master definition for the OpenAPI specification.

use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use crate::error::ApiError;
use crate::web::auth::{
    LoginRequest, LoginResponse, LogoutResponse, RegisterRequest, RegisterResponse,
};
use crate::web::state::AppState;
use docchat_core::domain::{DocumentInfo, DocumentInput, Metadata};

//=========================================================================================
// OpenAPI Master Definition
//=========================================================================================

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::web::auth::register_handler,
        crate::web::auth::login_handler,
        crate::web::auth::logout_handler,
        chat_handler,
        upload_document_handler,
        upload_file_handler,
        list_documents_handler,
        get_document_handler,
        clear_documents_handler,
    ),
    components(schemas(
        RegisterRequest,
        RegisterResponse,
        LoginRequest,
        LoginResponse,
        LogoutResponse,
        ChatRequest,
        ChatResponse,
        DocumentUploadRequest,
        DocumentUploadResponse,
        DocumentResponse,
        DocumentListResponse,
        ClearDocumentsResponse,
    )),
    tags(
        (name = "Auth", description = "Registration, login, and token revocation."),
        (name = "Chat", description = "Retrieval-augmented question answering."),
        (name = "Documents", description = "Document upload, listing, and removal.")
    )
)]
pub struct ApiDoc;

//=========================================================================================
// API Request and Response Structs
//=========================================================================================

#[derive(Deserialize, ToSchema)]
pub struct ChatRequest {
    pub question: String,
}

#[derive(Serialize, ToSchema)]
pub struct ChatResponse {
    pub answer: String,
}

#[derive(Deserialize, ToSchema)]
pub struct DocumentUploadRequest {
    pub content: String,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Metadata>,
}

#[derive(Serialize, ToSchema)]
pub struct DocumentUploadResponse {
    pub success: bool,
    pub message: String,
    pub documents_count: Option<usize>,
}

#[derive(Serialize, ToSchema)]
pub struct DocumentResponse {
    pub id: Uuid,
    pub content: String,
    #[schema(value_type = Option<Object>)]
    pub metadata: Option<Metadata>,
    pub created_at: Option<DateTime<Utc>>,
}

impl From<DocumentInfo> for DocumentResponse {
    fn from(doc: DocumentInfo) -> Self {
        Self {
            id: doc.id,
            content: doc.content,
            metadata: doc.metadata,
            created_at: doc.created_at,
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct DocumentListResponse {
    pub success: bool,
    pub message: String,
    pub documents: Vec<DocumentResponse>,
    pub total_count: usize,
}

#[derive(Serialize, ToSchema)]
pub struct ClearDocumentsResponse {
    pub success: bool,
    pub message: String,
}

//=========================================================================================
// REST API Handlers
//=========================================================================================

/// GET /health - liveness probe
pub async fn health_handler() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// POST /chat - Answer a question against the indexed documents
#[utoipa::path(
    post,
    path = "/api/v1/chat",
    request_body = ChatRequest,
    responses(
        (status = 200, description = "Generated answer", body = ChatResponse),
        (status = 400, description = "Blank question"),
        (status = 502, description = "Generation provider failed"),
        (status = 504, description = "Generation provider timed out")
    ),
    tag = "Chat"
)]
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    // Rejected here so a blank question never reaches the answer generator.
    if req.question.trim().is_empty() {
        return Err(ApiError::Validation("Question must not be empty".to_string()));
    }

    let answer = state.rag.generate_answer(&req.question).await?;
    Ok(Json(ChatResponse { answer }))
}

/// POST /documents - Index a text document
#[utoipa::path(
    post,
    path = "/api/v1/documents",
    request_body = DocumentUploadRequest,
    responses(
        (status = 200, description = "Document indexed", body = DocumentUploadResponse),
        (status = 400, description = "Blank content"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 502, description = "Vector store failed")
    ),
    tag = "Documents"
)]
pub async fn upload_document_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<DocumentUploadRequest>,
) -> Result<Json<DocumentUploadResponse>, ApiError> {
    let count = state
        .documents
        .add_document(DocumentInput {
            content: req.content,
            metadata: req.metadata,
        })
        .await?;

    Ok(Json(DocumentUploadResponse {
        success: true,
        message: format!("Successfully uploaded 1 document(s) with {count} chunk(s)"),
        documents_count: Some(count),
    }))
}

/// POST /documents/file - Index an uploaded markdown or PDF file
#[utoipa::path(
    post,
    path = "/api/v1/documents/file",
    request_body(content_type = "multipart/form-data", description = "The document file to upload."),
    responses(
        (status = 200, description = "File indexed", body = DocumentUploadResponse),
        (status = 400, description = "Unsupported file type or unreadable file"),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 502, description = "Vector store failed")
    ),
    tag = "Documents"
)]
pub async fn upload_file_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<DocumentUploadResponse>, ApiError> {
    let field = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("Failed to read multipart data: {e}")))?
        .ok_or_else(|| ApiError::Validation("Multipart form must include a file".to_string()))?;

    let file_name = field
        .file_name()
        .map(|name| name.to_string())
        .ok_or_else(|| ApiError::Validation("Multipart part carries no filename".to_string()))?;
    let data = field
        .bytes()
        .await
        .map_err(|e| ApiError::Validation(format!("Failed to read file bytes: {e}")))?;

    let count = state.documents.add_file(&file_name, &data).await?;

    Ok(Json(DocumentUploadResponse {
        success: true,
        message: format!("Successfully uploaded '{file_name}' with {count} chunk(s)"),
        documents_count: Some(count),
    }))
}

/// GET /documents - List all indexed documents
#[utoipa::path(
    get,
    path = "/api/v1/documents",
    responses(
        (status = 200, description = "Document listing", body = DocumentListResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 502, description = "Vector store failed")
    ),
    tag = "Documents"
)]
pub async fn list_documents_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DocumentListResponse>, ApiError> {
    let documents: Vec<DocumentResponse> = state
        .documents
        .list_documents()
        .await?
        .into_iter()
        .map(DocumentResponse::from)
        .collect();
    let total_count = documents.len();

    Ok(Json(DocumentListResponse {
        success: true,
        message: format!("Retrieved {total_count} document(s)"),
        documents,
        total_count,
    }))
}

/// GET /documents/{document_id} - Fetch one document with its full content
#[utoipa::path(
    get,
    path = "/api/v1/documents/{document_id}",
    params(
        ("document_id" = Uuid, Path, description = "The unique ID of the document.")
    ),
    responses(
        (status = 200, description = "Document detail", body = DocumentResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 404, description = "Unknown document id")
    ),
    tag = "Documents"
)]
pub async fn get_document_handler(
    State(state): State<Arc<AppState>>,
    Path(document_id): Path<Uuid>,
) -> Result<Json<DocumentResponse>, ApiError> {
    let doc = state.documents.get_document(document_id).await?;
    Ok(Json(doc.into()))
}

/// DELETE /documents - Remove every indexed document
#[utoipa::path(
    delete,
    path = "/api/v1/documents",
    responses(
        (status = 200, description = "All documents removed", body = ClearDocumentsResponse),
        (status = 401, description = "Missing or invalid bearer token"),
        (status = 502, description = "Vector store failed")
    ),
    tag = "Documents"
)]
pub async fn clear_documents_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ClearDocumentsResponse>, ApiError> {
    state.documents.clear_all().await?;
    Ok(Json(ClearDocumentsResponse {
        success: true,
        message: "Successfully cleared all documents from the vector store".to_string(),
    }))
}
