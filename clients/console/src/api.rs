//! clients/console/src/api.rs
//!
//! Typed, blocking client for the docchat HTTP API. Non-2xx responses carry a
//! `{"detail": ...}` body whose message is surfaced verbatim; an empty
//! response body is treated as a null payload.

use reqwest::blocking::{multipart, Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// A non-2xx response; `detail` comes from the server verbatim.
    #[error("{detail}")]
    Api { status: u16, detail: String },
    #[error("Request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Malformed response: {0}")]
    Decode(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ClientError {
    /// An invalid or expired token; the caller should drop its session.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ClientError::Api { status: 401, .. })
    }
}

//=========================================================================================
// Response Types (only the fields the client consumes)
//=========================================================================================

#[derive(Debug, Deserialize)]
pub struct RegisterResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub access_token: Option<String>,
    pub user_id: Option<String>,
    pub username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct DocumentEntry {
    pub id: String,
    pub content: String,
    pub metadata: Option<Value>,
    pub created_at: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DocumentListResponse {
    pub documents: Vec<DocumentEntry>,
    pub total_count: u64,
}

#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

//=========================================================================================
// The Client
//=========================================================================================

pub struct ApiClient {
    http: Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(Duration::from_secs(60)).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    pub fn register(&self, username: &str, password: &str) -> Result<RegisterResponse, ClientError> {
        let resp = self
            .http
            .post(self.url("/auth/register"))
            .json(&json!({ "username": username, "password": password }))
            .send()?;
        required(json_body(resp)?)
    }

    pub fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ClientError> {
        let resp = self
            .http
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()?;
        required(json_body(resp)?)
    }

    pub fn logout(&self, token: &str) -> Result<StatusResponse, ClientError> {
        let resp = self
            .http
            .post(self.url("/auth/logout"))
            .bearer_auth(token)
            .json(&json!({}))
            .send()?;
        required(json_body(resp)?)
    }

    pub fn chat(&self, question: &str) -> Result<ChatResponse, ClientError> {
        let resp = self
            .http
            .post(self.url("/chat"))
            .json(&json!({ "question": question }))
            .send()?;
        required(json_body(resp)?)
    }

    pub fn add_document(
        &self,
        token: &str,
        content: &str,
        metadata: Option<Value>,
    ) -> Result<UploadResponse, ClientError> {
        let resp = self
            .http
            .post(self.url("/documents"))
            .bearer_auth(token)
            .json(&json!({ "content": content, "metadata": metadata }))
            .send()?;
        required(json_body(resp)?)
    }

    pub fn upload_file(&self, token: &str, path: &Path) -> Result<UploadResponse, ClientError> {
        let form = multipart::Form::new().file("file", path)?;
        let resp = self
            .http
            .post(self.url("/documents/file"))
            .bearer_auth(token)
            .multipart(form)
            .send()?;
        required(json_body(resp)?)
    }

    pub fn list_documents(&self, token: &str) -> Result<DocumentListResponse, ClientError> {
        let resp = self
            .http
            .get(self.url("/documents"))
            .bearer_auth(token)
            .send()?;
        required(json_body(resp)?)
    }

    pub fn get_document(&self, token: &str, id: &str) -> Result<DocumentEntry, ClientError> {
        let resp = self
            .http
            .get(self.url(&format!("/documents/{id}")))
            .bearer_auth(token)
            .send()?;
        required(json_body(resp)?)
    }

    pub fn clear_documents(&self, token: &str) -> Result<StatusResponse, ClientError> {
        let resp = self
            .http
            .delete(self.url("/documents"))
            .bearer_auth(token)
            .send()?;
        required(json_body(resp)?)
    }
}

/// Decodes a response. Non-2xx statuses become `ClientError::Api` with the
/// server's `detail`; an empty 2xx body becomes `None`.
fn json_body<T: DeserializeOwned>(resp: Response) -> Result<Option<T>, ClientError> {
    let status = resp.status();
    let text = resp.text()?;

    if !status.is_success() {
        let detail = serde_json::from_str::<ErrorBody>(&text)
            .map(|body| body.detail)
            .unwrap_or_else(|_| {
                if text.trim().is_empty() {
                    status.to_string()
                } else {
                    text.clone()
                }
            });
        return Err(ClientError::Api {
            status: status.as_u16(),
            detail,
        });
    }

    if text.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| ClientError::Decode(e.to_string()))
}

fn required<T>(payload: Option<T>) -> Result<T, ClientError> {
    payload.ok_or_else(|| ClientError::Decode("Expected a response body".to_string()))
}
