//! services/api/src/adapters/embeddings.rs
//!
//! Embedding adapter speaking the OpenAI-compatible `/embeddings` endpoint.
//! Kept on a plain HTTP client so it also works against local
//! OpenAI-compatible servers.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use docchat_core::ports::{EmbeddingService, PortError, PortResult};

#[derive(Clone)]
pub struct OpenAiEmbeddingAdapter {
    http: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiEmbeddingAdapter {
    /// Creates a new `OpenAiEmbeddingAdapter`. `base_url` includes the `/v1` prefix.
    pub fn new(
        http: reqwest::Client,
        base_url: &str,
        api_key: Option<String>,
        model: String,
    ) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model,
        }
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingItem>,
}

#[derive(Deserialize)]
struct EmbeddingItem {
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingService for OpenAiEmbeddingAdapter {
    async fn embed(&self, inputs: &[String]) -> PortResult<Vec<Vec<f32>>> {
        if inputs.is_empty() {
            return Ok(Vec::new());
        }

        let url = format!("{}/embeddings", self.base_url);
        let mut request = self.http.post(&url).json(&EmbeddingRequest {
            model: &self.model,
            input: inputs,
        });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                PortError::Timeout(format!("Embedding request timed out: {e}"))
            } else {
                PortError::Dependency(format!("Embedding request failed: {e}"))
            }
        })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(PortError::Dependency(format!(
                "Embedding provider returned {status}: {body}"
            )));
        }

        let payload: EmbeddingResponse = resp.json().await.map_err(|e| {
            PortError::Dependency(format!("Embedding provider returned malformed JSON: {e}"))
        })?;

        if payload.data.len() != inputs.len() {
            return Err(PortError::Unexpected(format!(
                "Requested {} embeddings but received {}",
                inputs.len(),
                payload.data.len()
            )));
        }

        Ok(payload.data.into_iter().map(|d| d.embedding).collect())
    }
}
