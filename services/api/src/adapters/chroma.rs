//! services/api/src/adapters/chroma.rs
//!
//! This module contains the adapter for the external Chroma vector store.
//! It implements the `VectorIndex` port from the `core` crate by speaking
//! Chroma's HTTP API; all retrieval-quality concerns stay on the Chroma side.

use reqwest::StatusCode;
use serde_json::{json, Value};
use tokio::sync::RwLock;

use async_trait::async_trait;
use docchat_core::domain::{ChunkHit, IndexedChunk, Metadata};
use docchat_core::ports::{PortError, PortResult, VectorIndex};

//=========================================================================================
// The Main Adapter Struct
//=========================================================================================

/// An adapter that implements `VectorIndex` against a Chroma server.
///
/// The collection id is refreshed when the collection is dropped and recreated
/// on `clear`, so it sits behind an `RwLock`.
pub struct ChromaIndexAdapter {
    http: reqwest::Client,
    base_url: String,
    collection_name: String,
    collection_id: RwLock<String>,
}

impl ChromaIndexAdapter {
    /// Connects to the server and ensures the collection exists.
    pub async fn connect(
        http: reqwest::Client,
        base_url: &str,
        collection_name: &str,
    ) -> PortResult<Self> {
        let adapter = Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            collection_name: collection_name.to_string(),
            collection_id: RwLock::new(String::new()),
        };
        let id = adapter.get_or_create_collection().await?;
        *adapter.collection_id.write().await = id;
        Ok(adapter)
    }

    async fn get_or_create_collection(&self) -> PortResult<String> {
        let url = format!("{}/api/v1/collections", self.base_url);
        let body = json!({
            "name": self.collection_name,
            "get_or_create": true,
            "metadata": { "hnsw:space": "cosine" },
        });
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_err)?;
        let payload = check_json(resp).await?;
        payload["id"]
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| {
                PortError::Dependency("Chroma collection response carried no id".to_string())
            })
    }

    async fn collection_url(&self, suffix: &str) -> String {
        let id = self.collection_id.read().await;
        format!("{}/api/v1/collections/{}/{}", self.base_url, *id, suffix)
    }
}

fn map_transport_err(e: reqwest::Error) -> PortError {
    if e.is_timeout() {
        PortError::Timeout(format!("Vector store request timed out: {e}"))
    } else {
        PortError::Dependency(format!("Vector store request failed: {e}"))
    }
}

/// Rejects non-2xx responses and decodes the body.
async fn check_json(resp: reqwest::Response) -> PortResult<Value> {
    let status = resp.status();
    if !status.is_success() {
        let body = resp.text().await.unwrap_or_default();
        return Err(PortError::Dependency(format!(
            "Vector store returned {status}: {body}"
        )));
    }
    resp.json()
        .await
        .map_err(|e| PortError::Dependency(format!("Vector store returned malformed JSON: {e}")))
}

//=========================================================================================
// `VectorIndex` Trait Implementation
//=========================================================================================

#[async_trait]
impl VectorIndex for ChromaIndexAdapter {
    async fn add_chunks(
        &self,
        chunks: Vec<IndexedChunk>,
        embeddings: Vec<Vec<f32>>,
    ) -> PortResult<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        if chunks.len() != embeddings.len() {
            return Err(PortError::Unexpected(format!(
                "{} chunks but {} embeddings",
                chunks.len(),
                embeddings.len()
            )));
        }

        let ids: Vec<String> = chunks.iter().map(|c| c.chunk_id.to_string()).collect();
        let documents: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        let metadatas: Vec<&Metadata> = chunks.iter().map(|c| &c.metadata).collect();

        let url = self.collection_url("add").await;
        let body = json!({
            "ids": ids,
            "embeddings": embeddings,
            "documents": documents,
            "metadatas": metadatas,
        });
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_err)?;
        check_json(resp).await?;
        Ok(())
    }

    async fn list_chunk_metadata(&self) -> PortResult<Vec<Metadata>> {
        let url = self.collection_url("get").await;
        let body = json!({ "include": ["metadatas"] });
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_err)?;
        let payload = check_json(resp).await?;

        let raw = payload["metadatas"].as_array().cloned().unwrap_or_default();
        raw.into_iter()
            .map(|value| match value {
                Value::Object(map) => Ok(map),
                Value::Null => Ok(Metadata::new()),
                other => Err(PortError::Dependency(format!(
                    "Vector store returned non-object chunk metadata: {other}"
                ))),
            })
            .collect()
    }

    async fn search(&self, query_embedding: &[f32], limit: usize) -> PortResult<Vec<ChunkHit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let url = self.collection_url("query").await;
        let body = json!({
            "query_embeddings": [query_embedding],
            "n_results": limit,
            "include": ["documents", "distances"],
        });
        let resp = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(map_transport_err)?;
        let payload = check_json(resp).await?;

        let documents = payload["documents"][0].as_array().cloned().unwrap_or_default();
        let distances = payload["distances"][0].as_array().cloned().unwrap_or_default();

        let hits = documents
            .iter()
            .zip(distances.iter())
            .filter_map(|(doc, dist)| {
                let text = doc.as_str()?.to_string();
                // The collection uses cosine distance; flip it into a similarity.
                let score = 1.0 - dist.as_f64().unwrap_or(1.0) as f32;
                Some(ChunkHit { text, score })
            })
            .collect();
        Ok(hits)
    }

    async fn clear(&self) -> PortResult<()> {
        // Hold the write lock across drop + recreate so no caller observes a
        // partially-cleared collection.
        let mut id_guard = self.collection_id.write().await;

        let url = format!(
            "{}/api/v1/collections/{}",
            self.base_url, self.collection_name
        );
        let resp = self
            .http
            .delete(&url)
            .send()
            .await
            .map_err(map_transport_err)?;
        let status = resp.status();
        if !status.is_success() && status != StatusCode::NOT_FOUND {
            let body = resp.text().await.unwrap_or_default();
            return Err(PortError::Dependency(format!(
                "Vector store refused to drop collection: {status}: {body}"
            )));
        }

        *id_guard = self.get_or_create_collection().await?;
        Ok(())
    }
}
