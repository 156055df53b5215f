//! services/api/src/services/documents.rs
//!
//! Document ingestion and management on top of the `VectorIndex` and
//! `EmbeddingService` ports. Documents are split into chunks before indexing;
//! the listing and detail operations reassemble documents from chunk metadata.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::text_split::TextSplitter;
use docchat_core::domain::{DocumentInfo, DocumentInput, IndexedChunk, Metadata};
use docchat_core::ports::{EmbeddingService, PortError, PortResult, VectorIndex};

/// Reserved chunk-metadata keys. Everything else is user metadata.
pub const META_DOCUMENT_ID: &str = "document_id";
pub const META_CREATED_AT: &str = "created_at";
pub const META_FULL_CONTENT: &str = "full_content";

/// Listing previews are cut to this many characters.
const PREVIEW_CHARS: usize = 100;

pub struct DocumentService {
    index: Arc<dyn VectorIndex>,
    embeddings: Arc<dyn EmbeddingService>,
    splitter: TextSplitter,
}

impl DocumentService {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embeddings: Arc<dyn EmbeddingService>,
        splitter: TextSplitter,
    ) -> Self {
        Self {
            index,
            embeddings,
            splitter,
        }
    }

    /// Splits, embeds, and indexes one document.
    /// Returns the number of chunks written.
    pub async fn add_document(&self, input: DocumentInput) -> PortResult<usize> {
        let content = input.content.trim();
        if content.is_empty() {
            return Err(PortError::InvalidInput(
                "Document content must not be empty".to_string(),
            ));
        }

        let chunk_texts = self.splitter.split(content);
        let document_id = Uuid::new_v4();
        let created_at = Utc::now();

        let mut chunks = Vec::with_capacity(chunk_texts.len());
        for (position, text) in chunk_texts.iter().enumerate() {
            let mut metadata = input.metadata.clone().unwrap_or_default();
            metadata.insert(
                META_DOCUMENT_ID.to_string(),
                Value::String(document_id.to_string()),
            );
            metadata.insert(
                META_CREATED_AT.to_string(),
                Value::String(created_at.to_rfc3339()),
            );
            // Only the first chunk carries the full document body.
            if position == 0 {
                metadata.insert(
                    META_FULL_CONTENT.to_string(),
                    Value::String(content.to_string()),
                );
            }
            chunks.push(IndexedChunk {
                chunk_id: Uuid::new_v4(),
                text: text.clone(),
                metadata,
            });
        }

        let embeddings = self.embeddings.embed(&chunk_texts).await?;
        let written = chunks.len();
        self.index.add_chunks(chunks, embeddings).await?;
        Ok(written)
    }

    /// Gates on file type, extracts text, and delegates to `add_document`.
    /// Only markdown and PDF files are accepted.
    pub async fn add_file(&self, filename: &str, bytes: &[u8]) -> PortResult<usize> {
        let extension = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        let content = match extension.as_str() {
            "md" | "markdown" => String::from_utf8(bytes.to_vec()).map_err(|e| {
                PortError::InvalidInput(format!("Markdown file is not valid UTF-8: {e}"))
            })?,
            "pdf" => pdf_extract::extract_text_from_mem(bytes).map_err(|e| {
                PortError::InvalidInput(format!("Failed to extract text from PDF: {e}"))
            })?,
            "" => {
                return Err(PortError::InvalidInput(
                    "File has no extension: only .md and .pdf files are accepted".to_string(),
                ))
            }
            other => {
                return Err(PortError::InvalidInput(format!(
                    "Unsupported file type '.{other}': only .md and .pdf files are accepted"
                )))
            }
        };

        if content.trim().is_empty() {
            return Err(PortError::InvalidInput(format!(
                "File '{filename}' contains no extractable text"
            )));
        }

        let mut metadata = Metadata::new();
        metadata.insert("source".to_string(), Value::String(filename.to_string()));
        self.add_document(DocumentInput {
            content,
            metadata: Some(metadata),
        })
        .await
    }

    /// All documents, one entry per document id, in creation order.
    /// Listing entries carry a content preview, not the full body.
    pub async fn list_documents(&self) -> PortResult<Vec<DocumentInfo>> {
        let metadatas = self.index.list_chunk_metadata().await?;

        let mut seen: HashSet<Uuid> = HashSet::new();
        let mut documents = Vec::new();
        for metadata in &metadatas {
            let Some(id) = document_id_of(metadata) else {
                continue;
            };
            if !seen.insert(id) {
                continue;
            }
            let content = match metadata.get(META_FULL_CONTENT).and_then(Value::as_str) {
                Some(text) if !text.is_empty() => preview(text),
                _ => "Document content not available".to_string(),
            };
            documents.push(DocumentInfo {
                id,
                content,
                metadata: Some(strip_reserved(metadata)),
                created_at: parse_created_at(metadata),
            });
        }
        documents.sort_by_key(|d| d.created_at);
        Ok(documents)
    }

    /// Full, untruncated document by id.
    pub async fn get_document(&self, document_id: Uuid) -> PortResult<DocumentInfo> {
        let metadatas = self.index.list_chunk_metadata().await?;

        let mut first_match: Option<&Metadata> = None;
        let mut full_content: Option<String> = None;
        for metadata in &metadatas {
            if document_id_of(metadata) != Some(document_id) {
                continue;
            }
            if first_match.is_none() {
                first_match = Some(metadata);
            }
            if full_content.is_none() {
                full_content = metadata
                    .get(META_FULL_CONTENT)
                    .and_then(Value::as_str)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string);
            }
        }

        let Some(metadata) = first_match else {
            return Err(PortError::NotFound(format!(
                "Document {document_id} not found"
            )));
        };
        Ok(DocumentInfo {
            id: document_id,
            content: full_content.unwrap_or_else(|| "Document content not available".to_string()),
            metadata: Some(strip_reserved(metadata)),
            created_at: parse_created_at(metadata),
        })
    }

    /// Removes every document from the index.
    pub async fn clear_all(&self) -> PortResult<()> {
        self.index.clear().await
    }
}

fn document_id_of(metadata: &Metadata) -> Option<Uuid> {
    metadata
        .get(META_DOCUMENT_ID)
        .and_then(Value::as_str)
        .and_then(|raw| Uuid::parse_str(raw).ok())
}

fn parse_created_at(metadata: &Metadata) -> Option<DateTime<Utc>> {
    metadata
        .get(META_CREATED_AT)
        .and_then(Value::as_str)
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc))
}

fn preview(text: &str) -> String {
    if text.chars().count() > PREVIEW_CHARS {
        let cut: String = text.chars().take(PREVIEW_CHARS).collect();
        format!("{cut}...")
    } else {
        text.to_string()
    }
}

fn strip_reserved(metadata: &Metadata) -> Metadata {
    metadata
        .iter()
        .filter(|(key, _)| {
            !matches!(
                key.as_str(),
                META_DOCUMENT_ID | META_CREATED_AT | META_FULL_CONTENT
            )
        })
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docchat_core::domain::ChunkHit;
    use std::sync::Mutex;

    struct FakeIndex {
        chunks: Mutex<Vec<IndexedChunk>>,
    }

    impl FakeIndex {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                chunks: Mutex::new(Vec::new()),
            })
        }
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

    fn service(index: Arc<FakeIndex>) -> DocumentService {
        DocumentService::new(index, Arc::new(FakeEmbeddings), TextSplitter::new(1000, 200))
    }

    fn text_input(content: &str) -> DocumentInput {
        DocumentInput {
            content: content.to_string(),
            metadata: None,
        }
    }

    #[tokio::test]
    async fn blank_content_is_rejected() {
        let svc = service(FakeIndex::new());
        let err = svc.add_document(text_input("   ")).await.unwrap_err();
        assert!(matches!(err, PortError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn add_then_list_round_trips_short_content() {
        let index = FakeIndex::new();
        let svc = service(index);
        let mut metadata = Metadata::new();
        metadata.insert("topic".to_string(), Value::String("greeting".to_string()));
        let written = svc
            .add_document(DocumentInput {
                content: "hello world".to_string(),
                metadata: Some(metadata),
            })
            .await
            .unwrap();
        assert_eq!(written, 1);

        let docs = svc.list_documents().await.unwrap();
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].content, "hello world");
        assert!(docs[0].created_at.is_some());
        let listed = docs[0].metadata.as_ref().unwrap();
        assert_eq!(listed.get("topic"), Some(&Value::String("greeting".into())));
        assert!(listed.get(META_DOCUMENT_ID).is_none());
        assert!(listed.get(META_FULL_CONTENT).is_none());
    }

    #[tokio::test]
    async fn listing_truncates_but_detail_is_full() {
        let index = FakeIndex::new();
        let svc = service(index);
        let long = "x".repeat(150);
        svc.add_document(text_input(&long)).await.unwrap();

        let docs = svc.list_documents().await.unwrap();
        assert_eq!(docs[0].content.chars().count(), 103);
        assert!(docs[0].content.ends_with("..."));

        let full = svc.get_document(docs[0].id).await.unwrap();
        assert_eq!(full.content, long);
    }

    #[tokio::test]
    async fn multi_chunk_documents_are_listed_once() {
        let index = FakeIndex::new();
        let svc = DocumentService::new(
            index,
            Arc::new(FakeEmbeddings),
            TextSplitter::new(20, 0),
        );
        let content = vec!["alpha"; 20].join(" ");
        let written = svc.add_document(text_input(&content)).await.unwrap();
        assert!(written > 1);

        let docs = svc.list_documents().await.unwrap();
        assert_eq!(docs.len(), 1);
    }

    #[tokio::test]
    async fn unsupported_file_type_leaves_index_unchanged() {
        let index = FakeIndex::new();
        let svc = service(index);
        let err = svc.add_file("evil.exe", b"MZ").await.unwrap_err();
        assert!(matches!(err, PortError::InvalidInput(_)));
        assert!(svc.list_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn markdown_file_is_indexed_with_source_metadata() {
        let index = FakeIndex::new();
        let svc = service(index);
        let written = svc
            .add_file("notes.md", "# Title\n\nSome body text.".as_bytes())
            .await
            .unwrap();
        assert_eq!(written, 1);

        let docs = svc.list_documents().await.unwrap();
        let listed = docs[0].metadata.as_ref().unwrap();
        assert_eq!(
            listed.get("source"),
            Some(&Value::String("notes.md".into()))
        );
    }

    #[tokio::test]
    async fn clear_all_then_list_is_empty() {
        let index = FakeIndex::new();
        let svc = service(index);
        svc.add_document(text_input("one")).await.unwrap();
        svc.add_document(text_input("two")).await.unwrap();
        assert_eq!(svc.list_documents().await.unwrap().len(), 2);

        svc.clear_all().await.unwrap();
        assert!(svc.list_documents().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn unknown_document_is_not_found() {
        let svc = service(FakeIndex::new());
        let err = svc.get_document(Uuid::new_v4()).await.unwrap_err();
        assert!(matches!(err, PortError::NotFound(_)));
    }
}
