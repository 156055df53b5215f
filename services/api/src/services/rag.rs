//! services/api/src/services/rag.rs
//!
//! Answer generation: embeds the question, retrieves context chunks from the
//! vector index under a configurable policy, and hands both to the generation
//! port. The service holds no prompt text; prompt assembly belongs to the
//! generation adapter.

use std::sync::Arc;

use docchat_core::domain::ChunkHit;
use docchat_core::ports::{
    AnswerGeneration, EmbeddingService, PortError, PortResult, VectorIndex,
};

/// How much context is pulled in front of the generation provider.
#[derive(Debug, Clone)]
pub struct RetrievalPolicy {
    /// Maximum number of chunks to retrieve.
    pub top_k: usize,
    /// Chunks scoring below this similarity are dropped. `None` keeps everything.
    pub min_score: Option<f32>,
    /// Soft cap on the assembled context, in characters.
    pub max_context_chars: usize,
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self {
            top_k: 3,
            min_score: None,
            max_context_chars: 4000,
        }
    }
}

pub struct RagService {
    index: Arc<dyn VectorIndex>,
    embeddings: Arc<dyn EmbeddingService>,
    generator: Arc<dyn AnswerGeneration>,
    policy: RetrievalPolicy,
}

impl RagService {
    pub fn new(
        index: Arc<dyn VectorIndex>,
        embeddings: Arc<dyn EmbeddingService>,
        generator: Arc<dyn AnswerGeneration>,
        policy: RetrievalPolicy,
    ) -> Self {
        Self {
            index,
            embeddings,
            generator,
            policy,
        }
    }

    /// Produces an answer for `question`. A blank question is rejected before
    /// any external call is made.
    pub async fn generate_answer(&self, question: &str) -> PortResult<String> {
        let question = question.trim();
        if question.is_empty() {
            return Err(PortError::InvalidInput(
                "Question must not be empty".to_string(),
            ));
        }

        let vectors = self.embeddings.embed(&[question.to_string()]).await?;
        let query = vectors.into_iter().next().ok_or_else(|| {
            PortError::Unexpected("Embedding service returned no vector for the query".to_string())
        })?;

        let hits = self.index.search(&query, self.policy.top_k).await?;
        let context = self.build_context(&hits);
        self.generator.generate(question, &context).await
    }

    /// Joins retrieved chunks with blank lines, applying the score floor and
    /// the context-length cap. Hits arrive in score order from the index.
    fn build_context(&self, hits: &[ChunkHit]) -> String {
        let mut parts: Vec<&str> = Vec::new();
        let mut used = 0usize;
        for hit in hits {
            if self.policy.min_score.is_some_and(|min| hit.score < min) {
                continue;
            }
            let len = hit.text.chars().count();
            if !parts.is_empty() && used + len + 2 > self.policy.max_context_chars {
                break;
            }
            used += len + if parts.is_empty() { 0 } else { 2 };
            parts.push(&hit.text);
        }
        parts.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use docchat_core::domain::{IndexedChunk, Metadata};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    struct StaticIndex {
        hits: Vec<ChunkHit>,
        last_limit: AtomicUsize,
    }

    impl StaticIndex {
        fn new(hits: Vec<ChunkHit>) -> Arc<Self> {
            Arc::new(Self {
                hits,
                last_limit: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl VectorIndex for StaticIndex {
        async fn add_chunks(
            &self,
            _chunks: Vec<IndexedChunk>,
            _embeddings: Vec<Vec<f32>>,
        ) -> PortResult<()> {
            Ok(())
        }

        async fn list_chunk_metadata(&self) -> PortResult<Vec<Metadata>> {
            Ok(Vec::new())
        }

        async fn search(&self, _query: &[f32], limit: usize) -> PortResult<Vec<ChunkHit>> {
            self.last_limit.store(limit, Ordering::SeqCst);
            Ok(self.hits.iter().take(limit).cloned().collect())
        }

        async fn clear(&self) -> PortResult<()> {
            Ok(())
        }
    }

    struct FakeEmbeddings;

    #[async_trait]
    impl EmbeddingService for FakeEmbeddings {
        async fn embed(&self, inputs: &[String]) -> PortResult<Vec<Vec<f32>>> {
            Ok(vec![vec![0.5, 0.5]; inputs.len()])
        }
    }

    struct RecordingGenerator {
        calls: AtomicUsize,
        last_context: Mutex<String>,
    }

    impl RecordingGenerator {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                last_context: Mutex::new(String::new()),
            })
        }
    }

    #[async_trait]
    impl AnswerGeneration for RecordingGenerator {
        async fn generate(&self, question: &str, context: &str) -> PortResult<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_context.lock().unwrap() = context.to_string();
            Ok(format!("answer to: {question}"))
        }
    }

    struct FailingGenerator;

    #[async_trait]
    impl AnswerGeneration for FailingGenerator {
        async fn generate(&self, _question: &str, _context: &str) -> PortResult<String> {
            Err(PortError::Dependency("provider is down".to_string()))
        }
    }

    fn hit(text: &str, score: f32) -> ChunkHit {
        ChunkHit {
            text: text.to_string(),
            score,
        }
    }

    #[tokio::test]
    async fn blank_question_never_reaches_the_generator() {
        let generator = RecordingGenerator::new();
        let svc = RagService::new(
            StaticIndex::new(vec![]),
            Arc::new(FakeEmbeddings),
            generator.clone(),
            RetrievalPolicy::default(),
        );
        let err = svc.generate_answer("   ").await.unwrap_err();
        assert!(matches!(err, PortError::InvalidInput(_)));
        assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn retrieved_chunks_are_joined_into_context() {
        let index = StaticIndex::new(vec![hit("alpha", 0.9), hit("beta", 0.8)]);
        let generator = RecordingGenerator::new();
        let svc = RagService::new(
            index.clone(),
            Arc::new(FakeEmbeddings),
            generator.clone(),
            RetrievalPolicy::default(),
        );

        let answer = svc.generate_answer("what?").await.unwrap();
        assert_eq!(answer, "answer to: what?");
        assert_eq!(*generator.last_context.lock().unwrap(), "alpha\n\nbeta");
        assert_eq!(index.last_limit.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn low_scoring_chunks_are_dropped() {
        let index = StaticIndex::new(vec![hit("good", 0.9), hit("noise", 0.1)]);
        let generator = RecordingGenerator::new();
        let svc = RagService::new(
            index,
            Arc::new(FakeEmbeddings),
            generator.clone(),
            RetrievalPolicy {
                min_score: Some(0.5),
                ..RetrievalPolicy::default()
            },
        );

        svc.generate_answer("what?").await.unwrap();
        assert_eq!(*generator.last_context.lock().unwrap(), "good");
    }

    #[tokio::test]
    async fn context_respects_the_length_cap() {
        let index = StaticIndex::new(vec![hit(&"a".repeat(30), 0.9), hit(&"b".repeat(30), 0.8)]);
        let generator = RecordingGenerator::new();
        let svc = RagService::new(
            index,
            Arc::new(FakeEmbeddings),
            generator.clone(),
            RetrievalPolicy {
                max_context_chars: 40,
                ..RetrievalPolicy::default()
            },
        );

        svc.generate_answer("what?").await.unwrap();
        let context = generator.last_context.lock().unwrap().clone();
        assert_eq!(context, "a".repeat(30));
    }

    #[tokio::test]
    async fn zero_hits_still_produce_an_answer() {
        let generator = RecordingGenerator::new();
        let svc = RagService::new(
            StaticIndex::new(vec![]),
            Arc::new(FakeEmbeddings),
            generator.clone(),
            RetrievalPolicy::default(),
        );
        svc.generate_answer("what?").await.unwrap();
        assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
        assert_eq!(*generator.last_context.lock().unwrap(), "");
    }

    #[tokio::test]
    async fn generation_failure_propagates() {
        let svc = RagService::new(
            StaticIndex::new(vec![]),
            Arc::new(FakeEmbeddings),
            Arc::new(FailingGenerator),
            RetrievalPolicy::default(),
        );
        let err = svc.generate_answer("what?").await.unwrap_err();
        assert!(matches!(err, PortError::Dependency(_)));
    }
}
