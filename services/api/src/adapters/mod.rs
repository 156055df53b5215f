pub mod chat_llm;
pub mod chroma;
pub mod db;
pub mod embeddings;

pub use chat_llm::OpenAiChatAdapter;
pub use chroma::ChromaIndexAdapter;
pub use db::SqliteCredentialStore;
pub use embeddings::OpenAiEmbeddingAdapter;
