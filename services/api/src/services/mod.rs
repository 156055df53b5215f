pub mod documents;
pub mod rag;

pub use documents::DocumentService;
pub use rag::{RagService, RetrievalPolicy};
