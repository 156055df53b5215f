pub mod domain;
pub mod ports;

pub use domain::{
    AuthToken, ChunkHit, DocumentInfo, DocumentInput, IndexedChunk, Metadata, User,
    UserCredentials,
};
pub use ports::{
    AnswerGeneration, CredentialStore, EmbeddingService, PortError, PortResult, VectorIndex,
};
