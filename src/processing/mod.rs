//! Document pipeline: chunking, prompt rendering, and the service that ties storage to models.

pub mod chunking;
pub mod prompt;
mod service;
pub mod types;

pub use chunking::TextSplitter;
pub use service::{Components, DocumentApi, DocumentService, StorageLayout};
pub use types::{ChunkingError, ProcessingError, ServiceError, UploadOutcome};
