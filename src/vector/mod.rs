//! Per-document vector indexes: brute-force cosine search persisted as JSON.

mod index;
mod store;

pub use index::{ScoredChunk, VectorIndex};
pub use store::IndexStore;

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while building, searching, or persisting a vector index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// No chunks were supplied.
    #[error("cannot build an index from zero chunks")]
    Empty,
    /// Chunk and embedding counts differ.
    #[error("{chunks} chunks but {embeddings} embeddings")]
    CountMismatch {
        /// Number of chunk texts.
        chunks: usize,
        /// Number of embeddings.
        embeddings: usize,
    },
    /// A vector did not match the index dimension.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension of the index.
        expected: usize,
        /// Dimension of the offending vector.
        actual: usize,
    },
    /// Filesystem operation failed.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path the operation targeted.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
    /// Persisted index could not be decoded or encoded.
    #[error("Invalid index file {path}: {source}")]
    Serde {
        /// Index file path.
        path: PathBuf,
        /// Serializer error.
        #[source]
        source: serde_json::Error,
    },
}
