//! Core data types and error definitions for the document pipeline.

use crate::{
    completion::CompletionClientError, embedding::EmbeddingClientError, extract::ExtractError,
    storage::StorageError, vector::IndexError,
};
use anyhow::Error as TokenizerError;
use thiserror::Error;

/// Errors produced while splitting extracted text into chunks.
#[derive(Debug, Error)]
pub enum ChunkingError {
    /// Ingestion configured an impossible chunk budget.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Tokenizer resources were unavailable for token-based splitting.
    #[error("failed to initialize tokenizer: {0}")]
    Tokenizer(#[source] TokenizerError),
}

/// Errors emitted by the upload pipeline.
#[derive(Debug, Error)]
pub enum ProcessingError {
    /// Raw bytes could not be written to the upload directory.
    #[error("Failed to store upload: {0}")]
    Storage(#[from] StorageError),
    /// The file could not be parsed.
    #[error("Failed to extract text: {0}")]
    Extraction(#[from] ExtractError),
    /// Chunking step failed to segment the document.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Parsing succeeded but produced no text to index.
    #[error("Document contains no extractable text")]
    EmptyDocument,
    /// Embedding provider failed to produce vectors for the chunks.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// The vector index could not be built or persisted.
    #[error("Failed to build vector index: {0}")]
    Index(#[from] IndexError),
}

/// Errors surfaced by [`crate::processing::DocumentApi`] operations.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// No record exists for the identifier.
    #[error("File not found: {0}")]
    NotFound(String),
    /// A record exists but its vector index directory is gone.
    #[error("Document not processed: {0}")]
    IndexMissing(String),
    /// Upload processing failed.
    #[error("File upload failed: {0}")]
    Upload(#[from] ProcessingError),
    /// The question could not be embedded.
    #[error("Failed to embed question: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// The language model call failed.
    #[error(transparent)]
    Completion(#[from] CompletionClientError),
    /// The stored vector index could not be loaded or searched.
    #[error("Vector index error: {0}")]
    Index(#[from] IndexError),
    /// Metadata or upload storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result of a successful upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadOutcome {
    /// Identifier generated for the document.
    pub file_id: String,
    /// Name the raw file was stored under.
    pub stored_filename: String,
    /// Number of chunks indexed.
    pub chunk_count: usize,
}
