//! Embedding providers behind a single capability trait.

mod cohere;
mod ollama;

pub use cohere::CohereEmbedder;
pub use ollama::OllamaEmbedder;

use crate::config::{Config, ModelProvider};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// Provider was unable to produce embeddings for the supplied input.
    #[error("Failed to generate embeddings: {0}")]
    GenerationFailed(String),
    /// Provider could not be reached.
    #[error("Embedding provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider response could not be decoded or did not match the request.
    #[error("Malformed embedding response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Produce one embedding per document chunk, in input order.
    async fn embed_documents(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;

    /// Produce an embedding for a search query.
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError>;
}

/// Deterministic embedder that hashes bytes into a normalized vector.
///
/// A test fixture; [`build_embedder`] never selects it. Similar texts share byte patterns and so
/// score closer, which is enough for smoke-level retrieval.
#[derive(Debug, Clone, Copy)]
pub struct HashingEmbedder {
    dimension: usize,
}

impl HashingEmbedder {
    /// Create an embedder producing vectors of `dimension` components.
    pub const fn new(dimension: usize) -> Self {
        Self { dimension }
    }

    fn encode(&self, text: &str) -> Vec<f32> {
        let mut embedding = vec![0.0_f32; self.dimension];

        for word in text.split_whitespace() {
            let normalized = word
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>();
            if normalized.is_empty() {
                continue;
            }
            // FNV-1a over the normalized word picks the slot.
            let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
            for byte in normalized.bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x0100_0000_01b3);
            }
            let position = (hash % self.dimension as u64) as usize;
            embedding[position] += 1.0;
        }

        let norm = embedding
            .iter()
            .map(|value| value * value)
            .sum::<f32>()
            .sqrt();

        if norm > 0.0 {
            for value in &mut embedding {
                *value /= norm;
            }
        }

        embedding
    }

    fn check_dimension(&self) -> Result<(), EmbeddingClientError> {
        if self.dimension == 0 {
            return Err(EmbeddingClientError::GenerationFailed(
                "embedding dimension must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    async fn embed_documents(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        self.check_dimension()?;
        if texts.is_empty() {
            return Err(EmbeddingClientError::GenerationFailed(
                "no texts provided".to_string(),
            ));
        }
        Ok(texts.iter().map(|text| self.encode(text)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        self.check_dimension()?;
        Ok(self.encode(text))
    }
}

/// Build an embedding client suitable for the current configuration.
pub fn build_embedder(config: &Config) -> Arc<dyn Embedder> {
    match config.model_provider {
        ModelProvider::Cohere => Arc::new(CohereEmbedder::new(
            config.cohere_url.clone(),
            config.cohere_api_key.clone().unwrap_or_default(),
            config.embedding_model.clone(),
        )),
        ModelProvider::Ollama => Arc::new(OllamaEmbedder::new(
            config.ollama_url.clone(),
            config.embedding_model.clone(),
        )),
    }
}

fn ensure_count(expected: usize, actual: usize) -> Result<(), EmbeddingClientError> {
    if expected == actual {
        Ok(())
    } else {
        Err(EmbeddingClientError::InvalidResponse(format!(
            "expected {expected} embeddings, got {actual}"
        )))
    }
}
