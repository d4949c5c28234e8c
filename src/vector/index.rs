use super::IndexError;
use serde::{Deserialize, Serialize};

/// One chunk and its embedding.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct IndexEntry {
    text: String,
    embedding: Vec<f32>,
}

/// Nearest-neighbour index over a single document's chunk embeddings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VectorIndex {
    dimension: usize,
    entries: Vec<IndexEntry>,
}

/// A chunk returned by [`VectorIndex::similarity_search`].
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredChunk {
    /// Chunk text.
    pub text: String,
    /// Cosine similarity to the query.
    pub score: f32,
}

impl VectorIndex {
    /// Build an index pairing each chunk with its embedding.
    pub fn build(chunks: Vec<String>, embeddings: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        if chunks.len() != embeddings.len() {
            return Err(IndexError::CountMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            });
        }
        let dimension = embeddings.first().map(Vec::len).ok_or(IndexError::Empty)?;
        if dimension == 0 {
            return Err(IndexError::DimensionMismatch {
                expected: 1,
                actual: 0,
            });
        }
        if let Some(bad) = embeddings.iter().find(|vector| vector.len() != dimension) {
            return Err(IndexError::DimensionMismatch {
                expected: dimension,
                actual: bad.len(),
            });
        }

        let entries = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(text, embedding)| IndexEntry { text, embedding })
            .collect();
        Ok(Self { dimension, entries })
    }

    /// Embedding dimension of the index.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index holds no chunks.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return up to `k` chunks most similar to `query`, best first. Ties keep insertion order.
    pub fn similarity_search(
        &self,
        query: &[f32],
        k: usize,
    ) -> Result<Vec<ScoredChunk>, IndexError> {
        if query.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let query_norm = norm(query);
        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(position, entry)| {
                let score = cosine_similarity(query, query_norm, &entry.embedding);
                (position, score)
            })
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(position, score)| ScoredChunk {
                text: self.entries[position].text.clone(),
                score,
            })
            .collect())
    }
}

fn norm(vector: &[f32]) -> f32 {
    vector.iter().map(|value| value * value).sum::<f32>().sqrt()
}

/// Cosine similarity; zero vectors score 0.
fn cosine_similarity(query: &[f32], query_norm: f32, stored: &[f32]) -> f32 {
    let stored_norm = norm(stored);
    if query_norm == 0.0 || stored_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = query.iter().zip(stored).map(|(a, b)| a * b).sum();
    dot / (query_norm * stored_norm)
}
