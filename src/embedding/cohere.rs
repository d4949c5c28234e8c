use super::{Embedder, EmbeddingClientError, ensure_count};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Cohere accepts at most this many texts per embed call.
const MAX_BATCH: usize = 96;

/// Hosted Cohere embeddings (`/v1/embed`).
pub struct CohereEmbedder {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl CohereEmbedder {
    /// Construct a client for `base_url` authenticating with `api_key`.
    pub fn new(base_url: String, api_key: String, model: String) -> Self {
        Self {
            http: Client::new(),
            base_url,
            api_key,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/embed", self.base_url.trim_end_matches('/'))
    }

    async fn embed(
        &self,
        texts: &[String],
        input_type: &str,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        tracing::debug!(
            model = %self.model,
            count = texts.len(),
            input_type,
            "Requesting Cohere embeddings"
        );
        let payload = json!({
            "model": self.model,
            "texts": texts,
            "input_type": input_type,
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::ProviderUnavailable(format!(
                    "failed to reach Cohere at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "Cohere returned {status}: {body}"
            )));
        }

        let body: EmbedResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!(
                "failed to decode Cohere response: {error}"
            ))
        })?;
        ensure_count(texts.len(), body.embeddings.len())?;
        Ok(body.embeddings)
    }
}

#[async_trait]
impl Embedder for CohereEmbedder {
    async fn embed_documents(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(MAX_BATCH) {
            embeddings.extend(self.embed(batch, "search_document").await?);
        }
        Ok(embeddings)
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let mut vectors = self.embed(&[text.to_string()], "search_query").await?;
        vectors.pop().ok_or_else(|| {
            EmbeddingClientError::InvalidResponse("no embedding returned for query".into())
        })
    }
}
