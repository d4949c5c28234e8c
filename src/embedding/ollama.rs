use super::{Embedder, EmbeddingClientError, ensure_count};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

/// Embeddings served by a local Ollama runtime (`/api/embed`).
pub struct OllamaEmbedder {
    http: Client,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embeddings: Vec<Vec<f32>>,
}

impl OllamaEmbedder {
    /// Construct a client for the runtime at `base_url`.
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            http: Client::new(),
            base_url,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/embed", self.base_url.trim_end_matches('/'))
    }

    async fn embed(&self, input: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let payload = json!({ "model": self.model, "input": input });
        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                EmbeddingClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(EmbeddingClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: EmbedResponse = response.json().await.map_err(|error| {
            EmbeddingClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;
        ensure_count(input.len(), body.embeddings.len())?;
        Ok(body.embeddings)
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    async fn embed_documents(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        self.embed(&texts).await
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let mut vectors = self.embed(&[text.to_string()]).await?;
        vectors.pop().ok_or_else(|| {
            EmbeddingClientError::InvalidResponse("no embedding returned for query".into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn embeds_through_api_embed() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/embed")
                    .body_contains("nomic-embed-text");
                then.status(200).json_body(json!({
                    "model": "nomic-embed-text",
                    "embeddings": [[0.5, 0.5]]
                }));
            })
            .await;

        let client = OllamaEmbedder::new(server.base_url(), "nomic-embed-text".into());
        let vector = client.embed_query("hello").await.expect("vector");

        mock.assert_async().await;
        assert_eq!(vector, vec![0.5, 0.5]);
    }

    #[tokio::test]
    async fn missing_model_is_generation_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/embed");
                then.status(404).body("model not found");
            })
            .await;

        let client = OllamaEmbedder::new(server.base_url(), "absent".into());
        let error = client
            .embed_documents(vec!["text".into()])
            .await
            .expect_err("error");
        assert!(matches!(error, EmbeddingClientError::GenerationFailed(_)));
    }
}
