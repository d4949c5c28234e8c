//! Text generation providers answering rendered prompts.
//!
//! Both adapters issue HTTP requests directly to the provider: Cohere's chat endpoint for the
//! hosted setup and Ollama's generate endpoint for local runs. Calls are single-shot with no
//! retries and no streaming.

use crate::config::{Config, ModelProvider};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced while asking the language model for an answer.
#[derive(Debug, Error)]
pub enum CompletionClientError {
    /// Provider was unreachable or the endpoint does not exist.
    #[error("Completion provider unavailable: {0}")]
    ProviderUnavailable(String),
    /// Provider returned an error response.
    #[error("Failed to generate answer: {0}")]
    GenerationFailed(String),
    /// Provider response could not be parsed.
    #[error("Malformed provider response: {0}")]
    InvalidResponse(String),
}

/// Interface implemented by language model backends.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate a completion for `prompt` and return the text verbatim.
    async fn complete(&self, prompt: &str) -> Result<String, CompletionClientError>;
}

/// Build a completion client based on configuration.
pub fn build_completion_client(config: &Config) -> Box<dyn CompletionClient> {
    match config.model_provider {
        ModelProvider::Cohere => Box::new(CohereCompletion::new(
            config.cohere_url.clone(),
            config.cohere_api_key.clone().unwrap_or_default(),
            config.completion_model.clone(),
        )),
        ModelProvider::Ollama => Box::new(OllamaCompletion::new(
            config.ollama_url.clone(),
            config.completion_model.clone(),
        )),
    }
}

/// Hosted Cohere chat completions (`/v1/chat`).
pub struct CohereCompletion {
    http: Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl CohereCompletion {
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
        format!("{}/v1/chat", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct CohereChatResponse {
    text: String,
}

#[async_trait]
impl CompletionClient for CohereCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionClientError> {
        let payload = json!({
            "model": self.model,
            "message": prompt,
        });

        let response = self
            .http
            .post(self.endpoint())
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                CompletionClientError::ProviderUnavailable(format!(
                    "failed to reach Cohere at {}: {error}",
                    self.base_url
                ))
            })?;

        check_status(response.status(), &self.endpoint())?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionClientError::GenerationFailed(format!(
                "Cohere returned {status}: {body}"
            )));
        }

        let body: CohereChatResponse = response.json().await.map_err(|error| {
            CompletionClientError::InvalidResponse(format!(
                "failed to decode Cohere response: {error}"
            ))
        })?;
        Ok(body.text)
    }
}

/// Local Ollama completions (`/api/generate`).
pub struct OllamaCompletion {
    http: Client,
    base_url: String,
    model: String,
}

impl OllamaCompletion {
    /// Construct a client for the runtime at `base_url`.
    pub fn new(base_url: String, model: String) -> Self {
        Self {
            http: Client::new(),
            base_url,
            model,
        }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl CompletionClient for OllamaCompletion {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionClientError> {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let response = self
            .http
            .post(self.endpoint())
            .json(&payload)
            .send()
            .await
            .map_err(|error| {
                CompletionClientError::ProviderUnavailable(format!(
                    "failed to reach Ollama at {}: {error}",
                    self.base_url
                ))
            })?;

        check_status(response.status(), &self.endpoint())?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionClientError::GenerationFailed(format!(
                "Ollama returned {status}: {body}"
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|error| {
            CompletionClientError::InvalidResponse(format!(
                "failed to decode Ollama response: {error}"
            ))
        })?;

        if !body.done {
            return Err(CompletionClientError::InvalidResponse(
                "Ollama response incomplete (streaming not supported)".into(),
            ));
        }

        Ok(body.response)
    }
}

fn check_status(status: StatusCode, endpoint: &str) -> Result<(), CompletionClientError> {
    if status == StatusCode::NOT_FOUND {
        return Err(CompletionClientError::ProviderUnavailable(format!(
            "endpoint {endpoint} returned 404"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    #[tokio::test]
    async fn cohere_returns_chat_text_verbatim() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat")
                    .header("authorization", "Bearer key")
                    .body_contains("\"message\"");
                then.status(200).json_body(json!({
                    "response_id": "r1",
                    "text": " Paris is the capital. ",
                    "generation_id": "g1"
                }));
            })
            .await;

        let client = CohereCompletion::new(server.base_url(), "key".into(), "command-r".into());
        let answer = client.complete("prompt").await.expect("answer");

        mock.assert_async().await;
        assert_eq!(answer, " Paris is the capital. ");
    }

    #[tokio::test]
    async fn cohere_error_status_is_generation_failure() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat");
                then.status(429).body("rate limited");
            })
            .await;

        let client = CohereCompletion::new(server.base_url(), "key".into(), "command-r".into());
        let error = client.complete("prompt").await.expect_err("error");
        assert!(
            matches!(error, CompletionClientError::GenerationFailed(ref message) if message.contains("429"))
        );
    }

    #[tokio::test]
    async fn ollama_handles_successful_response() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({
                    "response": "Answer text",
                    "done": true
                }));
            })
            .await;

        let client = OllamaCompletion::new(server.base_url(), "llama3".into());
        let answer = client.complete("prompt").await.expect("answer");

        mock.assert_async().await;
        assert_eq!(answer, "Answer text");
    }

    #[tokio::test]
    async fn ollama_missing_endpoint_is_unavailable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(404).body("not found");
            })
            .await;

        let client = OllamaCompletion::new(server.base_url(), "llama3".into());
        let error = client.complete("prompt").await.expect_err("error");
        assert!(matches!(error, CompletionClientError::ProviderUnavailable(_)));
    }

    #[tokio::test]
    async fn ollama_incomplete_response_is_rejected() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200)
                    .json_body(json!({ "response": "partial", "done": false }));
            })
            .await;

        let client = OllamaCompletion::new(server.base_url(), "llama3".into());
        let error = client.complete("prompt").await.expect_err("error");
        assert!(matches!(error, CompletionClientError::InvalidResponse(_)));
    }
}
