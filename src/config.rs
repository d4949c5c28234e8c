use std::env;
use std::path::PathBuf;
use std::sync::OnceLock;
use thiserror::Error;

const DEFAULT_COHERE_URL: &str = "https://api.cohere.ai";
const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Required environment variable was not provided.
    #[error("Missing environment variable: {0}")]
    MissingVariable(String),
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the document service.
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory receiving raw uploaded files.
    pub upload_dir: PathBuf,
    /// Directory holding one vector index subdirectory per document.
    pub vector_dir: PathBuf,
    /// JSON file mapping document identifiers to stored filenames.
    pub file_store_path: PathBuf,
    /// Hosted or local provider used for embeddings and completions.
    pub model_provider: ModelProvider,
    /// Credential for the Cohere API.
    pub cohere_api_key: Option<String>,
    /// Base URL of the Cohere API.
    pub cohere_url: String,
    /// Base URL of the Ollama runtime.
    pub ollama_url: String,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Generation model identifier passed to the provider.
    pub completion_model: String,
    /// Maximum chunk length, measured in `chunk_unit`.
    pub chunk_size: usize,
    /// Trailing context carried from one chunk into the next, measured in `chunk_unit`.
    pub chunk_overlap: usize,
    /// Unit used to measure chunk lengths.
    pub chunk_unit: ChunkUnit,
    /// Number of chunks retrieved per question.
    pub retrieval_top_k: usize,
    /// Address the HTTP server binds to.
    pub server_host: String,
    /// Port the HTTP server binds to.
    pub server_port: u16,
    /// Largest accepted request body for uploads, in bytes.
    pub max_upload_bytes: usize,
}

/// Supported model backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelProvider {
    /// Hosted Cohere embed and chat APIs.
    Cohere,
    /// Local Ollama runtime.
    Ollama,
}

impl ModelProvider {
    fn default_embedding_model(self) -> &'static str {
        match self {
            Self::Cohere => "embed-english-v3.0",
            Self::Ollama => "nomic-embed-text",
        }
    }

    fn default_completion_model(self) -> &'static str {
        match self {
            Self::Cohere => "command-r",
            Self::Ollama => "llama3",
        }
    }
}

impl std::str::FromStr for ModelProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "cohere" => Ok(Self::Cohere),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Length unit applied by the text splitter.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChunkUnit {
    /// Unicode scalar values.
    Characters,
    /// `cl100k_base` tokens.
    Tokens,
}

impl std::str::FromStr for ChunkUnit {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "chars" | "characters" => Ok(Self::Characters),
            "tokens" => Ok(Self::Tokens),
            _ => Err(()),
        }
    }
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let model_provider = match get("MODEL_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("MODEL_PROVIDER".to_string()))?,
            None => ModelProvider::Cohere,
        };
        let cohere_api_key = get("COHERE_API_KEY");
        if model_provider == ModelProvider::Cohere && cohere_api_key.is_none() {
            return Err(ConfigError::MissingVariable("COHERE_API_KEY".to_string()));
        }

        let chunk_unit = match get("TEXT_SPLITTER_UNIT") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("TEXT_SPLITTER_UNIT".to_string()))?,
            None => ChunkUnit::Characters,
        };

        let chunk_size = parse_or(&get, "TEXT_SPLITTER_CHUNK_SIZE", 500_usize)?;
        if chunk_size == 0 {
            return Err(ConfigError::InvalidValue(
                "TEXT_SPLITTER_CHUNK_SIZE".to_string(),
            ));
        }
        let retrieval_top_k = parse_or(&get, "RETRIEVAL_TOP_K", 4_usize)?;
        if retrieval_top_k == 0 {
            return Err(ConfigError::InvalidValue("RETRIEVAL_TOP_K".to_string()));
        }

        Ok(Self {
            upload_dir: get("DOCQA_UPLOAD_DIR")
                .unwrap_or_else(|| "uploads".into())
                .into(),
            vector_dir: get("DOCQA_VECTOR_DIR")
                .unwrap_or_else(|| "vector_db".into())
                .into(),
            file_store_path: get("DOCQA_FILE_STORE")
                .unwrap_or_else(|| "file_store.json".into())
                .into(),
            model_provider,
            cohere_api_key,
            cohere_url: get("COHERE_URL").unwrap_or_else(|| DEFAULT_COHERE_URL.to_string()),
            ollama_url: get("OLLAMA_URL").unwrap_or_else(|| DEFAULT_OLLAMA_URL.to_string()),
            embedding_model: get("EMBEDDING_MODEL")
                .unwrap_or_else(|| model_provider.default_embedding_model().to_string()),
            completion_model: get("COMPLETION_MODEL")
                .unwrap_or_else(|| model_provider.default_completion_model().to_string()),
            chunk_size,
            chunk_overlap: parse_or(&get, "TEXT_SPLITTER_CHUNK_OVERLAP", 100_usize)?,
            chunk_unit,
            retrieval_top_k,
            server_host: get("SERVER_HOST").unwrap_or_else(|| "127.0.0.1".to_string()),
            server_port: parse_or(&get, "SERVER_PORT", 8000_u16)?,
            max_upload_bytes: parse_or(&get, "MAX_UPLOAD_BYTES", DEFAULT_MAX_UPLOAD_BYTES)?,
        })
    }
}

fn parse_or<G, T>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    G: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    get(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
        .map(|value| value.unwrap_or(default))
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Load configuration from the environment (and `.env`) and install it in the global cache.
///
/// A second call keeps the configuration installed first.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        upload_dir = %config.upload_dir.display(),
        vector_dir = %config.vector_dir.display(),
        file_store = %config.file_store_path.display(),
        provider = ?config.model_provider,
        embedding_model = %config.embedding_model,
        completion_model = %config.completion_model,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_original_layout() {
        let config = Config::from_lookup(lookup_from(&[("COHERE_API_KEY", "secret")]))
            .expect("config");
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.vector_dir, PathBuf::from("vector_db"));
        assert_eq!(config.file_store_path, PathBuf::from("file_store.json"));
        assert_eq!(config.model_provider, ModelProvider::Cohere);
        assert_eq!(config.chunk_size, 500);
        assert_eq!(config.chunk_overlap, 100);
        assert_eq!(config.chunk_unit, ChunkUnit::Characters);
        assert_eq!(config.retrieval_top_k, 4);
        assert_eq!(config.server_port, 8000);
        assert_eq!(config.embedding_model, "embed-english-v3.0");
    }

    #[test]
    fn cohere_requires_api_key() {
        let error = Config::from_lookup(lookup_from(&[])).unwrap_err();
        assert!(matches!(error, ConfigError::MissingVariable(key) if key == "COHERE_API_KEY"));
    }

    #[test]
    fn ollama_needs_no_key_and_picks_its_models() {
        let config = Config::from_lookup(lookup_from(&[
            ("MODEL_PROVIDER", "Ollama"),
            ("COMPLETION_MODEL", "mistral"),
        ]))
        .expect("config");
        assert_eq!(config.model_provider, ModelProvider::Ollama);
        assert_eq!(config.embedding_model, "nomic-embed-text");
        assert_eq!(config.completion_model, "mistral");
        assert!(config.cohere_api_key.is_none());
    }

    #[test]
    fn rejects_invalid_numbers_and_zero_sizes() {
        let error = Config::from_lookup(lookup_from(&[
            ("COHERE_API_KEY", "secret"),
            ("SERVER_PORT", "eighty"),
        ]))
        .unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "SERVER_PORT"));

        let error = Config::from_lookup(lookup_from(&[
            ("COHERE_API_KEY", "secret"),
            ("TEXT_SPLITTER_CHUNK_SIZE", "0"),
        ]))
        .unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue(_)));
    }

    #[test]
    fn only_hosted_providers_are_selectable() {
        let error = Config::from_lookup(lookup_from(&[
            ("COHERE_API_KEY", "secret"),
            ("MODEL_PROVIDER", "hashing"),
        ]))
        .unwrap_err();
        assert!(matches!(error, ConfigError::InvalidValue(key) if key == "MODEL_PROVIDER"));
    }

    #[test]
    fn blank_values_fall_back_to_defaults() {
        let config = Config::from_lookup(lookup_from(&[
            ("COHERE_API_KEY", "secret"),
            ("DOCQA_UPLOAD_DIR", "   "),
            ("TEXT_SPLITTER_UNIT", "tokens"),
        ]))
        .expect("config");
        assert_eq!(config.upload_dir, PathBuf::from("uploads"));
        assert_eq!(config.chunk_unit, ChunkUnit::Tokens);
    }
}
