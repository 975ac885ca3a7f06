use std::env;
use std::sync::OnceLock;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the literature review server.
#[derive(Debug, Clone)]
pub struct Config {
    /// Hosted service used for both embeddings and answer generation.
    pub model_provider: ModelProvider,
    /// Credential presented to the hosted provider.
    pub api_key: Option<String>,
    /// Optional override of the provider endpoint.
    pub provider_base_url: Option<String>,
    /// Embedding model identifier passed to the provider.
    pub embedding_model: String,
    /// Language model used to answer questions.
    pub chat_model: String,
    /// Sampling temperature for answer generation.
    pub model_temperature: f32,
    /// Maximum number of chunks sent in a single embedding request.
    pub embedding_batch_size: usize,
    /// Maximum chunk length, in characters.
    pub text_splitter_chunk_size: usize,
    /// Characters shared between neighbouring chunks.
    pub text_splitter_chunk_overlap: usize,
    /// Number of chunks retrieved per question.
    pub retriever_top_k: usize,
    /// Upper bound on the multipart upload size.
    pub max_upload_bytes: usize,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
}

/// Supported hosted model backends.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelProvider {
    /// Google Generative Language API.
    Gemini,
    /// Hosted OpenAI API.
    OpenAI,
    /// Local Ollama runtime.
    Ollama,
}

impl ModelProvider {
    /// Endpoint used when `PROVIDER_BASE_URL` is not set.
    pub const fn default_base_url(self) -> &'static str {
        match self {
            Self::Gemini => "https://generativelanguage.googleapis.com",
            Self::OpenAI => "https://api.openai.com",
            Self::Ollama => "http://127.0.0.1:11434",
        }
    }

    /// Embedding model used when `EMBEDDING_MODEL` is not set.
    pub const fn default_embedding_model(self) -> &'static str {
        match self {
            Self::Gemini => "embedding-001",
            Self::OpenAI => "text-embedding-3-small",
            Self::Ollama => "nomic-embed-text",
        }
    }

    /// Language model used when `CHAT_MODEL` is not set.
    pub const fn default_chat_model(self) -> &'static str {
        match self {
            Self::Gemini => "gemini-pro",
            Self::OpenAI => "gpt-4o-mini",
            Self::Ollama => "llama3",
        }
    }

    /// Whether the provider rejects unauthenticated requests.
    pub const fn requires_api_key(self) -> bool {
        !matches!(self, Self::Ollama)
    }
}

const DEFAULT_CHUNK_SIZE: usize = 1000;
const DEFAULT_CHUNK_OVERLAP: usize = 200;
const DEFAULT_TOP_K: usize = 4;
const DEFAULT_EMBEDDING_BATCH_SIZE: usize = 100;
const DEFAULT_MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        let model_provider = match load_env_optional("MODEL_PROVIDER") {
            Some(value) => value
                .parse()
                .map_err(|()| ConfigError::InvalidValue("MODEL_PROVIDER".to_string()))?,
            None => ModelProvider::Gemini,
        };

        let text_splitter_chunk_size =
            parse_optional("TEXT_SPLITTER_CHUNK_SIZE")?.unwrap_or(DEFAULT_CHUNK_SIZE);
        if text_splitter_chunk_size == 0 {
            return Err(ConfigError::InvalidValue(
                "TEXT_SPLITTER_CHUNK_SIZE".to_string(),
            ));
        }
        let text_splitter_chunk_overlap =
            parse_optional("TEXT_SPLITTER_CHUNK_OVERLAP")?.unwrap_or(DEFAULT_CHUNK_OVERLAP);
        if text_splitter_chunk_overlap >= text_splitter_chunk_size {
            return Err(ConfigError::InvalidValue(
                "TEXT_SPLITTER_CHUNK_OVERLAP".to_string(),
            ));
        }

        let retriever_top_k = parse_optional("RETRIEVER_TOP_K")?.unwrap_or(DEFAULT_TOP_K);
        if retriever_top_k == 0 {
            return Err(ConfigError::InvalidValue("RETRIEVER_TOP_K".to_string()));
        }
        let embedding_batch_size =
            parse_optional("EMBEDDING_BATCH_SIZE")?.unwrap_or(DEFAULT_EMBEDDING_BATCH_SIZE);
        if embedding_batch_size == 0 {
            return Err(ConfigError::InvalidValue("EMBEDDING_BATCH_SIZE".to_string()));
        }

        Ok(Self {
            model_provider,
            api_key: load_env_optional("PROVIDER_API_KEY")
                .or_else(|| load_env_optional("GOOGLE_API_KEY")),
            provider_base_url: load_env_optional("PROVIDER_BASE_URL"),
            embedding_model: load_env_optional("EMBEDDING_MODEL")
                .unwrap_or_else(|| model_provider.default_embedding_model().to_string()),
            chat_model: load_env_optional("CHAT_MODEL")
                .unwrap_or_else(|| model_provider.default_chat_model().to_string()),
            model_temperature: parse_optional("MODEL_TEMPERATURE")?.unwrap_or(0.0),
            embedding_batch_size,
            text_splitter_chunk_size,
            text_splitter_chunk_overlap,
            retriever_top_k,
            max_upload_bytes: parse_optional("MAX_UPLOAD_BYTES")?
                .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES),
            server_port: parse_optional("SERVER_PORT")?,
        })
    }

    /// Provider endpoint after applying the default for the configured backend.
    pub fn provider_base_url(&self) -> &str {
        self.provider_base_url
            .as_deref()
            .unwrap_or_else(|| self.model_provider.default_base_url())
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_optional<T: std::str::FromStr>(key: &str) -> Result<Option<T>, ConfigError> {
    load_env_optional(key)
        .map(|value| {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(key.to_string()))
        })
        .transpose()
}

impl std::str::FromStr for ModelProvider {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "gemini" | "google" => Ok(Self::Gemini),
            "openai" => Ok(Self::OpenAI),
            "ollama" => Ok(Self::Ollama),
            _ => Err(()),
        }
    }
}

/// Global configuration cache populated during process start.
pub static CONFIG: OnceLock<Config> = OnceLock::new();

/// Retrieve the loaded configuration, panicking if initialization has not occurred.
pub fn get_config() -> &'static Config {
    CONFIG.get().expect("Config not initialized")
}

/// Load configuration from the environment and install it in the global cache.
pub fn init_config() -> Result<&'static Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        provider = ?config.model_provider,
        base_url = %config.provider_base_url(),
        embedding_model = %config.embedding_model,
        chat_model = %config.chat_model,
        chunk_size = config.text_splitter_chunk_size,
        chunk_overlap = config.text_splitter_chunk_overlap,
        top_k = config.retriever_top_k,
        server_port = ?config.server_port,
        "Loaded configuration"
    );
    Ok(CONFIG.get_or_init(|| config))
}
