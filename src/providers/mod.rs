//! HTTP adapters for the hosted model services.
//!
//! Every adapter implements both [`crate::embedding::EmbeddingClient`] and
//! [`crate::completion::CompletionClient`] so a single credential and endpoint serve the whole
//! analysis. Requests are plain `reqwest` calls with JSON bodies; no retries are attempted.

mod gemini;
mod ollama;
mod openai;

pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use crate::config::Config;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;

const USER_AGENT: &str = concat!("litreview/", env!("CARGO_PKG_VERSION"));
const MAX_ERROR_BODY_CHARS: usize = 512;

/// Failures talking to a hosted model provider.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider requires a credential and none was configured.
    #[error("No API key configured for {provider}")]
    MissingApiKey {
        /// Provider display name.
        provider: &'static str,
    },
    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    /// Transport-level failure before a response arrived.
    #[error("Failed to reach {provider}: {message}")]
    Unreachable {
        /// Provider display name.
        provider: &'static str,
        /// Transport error description.
        message: String,
    },
    /// Provider answered with a non-success status (auth, quota, bad request).
    #[error("{provider} returned {status}: {body}")]
    UnexpectedStatus {
        /// Provider display name.
        provider: &'static str,
        /// HTTP status code received.
        status: StatusCode,
        /// Truncated response body.
        body: String,
    },
    /// Response body did not match the expected schema.
    #[error("Malformed {provider} response: {message}")]
    InvalidResponse {
        /// Provider display name.
        provider: &'static str,
        /// Decoding error description.
        message: String,
    },
}

/// Connection settings shared by all provider adapters.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Base URL of the provider API, without trailing slash.
    pub base_url: String,
    /// Credential, when the provider needs one.
    pub api_key: Option<String>,
    /// Model used for embeddings.
    pub embedding_model: String,
}

impl ProviderSettings {
    /// Derive provider settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.provider_base_url(),
            config.api_key.clone(),
            config.embedding_model.clone(),
        )
    }

    /// Construct settings explicitly, normalizing the base URL.
    pub fn new(
        base_url: impl AsRef<str>,
        api_key: Option<String>,
        embedding_model: impl Into<String>,
    ) -> Self {
        Self {
            base_url: base_url.as_ref().trim().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            embedding_model: embedding_model.into(),
        }
    }
}

pub(crate) fn build_http_client() -> Result<Client, ProviderError> {
    Client::builder()
        .user_agent(USER_AGENT)
        .build()
        .map_err(ProviderError::Client)
}

pub(crate) fn require_api_key<'a>(
    provider: &'static str,
    api_key: Option<&'a str>,
) -> Result<&'a str, ProviderError> {
    api_key.ok_or(ProviderError::MissingApiKey { provider })
}

/// Send a request and decode a successful JSON response.
pub(crate) async fn send_json<T: DeserializeOwned>(
    provider: &'static str,
    request: RequestBuilder,
) -> Result<T, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|error| ProviderError::Unreachable {
            provider,
            message: error.to_string(),
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::UnexpectedStatus {
            provider,
            status,
            body: truncate_chars(&body, MAX_ERROR_BODY_CHARS),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|error| ProviderError::InvalidResponse {
            provider,
            message: error.to_string(),
        })
}

fn truncate_chars(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((offset, _)) => format!("{}…", &text[..offset]),
        None => text.to_string(),
    }
}
