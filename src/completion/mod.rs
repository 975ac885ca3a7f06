//! Abstractions for generating answers with a hosted language model.
//!
//! The retrieval chain assembles a prompt from retrieved context and hands it to a
//! [`CompletionClient`]. Adapters for each backend live in [`crate::providers`].

use crate::config::{Config, ModelProvider};
use crate::providers::{GeminiClient, OllamaClient, OpenAiClient, ProviderError, ProviderSettings};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors surfaced while generating an answer.
#[derive(Debug, Error)]
pub enum CompletionClientError {
    /// The hosted provider rejected or failed the request.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Request payload passed to the completion provider.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    /// Model identifier understood by the provider.
    pub model: String,
    /// Prompt assembled by the retrieval chain.
    pub prompt: String,
    /// Sampling temperature; `0.0` keeps answers as stable as the model allows.
    pub temperature: f32,
}

/// Interface implemented by language model providers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Generate the model's answer for the supplied prompt.
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionClientError>;
}

/// Build a completion client for an explicit configuration.
pub fn completion_client_for(
    config: &Config,
) -> Result<Arc<dyn CompletionClient>, ProviderError> {
    let settings = ProviderSettings::from_config(config);
    tracing::debug!(
        provider = ?config.model_provider,
        model = %config.chat_model,
        "Building completion client"
    );
    let client: Arc<dyn CompletionClient> = match config.model_provider {
        ModelProvider::Gemini => Arc::new(GeminiClient::new(settings)?),
        ModelProvider::OpenAI => Arc::new(OpenAiClient::new(settings)?),
        ModelProvider::Ollama => Arc::new(OllamaClient::new(settings)?),
    };
    Ok(client)
}

/// Normalize provider output. A blank answer is returned as an empty string, not an error.
pub(crate) fn answer_text(text: String) -> String {
    text.trim().to_string()
}
