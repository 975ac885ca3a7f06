use crate::config::{Config, ModelProvider};
use crate::providers::{GeminiClient, OllamaClient, OpenAiClient, ProviderError, ProviderSettings};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;

/// Errors raised by embedding providers.
#[derive(Debug, Error)]
pub enum EmbeddingClientError {
    /// The hosted provider rejected or failed the request.
    #[error(transparent)]
    Provider(#[from] ProviderError),
    /// Provider returned a different number of vectors than texts submitted.
    #[error("Provider returned {actual} embeddings for {expected} inputs")]
    CountMismatch {
        /// Number of texts submitted.
        expected: usize,
        /// Number of vectors received.
        actual: usize,
    },
    /// Provider answered without any vector.
    #[error("Provider returned no embedding for the query")]
    EmptyResponse,
}

/// Interface implemented by embedding backends.
#[async_trait]
pub trait EmbeddingClient: Send + Sync {
    /// Produce an embedding vector for each supplied chunk of text, in input order.
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError>;

    /// Produce a vector for a search query in the same space as the chunk vectors.
    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let mut vectors = self.generate_embeddings(vec![query.to_string()]).await?;
        vectors.pop().ok_or(EmbeddingClientError::EmptyResponse)
    }
}

/// Check that a provider answered with exactly one vector per input.
pub(crate) fn ensure_count(
    expected: usize,
    vectors: Vec<Vec<f32>>,
) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
    if vectors.len() == expected {
        Ok(vectors)
    } else {
        Err(EmbeddingClientError::CountMismatch {
            expected,
            actual: vectors.len(),
        })
    }
}

/// Build an embedding client for an explicit configuration.
pub fn embedding_client_for(config: &Config) -> Result<Arc<dyn EmbeddingClient>, ProviderError> {
    let settings = ProviderSettings::from_config(config);
    tracing::debug!(
        provider = ?config.model_provider,
        model = %settings.embedding_model,
        "Building embedding client"
    );
    let client: Arc<dyn EmbeddingClient> = match config.model_provider {
        ModelProvider::Gemini => Arc::new(GeminiClient::new(settings)?),
        ModelProvider::OpenAI => Arc::new(OpenAiClient::new(settings)?),
        ModelProvider::Ollama => Arc::new(OllamaClient::new(settings)?),
    };
    Ok(client)
}
