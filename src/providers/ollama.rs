//! Ollama adapter (`/api/embed`, `/api/generate`).

use super::{ProviderError, ProviderSettings, build_http_client, send_json};
use crate::completion::{CompletionClient, CompletionClientError, CompletionRequest, answer_text};
use crate::embedding::{EmbeddingClient, EmbeddingClientError, ensure_count};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const PROVIDER: &str = "Ollama";

/// Client for a local Ollama runtime. No credential is sent.
pub struct OllamaClient {
    http: Client,
    settings: ProviderSettings,
}

impl OllamaClient {
    /// Build a client from provider settings.
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            http: build_http_client()?,
            settings,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{path}", self.settings.base_url)
    }
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    #[serde(default)]
    embeddings: Vec<Vec<f32>>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
    done: bool,
}

#[async_trait]
impl EmbeddingClient for OllamaClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let expected = texts.len();
        let payload = json!({
            "model": self.settings.embedding_model,
            "input": texts,
        });
        let response: EmbedResponse = send_json(
            PROVIDER,
            self.http.post(self.endpoint("embed")).json(&payload),
        )
        .await?;
        ensure_count(expected, response.embeddings)
    }
}

#[async_trait]
impl CompletionClient for OllamaClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionClientError> {
        let payload = json!({
            "model": request.model,
            "prompt": request.prompt,
            "stream": false,
            "options": {
                "temperature": request.temperature,
            }
        });

        let body: GenerateResponse = send_json(
            PROVIDER,
            self.http.post(self.endpoint("generate")).json(&payload),
        )
        .await?;

        if !body.done {
            return Err(ProviderError::InvalidResponse {
                provider: PROVIDER,
                message: "response incomplete (streaming not supported)".into(),
            }
            .into());
        }

        Ok(answer_text(body.response))
    }
}
