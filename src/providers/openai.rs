//! OpenAI adapter (`/v1/embeddings`, `/v1/chat/completions`).

use super::{ProviderError, ProviderSettings, build_http_client, require_api_key, send_json};
use crate::completion::{CompletionClient, CompletionClientError, CompletionRequest, answer_text};
use crate::embedding::{EmbeddingClient, EmbeddingClientError, ensure_count};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

const PROVIDER: &str = "OpenAI";

/// Client for OpenAI embeddings and chat completions.
pub struct OpenAiClient {
    http: Client,
    settings: ProviderSettings,
}

impl OpenAiClient {
    /// Build a client from provider settings.
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            http: build_http_client()?,
            settings,
        })
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        body: &Value,
    ) -> Result<T, ProviderError> {
        let api_key = require_api_key(PROVIDER, self.settings.api_key.as_deref())?;
        let url = format!("{}/v1/{path}", self.settings.base_url);
        send_json(PROVIDER, self.http.post(url).bearer_auth(api_key).json(body)).await
    }
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl EmbeddingClient for OpenAiClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let expected = texts.len();
        let body = json!({
            "model": self.settings.embedding_model,
            "input": texts,
        });
        let mut response: EmbeddingsResponse = self.post("embeddings", &body).await?;
        response.data.sort_by_key(|item| item.index);
        let vectors = response
            .data
            .into_iter()
            .map(|item| item.embedding)
            .collect();
        ensure_count(expected, vectors)
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionClientError> {
        let body = json!({
            "model": request.model,
            "messages": [{ "role": "user", "content": request.prompt }],
            "temperature": request.temperature,
        });
        let response: ChatResponse = self.post("chat/completions", &body).await?;
        let text = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .unwrap_or_default();
        Ok(answer_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client_for(server: &MockServer) -> OpenAiClient {
        OpenAiClient::new(ProviderSettings::new(
            server.base_url(),
            Some("sk-test".into()),
            "text-embedding-3-small",
        ))
        .expect("client")
    }

    #[tokio::test]
    async fn embeddings_are_reordered_by_index() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/embeddings")
                    .header("authorization", "Bearer sk-test");
                then.status(200).json_body(json!({
                    "data": [
                        { "embedding": [0.0, 1.0], "index": 1 },
                        { "embedding": [1.0, 0.0], "index": 0 }
                    ]
                }));
            })
            .await;

        let vectors = client_for(&server)
            .generate_embeddings(vec!["a".into(), "b".into()])
            .await
            .expect("embeddings");

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn chat_completion_returns_first_choice() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({
                    "choices": [{ "message": { "role": "assistant", "content": " Findings. " } }]
                }));
            })
            .await;

        let answer = client_for(&server)
            .complete(CompletionRequest {
                model: "gpt-4o-mini".into(),
                prompt: "Question".into(),
                temperature: 0.0,
            })
            .await
            .expect("answer");

        assert_eq!(answer, "Findings.");
    }

    #[tokio::test]
    async fn empty_choice_yields_empty_answer() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200).json_body(json!({ "choices": [] }));
            })
            .await;

        let answer = client_for(&server)
            .complete(CompletionRequest {
                model: "gpt-4o-mini".into(),
                prompt: "Question".into(),
                temperature: 0.0,
            })
            .await
            .expect("empty answer");

        assert_eq!(answer, "");
    }
}
