//! Google Generative Language API adapter (`embedContent`, `batchEmbedContents`,
//! `generateContent`).

use super::{ProviderError, ProviderSettings, build_http_client, require_api_key, send_json};
use crate::completion::{CompletionClient, CompletionClientError, CompletionRequest, answer_text};
use crate::embedding::{EmbeddingClient, EmbeddingClientError, ensure_count};
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Value, json};

const PROVIDER: &str = "Gemini";
const API_KEY_HEADER: &str = "x-goog-api-key";

/// Client for Gemini embeddings and text generation.
pub struct GeminiClient {
    http: Client,
    settings: ProviderSettings,
}

impl GeminiClient {
    /// Build a client from provider settings.
    pub fn new(settings: ProviderSettings) -> Result<Self, ProviderError> {
        Ok(Self {
            http: build_http_client()?,
            settings,
        })
    }

    fn endpoint(&self, model: &str, method: &str) -> String {
        format!(
            "{}/v1beta/{}:{method}",
            self.settings.base_url,
            model_resource(model)
        )
    }

    async fn post<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        body: &Value,
    ) -> Result<T, ProviderError> {
        let api_key = require_api_key(PROVIDER, self.settings.api_key.as_deref())?;
        send_json(
            PROVIDER,
            self.http.post(url).header(API_KEY_HEADER, api_key).json(body),
        )
        .await
    }
}

fn model_resource(model: &str) -> String {
    if model.starts_with("models/") {
        model.to_string()
    } else {
        format!("models/{model}")
    }
}

#[derive(Debug, Deserialize)]
struct ContentEmbedding {
    values: Vec<f32>,
}

#[derive(Debug, Deserialize)]
struct BatchEmbedResponse {
    #[serde(default)]
    embeddings: Vec<ContentEmbedding>,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    embedding: ContentEmbedding,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[async_trait]
impl EmbeddingClient for GeminiClient {
    async fn generate_embeddings(
        &self,
        texts: Vec<String>,
    ) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        let model = model_resource(&self.settings.embedding_model);
        let requests: Vec<Value> = texts
            .iter()
            .map(|text| {
                json!({
                    "model": model,
                    "content": { "parts": [{ "text": text }] },
                    "taskType": "RETRIEVAL_DOCUMENT",
                })
            })
            .collect();

        let response: BatchEmbedResponse = self
            .post(
                self.endpoint(&self.settings.embedding_model, "batchEmbedContents"),
                &json!({ "requests": requests }),
            )
            .await?;

        let vectors = response
            .embeddings
            .into_iter()
            .map(|embedding| embedding.values)
            .collect();
        ensure_count(texts.len(), vectors)
    }

    async fn embed_query(&self, query: &str) -> Result<Vec<f32>, EmbeddingClientError> {
        let body = json!({
            "model": model_resource(&self.settings.embedding_model),
            "content": { "parts": [{ "text": query }] },
            "taskType": "RETRIEVAL_QUERY",
        });
        let response: EmbedResponse = self
            .post(
                self.endpoint(&self.settings.embedding_model, "embedContent"),
                &body,
            )
            .await?;
        if response.embedding.values.is_empty() {
            return Err(EmbeddingClientError::EmptyResponse);
        }
        Ok(response.embedding.values)
    }
}

#[async_trait]
impl CompletionClient for GeminiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, CompletionClientError> {
        let body = json!({
            "contents": [{ "role": "user", "parts": [{ "text": request.prompt }] }],
            "generationConfig": { "temperature": request.temperature },
        });
        let response: GenerateResponse = self
            .post(self.endpoint(&request.model, "generateContent"), &body)
            .await?;

        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| {
                content
                    .parts
                    .into_iter()
                    .filter_map(|part| part.text)
                    .collect()
            })
            .unwrap_or_default();
        Ok(answer_text(text))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::POST, MockServer};

    fn client_for(server: &MockServer, api_key: Option<&str>) -> GeminiClient {
        GeminiClient::new(ProviderSettings::new(
            server.base_url(),
            api_key.map(str::to_string),
            "embedding-001",
        ))
        .expect("client")
    }

    #[tokio::test]
    async fn batch_embeddings_preserve_input_order() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/embedding-001:batchEmbedContents")
                    .header(API_KEY_HEADER, "secret")
                    .body_contains("RETRIEVAL_DOCUMENT");
                then.status(200).json_body(json!({
                    "embeddings": [
                        { "values": [1.0, 0.0] },
                        { "values": [0.0, 1.0] }
                    ]
                }));
            })
            .await;

        let vectors = client_for(&server, Some("secret"))
            .generate_embeddings(vec!["first".into(), "second".into()])
            .await
            .expect("embeddings");

        mock.assert_async().await;
        assert_eq!(vectors, vec![vec![1.0, 0.0], vec![0.0, 1.0]]);
    }

    #[tokio::test]
    async fn query_embeddings_use_retrieval_query_task() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/embedding-001:embedContent")
                    .body_contains("RETRIEVAL_QUERY");
                then.status(200)
                    .json_body(json!({ "embedding": { "values": [0.5, 0.5] } }));
            })
            .await;

        let vector = client_for(&server, Some("secret"))
            .embed_query("what is the aim?")
            .await
            .expect("query vector");

        mock.assert_async().await;
        assert_eq!(vector, vec![0.5, 0.5]);
    }

    #[tokio::test]
    async fn generate_content_joins_candidate_parts() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1beta/models/gemini-pro:generateContent")
                    .body_contains("\"temperature\":0.0");
                then.status(200).json_body(json!({
                    "candidates": [{
                        "content": { "parts": [{ "text": "The aim " }, { "text": "is X." }] }
                    }]
                }));
            })
            .await;

        let answer = client_for(&server, Some("secret"))
            .complete(CompletionRequest {
                model: "gemini-pro".into(),
                prompt: "Question".into(),
                temperature: 0.0,
            })
            .await
            .expect("answer");

        mock.assert_async().await;
        assert_eq!(answer, "The aim is X.");
    }

    #[tokio::test]
    async fn missing_api_key_fails_before_any_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200);
            })
            .await;

        let error = client_for(&server, None)
            .generate_embeddings(vec!["text".into()])
            .await
            .expect_err("missing key");

        assert_eq!(mock.hits_async().await, 0);
        assert!(matches!(
            error,
            EmbeddingClientError::Provider(ProviderError::MissingApiKey { .. })
        ));
    }

    #[tokio::test]
    async fn quota_errors_surface_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(429).body("quota exhausted");
            })
            .await;

        let error = client_for(&server, Some("secret"))
            .complete(CompletionRequest {
                model: "gemini-pro".into(),
                prompt: "Question".into(),
                temperature: 0.0,
            })
            .await
            .expect_err("quota error");

        assert!(error.to_string().contains("429"));
    }
}
