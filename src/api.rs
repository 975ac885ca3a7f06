//! HTTP surface for the literature review assistant.
//!
//! - `POST /api/analyze` – multipart form with a `file` (PDF) and a `topic`. Returns
//!   `{aim, methodology, results, scope, relevance}` on success, `400` when either field is
//!   missing or empty, and an opaque `500` for any processing failure. Failure details are only
//!   logged server-side.
//! - `GET /api/metrics` – analysis counters since startup.

use crate::metrics::MetricsSnapshot;
use crate::processing::{AnalysisApi, AnalysisError, AnalysisResult, Document};
use axum::{
    Json, Router,
    extract::{
        DefaultBodyLimit, Multipart, State,
        multipart::{MultipartError, MultipartRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use std::sync::Arc;

/// Body message for requests missing the file or the topic.
pub const VALIDATION_MESSAGE: &str = "File and topic are required";
/// Body message for every server-side failure.
pub const PROCESSING_MESSAGE: &str = "Error processing PDF";

const DEFAULT_FILE_NAME: &str = "upload.pdf";

/// Build the HTTP router exposing the analysis API surface.
pub fn create_router<S>(service: Arc<S>, max_upload_bytes: usize) -> Router
where
    S: AnalysisApi + 'static,
{
    Router::new()
        .route("/api/analyze", post(analyze_document::<S>))
        .route("/api/metrics", get(get_metrics::<S>))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(service)
}

#[derive(Default)]
struct AnalyzeForm {
    file: Option<Upload>,
    topic: Option<String>,
}

struct Upload {
    file_name: String,
    bytes: Vec<u8>,
}

async fn read_form(mut multipart: Multipart) -> Result<AnalyzeForm, MultipartError> {
    let mut form = AnalyzeForm::default();
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("file") => {
                let file_name = field
                    .file_name()
                    .filter(|name| !name.trim().is_empty())
                    .unwrap_or(DEFAULT_FILE_NAME)
                    .to_string();
                let bytes = field.bytes().await?;
                form.file = Some(Upload {
                    file_name,
                    bytes: bytes.to_vec(),
                });
            }
            Some("topic") => {
                // strict decoding: an undecodable topic counts as missing
                let bytes = field.bytes().await?;
                form.topic = match String::from_utf8(bytes.to_vec()) {
                    Ok(topic) => Some(topic),
                    Err(error) => {
                        tracing::debug!(error = %error, "Discarding non UTF-8 topic field");
                        None
                    }
                }
            }
            other => tracing::debug!(field = ?other, "Ignoring unexpected form field"),
        }
    }
    Ok(form)
}

/// Analyze one uploaded paper against the supplied research topic.
async fn analyze_document<S>(
    State(service): State<Arc<S>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<AnalysisResult>, AppError>
where
    S: AnalysisApi,
{
    let multipart = multipart.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Analyze request is not a multipart form");
        AppError::Validation
    })?;
    let form = read_form(multipart).await.map_err(AppError::Upload)?;

    let upload = form.file.filter(|upload| !upload.bytes.is_empty());
    let topic = form.topic.filter(|topic| !topic.trim().is_empty());
    let (Some(upload), Some(topic)) = (upload, topic) else {
        tracing::info!("Rejected analyze request missing file or topic");
        return Err(AppError::Validation);
    };

    tracing::info!(
        file = %upload.file_name,
        bytes = upload.bytes.len(),
        "Analyze request received"
    );
    let result = service
        .analyze(
            Document {
                file_name: upload.file_name,
                bytes: upload.bytes,
            },
            topic,
        )
        .await
        .map_err(AppError::Processing)?;
    Ok(Json(result))
}

/// Return the analysis counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: AnalysisApi,
{
    Json(service.metrics_snapshot())
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
}

enum AppError {
    Validation,
    Upload(MultipartError),
    Processing(AnalysisError),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation => (
                StatusCode::BAD_REQUEST,
                Json(ErrorBody {
                    error: VALIDATION_MESSAGE,
                }),
            )
                .into_response(),
            Self::Upload(error) => {
                tracing::error!(error = %error, "Failed to read multipart upload");
                processing_failure()
            }
            Self::Processing(error) => {
                tracing::debug!(error = %error, "Returning generic processing error");
                processing_failure()
            }
        }
    }
}

fn processing_failure() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            error: PROCESSING_MESSAGE,
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::LoadError;
    use async_trait::async_trait;
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request, header},
    };
    use tokio::sync::Mutex;
    use tower::ServiceExt;

    const BOUNDARY: &str = "litreview-test-boundary";

    #[derive(Clone, Debug)]
    struct AnalyzeCall {
        file_name: String,
        bytes: Vec<u8>,
        topic: String,
    }

    struct StubAnalysisService {
        calls: Mutex<Vec<AnalyzeCall>>,
        fail: bool,
    }

    impl StubAnalysisService {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(Self {
                calls: Mutex::new(Vec::new()),
                fail,
            })
        }

        async fn recorded_calls(&self) -> Vec<AnalyzeCall> {
            self.calls.lock().await.clone()
        }
    }

    #[async_trait]
    impl AnalysisApi for StubAnalysisService {
        async fn analyze(
            &self,
            document: Document,
            topic: String,
        ) -> Result<AnalysisResult, AnalysisError> {
            self.calls.lock().await.push(AnalyzeCall {
                file_name: document.file_name,
                bytes: document.bytes,
                topic,
            });
            if self.fail {
                return Err(LoadError::Malformed("secret parser detail".into()).into());
            }
            Ok(AnalysisResult {
                aim: "aim".into(),
                methodology: "methods".into(),
                results: "results".into(),
                scope: "scope".into(),
                relevance: "relevance".into(),
            })
        }

        fn metrics_snapshot(&self) -> MetricsSnapshot {
            MetricsSnapshot {
                documents_analyzed: 3,
                ..MetricsSnapshot::default()
            }
        }
    }

    enum Part<'a> {
        Text(&'a str, &'a str),
        File(&'a str, &'a str, &'a [u8]),
    }

    fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
        let mut body = Vec::new();
        for part in parts {
            body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
            match part {
                Part::Text(name, value) => {
                    body.extend_from_slice(
                        format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n")
                            .as_bytes(),
                    );
                    body.extend_from_slice(value.as_bytes());
                }
                Part::File(name, file_name, bytes) => {
                    body.extend_from_slice(
                        format!(
                            "Content-Disposition: form-data; name=\"{name}\"; filename=\"{file_name}\"\r\nContent-Type: application/pdf\r\n\r\n"
                        )
                        .as_bytes(),
                    );
                    body.extend_from_slice(bytes);
                }
            }
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    async fn post_form(
        service: Arc<StubAnalysisService>,
        parts: &[Part<'_>],
    ) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/analyze")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(multipart_body(parts)))
            .expect("request");
        send(service, request).await
    }

    async fn send(
        service: Arc<StubAnalysisService>,
        request: Request<Body>,
    ) -> (StatusCode, serde_json::Value) {
        let response = create_router(service, 1024 * 1024)
            .oneshot(request)
            .await
            .expect("router response");
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body bytes");
        (status, serde_json::from_slice(&body).expect("json body"))
    }

    fn validation_body() -> serde_json::Value {
        serde_json::json!({ "error": "File and topic are required" })
    }

    #[tokio::test]
    async fn analyze_route_returns_the_five_fields() {
        let service = StubAnalysisService::new(false);
        let (status, json) = post_form(
            service.clone(),
            &[
                Part::File("file", "paper.pdf", b"%PDF-1.5 bytes"),
                Part::Text("topic", "graph neural networks"),
            ],
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let object = json.as_object().expect("object");
        assert_eq!(object.len(), 5);
        for key in ["aim", "methodology", "results", "scope", "relevance"] {
            assert!(!object[key].as_str().expect("string field").is_empty());
        }

        let calls = service.recorded_calls().await;
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].file_name, "paper.pdf");
        assert_eq!(calls[0].bytes, b"%PDF-1.5 bytes");
        assert_eq!(calls[0].topic, "graph neural networks");
    }

    #[tokio::test]
    async fn missing_topic_is_rejected_before_analysis() {
        let service = StubAnalysisService::new(false);
        let (status, json) = post_form(
            service.clone(),
            &[Part::File("file", "paper.pdf", b"%PDF-1.5 bytes")],
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, validation_body());
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn missing_file_is_rejected_before_analysis() {
        let service = StubAnalysisService::new(false);
        let (status, json) =
            post_form(service.clone(), &[Part::Text("topic", "transformers")]).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, validation_body());
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn empty_file_or_blank_topic_is_rejected() {
        let service = StubAnalysisService::new(false);
        let (status, _) = post_form(
            service.clone(),
            &[
                Part::File("file", "paper.pdf", b""),
                Part::Text("topic", "transformers"),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, json) = post_form(
            service.clone(),
            &[
                Part::File("file", "paper.pdf", b"%PDF-1.5"),
                Part::Text("topic", "   "),
            ],
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, validation_body());
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn non_utf8_topic_is_a_validation_error() {
        let service = StubAnalysisService::new(false);
        let mut body = multipart_body(&[Part::File("file", "paper.pdf", b"%PDF-1.5")]);
        let closing = format!("--{BOUNDARY}--\r\n");
        body.truncate(body.len() - closing.len());
        body.extend_from_slice(
            format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"topic\"\r\n\r\n")
                .as_bytes(),
        );
        body.extend_from_slice(&[0xff, 0xfe, 0xfd]);
        body.extend_from_slice(format!("\r\n{closing}").as_bytes());
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/analyze")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request");

        let (status, json) = send(service.clone(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, validation_body());
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn non_multipart_request_is_a_validation_error() {
        let service = StubAnalysisService::new(false);
        let request = Request::builder()
            .method(Method::POST)
            .uri("/api/analyze")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"topic":"x"}"#))
            .expect("request");

        let (status, json) = send(service.clone(), request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(json, validation_body());
        assert!(service.recorded_calls().await.is_empty());
    }

    #[tokio::test]
    async fn pipeline_failure_is_opaque_to_the_client() {
        let service = StubAnalysisService::new(true);
        let (status, json) = post_form(
            service.clone(),
            &[
                Part::File("file", "broken.pdf", b"not a pdf"),
                Part::Text("topic", "transformers"),
            ],
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json, serde_json::json!({ "error": "Error processing PDF" }));
        assert!(!json.to_string().contains("secret parser detail"));
        assert_eq!(service.recorded_calls().await.len(), 1);
    }

    #[tokio::test]
    async fn metrics_route_reports_snapshot() {
        let service = StubAnalysisService::new(false);
        let request = Request::builder()
            .method(Method::GET)
            .uri("/api/metrics")
            .body(Body::empty())
            .expect("request");

        let (status, json) = send(service, request).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["documents_analyzed"], 3);
        assert_eq!(json["failed_analyses"], 0);
    }
}
