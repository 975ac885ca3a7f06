//! Sequential batch client for `POST /api/analyze`.
//!
//! A [`ReviewSession`] holds a topic and a list of PDF files and uploads them one at a time,
//! awaiting each response before starting the next. The first failure aborts the batch and the
//! results collected so far are discarded, so a session either reports every paper or none.

use crate::processing::AnalysisResult;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

/// Errors raised while collecting or uploading papers.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A selected file could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        /// File that failed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// A selected directory could not be walked.
    #[error(transparent)]
    Walk(#[from] walkdir::Error),
    /// The request could not be sent or the response could not be decoded.
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    /// The server answered with a non-success status.
    #[error("server responded with {status}: {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Error message from the response body, when present.
        message: String,
    },
}

/// Expand files and directories into the PDF files they contain, in a stable order.
///
/// Directories are walked recursively. Anything without a `.pdf` extension is skipped.
pub fn collect_pdf_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>, ClientError> {
    let mut files = Vec::new();
    for path in paths {
        for entry in WalkDir::new(path).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            if is_pdf(entry.path()) {
                files.push(entry.into_path());
            } else {
                tracing::debug!(path = %entry.path().display(), "Skipping non-PDF file");
            }
        }
    }
    Ok(files)
}

fn is_pdf(path: &Path) -> bool {
    path.extension()
        .and_then(|extension| extension.to_str())
        .is_some_and(|extension| extension.eq_ignore_ascii_case("pdf"))
}

/// Sends one paper to the analysis endpoint.
#[async_trait]
pub trait AnalyzeTransport: Send + Sync {
    /// Upload `bytes` as `file_name` together with the research topic.
    async fn analyze(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        topic: &str,
    ) -> Result<AnalysisResult, ClientError>;
}

/// reqwest-backed transport talking to a running server.
pub struct HttpTransport {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpTransport {
    /// Target the server at `base_url`, e.g. `http://localhost:3000`.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            client,
            endpoint: format!("{}/api/analyze", base_url.trim().trim_end_matches('/')),
        })
    }
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

#[async_trait]
impl AnalyzeTransport for HttpTransport {
    async fn analyze(
        &self,
        file_name: &str,
        bytes: Vec<u8>,
        topic: &str,
    ) -> Result<AnalysisResult, ClientError> {
        let file = Part::bytes(bytes)
            .file_name(file_name.to_string())
            .mime_str("application/pdf")?;
        let form = Form::new().part("file", file).text("topic", topic.to_string());

        let response = self.client.post(&self.endpoint).multipart(form).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .map(|body| body.error)
                .unwrap_or(body);
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }
        Ok(response.json::<AnalysisResult>().await?)
    }
}

/// One analyzed paper as shown to the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperAnalysis {
    /// Name of the uploaded file.
    pub file_name: String,
    /// The five answers.
    #[serde(flatten)]
    pub analysis: AnalysisResult,
}

/// User-facing notices raised by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Notification {
    /// Submitted without a topic.
    MissingTopic,
    /// Submitted without any file.
    MissingFiles,
    /// Every file was analyzed.
    Completed,
    /// A file failed and the batch was aborted.
    Failed,
}

impl Notification {
    /// Text shown to the user.
    pub fn message(self) -> &'static str {
        match self {
            Self::MissingTopic => "Please enter your research topic",
            Self::MissingFiles => "Please upload at least one PDF file",
            Self::Completed => "Analysis completed successfully",
            Self::Failed => "An error occurred during analysis",
        }
    }

    /// Whether the notice reports a problem.
    pub fn is_error(self) -> bool {
        !matches!(self, Self::Completed)
    }
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// Progress of a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Nothing submitted yet, or the submission failed validation.
    Idle,
    /// Uploading the file at `index` (zero-based) of `total`.
    Uploading {
        /// Position of the file being uploaded.
        index: usize,
        /// Files in the batch.
        total: usize,
    },
    /// Every file was analyzed.
    Done,
    /// A file failed and the remaining files were skipped.
    Failed,
}

/// A topic plus the files to analyze against it.
pub struct ReviewSession<T> {
    transport: T,
    topic: String,
    files: Vec<PathBuf>,
    state: SessionState,
    results: Vec<PaperAnalysis>,
    notifications: Vec<Notification>,
}

impl<T: AnalyzeTransport> ReviewSession<T> {
    /// Start an idle session.
    pub fn new(transport: T, topic: impl Into<String>, files: Vec<PathBuf>) -> Self {
        Self {
            transport,
            topic: topic.into(),
            files,
            state: SessionState::Idle,
            results: Vec::new(),
            notifications: Vec::new(),
        }
    }

    /// Current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Results of the last successful batch, in upload order.
    pub fn results(&self) -> &[PaperAnalysis] {
        &self.results
    }

    /// Every notification raised so far.
    pub fn notifications(&self) -> &[Notification] {
        &self.notifications
    }

    /// Validate the input and upload every file in order.
    ///
    /// `observe` sees each state transition. Results are only replaced when the whole batch
    /// succeeds.
    pub async fn submit(&mut self, mut observe: impl FnMut(&SessionState)) -> SessionState {
        if self.topic.trim().is_empty() {
            self.notifications.push(Notification::MissingTopic);
            return self.state;
        }
        if self.files.is_empty() {
            self.notifications.push(Notification::MissingFiles);
            return self.state;
        }

        let files = self.files.clone();
        let total = files.len();
        let mut collected = Vec::with_capacity(total);
        for (index, path) in files.iter().enumerate() {
            self.state = SessionState::Uploading { index, total };
            observe(&self.state);

            match self.analyze_file(path).await {
                Ok(paper) => collected.push(paper),
                Err(error) => {
                    tracing::error!(
                        file = %path.display(),
                        position = index + 1,
                        total,
                        error = %error,
                        "Analysis failed; discarding batch"
                    );
                    self.state = SessionState::Failed;
                    self.notifications.push(Notification::Failed);
                    observe(&self.state);
                    return self.state;
                }
            }
        }

        self.results = collected;
        self.state = SessionState::Done;
        self.notifications.push(Notification::Completed);
        observe(&self.state);
        self.state
    }

    async fn analyze_file(&self, path: &Path) -> Result<PaperAnalysis, ClientError> {
        let bytes = tokio::fs::read(path)
            .await
            .map_err(|source| ClientError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());

        let analysis = self
            .transport
            .analyze(&file_name, bytes, &self.topic)
            .await?;
        Ok(PaperAnalysis {
            file_name,
            analysis,
        })
    }
}
