//! Analysis service coordinating loading, chunking, embedding, indexing, and question answering.

use crate::{
    completion::{CompletionClient, completion_client_for},
    config::Config,
    embedding::{EmbeddingClient, EmbeddingClientError, embedding_client_for},
    metrics::{AnalysisMetrics, MetricsSnapshot},
    processing::{
        chunking::{ChunkingSettings, split_pages},
        index::VectorIndex,
        loader::load_pdf,
        retrieval::{RetrievalQa, RetrievalSettings},
        types::{AnalysisError, AnalysisResult, Chunk, Document, ResearchQuestion},
    },
    providers::ProviderError,
};
use async_trait::async_trait;
use futures_util::future::try_join_all;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// Tunables for one analysis run.
#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisSettings {
    /// Chunk sizing.
    pub chunking: ChunkingSettings,
    /// Maximum chunks per embedding request.
    pub embedding_batch_size: usize,
    /// Retrieval chain parameters.
    pub retrieval: RetrievalSettings,
}

impl Default for AnalysisSettings {
    fn default() -> Self {
        Self {
            chunking: ChunkingSettings::default(),
            embedding_batch_size: 100,
            retrieval: RetrievalSettings::default(),
        }
    }
}

impl AnalysisSettings {
    /// Derive settings from the loaded configuration.
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunking: ChunkingSettings {
                chunk_size: config.text_splitter_chunk_size,
                chunk_overlap: config.text_splitter_chunk_overlap,
            },
            embedding_batch_size: config.embedding_batch_size,
            retrieval: RetrievalSettings {
                top_k: config.retriever_top_k,
                chat_model: config.chat_model.clone(),
                temperature: config.model_temperature,
            },
        }
    }
}

/// Abstraction over the analysis pipeline used by the HTTP surface.
#[async_trait]
pub trait AnalysisApi: Send + Sync {
    /// Analyze one paper against a research topic.
    async fn analyze(
        &self,
        document: Document,
        topic: String,
    ) -> Result<AnalysisResult, AnalysisError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Runs the full per-document pipeline.
///
/// The service owns long-lived handles to the model clients and the metrics registry. Every
/// call to [`AnalysisService::analyze`] builds its own [`VectorIndex`] and drops it on return, so
/// concurrent requests never share chunks. Construct once near process start and share it through
/// an `Arc`.
pub struct AnalysisService {
    embedding_client: Arc<dyn EmbeddingClient>,
    completion_client: Arc<dyn CompletionClient>,
    settings: AnalysisSettings,
    metrics: Arc<AnalysisMetrics>,
}

impl AnalysisService {
    /// Assemble a service from explicit clients and settings.
    pub fn new(
        embedding_client: Arc<dyn EmbeddingClient>,
        completion_client: Arc<dyn CompletionClient>,
        settings: AnalysisSettings,
    ) -> Self {
        Self {
            embedding_client,
            completion_client,
            settings,
            metrics: Arc::new(AnalysisMetrics::new()),
        }
    }

    /// Build a service, and its provider clients, from configuration.
    pub fn from_config(config: &Config) -> Result<Self, ProviderError> {
        tracing::info!(provider = ?config.model_provider, "Initializing model clients");
        if config.model_provider.requires_api_key() && config.api_key.is_none() {
            tracing::warn!(
                provider = ?config.model_provider,
                "No PROVIDER_API_KEY configured; every analysis will fail until one is set"
            );
        }
        let embedding_client = embedding_client_for(config)?;
        let completion_client = completion_client_for(config)?;
        tracing::info!("Model clients initialized");
        Ok(Self::new(
            embedding_client,
            completion_client,
            AnalysisSettings::from_config(config),
        ))
    }

    /// Analyze a document: load, chunk, embed, index, then ask every research question.
    ///
    /// The questions run concurrently against the same index. The first failing question aborts
    /// the analysis and drops the others; no partial result is ever returned.
    pub async fn analyze(
        &self,
        document: Document,
        topic: String,
    ) -> Result<AnalysisResult, AnalysisError> {
        let request_id = Uuid::new_v4();
        let digest = hex::encode(Sha256::digest(&document.bytes));
        let span = tracing::info_span!(
            "analysis",
            %request_id,
            file = %document.file_name,
            sha256 = %digest
        );

        let outcome = self.run_pipeline(document, &topic).instrument(span.clone()).await;
        span.in_scope(|| match &outcome {
            Ok((_, chunk_count)) => {
                self.metrics
                    .record_analysis(*chunk_count as u64, ResearchQuestion::ALL.len() as u64);
                tracing::info!(chunks = chunk_count, "Analysis completed");
            }
            Err(AnalysisError::Load(error)) => {
                self.metrics.record_failure();
                tracing::warn!(error = %error, "Rejected unreadable PDF");
            }
            Err(error) => {
                self.metrics.record_failure();
                tracing::error!(error = %error, upstream = error.is_upstream(), "Analysis failed");
            }
        });
        outcome.map(|(result, _)| result)
    }

    async fn run_pipeline(
        &self,
        document: Document,
        topic: &str,
    ) -> Result<(AnalysisResult, usize), AnalysisError> {
        let Document { file_name, bytes } = document;
        tracing::info!(file = %file_name, bytes = bytes.len(), "Processing document");

        let chunking = self.settings.chunking;
        let (page_count, chunks) = tokio::task::spawn_blocking(move || {
            let pages = load_pdf(&bytes)?;
            let chunks = split_pages(&pages, chunking)?;
            Ok::<_, AnalysisError>((pages.len(), chunks))
        })
        .await
        .map_err(|error| AnalysisError::Worker(error.to_string()))??;
        tracing::debug!(
            pages = page_count,
            chunks = chunks.len(),
            chunk_size = self.settings.chunking.chunk_size,
            overlap = self.settings.chunking.chunk_overlap,
            "Chunked document"
        );

        let vectors = self.embed_chunks(&chunks).await?;
        let index = VectorIndex::build(chunks, vectors)?;
        let chunk_count = index.len();
        tracing::debug!(
            chunks = chunk_count,
            dimension = index.dimension(),
            "Built vector index"
        );

        let qa = RetrievalQa::new(
            &index,
            self.embedding_client.as_ref(),
            self.completion_client.as_ref(),
            &self.settings.retrieval,
        );
        let queries = ResearchQuestion::ALL.map(|question| question.query(topic));
        let answers = try_join_all(queries.iter().map(|query| qa.answer(query))).await?;

        let mut result = AnalysisResult::default();
        for (question, answer) in ResearchQuestion::ALL.into_iter().zip(answers) {
            result.set_answer(question, answer);
        }
        Ok((result, chunk_count))
    }

    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>, EmbeddingClientError> {
        let mut vectors = Vec::with_capacity(chunks.len());
        for batch in chunks.chunks(self.settings.embedding_batch_size.max(1)) {
            let texts = batch.iter().map(|chunk| chunk.text.clone()).collect();
            let mut embedded = self.embedding_client.generate_embeddings(texts).await?;
            vectors.append(&mut embedded);
        }
        Ok(vectors)
    }

    /// Return the current analysis metrics snapshot.
    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

#[async_trait]
impl AnalysisApi for AnalysisService {
    async fn analyze(
        &self,
        document: Document,
        topic: String,
    ) -> Result<AnalysisResult, AnalysisError> {
        AnalysisService::analyze(self, document, topic).await
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        AnalysisService::metrics_snapshot(self)
    }
}
