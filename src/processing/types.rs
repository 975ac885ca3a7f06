//! Core data types and error definitions for the analysis pipeline.

use crate::completion::CompletionClientError;
use crate::embedding::EmbeddingClientError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One uploaded paper. Lives only for the duration of a single analysis.
#[derive(Debug, Clone)]
pub struct Document {
    /// Name supplied by the uploader, used for logging only.
    pub file_name: String,
    /// Raw bytes purporting to be a PDF.
    pub bytes: Vec<u8>,
}

/// Text extracted from a single PDF page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageText {
    /// One-based page number inside the source PDF.
    pub page_number: u32,
    /// Extracted page text.
    pub text: String,
}

/// Bounded slice of page text; the unit that gets embedded and retrieved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    /// Page the chunk was cut from. Chunks never span pages.
    pub page_number: u32,
    /// Chunk contents.
    pub text: String,
}

/// Structured summary returned for one paper.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// Main aim, goal, or purpose.
    pub aim: String,
    /// Key methods used.
    pub methodology: String,
    /// Main results or findings.
    pub results: String,
    /// Scope, limitations and boundaries.
    pub scope: String,
    /// Relevance to the caller's research topic.
    pub relevance: String,
}

impl AnalysisResult {
    /// Store the answer for a question in its matching field.
    pub fn set_answer(&mut self, question: ResearchQuestion, answer: String) {
        let slot = match question {
            ResearchQuestion::Aim => &mut self.aim,
            ResearchQuestion::Methodology => &mut self.methodology,
            ResearchQuestion::Results => &mut self.results,
            ResearchQuestion::Scope => &mut self.scope,
            ResearchQuestion::Relevance => &mut self.relevance,
        };
        *slot = answer;
    }
}

/// The fixed questions asked about every paper.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResearchQuestion {
    /// Aim, goal, or purpose.
    Aim,
    /// Methodology.
    Methodology,
    /// Results or findings.
    Results,
    /// Scope and limitations.
    Scope,
    /// Relevance to the research topic.
    Relevance,
}

impl ResearchQuestion {
    /// Every question, in the order the result fields are declared.
    pub const ALL: [Self; 5] = [
        Self::Aim,
        Self::Methodology,
        Self::Results,
        Self::Scope,
        Self::Relevance,
    ];

    /// Literal query text sent through the retrieval chain.
    pub fn query(self, topic: &str) -> String {
        match self {
            Self::Aim => {
                "What is the main aim, goal, or purpose of this research paper? Be concise.".into()
            }
            Self::Methodology => {
                "What methodology or methods were used in this research? List the key methods."
                    .into()
            }
            Self::Results => {
                "What are the main results or findings of this research? Summarize briefly.".into()
            }
            Self::Scope => "What is the scope of this research? Include any limitations or boundaries mentioned.".into(),
            Self::Relevance => format!(
                "How relevant is this paper to the research topic: \"{topic}\"? Explain why or why not."
            ),
        }
    }
}

/// Errors raised while turning uploaded bytes into page text.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The buffer does not carry a PDF header.
    #[error("upload is not a PDF (missing %PDF- header)")]
    NotPdf,
    /// The PDF structure could not be parsed.
    #[error("failed to parse PDF: {0}")]
    Malformed(String),
    /// The PDF is encrypted.
    #[error("PDF is encrypted")]
    Encrypted,
    /// The PDF has no pages.
    #[error("PDF has no pages")]
    NoPages,
    /// No page yielded any text (typically a scanned, image-only PDF).
    #[error("PDF contains no extractable text")]
    NoText,
}

/// Errors produced while splitting page text into chunks.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChunkingError {
    /// Chunk size of zero cannot hold any text.
    #[error("chunk size must be greater than zero")]
    InvalidChunkSize,
    /// Overlap must leave room for new text in every chunk.
    #[error("chunk overlap {overlap} must be smaller than chunk size {chunk_size}")]
    InvalidOverlap {
        /// Requested overlap.
        overlap: usize,
        /// Requested chunk size.
        chunk_size: usize,
    },
}

/// Errors raised while building or querying the in-memory vector index.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexError {
    /// No chunks were supplied.
    #[error("cannot build an index without chunks")]
    Empty,
    /// Chunk and vector counts disagree.
    #[error("received {vectors} vectors for {chunks} chunks")]
    CountMismatch {
        /// Number of chunks.
        chunks: usize,
        /// Number of vectors.
        vectors: usize,
    },
    /// A vector does not share the index dimensionality.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Dimension fixed by the first vector.
        expected: usize,
        /// Offending vector's dimension.
        actual: usize,
    },
}

/// Errors emitted by the analysis pipeline.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// Upload could not be read as a PDF.
    #[error("Failed to load document: {0}")]
    Load(#[from] LoadError),
    /// Chunking configuration was rejected.
    #[error("Failed to chunk document: {0}")]
    Chunking(#[from] ChunkingError),
    /// Embedding provider failed.
    #[error("Failed to generate embeddings: {0}")]
    Embedding(#[from] EmbeddingClientError),
    /// Language model failed.
    #[error("Failed to generate answer: {0}")]
    Completion(#[from] CompletionClientError),
    /// Vector index could not be built or queried.
    #[error("Vector index error: {0}")]
    Index(#[from] IndexError),
    /// Blocking worker panicked or was cancelled.
    #[error("Background task failed: {0}")]
    Worker(String),
}

impl AnalysisError {
    /// Whether the failure came from the hosted embedding or language model service.
    pub fn is_upstream(&self) -> bool {
        matches!(self, Self::Embedding(_) | Self::Completion(_))
    }
}
