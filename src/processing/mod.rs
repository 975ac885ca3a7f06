//! Document analysis pipeline: PDF loading, chunking, embedding, indexing, and retrieval QA.

pub mod chunking;
pub mod index;
pub mod loader;
pub mod retrieval;
mod service;
pub mod types;

pub use chunking::ChunkingSettings;
pub use retrieval::RetrievalSettings;
pub use service::{AnalysisApi, AnalysisService, AnalysisSettings};
pub use types::{
    AnalysisError, AnalysisResult, Chunk, ChunkingError, Document, IndexError, LoadError,
    PageText, ResearchQuestion,
};
