#![deny(missing_docs)]

//! Core library for the literature review assistant: PDF analysis over retrieval-augmented QA.

/// HTTP routing and REST handlers.
pub mod api;
/// Sequential batch client for the analysis endpoint.
pub mod client;
/// Language-model completion abstraction.
pub mod completion;
/// Environment-driven configuration management.
pub mod config;
/// Embedding client abstraction.
pub mod embedding;
/// Structured logging and tracing setup.
pub mod logging;
/// Analysis metrics helpers.
pub mod metrics;
/// Document analysis pipeline.
pub mod processing;
/// Hosted model provider adapters.
pub mod providers;
