//! Retrieval-augmented question answering over a single document's index.

use super::index::VectorIndex;
use super::types::AnalysisError;
use crate::completion::{CompletionClient, CompletionRequest};
use crate::embedding::EmbeddingClient;

/// Parameters for one retrieval chain.
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalSettings {
    /// Chunks retrieved per question.
    pub top_k: usize,
    /// Language model asked to answer.
    pub chat_model: String,
    /// Sampling temperature.
    pub temperature: f32,
}

impl Default for RetrievalSettings {
    fn default() -> Self {
        Self {
            top_k: 4,
            chat_model: "gemini-pro".to_string(),
            temperature: 0.0,
        }
    }
}

/// Stuff the retrieved chunks into the standard QA prompt.
pub fn build_prompt(context: &[&str], question: &str) -> String {
    format!(
        "Use the following pieces of context to answer the question at the end. \
         If you don't know the answer, just say that you don't know, don't try to make up an answer.\n\n\
         {}\n\nQuestion: {question}\nHelpful Answer:",
        context.join("\n\n")
    )
}

/// Answers questions against one [`VectorIndex`]; borrowed for the lifetime of an analysis.
pub struct RetrievalQa<'a> {
    index: &'a VectorIndex,
    embedder: &'a dyn EmbeddingClient,
    completer: &'a dyn CompletionClient,
    settings: &'a RetrievalSettings,
}

impl<'a> RetrievalQa<'a> {
    /// Bind the chain to an index and the model clients.
    pub fn new(
        index: &'a VectorIndex,
        embedder: &'a dyn EmbeddingClient,
        completer: &'a dyn CompletionClient,
        settings: &'a RetrievalSettings,
    ) -> Self {
        Self {
            index,
            embedder,
            completer,
            settings,
        }
    }

    /// Embed the question, retrieve the closest chunks, and return the model's answer.
    pub async fn answer(&self, question: &str) -> Result<String, AnalysisError> {
        let query_vector = self.embedder.embed_query(question).await?;
        let hits = self.index.query(&query_vector, self.settings.top_k)?;
        tracing::debug!(
            question,
            retrieved = hits.len(),
            pages = ?hits.iter().map(|hit| hit.chunk.page_number).collect::<Vec<_>>(),
            "Retrieved context"
        );

        let context: Vec<&str> = hits.iter().map(|hit| hit.chunk.text.as_str()).collect();
        let answer = self
            .completer
            .complete(CompletionRequest {
                model: self.settings.chat_model.clone(),
                prompt: build_prompt(&context, question),
                temperature: self.settings.temperature,
            })
            .await?;
        Ok(answer)
    }
}
