use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters describing analysis activity since startup.
#[derive(Default)]
pub struct AnalysisMetrics {
    documents_analyzed: AtomicU64,
    chunks_indexed: AtomicU64,
    questions_answered: AtomicU64,
    failed_analyses: AtomicU64,
}

impl AnalysisMetrics {
    /// Create an empty metrics accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed analysis with the number of chunks indexed and questions answered.
    pub fn record_analysis(&self, chunk_count: u64, question_count: u64) {
        self.documents_analyzed.fetch_add(1, Ordering::Relaxed);
        self.chunks_indexed.fetch_add(chunk_count, Ordering::Relaxed);
        self.questions_answered
            .fetch_add(question_count, Ordering::Relaxed);
    }

    /// Record an analysis that ended in an error.
    pub fn record_failure(&self) {
        self.failed_analyses.fetch_add(1, Ordering::Relaxed);
    }

    /// Return a snapshot of the current counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            documents_analyzed: self.documents_analyzed.load(Ordering::Relaxed),
            chunks_indexed: self.chunks_indexed.load(Ordering::Relaxed),
            questions_answered: self.questions_answered.load(Ordering::Relaxed),
            failed_analyses: self.failed_analyses.load(Ordering::Relaxed),
        }
    }
}

/// Immutable view of analysis counters used for reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct MetricsSnapshot {
    /// Documents analyzed successfully.
    pub documents_analyzed: u64,
    /// Total chunks embedded across all successful analyses.
    pub chunks_indexed: u64,
    /// Questions answered by the language model.
    pub questions_answered: u64,
    /// Analyses that failed at any stage.
    pub failed_analyses: u64,
}
