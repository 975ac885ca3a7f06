//! Ephemeral in-memory vector index built once per analyzed document.

use super::types::{Chunk, IndexError};

struct IndexedChunk {
    chunk: Chunk,
    vector: Vec<f32>,
    norm: f32,
}

/// A retrieved chunk with its cosine similarity to the query.
#[derive(Debug, Clone, Copy)]
pub struct ScoredChunk<'a> {
    /// Retrieved chunk.
    pub chunk: &'a Chunk,
    /// Cosine similarity in `[-1, 1]`; zero vectors score `0`.
    pub score: f32,
}

/// Exact nearest-neighbour index over one document's chunk embeddings.
///
/// Build, query, drop. There is no update or persistence path.
pub struct VectorIndex {
    entries: Vec<IndexedChunk>,
    dimension: usize,
}

impl VectorIndex {
    /// Pair every chunk with its embedding. All vectors must share one dimension.
    pub fn build(chunks: Vec<Chunk>, vectors: Vec<Vec<f32>>) -> Result<Self, IndexError> {
        if chunks.is_empty() {
            return Err(IndexError::Empty);
        }
        if chunks.len() != vectors.len() {
            return Err(IndexError::CountMismatch {
                chunks: chunks.len(),
                vectors: vectors.len(),
            });
        }

        let dimension = vectors[0].len();
        let mut entries = Vec::with_capacity(chunks.len());
        for (chunk, vector) in chunks.into_iter().zip(vectors) {
            if vector.len() != dimension || dimension == 0 {
                return Err(IndexError::DimensionMismatch {
                    expected: dimension,
                    actual: vector.len(),
                });
            }
            let norm = l2_norm(&vector);
            entries.push(IndexedChunk {
                chunk,
                vector,
                norm,
            });
        }

        Ok(Self { entries, dimension })
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false for a successfully built index.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Dimensionality shared by every indexed vector.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Return up to `k` chunks ordered by descending similarity. Ties keep document order.
    pub fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredChunk<'_>>, IndexError> {
        if vector.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }

        let query_norm = l2_norm(vector);
        let mut scored: Vec<ScoredChunk<'_>> = self
            .entries
            .iter()
            .map(|entry| ScoredChunk {
                chunk: &entry.chunk,
                score: cosine(vector, query_norm, &entry.vector, entry.norm),
            })
            .collect();
        scored.sort_by(|left, right| right.score.total_cmp(&left.score));
        scored.truncate(k);
        Ok(scored)
    }
}

fn l2_norm(vector: &[f32]) -> f32 {
    vector.iter().map(|value| value * value).sum::<f32>().sqrt()
}

fn cosine(left: &[f32], left_norm: f32, right: &[f32], right_norm: f32) -> f32 {
    if left_norm == 0.0 || right_norm == 0.0 {
        return 0.0;
    }
    let dot: f32 = left.iter().zip(right).map(|(a, b)| a * b).sum();
    dot / (left_norm * right_norm)
}
