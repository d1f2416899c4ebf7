//! In-memory dense vector index.
//!
//! Vectors are L2-normalized at build time so cosine similarity reduces to a
//! dot product. The corpus is small (a few thousand pages), so search is a
//! flat scan.

use std::sync::Arc;

use regula_core::Chunk;

use crate::StoreError;

#[derive(Debug)]
pub struct VectorIndex {
    chunks: Vec<Arc<Chunk>>,
    vectors: Vec<Vec<f32>>,
    dim: usize,
}

impl VectorIndex {
    /// Build from `(chunk, embedding)` pairs. All embeddings must share one
    /// dimension.
    pub fn build(
        entries: impl IntoIterator<Item = (Arc<Chunk>, Vec<f32>)>,
    ) -> Result<Self, StoreError> {
        let mut chunks = Vec::new();
        let mut vectors = Vec::new();
        let mut dim = 0;

        for (chunk, mut vector) in entries {
            if vectors.is_empty() {
                dim = vector.len();
            } else if vector.len() != dim {
                return Err(StoreError::DimensionMismatch {
                    expected: dim,
                    found: vector.len(),
                });
            }
            normalize(&mut vector);
            chunks.push(chunk);
            vectors.push(vector);
        }

        Ok(Self { chunks, vectors, dim })
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Embedding dimension, 0 for an empty index.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// The `k` chunks most similar to `query`, best first. Equal similarities
    /// keep index order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Arc<Chunk>>, StoreError> {
        if self.is_empty() {
            return Ok(Vec::new());
        }
        if query.len() != self.dim {
            return Err(StoreError::DimensionMismatch {
                expected: self.dim,
                found: query.len(),
            });
        }

        let mut query = query.to_vec();
        normalize(&mut query);

        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_sim(&query, v)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));

        Ok(scored
            .into_iter()
            .take(k)
            .map(|(i, _)| Arc::clone(&self.chunks[i]))
            .collect())
    }
}

/// Cosine similarity of two L2-normalized vectors.
fn cosine_sim(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn normalize(v: &mut [f32]) {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
