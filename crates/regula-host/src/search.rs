//! Dense retrieval: embed the query, then search the in-memory vector index.

use std::sync::Arc;

use async_trait::async_trait;
use regula_core::{Chunk, DenseSearch, ExternalError, QueryEmbedder};
use regula_store::VectorIndex;
use tracing::debug;

pub const DENSE_SEARCH_SERVICE: &str = "dense-search";

pub struct SemanticSearch {
    embedder: Arc<dyn QueryEmbedder>,
    index: VectorIndex,
}

impl SemanticSearch {
    pub fn new(embedder: Arc<dyn QueryEmbedder>, index: VectorIndex) -> Self {
        Self { embedder, index }
    }
}

#[async_trait]
impl DenseSearch for SemanticSearch {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Arc<Chunk>>, ExternalError> {
        if self.index.is_empty() {
            debug!("vector index empty, dense search skipped");
            return Ok(Vec::new());
        }
        let embedding = self.embedder.embed(query).await?;
        self.index
            .search(&embedding, k)
            .map_err(|e| ExternalError::failed(DENSE_SEARCH_SERVICE, e.to_string(), false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedEmbedder {
        vector: Vec<f32>,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QueryEmbedder for FixedEmbedder {
        async fn embed(&self, _text: &str) -> Result<Vec<f32>, ExternalError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.vector.clone())
        }
    }

    fn index() -> VectorIndex {
        VectorIndex::build(vec![
            (Arc::new(Chunk::new("UU_21_2011.pdf", 0, "a")), vec![1.0, 0.0]),
            (Arc::new(Chunk::new("POJK_11_2022.pdf", 0, "b")), vec![0.0, 1.0]),
        ])
        .unwrap()
    }

    #[tokio::test]
    async fn embeds_then_searches() {
        let embedder = Arc::new(FixedEmbedder {
            vector: vec![0.1, 0.9],
            calls: AtomicUsize::new(0),
        });
        let search = SemanticSearch::new(embedder.clone(), index());
        let hits = search.search("teknologi informasi", 1).await.unwrap();
        assert_eq!(hits[0].source, "POJK_11_2022.pdf");
        assert_eq!(embedder.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn wrong_dimension_is_permanent_failure() {
        let embedder = Arc::new(FixedEmbedder {
            vector: vec![1.0, 0.0, 0.0],
            calls: AtomicUsize::new(0),
        });
        let err = SemanticSearch::new(embedder, index())
            .search("x", 1)
            .await
            .unwrap_err();
        assert!(!err.is_transient());
        assert_eq!(err.service(), DENSE_SEARCH_SERVICE);
    }
}
