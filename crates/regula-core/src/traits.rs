//! Seams to the collaborators the ranking core does not own.
//!
//! - [`DenseSearch`]: semantic vector search over the corpus.
//! - [`SparseScore`]: lexical scores for every corpus chunk.
//! - [`QueryEmbedder`]: query text to embedding vector.
//! - [`AnswerGenerator`]: the generative answering call.
//! - [`PromptBuilder`]: prompt text around the assembled context.

use std::sync::Arc;

use async_trait::async_trait;

use crate::chunk::Chunk;
use crate::error::ExternalError;

/// Semantic search returning chunks best-first.
#[async_trait]
pub trait DenseSearch: Send + Sync {
    async fn search(&self, query: &str, k: usize) -> Result<Vec<Arc<Chunk>>, ExternalError>;
}

/// Lexical index built once over the full corpus.
///
/// `scores` returns one score per corpus chunk, indexed like
/// [`SparseScore::chunks`].
pub trait SparseScore: Send + Sync {
    fn scores(&self, tokens: &[String]) -> Vec<f64>;

    fn chunks(&self) -> &[Arc<Chunk>];
}

#[async_trait]
pub trait QueryEmbedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, ExternalError>;
}

/// Synchronous-style (non-streaming) answer generation.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, ExternalError>;
}

pub trait PromptBuilder: Send + Sync {
    fn build(&self, context: &str, question: &str) -> String;
}
