//! Corpus snapshot: the immutable set of page-level chunks the pipeline
//! searches over.
//!
//! The snapshot is a JSONL file written by the ingestion step, one record per
//! PDF page:
//!
//! ```text
//! {"source": "POJK_11_2022.pdf", "page": 0, "content": "...", "embedding": [0.1, ...]}
//! ```
//!
//! `embedding` is optional; chunks without one are reachable only through the
//! lexical index.

use std::collections::BTreeSet;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::sync::Arc;

use regula_core::{Chunk, text};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::StoreError;
use crate::vector::VectorIndex;

/// One line of the corpus snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorpusRecord {
    pub source: String,
    pub page: u32,
    pub content: String,
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

/// The loaded corpus. Built once at startup and never mutated.
#[derive(Debug)]
pub struct Corpus {
    chunks: Vec<Arc<Chunk>>,
    embeddings: Vec<Option<Vec<f32>>>,
}

impl Corpus {
    /// Load a JSONL snapshot from disk.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        if !path.exists() {
            return Err(StoreError::CorpusNotFound(path.to_path_buf()));
        }
        let reader = BufReader::new(std::fs::File::open(path)?);

        let mut records = Vec::new();
        for (idx, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: CorpusRecord = serde_json::from_str(&line)
                .map_err(|source| StoreError::Record { line: idx + 1, source })?;
            records.push(record);
        }

        let corpus = Self::from_records(records)?;
        info!(
            path = %path.display(),
            chunks = corpus.len(),
            documents = corpus.sources().len(),
            "loaded corpus snapshot"
        );
        Ok(corpus)
    }

    /// Build a corpus from in-memory records.
    ///
    /// Content whitespace is collapsed and pages with no text are dropped.
    pub fn from_records(
        records: impl IntoIterator<Item = CorpusRecord>,
    ) -> Result<Self, StoreError> {
        let mut chunks = Vec::new();
        let mut embeddings = Vec::new();

        for record in records {
            let content = text::clean(&record.content);
            if content.is_empty() {
                continue;
            }
            chunks.push(Arc::new(Chunk::new(record.source, record.page, content)));
            embeddings.push(record.embedding);
        }

        if chunks.is_empty() {
            return Err(StoreError::EmptyCorpus);
        }
        Ok(Self { chunks, embeddings })
    }

    pub fn chunks(&self) -> &[Arc<Chunk>] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Distinct source filenames.
    pub fn sources(&self) -> BTreeSet<&str> {
        self.chunks.iter().map(|c| c.source.as_str()).collect()
    }

    /// Build the vector index over chunks that carry an embedding.
    pub fn vector_index(&self) -> Result<VectorIndex, StoreError> {
        let entries = self
            .chunks
            .iter()
            .zip(&self.embeddings)
            .filter_map(|(chunk, emb)| emb.as_ref().map(|e| (Arc::clone(chunk), e.clone())));
        VectorIndex::build(entries)
    }
}
