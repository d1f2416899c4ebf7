//! Storage layer: corpus snapshot, BM25 lexical index, in-memory vector index.

mod error;
pub use error::StoreError;

pub mod corpus;
pub use corpus::{Corpus, CorpusRecord};

pub mod lexical;
pub use lexical::{LexicalIndex, top_indices};

pub mod vector;
pub use vector::VectorIndex;
