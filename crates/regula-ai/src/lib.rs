//! Model-serving adapters: an Ollama HTTP client for answer generation and
//! query embeddings.

mod ollama;
pub use ollama::{EMBEDDING_SERVICE, GENERATION_SERVICE, OllamaClient, OllamaError};
