pub mod chunk;
pub mod config;
pub mod error;
pub mod reference;
pub mod text;
pub mod traits;

pub use chunk::{Chunk, RegulationType};
pub use config::{ConfigError, RegulaConfig, Strictness};
pub use error::ExternalError;
pub use reference::{RegulationDesignation, RegulationReference};
pub use traits::{AnswerGenerator, DenseSearch, PromptBuilder, QueryEmbedder, SparseScore};
