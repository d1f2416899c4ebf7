//! Request runtime: wires the corpus, indexes and model adapters into the
//! ask pipeline, with timeouts, retries and cancellation around every
//! external call.

pub mod call;
pub mod cancel;
pub mod pipeline;
pub mod prompt;
pub mod response;
pub mod search;
pub mod snippet;

pub use call::CallPolicy;
pub use cancel::CancelToken;
pub use pipeline::{Collaborators, Pipeline, PipelineError};
pub use prompt::ContextPromptBuilder;
pub use response::{AnswerStatus, AskResponse, SourceRef};
pub use search::SemanticSearch;
