use regula_core::RegulationReference;
use regula_rank::{ConfidenceReport, SignalDelta, ValidationResult};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerStatus {
    /// An answer was generated.
    Answered,
    /// The named regulation is not in the corpus; nothing was generated.
    Unavailable,
    /// Strict mode and the question names no regulation.
    NotExplicit,
}

/// One chunk that went into the answer context.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceRef {
    pub document: String,
    pub page: u32,
    pub score: f64,
    pub snippet: String,
    /// Reranker deltas that add up to `score`, in the order applied.
    pub signals: Vec<SignalDelta>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub status: AnswerStatus,
    /// Answer text, prefixed by any warning banners.
    pub answer: String,
    pub sources: Vec<SourceRef>,
    pub confidence: ConfidenceReport,
    pub validation: ValidationResult,
    pub num_sources: usize,
    /// Regulation the question named, if any.
    pub reference: Option<RegulationReference>,
    /// Banners prepended to `answer`, in order.
    pub warnings: Vec<String>,
}

impl AskResponse {
    /// A response that stops before generation.
    pub(crate) fn without_answer(
        status: AnswerStatus,
        message: String,
        reference: Option<RegulationReference>,
    ) -> Self {
        Self {
            status,
            answer: message,
            sources: Vec::new(),
            confidence: ConfidenceReport::none(),
            validation: ValidationResult::ok(),
            num_sources: 0,
            reference,
            warnings: Vec::new(),
        }
    }
}
