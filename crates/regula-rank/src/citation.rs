//! Post-hoc check that every regulation cited in a generated answer is one of
//! the documents the answer was generated from.

use std::sync::Arc;

use regula_core::{Chunk, RegulationReference, reference};
use serde::{Deserialize, Serialize};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    pub valid: bool,
    pub error: Option<String>,
    /// Cited references absent from the supplied sources, first mention order.
    pub offending: Vec<RegulationReference>,
}

impl ValidationResult {
    pub fn ok() -> Self {
        Self {
            valid: true,
            error: None,
            offending: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CitationValidator;

impl CitationValidator {
    pub fn validate(&self, answer: &str, sources: &[Arc<Chunk>]) -> ValidationResult {
        let mut offending: Vec<RegulationReference> = Vec::new();
        for cited in reference::find_all(answer) {
            let supplied = sources.iter().any(|c| cited.matches_source(&c.source));
            if !supplied && !offending.contains(&cited) {
                offending.push(cited);
            }
        }

        if offending.is_empty() {
            return ValidationResult::ok();
        }

        let listed = offending
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        warn!(offending = %listed, "answer cites documents outside its context");
        ValidationResult {
            valid: false,
            error: Some(format!("Jawaban menyebut dokumen yang tidak ada di konteks: {listed}")),
            offending,
        }
    }
}
