//! Answer confidence derived from the selected candidates.
//!
//! Three factors, each in `[0, 1]`:
//!
//! - retrieval quality: mean rerank score over 200, capped at 1
//! - document consistency: `1 - distinct_sources / selected`
//! - query coverage: share of query terms found in the top three chunks
//!
//! `overall = 0.4 × quality + 0.3 × consistency + 0.3 × coverage`.

use std::collections::HashSet;

use regula_core::text;
use serde::{Deserialize, Serialize};

use crate::rerank::ScoredCandidate;

const QUALITY_SCALE: f64 = 200.0;
const COVERAGE_WINDOW: usize = 3;
const QUALITY_WEIGHT: f64 = 0.4;
const CONSISTENCY_WEIGHT: f64 = 0.3;
const COVERAGE_WEIGHT: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    VeryLow,
    Low,
    Medium,
    High,
    VeryHigh,
}

impl ConfidenceLevel {
    pub fn from_overall(overall: f64) -> Self {
        if overall >= 0.8 {
            Self::VeryHigh
        } else if overall >= 0.6 {
            Self::High
        } else if overall >= 0.4 {
            Self::Medium
        } else if overall >= 0.2 {
            Self::Low
        } else {
            Self::VeryLow
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VeryLow => "VERY_LOW",
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::VeryHigh => "VERY_HIGH",
        }
    }

    pub fn explanation(&self) -> &'static str {
        match self {
            Self::VeryHigh => "Jawaban didukung kuat oleh dokumen yang sangat relevan",
            Self::High => "Jawaban cukup didukung oleh dokumen yang relevan",
            Self::Medium => "Dukungan dokumen sedang, sebaiknya dicek ke dokumen asli",
            Self::Low => "Dukungan dokumen terbatas, perlu verifikasi manual",
            Self::VeryLow => "Dukungan dokumen sangat lemah, gunakan sumber lain",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceFactors {
    pub retrieval_quality: f64,
    pub document_consistency: f64,
    pub query_coverage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceReport {
    pub overall: f64,
    /// `overall` as text, one decimal, e.g. `"62.5%"`.
    pub percentage: String,
    pub factors: ConfidenceFactors,
    pub level: ConfidenceLevel,
    pub explanation: String,
}

impl ConfidenceReport {
    /// Report for an empty selection.
    pub fn none() -> Self {
        Self {
            overall: 0.0,
            percentage: percentage(0.0),
            factors: ConfidenceFactors::default(),
            level: ConfidenceLevel::VeryLow,
            explanation: "Tidak ada dokumen relevan yang ditemukan".to_string(),
        }
    }
}

fn percentage(overall: f64) -> String {
    format!("{:.1}%", overall * 100.0)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ConfidenceScorer;

impl ConfidenceScorer {
    pub fn score(&self, selected: &[ScoredCandidate], query: &str) -> ConfidenceReport {
        if selected.is_empty() {
            return ConfidenceReport::none();
        }

        let count = selected.len() as f64;
        let mean = selected.iter().map(|c| c.score).sum::<f64>() / count;
        let retrieval_quality = (mean / QUALITY_SCALE).clamp(0.0, 1.0);

        let distinct_sources: HashSet<&str> =
            selected.iter().map(|c| c.chunk.source.as_str()).collect();
        let document_consistency = 1.0 - distinct_sources.len() as f64 / count;

        let query_terms = text::term_set(query);
        let query_coverage = if query_terms.is_empty() {
            0.0
        } else {
            let covered: HashSet<String> = selected
                .iter()
                .take(COVERAGE_WINDOW)
                .flat_map(|c| {
                    let content = text::term_set(&c.chunk.content);
                    query_terms
                        .iter()
                        .filter(|t| content.contains(*t))
                        .cloned()
                        .collect::<Vec<_>>()
                })
                .collect();
            covered.len() as f64 / query_terms.len() as f64
        };

        let overall = QUALITY_WEIGHT * retrieval_quality
            + CONSISTENCY_WEIGHT * document_consistency
            + COVERAGE_WEIGHT * query_coverage;
        let level = ConfidenceLevel::from_overall(overall);

        ConfidenceReport {
            overall,
            percentage: percentage(overall),
            factors: ConfidenceFactors {
                retrieval_quality,
                document_consistency,
                query_coverage,
            },
            level,
            explanation: level.explanation().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use regula_core::Chunk;
    use std::sync::Arc;

    fn candidate(source: &str, content: &str, score: f64) -> ScoredCandidate {
        ScoredCandidate {
            chunk: Arc::new(Chunk::new(source, 2, content)),
            score,
            trail: Vec::new(),
        }
    }

    #[test]
    fn empty_selection_is_very_low() {
        let report = ConfidenceScorer.score(&[], "apa saja");
        assert_eq!(report.overall, 0.0);
        assert_eq!(report.level, ConfidenceLevel::VeryLow);
        assert_eq!(report.percentage, "0.0%");
    }

    #[test]
    fn single_document_has_zero_consistency() {
        let report = ConfidenceScorer.score(
            &[candidate("POJK_27_2022.pdf", "modal minimum bank", 400.0)],
            "modal minimum",
        );
        assert_eq!(report.factors.document_consistency, 0.0);
        assert_eq!(report.factors.retrieval_quality, 1.0);
        assert_eq!(report.factors.query_coverage, 1.0);
        assert!((report.overall - 0.7).abs() < 1e-9);
        assert_eq!(report.level, ConfidenceLevel::High);
        assert_eq!(report.percentage, "70.0%");
    }

    #[test]
    fn repeated_source_raises_consistency() {
        let selected = vec![
            candidate("POJK_27_2022.pdf", "a", 100.0),
            candidate("POJK_27_2022.pdf", "b", 100.0),
            candidate("POJK_27_2022.pdf", "c", 100.0),
            candidate("UU_21_2011.pdf", "d", 100.0),
        ];
        let report = ConfidenceScorer.score(&selected, "");
        assert_eq!(report.factors.document_consistency, 0.5);
        assert_eq!(report.factors.retrieval_quality, 0.5);
        assert_eq!(report.factors.query_coverage, 0.0);
        assert_eq!(report.level, ConfidenceLevel::Low);
    }

    #[test]
    fn coverage_only_looks_at_top_three() {
        let selected = vec![
            candidate("A_1_2020.pdf", "x", 0.0),
            candidate("B_1_2020.pdf", "x", 0.0),
            candidate("C_1_2020.pdf", "x", 0.0),
            candidate("D_1_2020.pdf", "likuiditas", 0.0),
        ];
        let report = ConfidenceScorer.score(&selected, "likuiditas x");
        assert_eq!(report.factors.query_coverage, 0.5);
    }

    #[test]
    fn negative_scores_floor_quality_at_zero() {
        let report = ConfidenceScorer.score(&[candidate("A_1_2020.pdf", "x", -40.0)], "y");
        assert_eq!(report.factors.retrieval_quality, 0.0);
        assert_eq!(report.level, ConfidenceLevel::VeryLow);
    }

    #[test]
    fn levels_use_inclusive_lower_bounds() {
        assert_eq!(ConfidenceLevel::from_overall(0.8), ConfidenceLevel::VeryHigh);
        assert_eq!(ConfidenceLevel::from_overall(0.6), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_overall(0.4), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_overall(0.2), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_overall(0.19), ConfidenceLevel::VeryLow);
        assert_eq!(
            serde_json::to_string(&ConfidenceLevel::VeryHigh).unwrap(),
            "\"VERY_HIGH\""
        );
    }
}
