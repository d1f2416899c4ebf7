//! Multi-signal heuristic reranker.
//!
//! Each fused candidate gets an unbounded additive score from six signals:
//! rank position, keyword overlap, type priority adapted to the query, year
//! proximity, regulation-name match and domain-term co-occurrence. Every
//! applied delta is kept in the candidate's trail so a score can be explained
//! after the fact.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use regula_core::config::RerankWeights;
use regula_core::reference::{self, RegulationDesignation};
use regula_core::{Chunk, RegulationType, text};
use serde::Serialize;
use tracing::debug;

use crate::fairness::FairnessLedger;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Signal {
    RankPosition,
    KeywordOverlap,
    TypePriority,
    YearProximity,
    NameMatch,
    NameMismatch,
    DomainTerms,
}

impl Signal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RankPosition => "rank_position",
            Self::KeywordOverlap => "keyword_overlap",
            Self::TypePriority => "type_priority",
            Self::YearProximity => "year_proximity",
            Self::NameMatch => "name_match",
            Self::NameMismatch => "name_mismatch",
            Self::DomainTerms => "domain_terms",
        }
    }
}

impl fmt::Display for Signal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SignalDelta {
    pub signal: Signal,
    pub delta: f64,
}

/// A candidate with its heuristic score and the deltas that produced it.
#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub chunk: Arc<Chunk>,
    pub score: f64,
    pub trail: Vec<SignalDelta>,
}

impl ScoredCandidate {
    /// Total contribution of `signal` (0 when it never applied).
    pub fn contribution(&self, signal: Signal) -> f64 {
        self.trail
            .iter()
            .filter(|d| d.signal == signal)
            .map(|d| d.delta)
            .sum()
    }
}

/// `name+delta` pairs, e.g. `rank_position+100.0 name_match+500.0`.
pub fn format_trail(trail: &[SignalDelta]) -> String {
    trail
        .iter()
        .map(|d| format!("{}{:+.1}", d.signal, d.delta))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Everything the signals need from the query, computed once per call.
struct QueryFeatures {
    lower: String,
    terms: HashSet<String>,
    named_type: Option<RegulationType>,
    year: Option<u16>,
    designation: Option<RegulationDesignation>,
}

impl QueryFeatures {
    fn new(query: &str, weights: &RerankWeights) -> Self {
        let lower = query.to_lowercase();
        Self {
            terms: text::term_set(query),
            named_type: weights.type_mentions.named_type(&lower),
            year: reference::query_year(query),
            designation: reference::parse_designation(query),
            lower,
        }
    }
}

pub struct HeuristicReranker {
    weights: RerankWeights,
    ledger: Arc<FairnessLedger>,
}

impl HeuristicReranker {
    pub fn new(weights: RerankWeights, ledger: Arc<FairnessLedger>) -> Self {
        Self { weights, ledger }
    }

    /// Score `candidates` (in fused order) against `query` and sort by score
    /// descending. Equal scores keep fused order.
    pub fn rerank(&self, candidates: &[Arc<Chunk>], query: &str) -> Vec<ScoredCandidate> {
        let features = QueryFeatures::new(query, &self.weights);

        let mut scored: Vec<ScoredCandidate> = candidates
            .iter()
            .enumerate()
            .map(|(rank, chunk)| self.score_candidate(chunk, &features, rank))
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));

        self.ledger.record(
            candidates.iter().filter_map(|c| c.regulation_type()),
            scored
                .iter()
                .take(self.weights.selection_window)
                .filter_map(|c| c.chunk.regulation_type()),
        );

        if let Some(top) = scored.first() {
            debug!(
                candidates = scored.len(),
                top_source = %top.chunk.source,
                top_page = top.chunk.page,
                top_score = top.score,
                signals = %format_trail(&top.trail),
                "reranked"
            );
        }
        scored
    }

    fn score_candidate(
        &self,
        chunk: &Arc<Chunk>,
        query: &QueryFeatures,
        rank: usize,
    ) -> ScoredCandidate {
        let w = &self.weights;
        let mut trail = Vec::with_capacity(6);
        let content_lower = chunk.content.to_lowercase();
        let kind = chunk.regulation_type();

        trail.push(SignalDelta {
            signal: Signal::RankPosition,
            delta: w.rank_bonus / (rank as f64 + 1.0),
        });

        let content_terms = text::term_set(&chunk.content);
        let overlap = query.terms.intersection(&content_terms).count();
        trail.push(SignalDelta {
            signal: Signal::KeywordOverlap,
            delta: w.keyword_overlap * overlap as f64,
        });

        if let Some(kind) = kind {
            trail.push(SignalDelta {
                signal: Signal::TypePriority,
                delta: self.type_priority(kind, query.named_type),
            });
        }

        if let (Some(query_year), Some(source_year)) =
            (query.year, reference::source_year(&chunk.source))
        {
            trail.push(SignalDelta {
                signal: Signal::YearProximity,
                delta: self.year_delta(query_year, source_year),
            });
        }

        if let Some(designation) = &query.designation {
            if designation.matches_source(&chunk.source) {
                trail.push(SignalDelta {
                    signal: Signal::NameMatch,
                    delta: w.name_match,
                });
            } else {
                trail.push(SignalDelta {
                    signal: Signal::NameMismatch,
                    delta: -w.name_mismatch,
                });
            }
        }

        let shared_terms = w
            .domain_terms
            .iter()
            .filter(|t| query.lower.contains(t.as_str()) && content_lower.contains(t.as_str()))
            .count();
        if shared_terms > 0 {
            trail.push(SignalDelta {
                signal: Signal::DomainTerms,
                delta: w.domain_term * shared_terms as f64,
            });
        }

        ScoredCandidate {
            chunk: Arc::clone(chunk),
            score: trail.iter().map(|d| d.delta).sum(),
            trail,
        }
    }

    /// Base priority, except that a type the query names gets the named
    /// priority; with no type named every type gets the flat priority.
    fn type_priority(&self, kind: RegulationType, named: Option<RegulationType>) -> f64 {
        let w = &self.weights;
        match named {
            Some(named) if named == kind => w.named_type_priority,
            Some(_) => w.type_priority.get(kind),
            None => w.flat_type_priority,
        }
    }

    fn year_delta(&self, query_year: u16, source_year: u16) -> f64 {
        let w = &self.weights;
        let diff = query_year.abs_diff(source_year);
        if diff == 0 {
            w.year_exact
        } else if diff <= w.year_near_window {
            w.year_near
        } else if diff <= w.year_mid_window {
            w.year_mid
        } else {
            -w.year_penalty_per_year * f64::from(diff)
        }
    }
}
