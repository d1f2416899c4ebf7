//! Ranking and validation core: fusion, reranking, the regulation lock,
//! confidence scoring and citation validation. Everything here is a pure
//! computation over already-retrieved chunks.

pub mod citation;
pub mod confidence;
pub mod fairness;
pub mod fusion;
pub mod lock;
pub mod rerank;

pub use citation::{CitationValidator, ValidationResult};
pub use confidence::{ConfidenceFactors, ConfidenceLevel, ConfidenceReport, ConfidenceScorer};
pub use fairness::{FairnessLedger, FairnessReport, TypeFairness};
pub use fusion::{RankFusionEngine, RankedCandidate};
pub use lock::{LockOutcome, LockSource, RegulationLockGuard};
pub use rerank::{HeuristicReranker, ScoredCandidate, Signal, SignalDelta};
