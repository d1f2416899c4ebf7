//! Per-regulation-type selection telemetry.
//!
//! Every rerank call records which types were retrieved and which made the
//! selection window. Over time the selection rate per type shows whether the
//! reranker systematically favours one kind of regulation.

use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};

use regula_core::RegulationType;
use serde::{Deserialize, Serialize};

/// Selection-rate spread (percentage points) above which the ledger flags bias.
pub const BIAS_SPREAD_THRESHOLD: f64 = 30.0;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct TypeCounts {
    retrieved: u64,
    selected: u64,
}

/// Process-wide counters, shared by `Arc` between the reranker and whoever
/// reports on it. Counters only grow.
#[derive(Debug, Default)]
pub struct FairnessLedger {
    counts: Mutex<BTreeMap<RegulationType, TypeCounts>>,
}

impl FairnessLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one rerank call's increments under a single lock acquisition.
    pub fn record(
        &self,
        retrieved: impl IntoIterator<Item = RegulationType>,
        selected: impl IntoIterator<Item = RegulationType>,
    ) {
        let mut counts = self.counts.lock().unwrap_or_else(PoisonError::into_inner);
        for kind in retrieved {
            counts.entry(kind).or_default().retrieved += 1;
        }
        for kind in selected {
            counts.entry(kind).or_default().selected += 1;
        }
    }

    pub fn report(&self) -> FairnessReport {
        let counts = self
            .counts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        FairnessReport::from_counts(&counts)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeFairness {
    pub retrieved: u64,
    pub selected: u64,
    pub selection_rate_percent: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FairnessReport {
    pub total_retrieved: u64,
    pub total_selected: u64,
    /// Types that were retrieved at least once, keyed by `UU`/`POJK`/`SEOJK`.
    pub by_type: BTreeMap<String, TypeFairness>,
    /// Max minus min selection rate across `by_type`, in percentage points.
    pub selection_spread: f64,
    pub bias_detected: bool,
}

impl FairnessReport {
    fn from_counts(counts: &BTreeMap<RegulationType, TypeCounts>) -> Self {
        let total_retrieved = counts.values().map(|c| c.retrieved).sum();
        let total_selected = counts.values().map(|c| c.selected).sum();

        let by_type: BTreeMap<String, TypeFairness> = counts
            .iter()
            .filter(|(_, c)| c.retrieved > 0)
            .map(|(kind, c)| {
                let rate = c.selected as f64 / c.retrieved as f64 * 100.0;
                (
                    kind.as_str().to_string(),
                    TypeFairness {
                        retrieved: c.retrieved,
                        selected: c.selected,
                        selection_rate_percent: rate,
                    },
                )
            })
            .collect();

        let rates = by_type.values().map(|t| t.selection_rate_percent);
        let selection_spread = match (
            rates.clone().reduce(f64::max),
            rates.reduce(f64::min),
        ) {
            (Some(max), Some(min)) => max - min,
            _ => 0.0,
        };

        Self {
            total_retrieved,
            total_selected,
            by_type,
            selection_spread,
            bias_detected: selection_spread > BIAS_SPREAD_THRESHOLD,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    use RegulationType::{Pojk, Seojk, Uu};

    #[test]
    fn empty_ledger_reports_nothing() {
        let report = FairnessLedger::new().report();
        assert_eq!(report.total_retrieved, 0);
        assert!(report.by_type.is_empty());
        assert!(!report.bias_detected);
    }

    #[test]
    fn skewed_selection_flags_bias() {
        let ledger = FairnessLedger::new();
        ledger.record(
            std::iter::repeat_n(Uu, 10).chain(std::iter::repeat_n(Pojk, 20)),
            std::iter::repeat_n(Uu, 10).chain(std::iter::repeat_n(Pojk, 2)),
        );
        let report = ledger.report();
        assert_eq!(report.total_retrieved, 30);
        assert_eq!(report.total_selected, 12);
        assert_eq!(report.by_type["UU"].selection_rate_percent, 100.0);
        assert_eq!(report.by_type["POJK"].selection_rate_percent, 10.0);
        assert!(report.selection_spread > BIAS_SPREAD_THRESHOLD);
        assert!(report.bias_detected);
        assert!(!report.by_type.contains_key("SEOJK"));
    }

    #[test]
    fn balanced_selection_is_not_bias() {
        let ledger = FairnessLedger::new();
        ledger.record([Uu, Uu, Seojk, Seojk], [Uu, Seojk]);
        let report = ledger.report();
        assert_eq!(report.selection_spread, 0.0);
        assert!(!report.bias_detected);
    }

    #[test]
    fn concurrent_records_are_not_lost() {
        let ledger = Arc::new(FairnessLedger::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = Arc::clone(&ledger);
                thread::spawn(move || {
                    for _ in 0..100 {
                        ledger.record([Pojk, Uu], [Pojk]);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        let report = ledger.report();
        assert_eq!(report.by_type["POJK"].retrieved, 800);
        assert_eq!(report.by_type["POJK"].selected, 800);
        assert_eq!(report.by_type["UU"].selected, 0);
        assert!(report.bias_detected);
    }
}
