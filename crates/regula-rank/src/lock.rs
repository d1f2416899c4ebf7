//! Regulation lock: when a query names a full regulation reference, only
//! chunks of that regulation may reach the answer context.

use std::sync::Arc;

use regula_core::config::LockConfig;
use regula_core::{Chunk, RegulationReference};
use tracing::{debug, warn};

use crate::fusion::RankedCandidate;
use crate::rerank::ScoredCandidate;

/// Where the locked candidates came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockSource {
    /// Found among the fused retrieval results.
    Retrieved,
    /// Not retrieved, but present in the corpus.
    Corpus,
}

#[derive(Debug, Clone)]
pub enum LockOutcome {
    Locked {
        candidates: Vec<Arc<Chunk>>,
        source: LockSource,
    },
    /// The named regulation is not in the corpus at all.
    Unavailable,
}

#[derive(Debug, Clone)]
pub struct RegulationLockGuard {
    config: LockConfig,
}

impl RegulationLockGuard {
    pub fn new(config: LockConfig) -> Self {
        Self { config }
    }

    /// Keep only fused candidates of `reference`, in fused order.
    ///
    /// When retrieval found none, the corpus is consulted (at most `limit`
    /// chunks, corpus order) so that a regulation outside the retrieval depth
    /// is not reported as missing.
    pub fn filter(
        &self,
        reference: &RegulationReference,
        fused: &[RankedCandidate],
        corpus: &[Arc<Chunk>],
        limit: usize,
    ) -> LockOutcome {
        let retrieved: Vec<Arc<Chunk>> = fused
            .iter()
            .filter(|c| reference.matches_source(&c.chunk.source))
            .map(|c| Arc::clone(&c.chunk))
            .collect();
        if !retrieved.is_empty() {
            debug!(%reference, locked = retrieved.len(), "locked to retrieved chunks");
            return LockOutcome::Locked {
                candidates: retrieved,
                source: LockSource::Retrieved,
            };
        }

        let from_corpus: Vec<Arc<Chunk>> = corpus
            .iter()
            .filter(|c| reference.matches_source(&c.source))
            .take(limit)
            .cloned()
            .collect();
        if from_corpus.is_empty() {
            warn!(%reference, canonical_id = %reference.canonical_id, "regulation not in corpus");
            return LockOutcome::Unavailable;
        }
        debug!(%reference, locked = from_corpus.len(), "locked to corpus chunks");
        LockOutcome::Locked {
            candidates: from_corpus,
            source: LockSource::Corpus,
        }
    }

    /// Whether the query asks what the regulation is (a definition question).
    pub fn is_definition_query(&self, query: &str) -> bool {
        let lower = query.to_lowercase();
        self.config
            .definition_phrases
            .iter()
            .any(|p| lower.contains(p.as_str()))
    }

    /// Choose the final locked selection from reranked candidates.
    ///
    /// Definition questions are answered from identity pages (the title page
    /// carries the official "TENTANG ..." title), capped at
    /// `definition_cap`. When no identity page is available the general
    /// rule applies: the top `locked_top_n` by rerank score.
    pub fn narrow(&self, query: &str, reranked: Vec<ScoredCandidate>) -> Vec<ScoredCandidate> {
        if self.is_definition_query(query) {
            let identity: Vec<ScoredCandidate> = reranked
                .iter()
                .filter(|c| c.chunk.page <= self.config.identity_max_page)
                .take(self.config.definition_cap)
                .cloned()
                .collect();
            if !identity.is_empty() {
                return identity;
            }
            debug!("definition query without identity pages, using top locked chunks");
        }
        reranked
            .into_iter()
            .take(self.config.locked_top_n)
            .collect()
    }
}

/// Order a locked selection by page for context assembly.
pub fn order_by_page(selected: &mut [ScoredCandidate]) {
    selected.sort_by_key(|c| c.chunk.page);
}

#[cfg(test)]
mod tests {
    use super::*;
    use regula_core::reference;

    fn chunk(source: &str, page: u32) -> Arc<Chunk> {
        Arc::new(Chunk::new(source, page, "isi"))
    }

    fn fused(chunks: &[Arc<Chunk>]) -> Vec<RankedCandidate> {
        chunks
            .iter()
            .enumerate()
            .map(|(i, c)| RankedCandidate {
                chunk: Arc::clone(c),
                dense_rank: Some(i),
                sparse_rank: None,
                fused_score: 1.0 / (i as f64 + 1.0),
            })
            .collect()
    }

    fn scored(chunks: &[Arc<Chunk>]) -> Vec<ScoredCandidate> {
        chunks
            .iter()
            .enumerate()
            .map(|(i, c)| ScoredCandidate {
                chunk: Arc::clone(c),
                score: 100.0 - i as f64,
                trail: Vec::new(),
            })
            .collect()
    }

    fn guard() -> RegulationLockGuard {
        RegulationLockGuard::new(LockConfig::default())
    }

    #[test]
    fn keeps_only_the_named_regulation() {
        let corpus = vec![
            chunk("POJK_27_2022.pdf", 0),
            chunk("POJK_11_2022.pdf", 3),
            chunk("POJK_11_2022.pdf", 0),
        ];
        let reference = reference::parse("POJK Nomor 11 Tahun 2022").unwrap();
        let outcome = guard().filter(&reference, &fused(&corpus), &corpus, 10);
        let LockOutcome::Locked { candidates, source } = outcome else {
            panic!("expected a lock");
        };
        assert_eq!(source, LockSource::Retrieved);
        assert!(candidates.iter().all(|c| c.source == "POJK_11_2022.pdf"));
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn falls_back_to_corpus_then_unavailable() {
        let corpus = vec![chunk("UU_21_2011.pdf", 0), chunk("POJK_27_2022.pdf", 1)];
        let fused = fused(&corpus[1..]);

        let uu = reference::parse("UU 21/2011").unwrap();
        match guard().filter(&uu, &fused, &corpus, 10) {
            LockOutcome::Locked { candidates, source } => {
                assert_eq!(source, LockSource::Corpus);
                assert_eq!(candidates[0].source, "UU_21_2011.pdf");
            }
            LockOutcome::Unavailable => panic!("UU 21/2011 is in the corpus"),
        }

        let missing = reference::parse("UU 99 Tahun 2099").unwrap();
        assert!(matches!(
            guard().filter(&missing, &fused, &corpus, 10),
            LockOutcome::Unavailable
        ));
    }

    #[test]
    fn definition_query_uses_identity_pages() {
        let chunks = vec![
            chunk("POJK_27_2022.pdf", 5),
            chunk("POJK_27_2022.pdf", 0),
            chunk("POJK_27_2022.pdf", 7),
            chunk("POJK_27_2022.pdf", 1),
            chunk("POJK_27_2022.pdf", 0),
        ];
        let selected = guard().narrow("Apa yang dimaksud dengan POJK 27 Tahun 2022?", scored(&chunks));
        let pages: Vec<u32> = selected.iter().map(|c| c.chunk.page).collect();
        assert_eq!(pages, vec![0, 1]);
    }

    #[test]
    fn definition_query_without_identity_pages_uses_top_n() {
        let chunks: Vec<_> = (2..10).map(|p| chunk("POJK_27_2022.pdf", p)).collect();
        let selected = guard().narrow("apa itu POJK 27 tahun 2022", scored(&chunks));
        assert_eq!(selected.len(), 5);
    }

    #[test]
    fn other_queries_take_top_five_then_order_by_page() {
        let chunks: Vec<_> = [9, 3, 0, 7, 4, 2, 8]
            .into_iter()
            .map(|p| chunk("POJK_11_2022.pdf", p))
            .collect();
        let mut selected = guard().narrow("kewajiban bank dalam POJK 11/2022", scored(&chunks));
        assert_eq!(selected.len(), 5);
        order_by_page(&mut selected);
        let pages: Vec<u32> = selected.iter().map(|c| c.chunk.page).collect();
        assert_eq!(pages, vec![0, 3, 4, 7, 9]);
    }
}
