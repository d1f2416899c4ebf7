//! Reciprocal rank fusion of the dense and sparse candidate lists.
//!
//! A chunk at 0-based rank `r` in a list contributes `w / (K + r + 1)`,
//! where the dense list is weighted `α` and the sparse list `1 - α`:
//!
//! ```text
//! score(chunk) = α / (K + r_dense + 1) + (1 - α) / (K + r_sparse + 1)
//! ```
//!
//! Chunks are identified by `(source, page)`. The fused list is ordered by
//! score descending, then better dense rank, better sparse rank, and finally
//! `(source, page)` ascending, so equal inputs always fuse to the same order.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;

use regula_core::config::{RetrievalConfig, TopicRule};
use regula_core::{Chunk, reference};
use tracing::{debug, instrument};

/// RRF constant K.
pub const RRF_K: f64 = 60.0;

/// A chunk after fusion, with the ranks it held in each source list.
#[derive(Debug, Clone)]
pub struct RankedCandidate {
    pub chunk: Arc<Chunk>,
    pub dense_rank: Option<usize>,
    pub sparse_rank: Option<usize>,
    pub fused_score: f64,
}

impl RankedCandidate {
    fn cmp_for_ranking(&self, other: &Self) -> Ordering {
        let rank = |r: Option<usize>| r.unwrap_or(usize::MAX);
        other
            .fused_score
            .total_cmp(&self.fused_score)
            .then_with(|| rank(self.dense_rank).cmp(&rank(other.dense_rank)))
            .then_with(|| rank(self.sparse_rank).cmp(&rank(other.sparse_rank)))
            .then_with(|| self.chunk.key().cmp(&other.chunk.key()))
    }
}

#[inline]
fn rank_contribution(weight: f64, rank: usize) -> f64 {
    let rank_u32 = u32::try_from(rank).unwrap_or(u32::MAX);
    weight / (RRF_K + f64::from(rank_u32) + 1.0)
}

/// Dense weight for `query`: the lexical-leaning α when the query names a
/// regulation or an article, the semantic-leaning α otherwise.
pub fn adaptive_alpha(query: &str, config: &RetrievalConfig) -> f64 {
    let lower = query.to_lowercase();
    let names_regulation = reference::parse_designation(query).is_some();
    let names_article = config
        .article_words
        .iter()
        .any(|word| lower.contains(word.as_str()));
    if names_regulation || names_article {
        config.alpha_lexical
    } else {
        config.alpha_semantic
    }
}

/// Fuse a dense list of chunks with a sparse list of corpus indices.
///
/// Sparse indices outside `corpus` are ignored. A key repeated inside one
/// list keeps its first (best) rank. The result is truncated to `depth`.
#[instrument(
    name = "regula::rrf_fuse",
    skip(dense, sparse, corpus),
    fields(dense_count = dense.len(), sparse_count = sparse.len())
)]
pub fn rrf_fuse(
    dense: &[Arc<Chunk>],
    sparse: &[usize],
    corpus: &[Arc<Chunk>],
    alpha: f64,
    depth: usize,
) -> Vec<RankedCandidate> {
    let alpha = alpha.clamp(0.0, 1.0);
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut fused: Vec<RankedCandidate> = Vec::with_capacity(dense.len() + sparse.len());

    for (rank, chunk) in dense.iter().enumerate() {
        if positions.contains_key(chunk.id.as_str()) {
            continue;
        }
        positions.insert(chunk.id.as_str(), fused.len());
        fused.push(RankedCandidate {
            chunk: Arc::clone(chunk),
            dense_rank: Some(rank),
            sparse_rank: None,
            fused_score: rank_contribution(alpha, rank),
        });
    }

    for (rank, &idx) in sparse.iter().enumerate() {
        let Some(chunk) = corpus.get(idx) else {
            debug!(idx, corpus_len = corpus.len(), "sparse index out of range");
            continue;
        };
        let contribution = rank_contribution(1.0 - alpha, rank);
        match positions.get(chunk.id.as_str()) {
            Some(&pos) if fused[pos].sparse_rank.is_some() => {}
            Some(&pos) => {
                fused[pos].sparse_rank = Some(rank);
                fused[pos].fused_score += contribution;
            }
            None => {
                positions.insert(chunk.id.as_str(), fused.len());
                fused.push(RankedCandidate {
                    chunk: Arc::clone(chunk),
                    dense_rank: None,
                    sparse_rank: Some(rank),
                    fused_score: contribution,
                });
            }
        }
    }

    fused.sort_by(RankedCandidate::cmp_for_ranking);
    let distinct = fused.len();
    fused.truncate(depth);

    debug!(
        target: "regula.rrf",
        distinct,
        output_count = fused.len(),
        alpha,
        "rrf fusion complete"
    );
    fused
}

/// Topic rules whose phrase occurs in the lowercased query, in rule order.
pub fn matched_topics<'a>(query: &str, rules: &'a [TopicRule]) -> Vec<&'a TopicRule> {
    let lower = query.to_lowercase();
    rules
        .iter()
        .filter(|rule| lower.contains(rule.phrase.as_str()))
        .collect()
}

/// Move chunks of the documents mapped by matching topic rules to the front.
///
/// The partition is stable: relative order inside the boosted group and
/// inside the rest is unchanged.
pub fn topic_boost(
    query: &str,
    candidates: Vec<RankedCandidate>,
    rules: &[TopicRule],
) -> Vec<RankedCandidate> {
    let documents: Vec<String> = matched_topics(query, rules)
        .into_iter()
        .flat_map(|rule| rule.documents.iter().map(|d| d.to_ascii_uppercase()))
        .collect();
    if documents.is_empty() {
        return candidates;
    }

    let (boosted, rest): (Vec<_>, Vec<_>) = candidates.into_iter().partition(|c| {
        let source = c.chunk.source.to_ascii_uppercase();
        documents.iter().any(|d| source.contains(d.as_str()))
    });
    debug!(boosted = boosted.len(), "topic boost applied");
    boosted.into_iter().chain(rest).collect()
}

/// Adaptive fusion followed by topic boosting, driven by [`RetrievalConfig`].
#[derive(Debug, Clone)]
pub struct RankFusionEngine {
    config: RetrievalConfig,
}

impl RankFusionEngine {
    pub fn new(config: RetrievalConfig) -> Self {
        Self { config }
    }

    pub fn fuse(
        &self,
        query: &str,
        dense: &[Arc<Chunk>],
        sparse: &[usize],
        corpus: &[Arc<Chunk>],
    ) -> Vec<RankedCandidate> {
        let alpha = adaptive_alpha(query, &self.config);
        let fused = rrf_fuse(dense, sparse, corpus, alpha, self.config.depth);
        topic_boost(query, fused, &self.config.topic_rules)
    }
}
