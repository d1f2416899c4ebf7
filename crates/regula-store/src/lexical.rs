//! BM25 (Okapi) lexical index over the corpus.
//!
//! Built once at startup over lowercased whitespace tokens of every chunk.
//! Inverse document frequency uses the Robertson-Spärck Jones form
//! `ln((N - n + 0.5) / (n + 0.5))`; terms that occur in more than half the
//! corpus would score negative, so their idf is floored to
//! `epsilon × mean(idf)`.

use std::collections::HashMap;
use std::sync::Arc;

use regula_core::{Chunk, SparseScore, text};
use tracing::info;

const DEFAULT_K1: f64 = 1.5;
const DEFAULT_B: f64 = 0.75;
const DEFAULT_EPSILON: f64 = 0.25;

#[derive(Debug, Clone, Copy)]
struct Bm25Params {
    /// Term-frequency saturation.
    k1: f64,
    /// Length normalization strength.
    b: f64,
    /// Fraction of the mean idf given to negative-idf terms.
    epsilon: f64,
}

impl Default for Bm25Params {
    fn default() -> Self {
        Self {
            k1: DEFAULT_K1,
            b: DEFAULT_B,
            epsilon: DEFAULT_EPSILON,
        }
    }
}

/// Immutable BM25 index; one entry per corpus chunk, in corpus order.
#[derive(Debug)]
pub struct LexicalIndex {
    chunks: Vec<Arc<Chunk>>,
    term_freqs: Vec<HashMap<String, u32>>,
    doc_lens: Vec<usize>,
    avg_doc_len: f64,
    idf: HashMap<String, f64>,
    params: Bm25Params,
}

impl LexicalIndex {
    pub fn build(chunks: &[Arc<Chunk>]) -> Self {
        let params = Bm25Params::default();
        let mut term_freqs = Vec::with_capacity(chunks.len());
        let mut doc_lens = Vec::with_capacity(chunks.len());
        let mut doc_freq: HashMap<String, usize> = HashMap::new();

        for chunk in chunks {
            let tokens = text::tokens(&chunk.content);
            doc_lens.push(tokens.len());

            let mut freqs: HashMap<String, u32> = HashMap::new();
            for token in tokens {
                *freqs.entry(token).or_default() += 1;
            }
            for term in freqs.keys() {
                *doc_freq.entry(term.clone()).or_default() += 1;
            }
            term_freqs.push(freqs);
        }

        let total_len: usize = doc_lens.iter().sum();
        let avg_doc_len = if chunks.is_empty() {
            0.0
        } else {
            total_len as f64 / chunks.len() as f64
        };

        let idf = compute_idf(&doc_freq, chunks.len(), params.epsilon);
        info!(
            chunks = chunks.len(),
            vocabulary = idf.len(),
            avg_doc_len,
            "built lexical index"
        );

        Self {
            chunks: chunks.to_vec(),
            term_freqs,
            doc_lens,
            avg_doc_len,
            idf,
            params,
        }
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    fn score_doc(&self, doc: usize, query: &[String]) -> f64 {
        let Bm25Params { k1, b, .. } = self.params;
        let freqs = &self.term_freqs[doc];
        let len_ratio = if self.avg_doc_len > 0.0 {
            self.doc_lens[doc] as f64 / self.avg_doc_len
        } else {
            0.0
        };

        query
            .iter()
            .map(|term| {
                let tf = f64::from(freqs.get(term).copied().unwrap_or(0));
                if tf == 0.0 {
                    return 0.0;
                }
                let idf = self.idf.get(term).copied().unwrap_or(0.0);
                idf * (tf * (k1 + 1.0)) / (tf + k1 * (1.0 - b + b * len_ratio))
            })
            .sum()
    }
}

impl SparseScore for LexicalIndex {
    fn scores(&self, tokens: &[String]) -> Vec<f64> {
        (0..self.chunks.len())
            .map(|doc| self.score_doc(doc, tokens))
            .collect()
    }

    fn chunks(&self) -> &[Arc<Chunk>] {
        &self.chunks
    }
}

/// Indices of the `n` highest scores, best first.
///
/// Equal scores keep corpus order so the sparse ranking is deterministic.
pub fn top_indices(scores: &[f64], n: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..scores.len()).collect();
    order.sort_by(|&a, &b| scores[b].total_cmp(&scores[a]).then(a.cmp(&b)));
    order.truncate(n);
    order
}

fn compute_idf(doc_freq: &HashMap<String, usize>, n_docs: usize, epsilon: f64) -> HashMap<String, f64> {
    let n = n_docs as f64;
    let mut idf: HashMap<String, f64> = doc_freq
        .iter()
        .map(|(term, &df)| {
            let df = df as f64;
            (term.clone(), ((n - df + 0.5) / (df + 0.5)).ln())
        })
        .collect();

    if idf.is_empty() {
        return idf;
    }
    let mean = idf.values().sum::<f64>() / idf.len() as f64;
    let floor = epsilon * mean;
    for value in idf.values_mut() {
        if *value < 0.0 {
            *value = floor;
        }
    }
    idf
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunks(texts: &[&str]) -> Vec<Arc<Chunk>> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| Arc::new(Chunk::new(format!("POJK_{i}_2022.pdf"), 2, *t)))
            .collect()
    }

    #[test]
    fn matching_document_scores_highest() {
        let corpus = chunks(&[
            "kewajiban penyediaan modal minimum bank umum",
            "manajemen risiko teknologi informasi",
            "tugas dan wewenang otoritas jasa keuangan",
        ]);
        let index = LexicalIndex::build(&corpus);
        let scores = index.scores(&text::tokens("modal minimum"));
        assert_eq!(scores.len(), 3);
        assert!(scores[0] > 0.0);
        assert_eq!(scores[1], 0.0);
        assert_eq!(top_indices(&scores, 1), vec![0]);
    }

    #[test]
    fn unknown_terms_score_zero() {
        let index = LexicalIndex::build(&chunks(&["pasal satu", "pasal dua"]));
        assert!(index.scores(&text::tokens("likuiditas")).iter().all(|&s| s == 0.0));
    }

    #[test]
    fn common_terms_keep_positive_idf() {
        // "bank" appears in every document: its raw idf is negative and gets floored.
        let index = LexicalIndex::build(&chunks(&[
            "bank modal",
            "bank risiko",
            "bank likuiditas",
        ]));
        let scores = index.scores(&text::tokens("bank modal"));
        assert!(scores.iter().all(|&s| s.is_finite()));
        assert_eq!(top_indices(&scores, 3)[0], 0);
    }

    #[test]
    fn top_indices_breaks_ties_by_position() {
        assert_eq!(top_indices(&[1.0, 3.0, 1.0, 3.0], 4), vec![1, 3, 0, 2]);
        assert_eq!(top_indices(&[0.5, 0.2], 10), vec![0, 1]);
        assert!(top_indices(&[], 3).is_empty());
    }
}
