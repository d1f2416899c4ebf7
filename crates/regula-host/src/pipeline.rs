//! The request pipeline.
//!
//! ```text
//! query ─► reference parse ─► dense ∥ sparse ─► fusion ─► [lock] ─► rerank
//!       ─► selection ─► confidence ─► context ─► generation ─► citation check
//! ```
//!
//! Ranking and validation are pure; only dense search and generation leave
//! the process, and both run under a [`CallPolicy`] and the caller's
//! [`CancelToken`].

use std::sync::Arc;

use regula_ai::OllamaClient;
use regula_core::config::{RegulaConfig, RetrievalConfig};
use regula_core::{
    AnswerGenerator, Chunk, DenseSearch, ExternalError, PromptBuilder, RegulationReference,
    RegulationType, SparseScore, Strictness, reference, text,
};
use regula_rank::lock::order_by_page;
use regula_rank::{
    CitationValidator, ConfidenceScorer, FairnessLedger, FairnessReport, HeuristicReranker,
    LockOutcome, RankFusionEngine, RegulationLockGuard, ScoredCandidate,
};
use regula_store::{Corpus, LexicalIndex, StoreError, top_indices};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};

use crate::call::{CallPolicy, call_with_policy};
use crate::cancel::CancelToken;
use crate::prompt::{ContextPromptBuilder, format_context};
use crate::response::{AnswerStatus, AskResponse, SourceRef};
use crate::search::{DENSE_SEARCH_SERVICE, SemanticSearch};
use crate::snippet::extract_snippet;

const GENERATION_SERVICE: &str = "generation";
/// Selected sources checked by the lenient coverage warnings.
const WARNING_WINDOW: usize = 3;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("question is empty")]
    EmptyQuery,

    #[error(transparent)]
    External(#[from] ExternalError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// The external collaborators a pipeline is wired to.
pub struct Collaborators {
    pub dense: Arc<dyn DenseSearch>,
    /// Lexical index; its chunk list doubles as the corpus.
    pub sparse: Arc<dyn SparseScore>,
    pub generator: Arc<dyn AnswerGenerator>,
    pub prompt: Arc<dyn PromptBuilder>,
}

pub struct Pipeline {
    retrieval: RetrievalConfig,
    strictness: Strictness,
    search_policy: CallPolicy,
    generation_policy: CallPolicy,
    collaborators: Collaborators,
    fusion: RankFusionEngine,
    reranker: HeuristicReranker,
    lock: RegulationLockGuard,
    confidence: ConfidenceScorer,
    citations: CitationValidator,
    ledger: Arc<FairnessLedger>,
}

impl Pipeline {
    pub fn new(
        config: &RegulaConfig,
        collaborators: Collaborators,
        ledger: Arc<FairnessLedger>,
    ) -> Self {
        Self {
            retrieval: config.retrieval.clone(),
            strictness: config.pipeline.strictness,
            search_policy: CallPolicy::search(&config.services),
            generation_policy: CallPolicy::generation(&config.services),
            collaborators,
            fusion: RankFusionEngine::new(config.retrieval.clone()),
            reranker: HeuristicReranker::new(config.rerank.clone(), Arc::clone(&ledger)),
            lock: RegulationLockGuard::new(config.lock.clone()),
            confidence: ConfidenceScorer,
            citations: CitationValidator,
            ledger,
        }
    }

    /// Load the corpus snapshot, build both indexes and connect to Ollama.
    pub fn from_config(config: &RegulaConfig) -> Result<Self, PipelineError> {
        let corpus = Corpus::load(&config.corpus.path)?;
        let lexical = LexicalIndex::build(corpus.chunks());
        let vectors = corpus.vector_index()?;
        if vectors.is_empty() {
            warn!("corpus has no embeddings, dense retrieval disabled");
        }

        let client = Arc::new(OllamaClient::from_config(&config.services));
        info!(
            chunks = corpus.len(),
            embedded = vectors.len(),
            dim = vectors.dim(),
            ollama = %client.base_url(),
            strictness = ?config.pipeline.strictness,
            "pipeline ready"
        );

        let collaborators = Collaborators {
            dense: Arc::new(SemanticSearch::new(client.clone(), vectors)),
            sparse: Arc::new(lexical),
            generator: client,
            prompt: Arc::new(ContextPromptBuilder),
        };
        Ok(Self::new(config, collaborators, Arc::new(FairnessLedger::new())))
    }

    pub fn fairness_report(&self) -> FairnessReport {
        self.ledger.report()
    }

    pub async fn ask(&self, query: &str) -> Result<AskResponse, PipelineError> {
        self.ask_with(query, &CancelToken::new()).await
    }

    #[instrument(name = "regula::ask", skip(self, cancel), fields(strictness = ?self.strictness))]
    pub async fn ask_with(
        &self,
        query: &str,
        cancel: &CancelToken,
    ) -> Result<AskResponse, PipelineError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(PipelineError::EmptyQuery);
        }

        let target = reference::parse(query);
        if self.strictness == Strictness::Strict && target.is_none() {
            debug!("strict mode without explicit regulation");
            return Ok(AskResponse::without_answer(
                AnswerStatus::NotExplicit,
                "Pertanyaan tidak menyebut regulasi secara eksplisit (contoh: POJK 11 Tahun 2022). \
                 Mode strict hanya menjawab pertanyaan tentang regulasi yang disebut."
                    .to_string(),
                None,
            ));
        }

        let corpus = self.collaborators.sparse.chunks();
        let dense = self.dense_search(query, cancel).await?;
        let scores = self.collaborators.sparse.scores(&text::tokens(query));
        let sparse = top_indices(&scores, self.retrieval.depth);
        let fused = self.fusion.fuse(query, &dense, &sparse, corpus);
        debug!(dense = dense.len(), sparse = sparse.len(), fused = fused.len(), "retrieved");

        let mut selected = match (&target, self.strictness) {
            (Some(target), Strictness::Strict) => {
                match self.lock.filter(target, &fused, corpus, self.retrieval.depth) {
                    LockOutcome::Unavailable => {
                        return Ok(AskResponse::without_answer(
                            AnswerStatus::Unavailable,
                            format!("Dokumen {target} tidak tersedia dalam sistem."),
                            Some(target.clone()),
                        ));
                    }
                    LockOutcome::Locked { candidates, source } => {
                        debug!(locked = candidates.len(), ?source, "regulation lock applied");
                        let reranked = self.reranker.rerank(&candidates, query);
                        self.lock.narrow(query, reranked)
                    }
                }
            }
            _ => {
                let candidates: Vec<Arc<Chunk>> =
                    fused.iter().map(|c| Arc::clone(&c.chunk)).collect();
                let mut reranked = self.reranker.rerank(&candidates, query);
                reranked.truncate(self.retrieval.top_k);
                reranked
            }
        };

        let confidence = self.confidence.score(&selected, query);
        let mut warnings = match self.strictness {
            Strictness::Lenient => coverage_warnings(query, target.as_ref(), &selected),
            Strictness::Strict => Vec::new(),
        };
        if self.strictness == Strictness::Strict {
            order_by_page(&mut selected);
        }

        let context = format_context(&selected, self.strictness);
        let prompt = self.collaborators.prompt.build(&context, query);
        let generated = self.generate(&prompt, cancel).await?;

        let supplied: Vec<Arc<Chunk>> = selected.iter().map(|c| Arc::clone(&c.chunk)).collect();
        let validation = self.citations.validate(&generated, &supplied);
        if let Some(error) = &validation.error {
            warnings.push(format!("⚠️ Peringatan: {error}"));
        }

        let answer = warnings
            .iter()
            .map(|w| format!("{w}\n\n"))
            .chain(std::iter::once(generated))
            .collect::<String>();
        let sources: Vec<SourceRef> = selected
            .iter()
            .map(|c| SourceRef {
                document: c.chunk.source.clone(),
                page: c.chunk.page,
                score: c.score,
                snippet: extract_snippet(&c.chunk.content, query),
                signals: c.trail.clone(),
            })
            .collect();

        info!(
            sources = sources.len(),
            confidence = %confidence.percentage,
            valid = validation.valid,
            "answered"
        );
        Ok(AskResponse {
            status: AnswerStatus::Answered,
            answer,
            num_sources: sources.len(),
            sources,
            confidence,
            validation,
            reference: target,
            warnings,
        })
    }

    async fn dense_search(
        &self,
        query: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<Arc<Chunk>>, ExternalError> {
        let depth = self.retrieval.depth;
        let dense = &self.collaborators.dense;
        call_with_policy(DENSE_SEARCH_SERVICE, &self.search_policy, cancel, || {
            dense.search(query, depth)
        })
        .await
    }

    async fn generate(&self, prompt: &str, cancel: &CancelToken) -> Result<String, ExternalError> {
        let generator = &self.collaborators.generator;
        call_with_policy(GENERATION_SERVICE, &self.generation_policy, cancel, || {
            generator.generate(prompt)
        })
        .await
    }
}

/// Lenient-mode banners for a question whose named document or type did not
/// make the top of the selection.
fn coverage_warnings(
    query: &str,
    target: Option<&RegulationReference>,
    selected: &[ScoredCandidate],
) -> Vec<String> {
    let top = &selected[..selected.len().min(WARNING_WINDOW)];
    let mut warnings = Vec::new();

    if let Some(target) = target {
        if !top.iter().any(|c| target.matches_source(&c.chunk.source)) {
            warnings.push(format!("⚠️ Dokumen {target} tidak ditemukan dalam sistem."));
        }
    }

    if let Some(kind) = mentioned_type(query) {
        if !top.iter().any(|c| c.chunk.regulation_type() == Some(kind)) {
            let fallback = match kind {
                RegulationType::Seojk => "POJK terkait",
                RegulationType::Pojk | RegulationType::Uu => "regulasi terkait",
            };
            warnings.push(format!(
                "⚠️ {kind} yang dimaksud tidak ditemukan. Jawaban memakai {fallback}."
            ));
        }
    }
    warnings
}

/// Regulation type the question mentions, checked SEOJK, POJK, then UU.
fn mentioned_type(query: &str) -> Option<RegulationType> {
    let lower = query.to_lowercase();
    if text::contains_word(&lower, "seojk") {
        Some(RegulationType::Seojk)
    } else if text::contains_word(&lower, "pojk") {
        Some(RegulationType::Pojk)
    } else if text::contains_word(&lower, "undang-undang") || text::contains_word(&lower, "uu") {
        Some(RegulationType::Uu)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected(sources: &[&str]) -> Vec<ScoredCandidate> {
        sources
            .iter()
            .map(|s| ScoredCandidate {
                chunk: Arc::new(Chunk::new(*s, 2, "isi")),
                score: 100.0,
                trail: Vec::new(),
            })
            .collect()
    }

    #[test]
    fn mentioned_type_order() {
        assert_eq!(mentioned_type("isi SEOJK tentang pojk"), Some(RegulationType::Seojk));
        assert_eq!(mentioned_type("Peraturan POJK 11"), Some(RegulationType::Pojk));
        assert_eq!(mentioned_type("menurut UU 21/2011"), Some(RegulationType::Uu));
        assert_eq!(mentioned_type("undang-undang perbankan"), Some(RegulationType::Uu));
        assert_eq!(mentioned_type("tugas otoritas"), None);
        assert_eq!(mentioned_type("kuukuu"), None);
        assert_eq!(mentioned_type("kuu x"), None);
    }

    #[test]
    fn missing_named_document_warns() {
        let target = reference::parse("POJK 11/2022").unwrap();
        let warnings = coverage_warnings(
            "isi POJK 11/2022",
            Some(&target),
            &selected(&["POJK_27_2022.pdf", "UU_21_2011.pdf"]),
        );
        assert_eq!(warnings, vec!["⚠️ Dokumen POJK 11/2022 tidak ditemukan dalam sistem."]);
    }

    #[test]
    fn missing_type_warns_only_when_absent_from_top_three() {
        let in_top = coverage_warnings(
            "ketentuan seojk",
            None,
            &selected(&["POJK_1_2020.pdf", "SEOJK_2_2021.pdf"]),
        );
        assert!(in_top.is_empty());

        let outside = coverage_warnings(
            "ketentuan seojk",
            None,
            &selected(&["POJK_1_2020.pdf", "POJK_2_2020.pdf", "UU_3_2020.pdf", "SEOJK_2_2021.pdf"]),
        );
        assert_eq!(outside.len(), 1);
        assert!(outside[0].contains("SEOJK"));
        assert!(outside[0].contains("POJK terkait"));
    }
}
