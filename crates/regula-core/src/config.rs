//! Configuration for the retrieval, ranking and answering pipeline.
//!
//! [`RegulaConfig`] holds every tuning knob, including the reranker's weight
//! table. All sections have defaults; a TOML file overrides them selectively
//! and environment variables override the file.
//!
//! # Environment Variable Overrides
//!
//! | Variable              | Field                        | Default                  |
//! |-----------------------|------------------------------|--------------------------|
//! | `REGULA_CORPUS`       | `corpus.path`                | `data/corpus.jsonl`      |
//! | `REGULA_OLLAMA_URL`   | `services.ollama_url`        | `http://localhost:11434` |
//! | `REGULA_MODEL`        | `services.generation_model`  | `deepseek-r1:latest`     |
//! | `REGULA_EMBED_MODEL`  | `services.embedding_model`   | `nomic-embed-text`       |
//! | `REGULA_STRICT`       | `pipeline.strictness`        | `lenient`                |
//! | `REGULA_TIMEOUT_MS`   | `services.timeout_ms`        | `60000`                  |

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::chunk::RegulationType;
use crate::text;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("config parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RegulaConfig {
    pub corpus: CorpusConfig,
    pub retrieval: RetrievalConfig,
    pub rerank: RerankWeights,
    pub lock: LockConfig,
    pub services: ServiceConfig,
    pub pipeline: PipelineConfig,
}

impl RegulaConfig {
    /// Load configuration: defaults, then the TOML file (if any), then
    /// environment overrides. The result is validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = toml::from_str(&text)?;
        debug!(path = %path.display(), "loaded config file");
        Ok(config)
    }

    /// Apply `REGULA_*` overrides from `lookup` (normally the process environment).
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(v) = lookup("REGULA_CORPUS") {
            self.corpus.path = PathBuf::from(v);
        }
        if let Some(v) = lookup("REGULA_OLLAMA_URL") {
            self.services.ollama_url = v;
        }
        if let Some(v) = lookup("REGULA_MODEL") {
            self.services.generation_model = v;
        }
        if let Some(v) = lookup("REGULA_EMBED_MODEL") {
            self.services.embedding_model = v;
        }
        if let Some(v) = lookup("REGULA_STRICT") {
            self.pipeline.strictness = match v.to_ascii_lowercase().as_str() {
                "1" | "true" | "strict" => Strictness::Strict,
                "0" | "false" | "lenient" => Strictness::Lenient,
                other => {
                    return Err(ConfigError::Invalid(format!(
                        "REGULA_STRICT must be strict or lenient, got {other:?}"
                    )));
                }
            };
        }
        if let Some(v) = lookup("REGULA_TIMEOUT_MS") {
            self.services.timeout_ms = v.parse().map_err(|_| {
                ConfigError::Invalid(format!("REGULA_TIMEOUT_MS is not a number: {v:?}"))
            })?;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.retrieval;
        for (name, alpha) in [("alpha_lexical", r.alpha_lexical), ("alpha_semantic", r.alpha_semantic)] {
            if !(0.0..=1.0).contains(&alpha) {
                return Err(ConfigError::Invalid(format!(
                    "retrieval.{name} must be within [0, 1], got {alpha}"
                )));
            }
        }
        if r.depth == 0 || r.top_k == 0 {
            return Err(ConfigError::Invalid(
                "retrieval.depth and retrieval.top_k must be positive".into(),
            ));
        }
        if self.lock.locked_top_n == 0 {
            return Err(ConfigError::Invalid("lock.locked_top_n must be positive".into()));
        }
        if self.services.timeout_ms == 0 || self.services.search_timeout_ms == 0 {
            return Err(ConfigError::Invalid("service timeouts must be positive".into()));
        }
        Ok(())
    }
}

// ── Corpus ──

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorpusConfig {
    /// JSONL corpus snapshot produced by the ingestion step.
    pub path: PathBuf,
}

impl Default for CorpusConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("data/corpus.jsonl"),
        }
    }
}

// ── Retrieval and fusion ──

/// A topic phrase that pulls specific documents to the front of the fused list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicRule {
    /// Lowercase phrase searched for in the lowercased query.
    pub phrase: String,
    /// Canonical document-id prefixes, e.g. `UU_21_2011`.
    pub documents: Vec<String>,
}

impl TopicRule {
    fn new(phrase: &str, documents: &[&str]) -> Self {
        Self {
            phrase: phrase.to_string(),
            documents: documents.iter().map(|d| d.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Candidates fetched from each retriever and kept after fusion.
    pub depth: usize,
    /// Candidates selected for the answer context.
    pub top_k: usize,
    /// Dense weight when the query names a regulation or an article.
    pub alpha_lexical: f64,
    /// Dense weight otherwise.
    pub alpha_semantic: f64,
    /// Words meaning "article"; their presence favours lexical retrieval.
    pub article_words: Vec<String>,
    pub topic_rules: Vec<TopicRule>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            depth: 10,
            top_k: 5,
            alpha_lexical: 0.3,
            alpha_semantic: 0.6,
            article_words: vec!["pasal".to_string()],
            topic_rules: vec![
                TopicRule::new("ojk", &["UU_21_2011"]),
                TopicRule::new("otoritas jasa keuangan", &["UU_21_2011"]),
                TopicRule::new("tugas ojk", &["UU_21_2011"]),
                TopicRule::new("wewenang ojk", &["UU_21_2011"]),
                TopicRule::new("manajemen risiko teknologi", &["POJK_11_2022"]),
                TopicRule::new("manajemen risiko ti", &["POJK_11_2022"]),
                TopicRule::new("teknologi informasi bank", &["POJK_11_2022"]),
                TopicRule::new("modal minimum", &["POJK_27_2022"]),
                TopicRule::new("permodalan bank", &["POJK_27_2022"]),
            ],
        }
    }
}

// ── Reranker weight table ──

/// Static prior per regulation type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypePriority {
    pub uu: f64,
    pub pojk: f64,
    pub seojk: f64,
}

impl TypePriority {
    pub fn get(&self, kind: RegulationType) -> f64 {
        match kind {
            RegulationType::Uu => self.uu,
            RegulationType::Pojk => self.pojk,
            RegulationType::Seojk => self.seojk,
        }
    }
}

/// Phrases that mean the query explicitly names a regulation type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeMentions {
    pub uu: Vec<String>,
    pub pojk: Vec<String>,
    pub seojk: Vec<String>,
}

impl TypeMentions {
    /// First type (in UU, POJK, SEOJK order) named by the lowercased query.
    pub fn named_type(&self, query_lower: &str) -> Option<RegulationType> {
        RegulationType::ALL.into_iter().find(|kind| {
            let phrases = match kind {
                RegulationType::Uu => &self.uu,
                RegulationType::Pojk => &self.pojk,
                RegulationType::Seojk => &self.seojk,
            };
            phrases.iter().any(|p| text::contains_word(query_lower, p))
        })
    }
}

/// Additive signal table for the heuristic reranker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RerankWeights {
    /// Numerator of the rank-position bonus `rank_bonus / (r + 1)`.
    pub rank_bonus: f64,
    /// Per shared query/content term.
    pub keyword_overlap: f64,
    pub type_priority: TypePriority,
    /// Priority of the type the query names explicitly.
    pub named_type_priority: f64,
    /// Priority of every type when the query names none.
    pub flat_type_priority: f64,
    pub type_mentions: TypeMentions,
    pub year_exact: f64,
    pub year_near: f64,
    pub year_near_window: u16,
    pub year_mid: f64,
    pub year_mid_window: u16,
    /// Penalty per year of distance beyond `year_mid_window`.
    pub year_penalty_per_year: f64,
    pub name_match: f64,
    /// Applied (as a negative delta) when the query names another regulation.
    pub name_mismatch: f64,
    pub domain_term: f64,
    pub domain_terms: Vec<String>,
    /// Number of top candidates counted as "selected" by the fairness ledger.
    pub selection_window: usize,
}

impl Default for RerankWeights {
    fn default() -> Self {
        let strings = |items: &[&str]| items.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        Self {
            rank_bonus: 100.0,
            keyword_overlap: 5.0,
            type_priority: TypePriority {
                uu: 200.0,
                pojk: 100.0,
                seojk: 80.0,
            },
            named_type_priority: 80.0,
            flat_type_priority: 50.0,
            type_mentions: TypeMentions {
                uu: strings(&["undang-undang", "uu"]),
                pojk: strings(&["pojk", "peraturan ojk"]),
                seojk: strings(&["seojk", "surat edaran"]),
            },
            year_exact: 100.0,
            year_near: 50.0,
            year_near_window: 3,
            year_mid: 20.0,
            year_mid_window: 5,
            year_penalty_per_year: 0.5,
            name_match: 500.0,
            name_mismatch: 50.0,
            domain_term: 2.0,
            domain_terms: strings(&[
                "pasal",
                "ayat",
                "huruf",
                "angka",
                "ketentuan",
                "peraturan",
                "undang-undang",
                "bank",
                "risiko",
                "modal",
                "likuiditas",
            ]),
            selection_window: 5,
        }
    }
}

// ── Regulation lock ──

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LockConfig {
    /// Lowercase phrasings that ask for a definition of the regulation.
    pub definition_phrases: Vec<String>,
    /// Highest page index treated as a cover/identity page.
    pub identity_max_page: u32,
    /// Identity pages kept for definition queries.
    pub definition_cap: usize,
    /// Locked candidates kept otherwise.
    pub locked_top_n: usize,
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            definition_phrases: [
                "apa yang dimaksud",
                "apa itu",
                "pengertian",
                "definisi",
                "what is meant by",
                "what is",
                "definition of",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            identity_max_page: 1,
            definition_cap: 2,
            locked_top_n: 5,
        }
    }
}

// ── External services ──

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub ollama_url: String,
    pub generation_model: String,
    pub embedding_model: String,
    /// Budget for one generation call.
    pub timeout_ms: u64,
    /// Budget for one dense-search call (embedding included).
    pub search_timeout_ms: u64,
    /// Retries after the first attempt, transient failures only.
    pub max_retries: u32,
    /// Base delay for exponential backoff between retries.
    pub retry_base_delay_ms: u64,
}

impl ServiceConfig {
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            generation_model: "deepseek-r1:latest".to_string(),
            embedding_model: "nomic-embed-text".to_string(),
            timeout_ms: 60_000,
            search_timeout_ms: 10_000,
            max_retries: 2,
            retry_base_delay_ms: 500,
        }
    }
}

// ── Pipeline ──

/// How the pipeline treats a query that names a specific regulation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Always generate; decorate the answer with warnings on anomalies.
    #[default]
    Lenient,
    /// Lock candidates to the named regulation and stop before generation
    /// when it is absent or no regulation is named.
    Strict,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub strictness: Strictness,
}
