//! Human-readable rendering of answers, fairness reports and query analysis.
//!
//! Everything is printed as a vertical card: a `=== title ===` header, then
//! labelled sections with fields aligned in a fixed-width column.

use regula_core::config::RetrievalConfig;
use regula_core::reference;
use regula_core::text::truncate_chars;
use regula_host::{AnswerStatus, AskResponse};
use regula_rank::FairnessReport;
use regula_rank::fusion::{adaptive_alpha, matched_topics};
use regula_rank::rerank::format_trail;

const LABEL_WIDTH: usize = 22;
const MAX_SNIPPET_CHARS: usize = 160;

fn field(label: &str, value: impl std::fmt::Display) {
    println!("  {label:<LABEL_WIDTH$} {value}");
}

// ── Public API ──

/// Print an answer card: the answer text, then sources, confidence and
/// citation check.
pub fn print_answer(question: &str, response: &AskResponse) {
    println!("=== {question} ===");
    println!();
    println!("{}", response.answer);
    println!();

    println!("Status");
    field("status", status_label(response.status));
    if let Some(target) = &response.reference {
        field("regulation", target);
    }
    field("sources", response.num_sources);
    println!();

    if !response.sources.is_empty() {
        println!("Sources");
        for (i, source) in response.sources.iter().enumerate() {
            println!(
                "  {:>2}. {} (halaman {}, skor {:.1})",
                i + 1,
                source.document,
                source.page,
                source.score
            );
            if !source.snippet.is_empty() {
                println!("      {}", truncate_chars(&source.snippet, MAX_SNIPPET_CHARS));
            }
            if !source.signals.is_empty() {
                println!("      [{}]", format_trail(&source.signals));
            }
        }
        println!();
    }

    if response.status == AnswerStatus::Answered {
        let c = &response.confidence;
        println!("Confidence");
        field("overall", format!("{} ({})", c.percentage, c.level.as_str()));
        field("retrieval_quality", format!("{:.2}", c.factors.retrieval_quality));
        field("document_consistency", format!("{:.2}", c.factors.document_consistency));
        field("query_coverage", format!("{:.2}", c.factors.query_coverage));
        field("explanation", &c.explanation);
        println!();

        println!("Citation Check");
        match &response.validation.error {
            None => field("valid", "yes"),
            Some(error) => {
                field("valid", "no");
                field("error", error);
            }
        }
        println!();
    }
}

/// Print the cumulative selection-fairness report.
pub fn print_fairness(report: &FairnessReport) {
    println!("=== Fairness ===");
    field("total_retrieved", report.total_retrieved);
    field("total_selected", report.total_selected);
    field("selection_spread", format!("{:.1} pp", report.selection_spread));
    field("bias_detected", if report.bias_detected { "yes" } else { "no" });

    if !report.by_type.is_empty() {
        println!();
        println!("By Type");
        for (kind, stats) in &report.by_type {
            field(
                kind,
                format!(
                    "{} / {} selected ({:.1}%)",
                    stats.selected, stats.retrieved, stats.selection_rate_percent
                ),
            );
        }
    }
}

/// Print how a question would be routed, without touching any index.
pub fn print_inspection(question: &str, config: &RetrievalConfig) {
    println!("=== {question} ===");
    println!();

    println!("Reference");
    match reference::parse(question) {
        Some(target) => {
            field("citation", &target);
            field("canonical_id", &target.canonical_id);
        }
        None => field("citation", "-"),
    }
    match reference::parse_designation(question) {
        Some(designation) => field(
            "designation",
            format!("{} {}", designation.kind, designation.number),
        ),
        None => field("designation", "-"),
    }
    match reference::query_year(question) {
        Some(year) => field("year", year),
        None => field("year", "-"),
    }
    println!();

    println!("Fusion");
    field("alpha", format!("{:.2}", adaptive_alpha(question, config)));
    field("depth", config.depth);
    let topics = matched_topics(question, &config.topic_rules);
    if topics.is_empty() {
        field("topic_boost", "-");
    }
    for rule in topics {
        field("topic_boost", format!("{:?} -> {}", rule.phrase, rule.documents.join(", ")));
    }
}

// ── Helpers ──

fn status_label(status: AnswerStatus) -> &'static str {
    match status {
        AnswerStatus::Answered => "answered",
        AnswerStatus::Unavailable => "unavailable",
        AnswerStatus::NotExplicit => "not explicit",
    }
}
