mod display;

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use futures::stream::{self, StreamExt};
use regula_core::Strictness;
use regula_core::config::RegulaConfig;
use regula_host::{CancelToken, Pipeline};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "regula", version, about = "Question answering over Indonesian banking regulations")]
struct Cli {
    /// TOML config file; `REGULA_*` environment variables override it.
    #[arg(long, global = true, env = "REGULA_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, e.g. `info` or `regula_rank=debug`. Falls back to `RUST_LOG`.
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Answer one question.
    Ask {
        question: String,
        /// Answer only questions naming a regulation, from that regulation alone.
        #[arg(long)]
        strict: bool,
        /// Print the response as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Answer every non-empty line of a file, then print the fairness report.
    Batch {
        file: PathBuf,
        #[arg(long)]
        strict: bool,
        /// Questions in flight at once.
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
    },
    /// Show how a question is parsed and routed, without retrieval.
    Inspect { question: String },
}

fn init_tracing(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("regula=info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>, strict: bool) -> anyhow::Result<RegulaConfig> {
    let mut config = RegulaConfig::load(path).context("failed to load configuration")?;
    if strict {
        config.pipeline.strictness = Strictness::Strict;
    }
    Ok(config)
}

/// Cancel `token` on Ctrl-C so in-flight model calls stop promptly.
fn cancel_on_interrupt(token: &CancelToken) {
    let token = token.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling");
            token.cancel();
        }
    });
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_deref());
    info!("regula v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Command::Ask {
            question,
            strict,
            json,
        } => {
            let config = load_config(cli.config.as_deref(), strict)?;
            let pipeline = Pipeline::from_config(&config).context("failed to build pipeline")?;
            let cancel = CancelToken::new();
            cancel_on_interrupt(&cancel);

            let response = pipeline.ask_with(&question, &cancel).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&response)?);
            } else {
                display::print_answer(&question, &response);
            }
        }
        Command::Batch {
            file,
            strict,
            concurrency,
        } => {
            let config = load_config(cli.config.as_deref(), strict)?;
            let text = std::fs::read_to_string(&file)
                .with_context(|| format!("cannot read {}", file.display()))?;
            let questions: Vec<&str> = text
                .lines()
                .map(str::trim)
                .filter(|line| !line.is_empty())
                .collect();
            let pipeline = Pipeline::from_config(&config).context("failed to build pipeline")?;
            let cancel = CancelToken::new();
            cancel_on_interrupt(&cancel);
            info!(questions = questions.len(), concurrency, "starting batch");

            let pipeline = &pipeline;
            let cancel = &cancel;
            let mut answers = stream::iter(questions)
                .map(|question| async move { (question, pipeline.ask_with(question, cancel).await) })
                .buffered(concurrency.max(1));

            let mut failed = 0_usize;
            while let Some((question, result)) = answers.next().await {
                match result {
                    Ok(response) => display::print_answer(question, &response),
                    Err(e) => {
                        failed += 1;
                        eprintln!("  {question}: {e}");
                    }
                }
                if cancel.is_cancelled() {
                    break;
                }
            }
            if failed > 0 {
                warn!(failed, "some questions failed");
            }
            display::print_fairness(&pipeline.fairness_report());
        }
        Command::Inspect { question } => {
            let config = load_config(cli.config.as_deref(), false)?;
            display::print_inspection(&question, &config.retrieval);
        }
    }

    Ok(())
}
