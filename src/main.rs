use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;

use reflective_rag::agents::LlmJudge;
use reflective_rag::{config::Config, AgentRunner, AnswerOptions, ConversationTurn};

/// Answer a question from local documents and the web, self-correcting
/// answers the judge scores poorly.
#[derive(Debug, Parser)]
#[command(name = "reflective-rag", version, about)]
struct Cli {
    /// The question to answer
    question: String,

    /// Directory of .txt/.md documents to index (overrides DOCS_DIR)
    #[arg(long)]
    docs: Option<PathBuf>,

    /// Passages requested from vector search
    #[arg(long)]
    limit: Option<usize>,

    /// Minimum judge score for an answer to be accepted
    #[arg(long)]
    threshold: Option<f64>,

    /// Corrective retries allowed after the first answer
    #[arg(long)]
    max_reflections: Option<u32>,

    /// JSON file with prior turns: [{"question": .., "answer": ..}, ..]
    #[arg(long)]
    history: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = Config::from_env()?;
    let _log_guard = reflective_rag::utils::init_logger(config.logging.log_dir.as_deref());
    info!(provider = %config.llm.provider, model = %config.llm.model, "Configuration loaded");

    if let Some(docs) = cli.docs {
        config.retrieval.docs_dir = Some(docs);
    }

    let history: Option<Vec<ConversationTurn>> = match &cli.history {
        Some(path) => {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read history file {}", path.display()))?;
            Some(serde_json::from_str(&raw).context("History file is not valid JSON")?)
        }
        None => None,
    };

    let defaults = AnswerOptions::from_config(&config.reflection);
    let options = AnswerOptions {
        limit: cli.limit.unwrap_or(defaults.limit),
        reflection_threshold: cli.threshold.unwrap_or(defaults.reflection_threshold),
        max_reflections: cli.max_reflections.unwrap_or(defaults.max_reflections),
    };

    let judge = Arc::new(LlmJudge::from_config(&config)?);
    let runner = AgentRunner::new(None, None, judge, &config).await?;

    let answer = runner
        .answer(&cli.question, history.as_deref(), options)
        .await?;

    println!("{}", answer);
    Ok(())
}
