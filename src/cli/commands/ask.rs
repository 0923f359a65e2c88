use anyhow::{Context, Result};
use clap::Args;

use super::{SourceArgs, build_pipeline, confirm_files, spinner};
use crate::cli::output::get_formatter;
use crate::models::{Config, OutputFormat};

#[derive(Debug, Args)]
pub struct AskArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Question to answer from the documents
    #[arg(long, short = 'q')]
    pub question: String,
}

pub async fn handle_ask(args: AskArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let question = args.question.trim().to_string();
    if question.is_empty() {
        anyhow::bail!("question cannot be empty");
    }

    let config = Config::load().context("failed to load configuration")?;
    let formatter = get_formatter(format);
    let top_k = args.source.top_k(&config)?;
    let files = args.source.resolve_files(&config)?;

    if !confirm_files(&files, args.source.yes, formatter.as_ref())? {
        return Ok(());
    }

    if verbose {
        eprintln!("Question: \"{question}\"");
        eprintln!("  Top-k: {top_k}");
    }

    let output = tokio::task::spawn_blocking(move || -> Result<String> {
        let formatter = get_formatter(format);
        let pipeline = build_pipeline(config, &files, formatter.as_ref())?;

        let pb = spinner("Generating answer...");
        let trace = pipeline.answer(&question, Some(top_k));
        pb.finish_and_clear();
        let trace = trace.context("failed to answer question")?;

        Ok(formatter.format_answer(&trace, verbose))
    })
    .await
    .context("answer task failed")??;

    print!("{output}");
    Ok(())
}
