mod ask;
mod chat;
mod config;

pub use ask::AskArgs;
pub use chat::ChatArgs;
pub use config::ConfigCommand;

pub use ask::handle_ask;
pub use chat::handle_chat;
pub use config::handle_config;

use std::collections::HashSet;
use std::io::Write;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::output::Formatter;
use crate::models::Config;
use crate::services::OnnxPipeline;
use crate::utils::{file_size_mb, find_pdf_files, validate_pdf_file};

/// Which PDFs to load, shared by `ask` and `chat`.
#[derive(Debug, Args)]
pub struct SourceArgs {
    /// PDF files to load
    #[arg(long, short = 'f', num_args = 1.., conflicts_with = "directory")]
    pub files: Vec<PathBuf>,

    /// Directory searched recursively for PDFs
    #[arg(long, short = 'd')]
    pub directory: Option<PathBuf>,

    /// Number of chunks to answer from
    #[arg(long, short = 'k')]
    pub top_k: Option<usize>,

    /// Skip confirmation prompt
    #[arg(long, short = 'y')]
    pub yes: bool,
}

impl SourceArgs {
    pub fn top_k(&self, config: &Config) -> Result<usize> {
        let top_k = self
            .top_k
            .unwrap_or(config.search.default_top_k as usize);
        if top_k == 0 {
            anyhow::bail!("top-k must be at least 1");
        }
        Ok(top_k)
    }

    /// Resolve the inputs to validated PDF paths, reporting rejected ones on stderr.
    pub fn resolve_files(&self, config: &Config) -> Result<Vec<PathBuf>> {
        let candidates = if let Some(ref dir) = self.directory {
            if !dir.is_dir() {
                anyhow::bail!("not a directory: {}", dir.display());
            }
            find_pdf_files(dir, &config.files.supported_extensions)
        } else if !self.files.is_empty() {
            let mut seen = HashSet::new();
            self.files
                .iter()
                .filter(|path| seen.insert(*path))
                .cloned()
                .collect()
        } else {
            anyhow::bail!("no input given: use --files <PDF>... or --directory <DIR>");
        };

        let mut valid = Vec::with_capacity(candidates.len());
        for path in candidates {
            match validate_pdf_file(&path, &config.files) {
                Ok(()) => valid.push(path),
                Err(e) => eprintln!("Skipping: {e}"),
            }
        }

        if valid.is_empty() {
            anyhow::bail!("no valid PDF files found");
        }
        Ok(valid)
    }
}

/// Print the selected files with their sizes and ask for confirmation unless `yes`.
pub fn confirm_files(files: &[PathBuf], yes: bool, formatter: &dyn Formatter) -> Result<bool> {
    eprintln!("Selected {} PDF file(s):", files.len());
    let mut total_mb = 0.0;
    for file in files {
        let size = file_size_mb(file).unwrap_or(0.0);
        total_mb += size;
        eprintln!("  {} ({:.1}MB)", file.display(), size);
    }
    eprintln!("Total: {:.1}MB", total_mb);

    if yes {
        return Ok(true);
    }

    eprint!("Continue? [y/N] ");
    std::io::stderr().flush()?;
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    if !input.trim().eq_ignore_ascii_case("y") {
        eprint!("{}", formatter.format_message("Cancelled."));
        return Ok(false);
    }
    Ok(true)
}

pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Load the models and index `files`. Blocking; run it off the async runtime.
pub fn build_pipeline(
    config: Config,
    files: &[PathBuf],
    formatter: &dyn Formatter,
) -> Result<OnnxPipeline> {
    let pb = spinner("Loading models...");
    let pipeline = OnnxPipeline::from_config(config);
    pb.finish_and_clear();
    let mut pipeline = pipeline.context("failed to load models")?;

    let pb = spinner(&format!("Indexing {} PDF file(s)...", files.len()));
    let report = pipeline.load(files).map(|report| report.clone());
    pb.finish_and_clear();
    let report = report.context("failed to load documents")?;

    eprint!("{}", formatter.format_report(&report));
    Ok(pipeline)
}
