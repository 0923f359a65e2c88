//! Command-line interface of the PDF question-answering tool.

pub mod commands;
pub mod output;

use clap::{Parser, Subcommand};

use crate::models::OutputFormat;

/// Answer questions about PDF documents with a local language model.
#[derive(Debug, Parser)]
#[command(name = "pdfqa")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[arg(long, global = true, help = "Output format: text, json, or markdown")]
    pub format: Option<OutputFormat>,

    #[arg(long, short = 'v', global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Load PDFs and answer one question
    Ask(commands::AskArgs),

    /// Load PDFs and answer questions interactively
    Chat(commands::ChatArgs),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::ConfigCommand),
}
