use std::io::{BufRead, Write};

use anyhow::{Context, Result};
use clap::Args;
use console::style;

use super::{SourceArgs, build_pipeline, confirm_files};
use crate::cli::output::{Formatter, get_formatter};
use crate::engine::{Embedder, LanguageModel};
use crate::models::{Config, OutputFormat};
use crate::services::QaPipeline;

const EXIT_WORDS: [&str; 3] = ["çık", "exit", "quit"];

#[derive(Debug, Args)]
pub struct ChatArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Question answered before the interactive session starts
    #[arg(long, short = 'q')]
    pub question: Option<String>,
}

/// One line of user input in the interactive session.
#[derive(Debug, PartialEq, Eq)]
enum SessionInput {
    Empty,
    Exit,
    Stats,
    Question(String),
}

fn parse_input(line: &str) -> SessionInput {
    let line = line.trim();
    if line.is_empty() {
        return SessionInput::Empty;
    }
    let lowered = line.to_lowercase();
    if EXIT_WORDS.contains(&lowered.as_str()) {
        SessionInput::Exit
    } else if lowered == "stats" {
        SessionInput::Stats
    } else {
        SessionInput::Question(line.to_string())
    }
}

pub async fn handle_chat(args: ChatArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = Config::load().context("failed to load configuration")?;
    let formatter = get_formatter(format);
    let top_k = args.source.top_k(&config)?;
    let files = args.source.resolve_files(&config)?;

    if !confirm_files(&files, args.source.yes, formatter.as_ref())? {
        return Ok(());
    }

    let initial = args.question;
    tokio::task::spawn_blocking(move || -> Result<()> {
        let formatter = get_formatter(format);
        let pipeline = build_pipeline(config, &files, formatter.as_ref())?;

        eprintln!(
            "Ready. Type a question, 'stats' for statistics, or '{}' to leave.",
            EXIT_WORDS.join("' / '")
        );
        let stdin = std::io::stdin();
        run_session(
            &pipeline,
            formatter.as_ref(),
            Session {
                top_k,
                verbose,
                initial,
                interactive: true,
            },
            stdin.lock(),
            std::io::stdout(),
        )
    })
    .await
    .context("chat session failed")?
}

struct Session {
    top_k: usize,
    verbose: bool,
    initial: Option<String>,
    /// Print an input prompt before each read
    interactive: bool,
}

/// Answer questions read line by line until EOF or an exit word. Errors are printed, not returned.
fn run_session<L, E, R, W>(
    pipeline: &QaPipeline<L, E>,
    formatter: &dyn Formatter,
    session: Session,
    input: R,
    mut output: W,
) -> Result<()>
where
    L: LanguageModel,
    E: Embedder,
    R: BufRead,
    W: Write,
{
    let answer = |question: &str, output: &mut W| -> Result<()> {
        match pipeline.answer(question, Some(session.top_k)) {
            Ok(trace) => write!(output, "{}", formatter.format_answer(&trace, session.verbose))?,
            Err(e) => write!(output, "{}", formatter.format_error(&e.to_string()))?,
        }
        output.flush()?;
        Ok(())
    };

    if let Some(ref question) = session.initial {
        answer(question, &mut output)?;
    }

    let mut lines = input.lines();
    loop {
        if session.interactive {
            eprint!("{} ", style("Soru:").cyan().bold());
            std::io::stderr().flush()?;
        }

        let Some(line) = lines.next() else {
            break;
        };
        match parse_input(&line.context("failed to read input")?) {
            SessionInput::Empty => continue,
            SessionInput::Exit => break,
            SessionInput::Stats => {
                write!(output, "{}", formatter.format_stats(&pipeline.stats()))?;
            }
            SessionInput::Question(question) => answer(&question, &mut output)?,
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::cli::output::JsonFormatter;
    use crate::engine::testing::{FakeEmbedder, ScriptedModel};
    use crate::models::{ChunkingConfig, CorpusReport, ExtractedCorpus, GenerationConfig};

    #[test]
    fn test_parse_input() {
        assert_eq!(parse_input("   "), SessionInput::Empty);
        assert_eq!(parse_input("çık"), SessionInput::Exit);
        assert_eq!(parse_input(" QUIT "), SessionInput::Exit);
        assert_eq!(parse_input("stats"), SessionInput::Stats);
        assert_eq!(
            parse_input(" Tork nedir? "),
            SessionInput::Question("Tork nedir?".to_string())
        );
    }

    fn ready_pipeline() -> QaPipeline<Arc<ScriptedModel>, Arc<FakeEmbedder>> {
        let config = Config {
            chunking: ChunkingConfig {
                chunk_size: 4,
                chunk_stride: 0,
                ..Default::default()
            },
            generation: GenerationConfig {
                no_repeat_ngram_size: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        let llm = Arc::new(ScriptedModel::new(|prompt| {
            if prompt.starts_with("Metin:") {
                "aday".to_string()
            } else {
                " sonuç".to_string()
            }
        }));
        let embedder = Arc::new(FakeEmbedder::letter_share(&['a', 'b']));
        let mut pipeline = QaPipeline::new(config, llm, embedder).unwrap();
        pipeline
            .index_corpus(ExtractedCorpus {
                text: "aaaabbbb".to_string(),
                report: CorpusReport::default(),
            })
            .unwrap();
        pipeline
    }

    fn run(initial: Option<&str>, input: &str) -> Vec<serde_json::Value> {
        let pipeline = ready_pipeline();
        let mut output = Vec::new();
        run_session(
            &pipeline,
            &JsonFormatter::new(false),
            Session {
                top_k: 1,
                verbose: false,
                initial: initial.map(str::to_string),
                interactive: false,
            },
            input.as_bytes(),
            &mut output,
        )
        .unwrap();

        String::from_utf8(output)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[test]
    fn test_session_answers_until_exit() {
        let replies = run(Some("ilk soru"), "\nstats\n  \nab\nexit\nsonraki\n");

        assert_eq!(replies.len(), 3);
        assert_eq!(replies[0]["answer"], "sonuç");
        assert_eq!(replies[1]["status"], "ready");
        assert_eq!(replies[2]["question"], "ab");
    }

    #[test]
    fn test_session_reports_errors_and_continues() {
        // U+2603 cannot be tokenized by the test model
        let replies = run(None, "\u{2603}\nab\n");
        assert_eq!(replies.len(), 2);
        assert!(replies[0]["error"].is_string());
        assert_eq!(replies[1]["answer"], "sonuç");

        // stops at EOF without an exit word
        let replies = run(None, "");
        assert!(replies.is_empty());
    }
}
