use std::fmt::Write as FmtWrite;

use console::style;

use crate::models::{AnswerTrace, CorpusReport, DocumentOutcome, OutputFormat, PipelineStats};

const PREVIEW_CHARS: usize = 200;

pub trait Formatter {
    fn format_answer(&self, trace: &AnswerTrace, verbose: bool) -> String;
    fn format_stats(&self, stats: &PipelineStats) -> String;
    fn format_report(&self, report: &CorpusReport) -> String;
    fn format_message(&self, message: &str) -> String;
    fn format_error(&self, error: &str) -> String;
}

fn preview(text: &str) -> String {
    let head: String = text.chars().take(PREVIEW_CHARS).collect();
    if text.chars().count() > PREVIEW_CHARS {
        format!("{}...", head)
    } else {
        head
    }
}

pub struct TextFormatter;

impl Formatter for TextFormatter {
    fn format_answer(&self, trace: &AnswerTrace, verbose: bool) -> String {
        let mut output = String::new();

        if verbose {
            writeln!(
                output,
                "Retrieved {} chunks in {}ms",
                trace.len(),
                trace.duration_ms
            )
            .unwrap();
            for (hit, candidate) in trace.retrieved.iter().zip(&trace.candidates) {
                writeln!(
                    output,
                    "{}. [chunk {}, distance {:.4}]",
                    hit.rank, hit.chunk_index, hit.distance
                )
                .unwrap();
                writeln!(output, "   {}", preview(&hit.text)).unwrap();
                writeln!(output, "   -> {}", candidate).unwrap();
            }
            writeln!(output).unwrap();
        }

        writeln!(output, "{} {}", style("Cevap:").green().bold(), trace.answer).unwrap();
        output
    }

    fn format_stats(&self, stats: &PipelineStats) -> String {
        let mut output = String::new();
        writeln!(output, "Pipeline").unwrap();
        writeln!(output, "--------").unwrap();

        if !stats.is_ready() {
            writeln!(output, "Status:          [NOT READY]").unwrap();
            return output;
        }
        writeln!(output, "Status:          [READY]").unwrap();

        let rows = [
            ("Chunks:", stats.chunk_count.map(|v| v.to_string())),
            ("Embedding dim:", stats.embedding_dim.map(|v| v.to_string())),
            ("Device:", stats.device.clone()),
            ("Model:", stats.model_name.clone()),
            ("Embedding:", stats.embedding_model.clone()),
            ("Documents:", stats.documents_loaded.map(|v| v.to_string())),
            ("Skipped docs:", stats.documents_skipped.map(|v| v.to_string())),
            ("Skipped pages:", stats.pages_skipped.map(|v| v.to_string())),
            ("Indexed at:", stats.indexed_at.clone()),
        ];
        for (label, value) in rows {
            if let Some(value) = value {
                writeln!(output, "{:<17}{}", label, value).unwrap();
            }
        }
        output
    }

    fn format_report(&self, report: &CorpusReport) -> String {
        let mut output = String::new();
        writeln!(
            output,
            "Loaded {} document(s), skipped {}",
            report.documents_loaded(),
            report.documents_skipped()
        )
        .unwrap();

        for doc in &report.documents {
            match doc {
                DocumentOutcome::Loaded {
                    name,
                    pages,
                    pages_skipped,
                    characters,
                    ..
                } => {
                    write!(output, "  ✓ {} ({} pages, {} chars", name, pages, characters).unwrap();
                    if *pages_skipped > 0 {
                        write!(output, ", {} pages unreadable", pages_skipped).unwrap();
                    }
                    writeln!(output, ")").unwrap();
                }
                DocumentOutcome::Dropped { name, reason } => {
                    writeln!(output, "  ✗ {} - {}", name, reason).unwrap();
                }
            }
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("{} {}\n", style("Error:").red().bold(), error)
    }
}

pub struct JsonFormatter {
    pub pretty: bool,
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }

    fn render<T: serde::Serialize>(&self, value: &T) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        let mut text = rendered.unwrap_or_else(|e| format!("{{\"error\": \"{}\"}}", e));
        text.push('\n');
        text
    }
}

impl Formatter for JsonFormatter {
    fn format_answer(&self, trace: &AnswerTrace, verbose: bool) -> String {
        if verbose {
            self.render(trace)
        } else {
            self.render(&serde_json::json!({
                "question": trace.question,
                "answer": trace.answer,
                "duration_ms": trace.duration_ms,
            }))
        }
    }

    fn format_stats(&self, stats: &PipelineStats) -> String {
        self.render(stats)
    }

    fn format_report(&self, report: &CorpusReport) -> String {
        self.render(&serde_json::json!({
            "documents_loaded": report.documents_loaded(),
            "documents_skipped": report.documents_skipped(),
            "pages_skipped": report.pages_skipped(),
            "documents": report.documents,
        }))
    }

    fn format_message(&self, message: &str) -> String {
        self.render(&serde_json::json!({ "message": message }))
    }

    fn format_error(&self, error: &str) -> String {
        self.render(&serde_json::json!({ "error": error }))
    }
}

pub struct MarkdownFormatter;

impl Formatter for MarkdownFormatter {
    fn format_answer(&self, trace: &AnswerTrace, verbose: bool) -> String {
        let mut output = String::new();
        writeln!(output, "## Cevap\n").unwrap();
        writeln!(output, "**Soru:** {}\n", trace.question).unwrap();
        writeln!(output, "{}\n", trace.answer).unwrap();

        if verbose && !trace.is_empty() {
            writeln!(output, "### Kaynak parçalar\n").unwrap();
            writeln!(output, "| # | Chunk | Distance | Candidate |").unwrap();
            writeln!(output, "|---|-------|----------|-----------|").unwrap();
            for (hit, candidate) in trace.retrieved.iter().zip(&trace.candidates) {
                writeln!(
                    output,
                    "| {} | {} | {:.4} | {} |",
                    hit.rank,
                    hit.chunk_index,
                    hit.distance,
                    candidate.replace('|', "\\|").replace('\n', " ")
                )
                .unwrap();
            }
            writeln!(output).unwrap();
        }
        output
    }

    fn format_stats(&self, stats: &PipelineStats) -> String {
        let mut output = String::new();
        writeln!(output, "## Pipeline\n").unwrap();
        writeln!(output, "- **Status:** {}", stats.status).unwrap();
        if let Some(count) = stats.chunk_count {
            writeln!(output, "- **Chunks:** {}", count).unwrap();
        }
        if let Some(dim) = stats.embedding_dim {
            writeln!(output, "- **Embedding dim:** {}", dim).unwrap();
        }
        if let Some(ref model) = stats.model_name {
            writeln!(output, "- **Model:** `{}`", model).unwrap();
        }
        if let Some(ref model) = stats.embedding_model {
            writeln!(output, "- **Embedding model:** `{}`", model).unwrap();
        }
        if let Some(ref device) = stats.device {
            writeln!(output, "- **Device:** {}", device).unwrap();
        }
        if let Some(loaded) = stats.documents_loaded {
            writeln!(
                output,
                "- **Documents:** {} loaded, {} skipped",
                loaded,
                stats.documents_skipped.unwrap_or(0)
            )
            .unwrap();
        }
        output
    }

    fn format_report(&self, report: &CorpusReport) -> String {
        let mut output = String::new();
        writeln!(output, "## Documents\n").unwrap();
        for doc in &report.documents {
            match doc {
                DocumentOutcome::Loaded { name, pages, .. } => {
                    writeln!(output, "- `{}`: {} pages", name, pages).unwrap();
                }
                DocumentOutcome::Dropped { name, reason } => {
                    writeln!(output, "- `{}`: skipped ({})", name, reason).unwrap();
                }
            }
        }
        output
    }

    fn format_message(&self, message: &str) -> String {
        format!("{}\n", message)
    }

    fn format_error(&self, error: &str) -> String {
        format!("> **Error:** {}\n", error)
    }
}

pub fn get_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Text => Box::new(TextFormatter),
        OutputFormat::Json => Box::new(JsonFormatter::new(true)),
        OutputFormat::Markdown => Box::new(MarkdownFormatter),
    }
}
