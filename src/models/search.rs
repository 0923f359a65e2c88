//! Retrieval and answer models.

use serde::{Deserialize, Serialize};

/// Output format for answers and statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// Machine-parseable JSON format
    Json,
    /// Documentation-friendly Markdown format
    Markdown,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "markdown" | "md" => Ok(OutputFormat::Markdown),
            _ => Err(format!("unknown output format: {}", s)),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Markdown => write!(f, "markdown"),
        }
    }
}

/// A chunk returned by the index for a question, in rank order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    /// 1-based retrieval rank
    pub rank: usize,

    /// Ordinal of the chunk in the loaded corpus
    pub chunk_index: usize,

    /// Squared Euclidean distance to the question embedding
    pub distance: f32,

    pub text: String,
}

/// A fused answer together with the evidence it was built from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerTrace {
    pub question: String,

    /// Final fused answer
    pub answer: String,

    /// Retrieved chunks, ascending by distance
    pub retrieved: Vec<RetrievedChunk>,

    /// Per-chunk candidate answers, same order as `retrieved`
    pub candidates: Vec<String>,

    pub duration_ms: u64,
}

impl AnswerTrace {
    /// Number of chunks the answer was generated from.
    pub fn len(&self) -> usize {
        self.retrieved.len()
    }

    pub fn is_empty(&self) -> bool {
        self.retrieved.is_empty()
    }
}
