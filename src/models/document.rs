//! Document, chunk and corpus-report models.

use std::fmt;
use std::io::Read;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A PDF input: a file on disk or an already-open byte stream.
pub enum PdfSource {
    Path(PathBuf),
    Stream {
        name: String,
        reader: Box<dyn Read + Send>,
    },
}

impl PdfSource {
    pub fn path(path: impl Into<PathBuf>) -> Self {
        PdfSource::Path(path.into())
    }

    pub fn stream(name: impl Into<String>, reader: impl Read + Send + 'static) -> Self {
        PdfSource::Stream {
            name: name.into(),
            reader: Box::new(reader),
        }
    }

    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::stream(name, std::io::Cursor::new(bytes))
    }

    /// Label used in logs and reports.
    pub fn name(&self) -> String {
        match self {
            PdfSource::Path(path) => path.display().to_string(),
            PdfSource::Stream { name, .. } => name.clone(),
        }
    }
}

impl fmt::Debug for PdfSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PdfSource::Path(path) => f.debug_tuple("Path").field(path).finish(),
            PdfSource::Stream { name, .. } => {
                f.debug_struct("Stream").field("name", name).finish_non_exhaustive()
            }
        }
    }
}

impl From<&Path> for PdfSource {
    fn from(path: &Path) -> Self {
        PdfSource::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for PdfSource {
    fn from(path: PathBuf) -> Self {
        PdfSource::Path(path)
    }
}

/// A token window of the corpus decoded back to text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// Position in the chunk sequence; the key retrieval hits map back to
    pub index: usize,
    pub text: String,
    /// First token of the window (inclusive)
    pub token_start: usize,
    /// End of the window (exclusive)
    pub token_end: usize,
}

impl Chunk {
    pub fn token_len(&self) -> usize {
        self.token_end - self.token_start
    }
}

/// What happened to one input document during extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DocumentOutcome {
    Loaded {
        name: String,
        pages: usize,
        pages_skipped: usize,
        characters: usize,
        checksum: String,
    },
    Dropped {
        name: String,
        reason: String,
    },
}

impl DocumentOutcome {
    pub fn name(&self) -> &str {
        match self {
            DocumentOutcome::Loaded { name, .. } | DocumentOutcome::Dropped { name, .. } => name,
        }
    }

    pub fn is_loaded(&self) -> bool {
        matches!(self, DocumentOutcome::Loaded { .. })
    }
}

/// Per-document outcomes of one corpus build, in input order.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorpusReport {
    pub documents: Vec<DocumentOutcome>,
}

impl CorpusReport {
    pub fn push(&mut self, outcome: DocumentOutcome) {
        self.documents.push(outcome);
    }

    pub fn documents_loaded(&self) -> usize {
        self.documents.iter().filter(|d| d.is_loaded()).count()
    }

    pub fn documents_skipped(&self) -> usize {
        self.documents.len() - self.documents_loaded()
    }

    pub fn pages_skipped(&self) -> usize {
        self.documents
            .iter()
            .map(|d| match d {
                DocumentOutcome::Loaded { pages_skipped, .. } => *pages_skipped,
                DocumentOutcome::Dropped { .. } => 0,
            })
            .sum()
    }
}

/// Normalized corpus text plus the report describing how it was assembled.
#[derive(Debug, Clone)]
pub struct ExtractedCorpus {
    pub text: String,
    pub report: CorpusReport,
}
