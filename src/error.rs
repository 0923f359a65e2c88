//! Error types for the PDF question-answering pipeline.

use std::path::PathBuf;

use thiserror::Error;

/// Errors related to model loading and inference.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model not found: {0}")]
    NotFound(String),

    #[error("model load error: {0}")]
    LoadError(String),

    #[error("tokenizer error: {0}")]
    TokenizerError(String),

    #[error("inference error: {0}")]
    InferenceError(String),
}

/// Errors related to configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlParseError(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerializeError(#[from] toml::ser::Error),

    #[error("path error: {0}")]
    PathError(String),

    #[error("validation error: {0}")]
    ValidationError(String),
}

/// Reasons an input file is rejected before extraction.
#[derive(Debug, Error)]
pub enum FileError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("unsupported file format: {}", .0.display())]
    UnsupportedExtension(PathBuf),

    #[error("file too large ({size_mb:.1}MB > {max_mb}MB): {}", .path.display())]
    TooLarge {
        path: PathBuf,
        size_mb: f64,
        max_mb: u64,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors related to PDF text extraction.
#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("failed to read {name}: {source}")]
    Read {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse PDF {name}: {message}")]
    Parse { name: String, message: String },

    #[error("no text could be extracted from any document")]
    EmptyCorpus,
}

/// Errors related to token-window chunking.
#[derive(Debug, Error)]
pub enum ChunkError {
    #[error("nothing to chunk: token stream is empty")]
    EmptyInput,

    #[error("chunking failed: {0}")]
    Tokenizer(#[source] ModelError),
}

/// Errors related to the embedding index.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding count mismatch: {chunks} chunks but {embeddings} embeddings")]
    CountMismatch { chunks: usize, embeddings: usize },

    #[error("cannot build an index without vectors")]
    Empty,

    #[error("embedding error: {0}")]
    Embedding(#[from] ModelError),
}

/// Errors related to answer generation and fusion.
#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation failed: {0}")]
    Model(#[from] ModelError),

    #[error("fusion output did not contain the answer cue {cue:?}")]
    FusionParse { cue: String },

    #[error("no candidate answers to fuse")]
    NoCandidates,
}

/// Errors surfaced by the pipeline orchestrator.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline not ready: load documents first")]
    NotReady,

    #[error("invalid question: {0}")]
    InvalidQuestion(String),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("extraction failure: {0}")]
    Extraction(#[from] ExtractionError),

    #[error("{0}")]
    Chunking(#[from] ChunkError),

    #[error("index error: {0}")]
    Index(#[from] IndexError),

    #[error("{0}")]
    Generation(#[from] GenerationError),
}

/// Application-level errors that wrap domain errors.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("model error: {0}")]
    Model(#[from] ModelError),

    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("{0}")]
    Other(String),
}
