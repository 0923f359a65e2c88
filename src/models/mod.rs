mod config;
mod document;
mod search;
mod stats;

pub use config::{
    CONFIG_PATH_ENV, ChunkingConfig, Config, DEFAULT_DOCUMENT_SEPARATOR,
    DEFAULT_EMBEDDING_DIMENSION, DEFAULT_EMBEDDING_MODEL, DEFAULT_FUSION_CUE, DEFAULT_LLM_MODEL,
    EmbeddingConfig, FilesConfig, GenerationConfig, ModelsConfig, SearchConfig,
};
pub use document::{Chunk, CorpusReport, DocumentOutcome, ExtractedCorpus, PdfSource};
pub use search::{AnswerTrace, OutputFormat, RetrievedChunk};
pub use stats::PipelineStats;
