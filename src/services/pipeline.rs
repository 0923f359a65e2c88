//! The question-answering pipeline: load documents, then ask questions.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::answer::{AnswerFuser, AnswerGenerator};
use super::chunker::TokenChunker;
use super::extractor::PdfExtractor;
use super::index::{FlatIndex, embed_in_batches};
use crate::engine::{Embedder, LanguageModel, OnnxEmbeddingModel, OnnxLanguageModel};
use crate::error::{AppError, ConfigError, IndexError, PipelineError};
use crate::models::{
    AnswerTrace, Chunk, Config, CorpusReport, DocumentOutcome, ExtractedCorpus, PdfSource,
    PipelineStats, RetrievedChunk,
};
use crate::utils::validate_pdf_file;

/// Lifecycle of a pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    /// Models not loaded yet. Construction either loads them or fails, so
    /// [`QaPipeline::state`] never returns this.
    Uninitialized,
    ModelsLoaded,
    Indexed,
}

/// Everything built by one successful load. Replaced as a whole, never mutated.
#[derive(Debug)]
pub struct IndexedCorpus {
    pub chunks: Vec<Chunk>,
    pub index: FlatIndex,
    pub report: CorpusReport,
    pub indexed_at: DateTime<Utc>,
}

pub struct QaPipeline<L, E> {
    config: Config,
    llm: L,
    embedder: E,
    chunker: TokenChunker,
    extractor: PdfExtractor,
    corpus: Option<Arc<IndexedCorpus>>,
}

/// Pipeline backed by ONNX Runtime models.
pub type OnnxPipeline = QaPipeline<OnnxLanguageModel, OnnxEmbeddingModel>;

impl OnnxPipeline {
    /// Validate `config` and load both models from their configured directories.
    pub fn from_config(config: Config) -> Result<Self, AppError> {
        config.validate()?;

        let llm_dir = config.llm_model_dir().ok_or_else(|| {
            ConfigError::PathError("could not determine language model directory".to_string())
        })?;
        let embedding_dir = config.embedding_model_dir().ok_or_else(|| {
            ConfigError::PathError("could not determine embedding model directory".to_string())
        })?;

        info!(model = %config.models.llm_model_id, path = %llm_dir.display(), "loading language model");
        let llm = OnnxLanguageModel::load(&config.models, &llm_dir)?;

        info!(model = %config.embedding.model_id, path = %embedding_dir.display(), "loading embedding model");
        let embedder = OnnxEmbeddingModel::load(
            &config.embedding,
            &embedding_dir,
            config.models.intra_threads,
        )?;

        Ok(QaPipeline::new(config, llm, embedder)?)
    }
}

impl<L: LanguageModel, E: Embedder> QaPipeline<L, E> {
    pub fn new(config: Config, llm: L, embedder: E) -> Result<Self, PipelineError> {
        config.validate()?;
        let chunker = TokenChunker::new(&config.chunking)?;
        let extractor = PdfExtractor::new(config.chunking.document_separator.clone());

        Ok(Self {
            config,
            llm,
            embedder,
            chunker,
            extractor,
            corpus: None,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> PipelineState {
        if self.corpus.is_some() {
            PipelineState::Indexed
        } else {
            PipelineState::ModelsLoaded
        }
    }

    pub fn is_ready(&self) -> bool {
        self.state() == PipelineState::Indexed
    }

    /// Load PDF files from disk. Paths failing validation are dropped and reported.
    ///
    /// On any error the previously loaded corpus stays in place.
    pub fn load(&mut self, paths: &[PathBuf]) -> Result<&CorpusReport, PipelineError> {
        let mut rejected: Vec<Option<DocumentOutcome>> = Vec::with_capacity(paths.len());
        let mut sources = Vec::new();

        for path in paths {
            match validate_pdf_file(path, &self.config.files) {
                Ok(()) => {
                    rejected.push(None);
                    sources.push(PdfSource::from(path.as_path()));
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping invalid file");
                    rejected.push(Some(DocumentOutcome::Dropped {
                        name: path.display().to_string(),
                        reason: e.to_string(),
                    }));
                }
            }
        }

        let mut corpus = self.extractor.extract(sources)?;

        // restore input order with the rejected paths in place
        let mut extracted = std::mem::take(&mut corpus.report.documents).into_iter();
        corpus.report.documents = rejected
            .into_iter()
            .filter_map(|outcome| outcome.or_else(|| extracted.next()))
            .collect();

        self.index_corpus(corpus)
    }

    /// Load PDFs from paths or already-open streams.
    pub fn load_sources(
        &mut self,
        sources: Vec<PdfSource>,
    ) -> Result<&CorpusReport, PipelineError> {
        let corpus = self.extractor.extract(sources)?;
        self.index_corpus(corpus)
    }

    /// Chunk, embed and index an extracted corpus, then swap it in.
    pub(crate) fn index_corpus(
        &mut self,
        corpus: ExtractedCorpus,
    ) -> Result<&CorpusReport, PipelineError> {
        let started = Instant::now();

        let chunks = self.chunker.chunk(&self.llm, &corpus.text)?;
        info!(chunks = chunks.len(), "corpus chunked");

        let texts: Vec<String> = chunks.iter().map(|c| c.text.clone()).collect();
        let embeddings = embed_in_batches(
            &self.embedder,
            &texts,
            self.config.embedding.batch_size as usize,
        )?;
        if embeddings.len() != chunks.len() {
            return Err(IndexError::CountMismatch {
                chunks: chunks.len(),
                embeddings: embeddings.len(),
            }
            .into());
        }

        let index = FlatIndex::build(embeddings, self.embedder.dimension())?;

        info!(
            chunks = chunks.len(),
            dimension = index.dimension(),
            documents = corpus.report.documents_loaded(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "index built"
        );

        let bundle = self.corpus.insert(Arc::new(IndexedCorpus {
            chunks,
            index,
            report: corpus.report,
            indexed_at: Utc::now(),
        }));
        Ok(&bundle.report)
    }

    /// Report of the currently loaded corpus.
    pub fn report(&self) -> Option<&CorpusReport> {
        self.corpus.as_ref().map(|c| &c.report)
    }

    /// Nearest chunks to `question`, ascending by distance.
    pub fn retrieve(
        &self,
        question: &str,
        top_k: Option<usize>,
    ) -> Result<Vec<RetrievedChunk>, PipelineError> {
        let corpus = self.corpus.as_ref().ok_or(PipelineError::NotReady)?;
        let question = validate_question(question)?;
        let top_k = top_k.unwrap_or(self.config.search.default_top_k as usize);

        let query = self
            .embedder
            .embed(&[question.to_string()])
            .map_err(IndexError::from)?
            .into_iter()
            .next()
            .ok_or(IndexError::CountMismatch {
                chunks: 1,
                embeddings: 0,
            })?;

        let hits = corpus.index.search(&query, top_k)?;
        debug!(hits = hits.len(), top_k, "retrieved chunks");

        Ok(hits
            .into_iter()
            .enumerate()
            .map(|(rank, hit)| RetrievedChunk {
                rank: rank + 1,
                chunk_index: hit.index,
                distance: hit.distance,
                text: corpus.chunks[hit.index].text.clone(),
            })
            .collect())
    }

    /// Answer `question` from the loaded documents.
    pub fn ask(&self, question: &str, top_k: Option<usize>) -> Result<String, PipelineError> {
        self.answer(question, top_k).map(|trace| trace.answer)
    }

    /// Like [`ask`](Self::ask), also returning the retrieved chunks and candidate answers.
    pub fn answer(
        &self,
        question: &str,
        top_k: Option<usize>,
    ) -> Result<AnswerTrace, PipelineError> {
        let started = Instant::now();
        let retrieved = self.retrieve(question, top_k)?;
        let question = question.trim();

        let generator = AnswerGenerator::new(&self.llm, &self.config.generation);
        let mut candidates = Vec::with_capacity(retrieved.len());
        for hit in &retrieved {
            let candidate = generator.generate(&hit.text, question)?;
            debug!(
                rank = hit.rank,
                chunk = hit.chunk_index,
                distance = hit.distance,
                "candidate answer generated"
            );
            candidates.push(candidate);
        }

        let fuser = AnswerFuser::new(&self.llm, &self.config.generation);
        let answer = fuser.fuse(&candidates, question)?;

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(chunks = retrieved.len(), duration_ms, "question answered");

        Ok(AnswerTrace {
            question: question.to_string(),
            answer,
            retrieved,
            candidates,
            duration_ms,
        })
    }

    pub fn stats(&self) -> PipelineStats {
        let Some(corpus) = self.corpus.as_ref() else {
            return PipelineStats::not_ready();
        };

        PipelineStats {
            status: PipelineStats::READY.to_string(),
            chunk_count: Some(corpus.chunks.len()),
            embedding_dim: Some(corpus.index.dimension()),
            device: Some(self.llm.device()),
            model_name: Some(self.llm.model_id().to_string()),
            embedding_model: Some(self.embedder.model_id().to_string()),
            documents_loaded: Some(corpus.report.documents_loaded()),
            documents_skipped: Some(corpus.report.documents_skipped()),
            pages_skipped: Some(corpus.report.pages_skipped()),
            indexed_at: Some(corpus.indexed_at.to_rfc3339()),
        }
    }
}

fn validate_question(question: &str) -> Result<&str, PipelineError> {
    let question = question.trim();
    if question.is_empty() {
        return Err(PipelineError::InvalidQuestion(
            "question must not be empty".to_string(),
        ));
    }
    Ok(question)
}
