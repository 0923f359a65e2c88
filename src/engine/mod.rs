//! Model-facing seams of the pipeline and their ONNX Runtime implementations.
//!
//! The pipeline only talks to the traits below, so the extractor, chunker,
//! index and answer stages can be exercised without model weights.

mod embedding;
mod language_model;
#[cfg(test)]
pub(crate) mod testing;

pub use embedding::OnnxEmbeddingModel;
pub use language_model::OnnxLanguageModel;

use std::sync::Arc;

use crate::error::ModelError;

/// Text <-> token id conversion with the generation model's vocabulary.
pub trait TokenCodec {
    fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>, ModelError>;

    fn decode(&self, tokens: &[u32], skip_special_tokens: bool) -> Result<String, ModelError>;
}

/// A causal language model driven one token at a time.
pub trait LanguageModel: TokenCodec {
    /// Logits over the vocabulary for the token following `tokens`.
    fn next_token_logits(&self, tokens: &[u32]) -> Result<Vec<f32>, ModelError>;

    /// Whether generation must stop after emitting `token`.
    fn is_stop_token(&self, token: u32) -> bool;

    /// Longest sequence (prompt + continuation) the model accepts.
    fn max_context_tokens(&self) -> usize;

    fn model_id(&self) -> &str;

    /// Human-readable execution backend, e.g. `cpu (8 threads)`.
    fn device(&self) -> String;
}

/// Sentence-level embedding model.
pub trait Embedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError>;

    fn dimension(&self) -> usize;

    fn model_id(&self) -> &str;
}

impl<T: TokenCodec + ?Sized> TokenCodec for Arc<T> {
    fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>, ModelError> {
        (**self).encode(text, add_special_tokens)
    }

    fn decode(&self, tokens: &[u32], skip_special_tokens: bool) -> Result<String, ModelError> {
        (**self).decode(tokens, skip_special_tokens)
    }
}

impl<T: LanguageModel + ?Sized> LanguageModel for Arc<T> {
    fn next_token_logits(&self, tokens: &[u32]) -> Result<Vec<f32>, ModelError> {
        (**self).next_token_logits(tokens)
    }

    fn is_stop_token(&self, token: u32) -> bool {
        (**self).is_stop_token(token)
    }

    fn max_context_tokens(&self) -> usize {
        (**self).max_context_tokens()
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }

    fn device(&self) -> String {
        (**self).device()
    }
}

impl<T: Embedder + ?Sized> Embedder for Arc<T> {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError> {
        (**self).embed(texts)
    }

    fn dimension(&self) -> usize {
        (**self).dimension()
    }

    fn model_id(&self) -> &str {
        (**self).model_id()
    }
}

pub(crate) fn num_cpus() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}
