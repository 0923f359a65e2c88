//! Token-window chunking with overlap.

use std::ops::Range;

use tracing::debug;

use crate::engine::TokenCodec;
use crate::error::{ChunkError, ConfigError};
use crate::models::{Chunk, ChunkingConfig};

/// Splits text into overlapping windows of model tokens.
#[derive(Debug, Clone)]
pub struct TokenChunker {
    /// Window length in tokens
    chunk_size: usize,
    /// Tokens shared by consecutive windows
    stride: usize,
}

impl TokenChunker {
    /// Create a chunker, rejecting a zero size or a stride that does not leave room to advance.
    pub fn new(config: &ChunkingConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            chunk_size: config.chunk_size as usize,
            stride: config.chunk_stride as usize,
        })
    }

    /// Create a chunker with default settings.
    pub fn with_defaults() -> Self {
        Self {
            chunk_size: 500,
            stride: 100,
        }
    }

    pub fn step(&self) -> usize {
        self.chunk_size - self.stride
    }

    /// Window boundaries over a stream of `total_tokens` tokens.
    pub fn windows(&self, total_tokens: usize) -> Vec<Range<usize>> {
        let mut windows = Vec::new();
        let mut start = 0;

        while start < total_tokens {
            let end = (start + self.chunk_size).min(total_tokens);
            windows.push(start..end);

            if end >= total_tokens {
                break;
            }
            start += self.step();
        }

        windows
    }

    /// Tokenize `text` without special tokens and decode each window back to text.
    pub fn chunk<C: TokenCodec + ?Sized>(
        &self,
        codec: &C,
        text: &str,
    ) -> Result<Vec<Chunk>, ChunkError> {
        let tokens = codec.encode(text, false).map_err(ChunkError::Tokenizer)?;
        if tokens.is_empty() {
            return Err(ChunkError::EmptyInput);
        }

        let chunks = self
            .windows(tokens.len())
            .into_iter()
            .enumerate()
            .map(|(index, range)| {
                let text = codec
                    .decode(&tokens[range.clone()], true)
                    .map_err(ChunkError::Tokenizer)?;
                Ok(Chunk {
                    index,
                    text,
                    token_start: range.start,
                    token_end: range.end,
                })
            })
            .collect::<Result<Vec<_>, ChunkError>>()?;

        debug!(
            tokens = tokens.len(),
            chunks = chunks.len(),
            "split corpus into token windows"
        );
        Ok(chunks)
    }
}
