mod answer;
mod chunker;
mod decoding;
mod extractor;
mod index;
mod pipeline;
mod prompt;
#[cfg(test)]
pub(crate) mod testing;

pub use answer::{AnswerFuser, AnswerGenerator};
pub use chunker::TokenChunker;
pub use decoding::{DecodingParams, greedy_decode};
pub use extractor::PdfExtractor;
pub use index::{FlatIndex, Neighbor, embed_in_batches};
pub use pipeline::{IndexedCorpus, OnnxPipeline, PipelineState, QaPipeline};
