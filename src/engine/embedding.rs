use std::borrow::Cow;
use std::path::Path;
use std::sync::Mutex;

use ort::session::{Session, SessionInputValue, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tokenizers::{PaddingParams, PaddingStrategy, TruncationParams, TruncationStrategy};
use tracing::debug;

use super::{Embedder, num_cpus};
use crate::error::ModelError;
use crate::models::EmbeddingConfig;

/// Sentence embedding model (BERT-style ONNX export) with attention-masked mean pooling.
pub struct OnnxEmbeddingModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    model_id: String,
    dimension: usize,
    normalize: bool,
    wants_token_type_ids: bool,
}

impl OnnxEmbeddingModel {
    pub fn load(
        config: &EmbeddingConfig,
        model_dir: &Path,
        intra_threads: Option<usize>,
    ) -> Result<Self, ModelError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let max_tokens = config.max_tokens as usize;

        if !model_path.exists() {
            return Err(ModelError::NotFound(format!(
                "embedding model not found: {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .with_intra_threads(intra_threads.unwrap_or_else(num_cpus))
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?;

        let wants_token_type_ids = session
            .inputs
            .iter()
            .any(|input| input.name == "token_type_ids");

        let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        // BERT position embeddings stop at max_tokens
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: max_tokens,
                strategy: TruncationStrategy::LongestFirst,
                ..Default::default()
            }))
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        tokenizer.with_padding(Some(PaddingParams {
            strategy: PaddingStrategy::BatchLongest,
            ..Default::default()
        }));

        debug!(
            model = %config.model_id,
            dimension = config.dimension,
            wants_token_type_ids,
            "embedding session ready"
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            model_id: config.model_id.clone(),
            dimension: config.dimension as usize,
            normalize: config.normalize,
            wants_token_type_ids,
        })
    }
}

impl Embedder for OnnxEmbeddingModel {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let encodings = self
            .tokenizer
            .encode_batch(texts.to_vec(), true)
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        let max_len = encodings
            .iter()
            .map(|e| e.get_ids().len())
            .max()
            .unwrap_or(0);
        let batch_size = encodings.len();

        let mut input_ids = vec![0i64; batch_size * max_len];
        let mut attention_mask = vec![0i64; batch_size * max_len];
        let mut token_type_ids = vec![0i64; batch_size * max_len];

        for (i, encoding) in encodings.iter().enumerate() {
            let ids = encoding.get_ids();
            let mask = encoding.get_attention_mask();
            let types = encoding.get_type_ids();
            for (j, (&id, &m)) in ids.iter().zip(mask.iter()).enumerate() {
                input_ids[i * max_len + j] = id as i64;
                attention_mask[i * max_len + j] = m as i64;
                token_type_ids[i * max_len + j] = types.get(j).copied().unwrap_or(0) as i64;
            }
        }

        let mut inputs: Vec<(Cow<'static, str>, SessionInputValue<'static>)> = vec![
            (
                "input_ids".into(),
                Tensor::from_array(([batch_size, max_len], input_ids))
                    .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?
                    .into(),
            ),
            (
                "attention_mask".into(),
                Tensor::from_array(([batch_size, max_len], attention_mask.clone()))
                    .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?
                    .into(),
            ),
        ];
        if self.wants_token_type_ids {
            inputs.push((
                "token_type_ids".into(),
                Tensor::from_array(([batch_size, max_len], token_type_ids))
                    .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?
                    .into(),
            ));
        }

        let mut session = self
            .session
            .lock()
            .map_err(|_| ModelError::InferenceError("session lock poisoned".to_string()))?;

        let outputs = session
            .run(inputs)
            .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;

        let output_array = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;

        let shape = output_array.shape().to_vec();
        // Vectors keep the width the model produced; the index rejects a mismatch.
        let output_dim = *shape.last().unwrap_or(&0);

        let embeddings: Vec<Vec<f32>> = match shape.len() {
            // last_hidden_state: [batch, seq, dim]
            3 => (0..batch_size)
                .map(|i| {
                    let mask = &attention_mask[i * max_len..(i + 1) * max_len];
                    let pooled = mean_pool(mask, output_dim, |j, d| output_array[[i, j, d]]);
                    self.finish(pooled)
                })
                .collect(),
            // already pooled: [batch, dim]
            2 => (0..batch_size)
                .map(|i| {
                    let embedding: Vec<f32> =
                        (0..output_dim).map(|d| output_array[[i, d]]).collect();
                    self.finish(embedding)
                })
                .collect(),
            _ => {
                return Err(ModelError::InferenceError(format!(
                    "unexpected output shape: {:?}",
                    shape
                )));
            }
        };

        Ok(embeddings)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}

impl OnnxEmbeddingModel {
    fn finish(&self, v: Vec<f32>) -> Vec<f32> {
        if self.normalize { normalize(&v) } else { v }
    }
}

/// Average token vectors whose attention mask is set.
fn mean_pool(mask: &[i64], dimension: usize, value: impl Fn(usize, usize) -> f32) -> Vec<f32> {
    let mut sum = vec![0f32; dimension];
    let mut count = 0f32;
    for (j, &m) in mask.iter().enumerate() {
        if m == 0 {
            continue;
        }
        count += 1.0;
        for (d, slot) in sum.iter_mut().enumerate() {
            *slot += value(j, d);
        }
    }
    if count > 0.0 {
        sum.iter_mut().for_each(|x| *x /= count);
    }
    sum
}

fn normalize(v: &[f32]) -> Vec<f32> {
    let norm: f32 = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        v.iter().map(|x| x / norm).collect()
    } else {
        v.to_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_pool_ignores_padding() {
        // token rows: [1, 2], [3, 4], padding [100, 100]
        let rows = [[1.0f32, 2.0], [3.0, 4.0], [100.0, 100.0]];
        let pooled = mean_pool(&[1, 1, 0], 2, |j, d| rows[j][d]);
        assert_eq!(pooled, vec![2.0, 3.0]);
    }

    #[test]
    fn test_mean_pool_all_masked() {
        let pooled = mean_pool(&[0, 0], 3, |_, _| 7.0);
        assert_eq!(pooled, vec![0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_normalize() {
        let v = normalize(&[3.0, 4.0]);
        assert!((v[0] - 0.6).abs() < 1e-6);
        assert!((v[1] - 0.8).abs() < 1e-6);
        assert_eq!(normalize(&[0.0, 0.0]), vec![0.0, 0.0]);
    }
}
