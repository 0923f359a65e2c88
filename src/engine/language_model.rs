use std::borrow::Cow;
use std::collections::HashSet;
use std::path::Path;
use std::sync::Mutex;

use ort::session::{Session, SessionInputValue, builder::GraphOptimizationLevel};
use ort::value::Tensor;
use tokenizers::Tokenizer;
use tracing::{debug, warn};

use super::{LanguageModel, TokenCodec, num_cpus};
use crate::error::ModelError;
use crate::models::ModelsConfig;

/// Decoder-only causal LM exported to ONNX without KV-cache inputs.
///
/// Every step re-runs the full sequence, which keeps the session stateless and
/// the output a pure function of the token ids.
pub struct OnnxLanguageModel {
    session: Mutex<Session>,
    tokenizer: Tokenizer,
    model_id: String,
    stop_tokens: HashSet<u32>,
    max_context_tokens: usize,
    threads: usize,
    wants_position_ids: bool,
}

impl OnnxLanguageModel {
    pub fn load(config: &ModelsConfig, model_dir: &Path) -> Result<Self, ModelError> {
        let model_path = model_dir.join("model.onnx");
        let tokenizer_path = model_dir.join("tokenizer.json");
        let threads = config.intra_threads.unwrap_or_else(num_cpus);

        if !model_path.exists() {
            return Err(ModelError::NotFound(format!(
                "language model not found: {}",
                model_path.display()
            )));
        }

        let session = Session::builder()
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .with_intra_threads(threads)
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?
            .commit_from_file(&model_path)
            .map_err(|e: ort::Error| ModelError::LoadError(e.to_string()))?;

        if session
            .inputs
            .iter()
            .any(|input| input.name.starts_with("past_key_values"))
        {
            return Err(ModelError::LoadError(
                "model expects past_key_values inputs; export it without KV cache".to_string(),
            ));
        }
        let wants_position_ids = session
            .inputs
            .iter()
            .any(|input| input.name == "position_ids");

        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;

        let stop_tokens: HashSet<u32> = config
            .stop_tokens
            .iter()
            .filter_map(|token| {
                let id = tokenizer.token_to_id(token);
                if id.is_none() {
                    warn!(token = %token, "stop token not in vocabulary");
                }
                id
            })
            .collect();
        if stop_tokens.is_empty() {
            warn!("no stop tokens resolved; generation always runs to the token budget");
        }

        debug!(
            model = %config.llm_model_id,
            threads,
            wants_position_ids,
            stop_tokens = stop_tokens.len(),
            "language model session ready"
        );

        Ok(Self {
            session: Mutex::new(session),
            tokenizer,
            model_id: config.llm_model_id.clone(),
            stop_tokens,
            max_context_tokens: config.max_context_tokens as usize,
            threads,
            wants_position_ids,
        })
    }
}

impl TokenCodec for OnnxLanguageModel {
    fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>, ModelError> {
        let encoding = self
            .tokenizer
            .encode(text, add_special_tokens)
            .map_err(|e| ModelError::TokenizerError(e.to_string()))?;
        Ok(encoding.get_ids().to_vec())
    }

    fn decode(&self, tokens: &[u32], skip_special_tokens: bool) -> Result<String, ModelError> {
        self.tokenizer
            .decode(tokens, skip_special_tokens)
            .map_err(|e| ModelError::TokenizerError(e.to_string()))
    }
}

impl LanguageModel for OnnxLanguageModel {
    fn next_token_logits(&self, tokens: &[u32]) -> Result<Vec<f32>, ModelError> {
        if tokens.is_empty() {
            return Err(ModelError::InferenceError(
                "cannot run the model on an empty sequence".to_string(),
            ));
        }

        let seq_len = tokens.len();
        let input_ids: Vec<i64> = tokens.iter().map(|&t| t as i64).collect();
        let attention_mask = vec![1i64; seq_len];

        let mut inputs: Vec<(Cow<'static, str>, SessionInputValue<'static>)> = vec![
            (
                "input_ids".into(),
                Tensor::from_array(([1, seq_len], input_ids))
                    .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?
                    .into(),
            ),
            (
                "attention_mask".into(),
                Tensor::from_array(([1, seq_len], attention_mask))
                    .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?
                    .into(),
            ),
        ];
        if self.wants_position_ids {
            let position_ids: Vec<i64> = (0..seq_len as i64).collect();
            inputs.push((
                "position_ids".into(),
                Tensor::from_array(([1, seq_len], position_ids))
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

        let logits = outputs[0]
            .try_extract_array::<f32>()
            .map_err(|e: ort::Error| ModelError::InferenceError(e.to_string()))?;

        let shape = logits.shape().to_vec();
        match shape.as_slice() {
            [1, len, vocab] if *len == seq_len => {
                Ok((0..*vocab).map(|v| logits[[0, len - 1, v]]).collect())
            }
            [1, vocab] => Ok((0..*vocab).map(|v| logits[[0, v]]).collect()),
            _ => Err(ModelError::InferenceError(format!(
                "unexpected logits shape: {:?}",
                shape
            ))),
        }
    }

    fn is_stop_token(&self, token: u32) -> bool {
        self.stop_tokens.contains(&token)
    }

    fn max_context_tokens(&self) -> usize {
        self.max_context_tokens
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn device(&self) -> String {
        format!("cpu ({} threads)", self.threads)
    }
}
