//! Deterministic stand-ins for the model traits.
//!
//! Tokens are Unicode scalar values below [`VOCAB_SIZE`], so encode/decode is
//! lossless and token counts equal character counts.

use std::sync::Mutex;

use super::{Embedder, LanguageModel, TokenCodec};
use crate::error::ModelError;

pub const VOCAB_SIZE: usize = 0x250;
pub const BOS: u32 = 0x24E;
pub const EOS: u32 = 0x24F;

#[derive(Debug, Default, Clone, Copy)]
pub struct CharCodec;

impl TokenCodec for CharCodec {
    fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>, ModelError> {
        let mut ids = Vec::with_capacity(text.len() + 1);
        if add_special_tokens {
            ids.push(BOS);
        }
        for c in text.chars() {
            let id = c as u32;
            if id >= BOS {
                return Err(ModelError::TokenizerError(format!(
                    "character {c:?} outside test vocabulary"
                )));
            }
            ids.push(id);
        }
        Ok(ids)
    }

    fn decode(&self, tokens: &[u32], skip_special_tokens: bool) -> Result<String, ModelError> {
        let mut text = String::with_capacity(tokens.len());
        for &id in tokens {
            match id {
                BOS => {
                    if !skip_special_tokens {
                        text.push_str("<bos>");
                    }
                }
                EOS => {
                    if !skip_special_tokens {
                        text.push_str("<eos>");
                    }
                }
                _ => text.push(char::from_u32(id).ok_or_else(|| {
                    ModelError::TokenizerError(format!("invalid token id {id}"))
                })?),
            }
        }
        Ok(text)
    }
}

type Responder = Box<dyn Fn(&str) -> String + Send + Sync>;

/// Language model that answers each prompt with a scripted reply, one character per step.
pub struct ScriptedModel {
    responder: Responder,
    max_context_tokens: usize,
    current: Mutex<Option<(Vec<u32>, Vec<u32>)>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedModel {
    pub fn new(responder: impl Fn(&str) -> String + Send + Sync + 'static) -> Self {
        Self {
            responder: Box::new(responder),
            max_context_tokens: 100_000,
            current: Mutex::new(None),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_max_context_tokens(mut self, max_context_tokens: usize) -> Self {
        self.max_context_tokens = max_context_tokens;
        self
    }

    /// Prompts seen so far, decoded without special tokens.
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl TokenCodec for ScriptedModel {
    fn encode(&self, text: &str, add_special_tokens: bool) -> Result<Vec<u32>, ModelError> {
        CharCodec.encode(text, add_special_tokens)
    }

    fn decode(&self, tokens: &[u32], skip_special_tokens: bool) -> Result<String, ModelError> {
        CharCodec.decode(tokens, skip_special_tokens)
    }
}

impl LanguageModel for ScriptedModel {
    fn next_token_logits(&self, tokens: &[u32]) -> Result<Vec<f32>, ModelError> {
        let mut current = self.current.lock().unwrap();

        let continuing = matches!(
            current.as_ref(),
            Some((prompt, _)) if tokens.len() > prompt.len() && tokens.starts_with(prompt)
        );
        if !continuing {
            let prompt_text = CharCodec.decode(tokens, true)?;
            let reply = CharCodec.encode(&(self.responder)(&prompt_text), false)?;
            self.prompts.lock().unwrap().push(prompt_text);
            *current = Some((tokens.to_vec(), reply));
        }

        let (prompt, reply) = current.as_ref().expect("prompt recorded above");
        let step = tokens.len() - prompt.len();
        let next = reply.get(step).copied().unwrap_or(EOS);

        let mut logits = vec![0.0f32; VOCAB_SIZE];
        logits[next as usize] = 10.0;
        Ok(logits)
    }

    fn is_stop_token(&self, token: u32) -> bool {
        token == EOS
    }

    fn max_context_tokens(&self) -> usize {
        self.max_context_tokens
    }

    fn model_id(&self) -> &str {
        "scripted-test-model"
    }

    fn device(&self) -> String {
        "test".to_string()
    }
}

type EmbedFn = Box<dyn Fn(&str) -> Vec<f32> + Send + Sync>;

pub struct FakeEmbedder {
    embed_fn: EmbedFn,
    dimension: usize,
    calls: Mutex<Vec<Vec<String>>>,
}

impl FakeEmbedder {
    pub fn new(
        dimension: usize,
        embed_fn: impl Fn(&str) -> Vec<f32> + Send + Sync + 'static,
    ) -> Self {
        Self {
            embed_fn: Box::new(embed_fn),
            dimension,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// One component per letter: the share of characters equal to that letter.
    pub fn letter_share(letters: &'static [char]) -> Self {
        Self::new(letters.len(), move |text| {
            let total = text.chars().count().max(1) as f32;
            letters
                .iter()
                .map(|l| text.chars().filter(|c| c == l).count() as f32 / total)
                .collect()
        })
    }

    /// Batches passed to `embed`, in call order.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.lock().unwrap().clone()
    }
}

impl Embedder for FakeEmbedder {
    fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, ModelError> {
        self.calls.lock().unwrap().push(texts.to_vec());
        Ok(texts.iter().map(|t| (self.embed_fn)(t)).collect())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        "fake-embedder"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_codec_roundtrip_with_specials() {
        let ids = CharCodec.encode("Soru: ış?", true).unwrap();
        assert_eq!(ids[0], BOS);
        assert_eq!(ids.len(), 10);
        assert_eq!(CharCodec.decode(&ids, true).unwrap(), "Soru: ış?");
        assert_eq!(CharCodec.decode(&ids, false).unwrap(), "<bos>Soru: ış?");
    }

    #[test]
    fn test_scripted_model_replays_reply() {
        let model = ScriptedModel::new(|_| "ok".to_string());
        let mut seq = model.encode("q", true).unwrap();
        for expected in ['o' as u32, 'k' as u32, EOS] {
            let logits = model.next_token_logits(&seq).unwrap();
            let best = logits
                .iter()
                .enumerate()
                .max_by(|a, b| a.1.total_cmp(b.1))
                .map(|(i, _)| i as u32)
                .unwrap();
            assert_eq!(best, expected);
            seq.push(best);
        }
        assert_eq!(model.prompts(), vec!["q".to_string()]);
    }
}
