//! Deterministic greedy decoding with repetition constraints.
//!
//! Temperature, top-k and top-p are applied as logit warpers, but the next token
//! is always the argmax of the warped logits. None of the warpers can change the
//! argmax, so output depends only on the model and the prompt.

use std::collections::HashSet;

use tracing::trace;

use crate::engine::LanguageModel;
use crate::error::ModelError;
use crate::models::GenerationConfig;

/// Decoding knobs for one generation call.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodingParams {
    pub max_new_tokens: usize,
    pub temperature: f32,
    pub top_p: f32,
    pub top_k: usize,
    pub repetition_penalty: f32,
    pub no_repeat_ngram_size: usize,
}

impl DecodingParams {
    /// Budget for a per-chunk candidate answer.
    pub fn for_chunk(config: &GenerationConfig) -> Self {
        Self::with_budget(config, config.max_new_tokens_chunk)
    }

    /// Budget for the fused final answer.
    pub fn for_fusion(config: &GenerationConfig) -> Self {
        Self::with_budget(config, config.max_new_tokens_final)
    }

    fn with_budget(config: &GenerationConfig, max_new_tokens: u32) -> Self {
        Self {
            max_new_tokens: max_new_tokens as usize,
            temperature: config.temperature,
            top_p: config.top_p,
            top_k: config.top_k as usize,
            repetition_penalty: config.repetition_penalty,
            no_repeat_ngram_size: config.no_repeat_ngram_size as usize,
        }
    }
}

/// Run greedy decoding after `prompt` and return the generated tokens only.
///
/// Generation stops at a stop token (which is kept in the output), at the token
/// budget, or when the sequence reaches the model's context length.
pub fn greedy_decode<M: LanguageModel + ?Sized>(
    model: &M,
    prompt: &[u32],
    params: &DecodingParams,
) -> Result<Vec<u32>, ModelError> {
    let mut sequence = prompt.to_vec();
    let context_limit = model.max_context_tokens();

    for _ in 0..params.max_new_tokens {
        if sequence.len() >= context_limit {
            break;
        }

        let mut logits = model.next_token_logits(&sequence)?;
        apply_repetition_penalty(&mut logits, &sequence, params.repetition_penalty);
        for token in banned_ngram_tokens(&sequence, params.no_repeat_ngram_size) {
            if let Some(logit) = logits.get_mut(token as usize) {
                *logit = f32::NEG_INFINITY;
            }
        }
        apply_temperature(&mut logits, params.temperature);
        apply_top_k(&mut logits, params.top_k);
        apply_top_p(&mut logits, params.top_p);

        let Some(next) = argmax(&logits) else {
            return Err(ModelError::InferenceError(
                "model returned empty logits".to_string(),
            ));
        };
        sequence.push(next);

        if model.is_stop_token(next) {
            break;
        }
    }

    let generated = sequence.split_off(prompt.len());
    trace!(tokens = generated.len(), "decoding finished");
    Ok(generated)
}

/// Keep the first token (BOS) and the last `limit - 1` tokens when `tokens` exceeds `limit`.
pub fn truncate_left(mut tokens: Vec<u32>, limit: usize) -> Vec<u32> {
    if tokens.len() <= limit || limit == 0 {
        return tokens;
    }
    let excess = tokens.len() - limit;
    tokens.drain(1..1 + excess);
    tokens
}

/// Divide positive logits and multiply negative ones for every token already in `sequence`.
fn apply_repetition_penalty(logits: &mut [f32], sequence: &[u32], penalty: f32) {
    if (penalty - 1.0).abs() < f32::EPSILON {
        return;
    }
    let seen: HashSet<u32> = sequence.iter().copied().collect();
    for token in seen {
        if let Some(logit) = logits.get_mut(token as usize) {
            *logit = if *logit < 0.0 {
                *logit * penalty
            } else {
                *logit / penalty
            };
        }
    }
}

/// Tokens that would complete an n-gram already present in `sequence`.
fn banned_ngram_tokens(sequence: &[u32], n: usize) -> Vec<u32> {
    if n == 0 || sequence.len() + 1 < n {
        return Vec::new();
    }
    if n == 1 {
        return sequence.to_vec();
    }

    let prefix = &sequence[sequence.len() + 1 - n..];
    sequence
        .windows(n)
        .filter(|window| &window[..n - 1] == prefix)
        .map(|window| window[n - 1])
        .collect()
}

fn apply_temperature(logits: &mut [f32], temperature: f32) {
    if temperature > 0.0 && (temperature - 1.0).abs() > f32::EPSILON {
        logits.iter_mut().for_each(|l| *l /= temperature);
    }
}

/// Mask everything below the k-th largest logit.
fn apply_top_k(logits: &mut [f32], k: usize) {
    if k == 0 || k >= logits.len() {
        return;
    }
    let mut sorted: Vec<f32> = logits.to_vec();
    sorted.sort_by(|a, b| b.total_cmp(a));
    let threshold = sorted[k - 1];
    for logit in logits.iter_mut() {
        if *logit < threshold {
            *logit = f32::NEG_INFINITY;
        }
    }
}

/// Mask the tail outside the smallest set of tokens whose probability mass reaches `p`.
fn apply_top_p(logits: &mut [f32], p: f32) {
    if p >= 1.0 || logits.is_empty() {
        return;
    }
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    if !max.is_finite() {
        return;
    }

    let mut order: Vec<usize> = (0..logits.len()).collect();
    order.sort_by(|&a, &b| logits[b].total_cmp(&logits[a]));

    let weights: Vec<f32> = order.iter().map(|&i| (logits[i] - max).exp()).collect();
    let total: f32 = weights.iter().sum();

    let mut cumulative = 0.0;
    let mut keep = order.len();
    for (rank, weight) in weights.iter().enumerate() {
        cumulative += weight / total;
        if cumulative >= p {
            keep = rank + 1;
            break;
        }
    }
    for &i in &order[keep..] {
        logits[i] = f32::NEG_INFINITY;
    }
}

/// Index of the largest logit; the lowest index wins ties.
fn argmax(logits: &[f32]) -> Option<u32> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &logit) in logits.iter().enumerate() {
        match best {
            Some((_, value)) if logit <= value => {}
            _ => best = Some((i, logit)),
        }
    }
    best.map(|(i, _)| i as u32)
}
