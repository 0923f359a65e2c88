//! Turkish prompt templates for per-chunk answering and answer fusion.

const FUSION_INSTRUCTION: &str = "Sadece yukarıdaki cevaplara dayalı teknik ve doğru bir Türkçe cevap ver.\n\
Genel açıklamalardan, tahminlerden ve konu dışı ifadelerden kaçın. \
Sadece doğrudan sorunun teknik cevabını ver.";

/// Prompt asking for an answer grounded in one chunk.
pub fn chunk_prompt(chunk: &str, question: &str) -> String {
    format!("Metin: {chunk}\n\nSoru: {question}\n\nCevap:")
}

/// Prompt asking the model to merge candidate answers, ending with `cue`.
///
/// Occurrences of `cue` inside candidates are removed so the only cue in the
/// prompt is the trailing one.
pub fn fusion_prompt(candidates: &[String], question: &str, cue: &str) -> String {
    let mut prompt = String::new();
    for (i, candidate) in candidates.iter().enumerate() {
        prompt.push_str(&format!(
            "Parça {} Cevap: {}\n",
            i + 1,
            strip_cue(candidate, cue).trim()
        ));
    }
    prompt.push('\n');
    prompt.push_str(FUSION_INSTRUCTION);
    prompt.push_str(&format!("\n\nSORU: {question}\n\n{cue}"));
    prompt
}

/// Text after the last occurrence of `cue`, trimmed.
pub fn extract_after_cue<'a>(decoded: &'a str, cue: &str) -> Option<&'a str> {
    decoded
        .rfind(cue)
        .map(|pos| decoded[pos + cue.len()..].trim())
}

fn strip_cue(text: &str, cue: &str) -> String {
    if cue.is_empty() {
        return text.to_string();
    }
    text.replace(cue, "")
}
