use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::search::OutputFormat;
use crate::error::ConfigError;

pub const DEFAULT_LLM_MODEL: &str = "ytu-ce-cosmos/Turkish-Gemma-9b-v0.1";
pub const DEFAULT_EMBEDDING_MODEL: &str = "emrecan/bert-base-turkish-cased-mean-nli-stsb-tr";
pub const DEFAULT_EMBEDDING_DIMENSION: u32 = 768;
pub const DEFAULT_DOCUMENT_SEPARATOR: &str = "\n\n--- YENİ DÖKÜMAN ---\n\n";
pub const DEFAULT_FUSION_CUE: &str = "### NİHAİ CEVAP:";

/// Environment variable that overrides the config file location.
pub const CONFIG_PATH_ENV: &str = "PDFQA_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub models: ModelsConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub chunking: ChunkingConfig,

    #[serde(default)]
    pub search: SearchConfig,

    #[serde(default)]
    pub generation: GenerationConfig,

    #[serde(default)]
    pub files: FilesConfig,
}

impl Config {
    pub fn config_path() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV)
            && !path.is_empty()
        {
            return Some(PathBuf::from(path));
        }
        dirs::config_dir().map(|p| p.join("pdfqa").join("config.toml"))
    }

    pub fn models_dir() -> Option<PathBuf> {
        dirs::data_dir().map(|p| p.join("pdfqa").join("models"))
    }

    /// Load the config file if present, falling back to defaults. The result is validated.
    pub fn load() -> Result<Self, ConfigError> {
        let config = match Self::config_path() {
            Some(path) if path.exists() => {
                let content = std::fs::read_to_string(&path)?;
                toml::from_str::<Config>(&content)?
            }
            _ => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<PathBuf, ConfigError> {
        let path = Self::config_path().ok_or_else(|| {
            ConfigError::PathError("could not determine config directory".to_string())
        })?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(path)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.chunking.validate()?;
        self.generation.validate()?;

        if self.models.max_context_tokens <= self.generation.max_new_tokens_final {
            return Err(ConfigError::ValidationError(format!(
                "models.max_context_tokens ({}) must be greater than generation.max_new_tokens_final ({})",
                self.models.max_context_tokens, self.generation.max_new_tokens_final
            )));
        }
        if self.search.default_top_k == 0 {
            return Err(ConfigError::ValidationError(
                "search.default_top_k must be at least 1".to_string(),
            ));
        }
        if self.embedding.batch_size == 0 {
            return Err(ConfigError::ValidationError(
                "embedding.batch_size must be at least 1".to_string(),
            ));
        }
        if self.files.supported_extensions.is_empty() {
            return Err(ConfigError::ValidationError(
                "files.supported_extensions must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Directory holding the ONNX export and tokenizer of the language model.
    pub fn llm_model_dir(&self) -> Option<PathBuf> {
        self.models
            .llm_model_path
            .clone()
            .or_else(|| Self::models_dir().map(|d| d.join(model_dir_name(&self.models.llm_model_id))))
    }

    /// Directory holding the ONNX export and tokenizer of the embedding model.
    pub fn embedding_model_dir(&self) -> Option<PathBuf> {
        self.embedding
            .model_path
            .clone()
            .or_else(|| Self::models_dir().map(|d| d.join(model_dir_name(&self.embedding.model_id))))
    }
}

fn model_dir_name(model_id: &str) -> String {
    model_id.replace('/', "--")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_llm_model_id")]
    pub llm_model_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub llm_model_path: Option<PathBuf>,

    /// Tokens that end generation.
    #[serde(default = "default_stop_tokens")]
    pub stop_tokens: Vec<String>,

    #[serde(default = "default_max_context_tokens")]
    pub max_context_tokens: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intra_threads: Option<usize>,
}

fn default_llm_model_id() -> String {
    DEFAULT_LLM_MODEL.to_string()
}

fn default_stop_tokens() -> Vec<String> {
    vec!["<eos>".to_string(), "<end_of_turn>".to_string()]
}

fn default_max_context_tokens() -> u32 {
    8192
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            llm_model_id: default_llm_model_id(),
            llm_model_path: None,
            stop_tokens: default_stop_tokens(),
            max_context_tokens: default_max_context_tokens(),
            intra_threads: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    #[serde(default = "default_embedding_model")]
    pub model_id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_path: Option<PathBuf>,

    #[serde(default = "default_dimension")]
    pub dimension: u32,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_batch_size")]
    pub batch_size: u32,

    /// L2-normalize pooled vectors. Off for models trained with raw mean pooling.
    #[serde(default)]
    pub normalize: bool,
}

fn default_embedding_model() -> String {
    DEFAULT_EMBEDDING_MODEL.to_string()
}

fn default_dimension() -> u32 {
    DEFAULT_EMBEDDING_DIMENSION
}

fn default_max_tokens() -> u32 {
    512
}

fn default_batch_size() -> u32 {
    32
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: default_embedding_model(),
            model_path: None,
            dimension: default_dimension(),
            max_tokens: default_max_tokens(),
            batch_size: default_batch_size(),
            normalize: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Window length in tokens.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    /// Tokens shared by two consecutive windows.
    #[serde(default = "default_chunk_stride")]
    pub chunk_stride: u32,

    #[serde(default = "default_document_separator")]
    pub document_separator: String,
}

fn default_chunk_size() -> u32 {
    500
}

fn default_chunk_stride() -> u32 {
    100
}

fn default_document_separator() -> String {
    DEFAULT_DOCUMENT_SEPARATOR.to_string()
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.chunk_size == 0 {
            return Err(ConfigError::ValidationError(
                "chunking.chunk_size must be at least 1".to_string(),
            ));
        }
        if self.chunk_stride >= self.chunk_size {
            return Err(ConfigError::ValidationError(format!(
                "chunking.chunk_stride ({}) must be smaller than chunking.chunk_size ({})",
                self.chunk_stride, self.chunk_size
            )));
        }
        Ok(())
    }
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_stride: default_chunk_stride(),
            document_separator: default_document_separator(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchConfig {
    #[serde(default = "default_top_k")]
    pub default_top_k: u32,

    #[serde(default)]
    pub default_format: OutputFormat,
}

fn default_top_k() -> u32 {
    5
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            default_top_k: default_top_k(),
            default_format: OutputFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    #[serde(default = "default_max_new_tokens_chunk")]
    pub max_new_tokens_chunk: u32,

    #[serde(default = "default_max_new_tokens_final")]
    pub max_new_tokens_final: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_top_p")]
    pub top_p: f32,

    #[serde(default = "default_sampling_top_k")]
    pub top_k: u32,

    #[serde(default = "default_repetition_penalty")]
    pub repetition_penalty: f32,

    /// 0 disables the constraint.
    #[serde(default = "default_no_repeat_ngram_size")]
    pub no_repeat_ngram_size: u32,

    /// Marker that ends the fusion prompt; the final answer is read after its last occurrence.
    #[serde(default = "default_fusion_cue")]
    pub fusion_cue: String,
}

fn default_max_new_tokens_chunk() -> u32 {
    100
}

fn default_max_new_tokens_final() -> u32 {
    150
}

fn default_temperature() -> f32 {
    0.4
}

fn default_top_p() -> f32 {
    0.95
}

fn default_sampling_top_k() -> u32 {
    40
}

fn default_repetition_penalty() -> f32 {
    1.1
}

fn default_no_repeat_ngram_size() -> u32 {
    3
}

fn default_fusion_cue() -> String {
    DEFAULT_FUSION_CUE.to_string()
}

impl GenerationConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_new_tokens_chunk == 0 {
            return Err(ConfigError::ValidationError(
                "generation.max_new_tokens_chunk must be at least 1".to_string(),
            ));
        }
        if self.max_new_tokens_chunk > self.max_new_tokens_final {
            return Err(ConfigError::ValidationError(format!(
                "generation.max_new_tokens_chunk ({}) must not exceed generation.max_new_tokens_final ({})",
                self.max_new_tokens_chunk, self.max_new_tokens_final
            )));
        }
        if self.temperature <= 0.0 {
            return Err(ConfigError::ValidationError(
                "generation.temperature must be positive".to_string(),
            ));
        }
        if !(self.top_p > 0.0 && self.top_p <= 1.0) {
            return Err(ConfigError::ValidationError(
                "generation.top_p must be in (0, 1]".to_string(),
            ));
        }
        if self.repetition_penalty <= 0.0 {
            return Err(ConfigError::ValidationError(
                "generation.repetition_penalty must be positive".to_string(),
            ));
        }
        if self.fusion_cue.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "generation.fusion_cue must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_new_tokens_chunk: default_max_new_tokens_chunk(),
            max_new_tokens_final: default_max_new_tokens_final(),
            temperature: default_temperature(),
            top_p: default_top_p(),
            top_k: default_sampling_top_k(),
            repetition_penalty: default_repetition_penalty(),
            no_repeat_ngram_size: default_no_repeat_ngram_size(),
            fusion_cue: default_fusion_cue(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilesConfig {
    /// Accepted extensions, lowercase and without the dot.
    #[serde(default = "default_supported_extensions")]
    pub supported_extensions: Vec<String>,

    #[serde(default = "default_max_pdf_size_mb")]
    pub max_pdf_size_mb: u64,
}

fn default_supported_extensions() -> Vec<String> {
    vec!["pdf".to_string()]
}

fn default_max_pdf_size_mb() -> u64 {
    100
}

impl Default for FilesConfig {
    fn default() -> Self {
        Self {
            supported_extensions: default_supported_extensions(),
            max_pdf_size_mb: default_max_pdf_size_mb(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = Config::default();
        assert_eq!(config.models.llm_model_id, DEFAULT_LLM_MODEL);
        assert_eq!(config.embedding.model_id, DEFAULT_EMBEDDING_MODEL);
        assert_eq!(config.chunking.chunk_size, 500);
        assert_eq!(config.chunking.chunk_stride, 100);
        assert_eq!(config.search.default_top_k, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_generation_config_default() {
        let config = GenerationConfig::default();
        assert_eq!(config.max_new_tokens_chunk, 100);
        assert_eq!(config.max_new_tokens_final, 150);
        assert_eq!(config.no_repeat_ngram_size, 3);
        assert!((config.repetition_penalty - 1.1).abs() < f32::EPSILON);
    }

    #[test]
    fn test_stride_must_be_smaller_than_size() {
        let chunking = ChunkingConfig {
            chunk_size: 100,
            chunk_stride: 100,
            ..Default::default()
        };
        assert!(matches!(
            chunking.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        let chunking = ChunkingConfig {
            chunk_size: 0,
            chunk_stride: 0,
            ..Default::default()
        };
        assert!(chunking.validate().is_err());
    }

    #[test]
    fn test_chunk_budget_cannot_exceed_final_budget() {
        let config = Config {
            generation: GenerationConfig {
                max_new_tokens_chunk: 200,
                max_new_tokens_final: 150,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_context_must_exceed_final_budget() {
        let mut config = Config::default();
        config.models.max_context_tokens = config.generation.max_new_tokens_final;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));

        config.models.max_context_tokens = 64;
        assert!(config.validate().is_err());

        config.models.max_context_tokens = config.generation.max_new_tokens_final + 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [chunking]
            chunk_size = 256

            [generation]
            no_repeat_ngram_size = 0
            "#,
        )
        .unwrap();
        assert_eq!(config.chunking.chunk_size, 256);
        assert_eq!(config.chunking.chunk_stride, 100);
        assert_eq!(config.generation.no_repeat_ngram_size, 0);
        assert_eq!(config.generation.max_new_tokens_final, 150);
        assert_eq!(config.files.supported_extensions, vec!["pdf".to_string()]);
    }

    #[test]
    fn test_config_roundtrips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.chunking.document_separator, DEFAULT_DOCUMENT_SEPARATOR);
        assert_eq!(parsed.generation.fusion_cue, DEFAULT_FUSION_CUE);
    }

    #[test]
    fn test_explicit_model_path_wins() {
        let config = Config {
            embedding: EmbeddingConfig {
                model_path: Some(PathBuf::from("/models/bert")),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(
            config.embedding_model_dir(),
            Some(PathBuf::from("/models/bert"))
        );
    }

    #[test]
    fn test_model_dir_name() {
        assert_eq!(
            model_dir_name("ytu-ce-cosmos/Turkish-Gemma-9b-v0.1"),
            "ytu-ce-cosmos--Turkish-Gemma-9b-v0.1"
        );
    }
}
