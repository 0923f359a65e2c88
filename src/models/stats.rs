use serde::{Deserialize, Serialize};

/// Snapshot of pipeline readiness. Only `status` is set while not ready.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStats {
    pub status: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_count: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_dim: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub model_name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub embedding_model: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents_loaded: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub documents_skipped: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pages_skipped: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub indexed_at: Option<String>,
}

impl PipelineStats {
    pub const READY: &'static str = "ready";
    pub const NOT_READY: &'static str = "not_ready";

    pub fn not_ready() -> Self {
        Self {
            status: Self::NOT_READY.to_string(),
            ..Default::default()
        }
    }

    pub fn is_ready(&self) -> bool {
        self.status == Self::READY
    }
}
