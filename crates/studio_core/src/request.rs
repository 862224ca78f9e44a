use serde::{Deserialize, Serialize};

/// Tuning knobs sent with every inference request. Absent fields let the
/// backend fall back to its own defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RequestConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vision_model: Option<String>,
    pub disable_vision: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_images_per_batch: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_max_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_quality: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_section_chars: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_inference_concurrency: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_download_concurrency: Option<i64>,
}

/// Where a piece of request content comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentSource {
    /// Text held in the session (uploaded or pasted).
    Inline(String),
    /// A document previously stored on the backend, resolved server-side.
    Stored(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationInput {
    pub old_prd: Option<ContentSource>,
    pub new_prd: ContentSource,
    pub config: RequestConfig,
}

impl GenerationInput {
    pub fn is_incremental(&self) -> bool {
        self.old_prd.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnhanceInput {
    pub test_cases: ContentSource,
    pub config: RequestConfig,
}

/// Backend-reported details about how a result was produced.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResultMeta {
    #[serde(default)]
    pub mode: Option<String>,
    #[serde(default)]
    pub model_used: Option<String>,
    #[serde(default)]
    pub use_vision: bool,
}

/// Terminal value of a generation, enhancement or ingest job.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct JobOutput {
    pub text: String,
    pub meta: Option<ResultMeta>,
}

impl JobOutput {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            meta: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct JobProgress {
    #[serde(default)]
    pub current: u64,
    #[serde(default)]
    pub total: u64,
}

impl JobProgress {
    /// Rounded completion percentage, or `None` while the total is unknown.
    pub fn percent(&self) -> Option<u8> {
        if self.total == 0 {
            return None;
        }
        let ratio = self.current as f64 / self.total as f64;
        Some((ratio * 100.0).round().clamp(0.0, 100.0) as u8)
    }
}
