//! User-editable settings shared by every tab.
//!
//! [`ConfigStore`] is the single source of truth: tabs read it at submission
//! time, the config panel writes to it, and subscribers are notified
//! synchronously on every change.

use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use thiserror::Error;

use crate::request::RequestConfig;
use crate::storage::{KeyValueStorage, StorageError};

/// Namespace for persisted entries, one entry per field.
pub const STORAGE_PREFIX: &str = "tc_agent.";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("unknown config key: {0}")]
    UnknownKey(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ConfigKey {
    ApiKey,
    BaseUrl,
    TextModel,
    VisionModel,
    DisableVision,
    MaxImagesPerBatch,
    ImageMaxSize,
    ImageQuality,
    MaxSectionChars,
    BatchInferenceConcurrency,
    ImageDownloadConcurrency,
}

impl ConfigKey {
    pub const ALL: [ConfigKey; 11] = [
        ConfigKey::ApiKey,
        ConfigKey::BaseUrl,
        ConfigKey::TextModel,
        ConfigKey::VisionModel,
        ConfigKey::DisableVision,
        ConfigKey::MaxImagesPerBatch,
        ConfigKey::ImageMaxSize,
        ConfigKey::ImageQuality,
        ConfigKey::MaxSectionChars,
        ConfigKey::BatchInferenceConcurrency,
        ConfigKey::ImageDownloadConcurrency,
    ];

    /// Internal (camelCase) name, also used for storage keys.
    pub fn name(self) -> &'static str {
        match self {
            ConfigKey::ApiKey => "apiKey",
            ConfigKey::BaseUrl => "baseUrl",
            ConfigKey::TextModel => "textModel",
            ConfigKey::VisionModel => "visionModel",
            ConfigKey::DisableVision => "disableVision",
            ConfigKey::MaxImagesPerBatch => "maxImagesPerBatch",
            ConfigKey::ImageMaxSize => "imageMaxSize",
            ConfigKey::ImageQuality => "imageQuality",
            ConfigKey::MaxSectionChars => "maxSectionChars",
            ConfigKey::BatchInferenceConcurrency => "batchInferenceConcurrency",
            ConfigKey::ImageDownloadConcurrency => "imageDownloadConcurrency",
        }
    }

    /// External (snake_case) name used on the wire.
    pub fn wire_name(self) -> &'static str {
        match self {
            ConfigKey::ApiKey => "api_key",
            ConfigKey::BaseUrl => "base_url",
            ConfigKey::TextModel => "text_model",
            ConfigKey::VisionModel => "vision_model",
            ConfigKey::DisableVision => "disable_vision",
            ConfigKey::MaxImagesPerBatch => "max_images_per_batch",
            ConfigKey::ImageMaxSize => "image_max_size",
            ConfigKey::ImageQuality => "image_quality",
            ConfigKey::MaxSectionChars => "max_section_chars",
            ConfigKey::BatchInferenceConcurrency => "batch_inference_concurrency",
            ConfigKey::ImageDownloadConcurrency => "image_download_concurrency",
        }
    }

    /// Environment variable name used by the `.env` export.
    pub fn env_name(self) -> &'static str {
        match self {
            ConfigKey::ApiKey => "OPENAI_API_KEY",
            ConfigKey::BaseUrl => "OPENAI_BASE_URL",
            ConfigKey::TextModel => "TEXT_MODEL_NAME",
            ConfigKey::VisionModel => "VISION_MODEL_NAME",
            ConfigKey::DisableVision => "DISABLE_VISION",
            ConfigKey::MaxImagesPerBatch => "MAX_IMAGES_PER_BATCH",
            ConfigKey::ImageMaxSize => "IMAGE_MAX_SIZE",
            ConfigKey::ImageQuality => "IMAGE_QUALITY",
            ConfigKey::MaxSectionChars => "MAX_SECTION_CHARS",
            ConfigKey::BatchInferenceConcurrency => "BATCH_INFERENCE_CONCURRENCY",
            ConfigKey::ImageDownloadConcurrency => "IMAGE_DOWNLOAD_CONCURRENCY",
        }
    }

    pub fn is_flag(self) -> bool {
        self == ConfigKey::DisableVision
    }

    /// Fields parsed to integers when building a request.
    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            ConfigKey::MaxImagesPerBatch
                | ConfigKey::ImageMaxSize
                | ConfigKey::ImageQuality
                | ConfigKey::MaxSectionChars
                | ConfigKey::BatchInferenceConcurrency
                | ConfigKey::ImageDownloadConcurrency
        )
    }

    /// Settings only meaningful while the vision model is enabled.
    pub fn is_vision_param(self) -> bool {
        matches!(
            self,
            ConfigKey::VisionModel
                | ConfigKey::MaxImagesPerBatch
                | ConfigKey::ImageMaxSize
                | ConfigKey::ImageQuality
                | ConfigKey::ImageDownloadConcurrency
        )
    }

    pub fn storage_key(self) -> String {
        format!("{STORAGE_PREFIX}{}", self.name())
    }
}

impl fmt::Display for ConfigKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ConfigKey {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ConfigKey::ALL
            .into_iter()
            .find(|key| key.name() == s)
            .ok_or_else(|| ConfigError::UnknownKey(s.to_string()))
    }
}

/// Raw input for [`ConfigStore::set`], coerced according to the target key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigValue {
    Text(String),
    Flag(bool),
    Unset,
}

impl ConfigValue {
    fn into_text(self) -> String {
        match self {
            ConfigValue::Text(text) => text,
            ConfigValue::Flag(flag) => flag.to_string(),
            ConfigValue::Unset => String::new(),
        }
    }

    fn into_flag(self) -> bool {
        match self {
            ConfigValue::Flag(flag) => flag,
            ConfigValue::Text(text) => matches!(
                text.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            ),
            ConfigValue::Unset => false,
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Flag(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        ConfigValue::Text(value)
    }
}

impl<T: Into<ConfigValue>> From<Option<T>> for ConfigValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(ConfigValue::Unset, Into::into)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub text_model: String,
    pub vision_model: String,
    pub disable_vision: bool,
    pub max_images_per_batch: String,
    pub image_max_size: String,
    pub image_quality: String,
    pub max_section_chars: String,
    pub batch_inference_concurrency: String,
    pub image_download_concurrency: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: String::new(),
            text_model: String::new(),
            vision_model: String::new(),
            disable_vision: true,
            max_images_per_batch: "10".to_string(),
            image_max_size: "1024".to_string(),
            image_quality: "85".to_string(),
            max_section_chars: "60000".to_string(),
            batch_inference_concurrency: String::new(),
            image_download_concurrency: String::new(),
        }
    }
}

impl Config {
    /// Text value of a string field; `None` for the boolean field.
    pub fn text(&self, key: ConfigKey) -> Option<&str> {
        let value = match key {
            ConfigKey::ApiKey => &self.api_key,
            ConfigKey::BaseUrl => &self.base_url,
            ConfigKey::TextModel => &self.text_model,
            ConfigKey::VisionModel => &self.vision_model,
            ConfigKey::DisableVision => return None,
            ConfigKey::MaxImagesPerBatch => &self.max_images_per_batch,
            ConfigKey::ImageMaxSize => &self.image_max_size,
            ConfigKey::ImageQuality => &self.image_quality,
            ConfigKey::MaxSectionChars => &self.max_section_chars,
            ConfigKey::BatchInferenceConcurrency => &self.batch_inference_concurrency,
            ConfigKey::ImageDownloadConcurrency => &self.image_download_concurrency,
        };
        Some(value.as_str())
    }

    fn text_mut(&mut self, key: ConfigKey) -> Option<&mut String> {
        let value = match key {
            ConfigKey::ApiKey => &mut self.api_key,
            ConfigKey::BaseUrl => &mut self.base_url,
            ConfigKey::TextModel => &mut self.text_model,
            ConfigKey::VisionModel => &mut self.vision_model,
            ConfigKey::DisableVision => return None,
            ConfigKey::MaxImagesPerBatch => &mut self.max_images_per_batch,
            ConfigKey::ImageMaxSize => &mut self.image_max_size,
            ConfigKey::ImageQuality => &mut self.image_quality,
            ConfigKey::MaxSectionChars => &mut self.max_section_chars,
            ConfigKey::BatchInferenceConcurrency => &mut self.batch_inference_concurrency,
            ConfigKey::ImageDownloadConcurrency => &mut self.image_download_concurrency,
        };
        Some(value)
    }

    /// Display form of any field, booleans as `true`/`false`.
    pub fn display_value(&self, key: ConfigKey) -> String {
        match self.text(key) {
            Some(text) => text.to_string(),
            None => self.disable_vision.to_string(),
        }
    }

    fn apply(&mut self, key: ConfigKey, value: ConfigValue) {
        match self.text_mut(key) {
            Some(slot) => *slot = value.into_text(),
            None => self.disable_vision = value.into_flag(),
        }
    }

    fn apply_stored(&mut self, key: ConfigKey, stored: String) {
        match self.text_mut(key) {
            Some(slot) => *slot = stored,
            None => self.disable_vision = stored == "true",
        }
    }

    pub fn request_config(&self) -> RequestConfig {
        RequestConfig {
            api_key: non_empty(&self.api_key),
            base_url: non_empty(&self.base_url),
            text_model: non_empty(&self.text_model),
            vision_model: non_empty(&self.vision_model),
            disable_vision: self.disable_vision,
            max_images_per_batch: parse_int(&self.max_images_per_batch),
            image_max_size: parse_int(&self.image_max_size),
            image_quality: parse_int(&self.image_quality),
            max_section_chars: parse_int(&self.max_section_chars),
            batch_inference_concurrency: parse_int(&self.batch_inference_concurrency),
            image_download_concurrency: parse_int(&self.image_download_concurrency),
        }
    }

    /// `.env` rendition of the configuration, one `NAME=value` per line.
    pub fn env_export(&self) -> String {
        ConfigKey::ALL
            .into_iter()
            .map(|key| {
                let value = match self.text(key) {
                    Some(text) => text.to_string(),
                    None => String::from(if self.disable_vision { "1" } else { "0" }),
                };
                format!("{}={}", key.env_name(), value)
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

fn non_empty(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

fn parse_int(value: &str) -> Option<i64> {
    value.trim().parse::<i64>().ok()
}

type Handler = Arc<dyn Fn(&Config) + Send + Sync>;

struct Inner {
    config: Config,
    subscribers: Vec<(u64, Handler)>,
    next_subscriber: u64,
}

/// Shared, observable configuration. Clones share the same state.
#[derive(Clone)]
pub struct ConfigStore {
    inner: Arc<Mutex<Inner>>,
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::with_config(Config::default())
    }
}

impl fmt::Debug for ConfigStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.lock();
        f.debug_struct("ConfigStore")
            .field("config", &inner.config)
            .field("subscribers", &inner.subscribers.len())
            .finish()
    }
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: Config) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                config,
                subscribers: Vec::new(),
                next_subscriber: 0,
            })),
        }
    }

    /// Initial state from storage; keys without an entry keep the defaults.
    pub fn load(storage: &dyn KeyValueStorage) -> Self {
        let mut config = Config::default();
        for key in ConfigKey::ALL {
            if let Some(stored) = storage.get_item(&key.storage_key()) {
                config.apply_stored(key, stored);
            }
        }
        Self::with_config(config)
    }

    pub fn get(&self) -> Config {
        self.lock().config.clone()
    }

    /// Sets a field by its internal name. Unknown names are a programming error
    /// and are reported instead of ignored.
    pub fn set(&self, key: &str, value: impl Into<ConfigValue>) -> Result<(), ConfigError> {
        let key = key.parse::<ConfigKey>()?;
        self.set_key(key, value);
        Ok(())
    }

    pub fn set_key(&self, key: ConfigKey, value: impl Into<ConfigValue>) {
        self.lock().config.apply(key, value.into());
        self.notify();
    }

    /// Writes every non-empty field and removes the entry of every empty one.
    pub fn persist(&self, storage: &mut dyn KeyValueStorage) -> Result<(), ConfigError> {
        let config = self.get();
        for key in ConfigKey::ALL {
            let storage_key = key.storage_key();
            match config.text(key) {
                Some("") => storage.remove_item(&storage_key)?,
                Some(text) => storage.set_item(&storage_key, text)?,
                None => {
                    let flag = if config.disable_vision { "true" } else { "false" };
                    storage.set_item(&storage_key, flag)?;
                }
            }
        }
        Ok(())
    }

    /// Registers `handler` and immediately replays the current state to it.
    pub fn subscribe<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&Config) + Send + Sync + 'static,
    {
        let handler: Handler = Arc::new(handler);
        let (id, current) = {
            let mut inner = self.lock();
            let id = inner.next_subscriber;
            inner.next_subscriber += 1;
            inner.subscribers.push((id, handler.clone()));
            (id, inner.config.clone())
        };
        handler(&current);
        Subscription {
            inner: Arc::downgrade(&self.inner),
            id,
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.lock().subscribers.len()
    }

    pub fn build_request_payload(&self) -> RequestConfig {
        self.lock().config.request_config()
    }

    fn notify(&self) {
        // Handlers run outside the lock so they may read the store again.
        let (config, handlers) = {
            let inner = self.lock();
            let handlers: Vec<Handler> = inner
                .subscribers
                .iter()
                .map(|(_, handler)| handler.clone())
                .collect();
            (inner.config.clone(), handlers)
        };
        for handler in handlers {
            handler(&config);
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle returned by [`ConfigStore::subscribe`].
#[must_use = "dropping a Subscription keeps the handler registered; call unsubscribe to remove it"]
pub struct Subscription {
    inner: Weak<Mutex<Inner>>,
    id: u64,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut inner = inner.lock().unwrap_or_else(PoisonError::into_inner);
            inner.subscribers.retain(|(id, _)| *id != self.id);
        }
    }
}
