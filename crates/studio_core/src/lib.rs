//! Studio core: configuration store and the pure session state machine.
mod config;
mod effect;
mod msg;
mod request;
mod state;
mod storage;
mod update;
mod view_model;

pub use config::{
    Config, ConfigError, ConfigKey, ConfigStore, ConfigValue, Subscription, STORAGE_PREFIX,
};
pub use effect::{Effect, SEARCH_TOP_K};
pub use msg::Msg;
pub use request::{
    ContentSource, EnhanceInput, GenerationInput, JobOutput, JobProgress, RequestConfig,
    ResultMeta,
};
pub use state::{
    AppState, DocKind, DocumentPreview, DocumentSummary, IngestedDoc, Panel, PanelOutput,
    ProgressView, SearchHit, SelectionTarget, Ticket, TimerState, PREVIEW_CHARS,
};
pub use storage::{KeyValueStorage, MemoryStorage, StorageError};
pub use update::{update, UPLOAD_EXTENSIONS};
pub use view_model::{
    eta_label, progress_label, timer_label, AppViewModel, PanelView, SelectionView,
};
