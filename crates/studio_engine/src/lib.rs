//! Studio engine: backend API access, job polling and result formatting.
mod api;
mod engine;
mod export;
pub mod format;
mod jobs;
mod persist;
mod types;
mod upload;
mod wire;

pub use api::{ApiClient, ApiSettings, DEFAULT_BASE_URL};
pub use engine::{EngineHandle, EngineSettings};
pub use export::{export_csv_file, ExportError};
pub use format::{FormatError, ResultFormat};
pub use jobs::{ChannelProgressSink, JobApi, JobClient, PollSettings, ProgressSink};
pub use persist::{ensure_dir, AtomicFileWriter, PersistError};
pub use types::{ApiError, EngineError, EngineEvent, FailureKind};
pub use upload::{
    decode_text, read_upload, SpreadsheetReader, UploadError, UploadedText, WorkbookReader,
};
pub use wire::{JobStart, JobState, JobStatus, StoredDocument};
