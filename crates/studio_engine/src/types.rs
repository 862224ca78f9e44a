use std::fmt;

use studio_core::{
    DocumentPreview, DocumentSummary, IngestedDoc, JobOutput, JobProgress, SearchHit, Ticket,
};

#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// A poll came back for a job that is still running.
    JobProgress {
        ticket: Ticket,
        progress: Option<JobProgress>,
        eta_seconds: Option<i64>,
    },
    JobCompleted {
        ticket: Ticket,
        result: Result<JobOutput, ApiError>,
    },
    DocumentsLoaded(Result<Vec<DocumentSummary>, ApiError>),
    IngestedDocsLoaded(Result<Vec<IngestedDoc>, ApiError>),
    SearchCompleted(Result<Vec<SearchHit>, ApiError>),
    DocumentUploaded(Result<DocumentSummary, ApiError>),
    PreviewLoaded(Result<DocumentPreview, ApiError>),
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ApiError {
    pub kind: FailureKind,
    pub message: String,
}

impl ApiError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub(crate) fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "cancelled")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    InvalidUrl,
    HttpStatus(u16),
    Timeout,
    Network,
    /// Response body did not match the expected shape.
    Decode,
    /// The backend reported the job as failed.
    JobFailed,
    PollLimitExceeded,
    Cancelled,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::InvalidUrl => write!(f, "invalid url"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Network => write!(f, "network error"),
            FailureKind::Decode => write!(f, "malformed response"),
            FailureKind::JobFailed => write!(f, "job failed"),
            FailureKind::PollLimitExceeded => write!(f, "poll limit exceeded"),
            FailureKind::Cancelled => write!(f, "cancelled"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("failed to start async runtime: {0}")]
    Runtime(#[from] std::io::Error),
    #[error("failed to build http client: {0}")]
    Client(ApiError),
}
