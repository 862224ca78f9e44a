use crate::request::{JobOutput, JobProgress, RequestConfig};
use crate::state::{
    DocumentPreview, DocumentSummary, IngestedDoc, Panel, SearchHit, SelectionTarget, Ticket,
};

#[derive(Debug, Clone, PartialEq)]
pub enum Msg {
    /// User loaded the previous PRD version (file content or pasted text).
    OldPrdLoaded(String),
    /// User loaded the new PRD version.
    NewPrdLoaded(String),
    /// User loaded existing test cases for enhancement.
    TestCasesLoaded(String),
    /// User submitted the generation form.
    GenerateSubmitted { config: RequestConfig, now_ms: u64 },
    /// User submitted the enhancement form.
    EnhanceSubmitted { config: RequestConfig, now_ms: u64 },
    /// User asked to ingest pasted PRD text into the knowledge base.
    IngestSubmitted {
        name: String,
        content: String,
        now_ms: u64,
    },
    /// User asked to generate test cases from an ingested document.
    KbGenerateClicked {
        doc_id: String,
        config: RequestConfig,
        now_ms: u64,
    },
    /// User ran a similarity search over the knowledge base.
    SearchSubmitted { query: String },
    /// Reload both document listings.
    RefreshDocsRequested,
    /// User picked a file to store as a knowledge-base document.
    UploadSubmitted { file_name: String, content: String },
    PreviewRequested { doc_id: String },
    /// Use a stored document instead of uploaded content.
    DocumentSelected {
        target: SelectionTarget,
        doc_id: String,
    },
    SelectionCleared(SelectionTarget),
    ExportClicked(Panel),
    /// Timer tick driving the elapsed-time display.
    Tick { now_ms: u64 },
    /// Poll response for an outstanding job.
    JobProgress {
        ticket: Ticket,
        progress: Option<JobProgress>,
        eta_seconds: Option<i64>,
    },
    /// Terminal state of a job.
    JobDone {
        ticket: Ticket,
        result: Result<JobOutput, String>,
        now_ms: u64,
    },
    DocumentsLoaded(Result<Vec<DocumentSummary>, String>),
    IngestedDocsLoaded(Result<Vec<IngestedDoc>, String>),
    SearchCompleted(Result<Vec<SearchHit>, String>),
    DocumentUploaded(Result<DocumentSummary, String>),
    PreviewLoaded(Result<DocumentPreview, String>),
    /// Outcome of writing an export file: the written path or the reason it failed.
    ExportFinished(Result<String, String>),
}
