//! JSON bodies exchanged with the backend.
use serde::{Deserialize, Serialize};
use serde_json::Value;
use studio_core::{
    ContentSource, DocKind, DocumentSummary, EnhanceInput, GenerationInput, IngestedDoc,
    JobOutput, JobProgress, RequestConfig, ResultMeta, SearchHit,
};

use crate::types::{ApiError, FailureKind};

#[derive(Debug, Serialize)]
pub(crate) struct GenerateRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    old_prd: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_prd: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    old_prd_id: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    new_prd_id: Option<&'a str>,
    config: &'a RequestConfig,
}

impl<'a> From<&'a GenerationInput> for GenerateRequest<'a> {
    fn from(input: &'a GenerationInput) -> Self {
        let (old_prd, old_prd_id) = split_source(input.old_prd.as_ref());
        let (new_prd, new_prd_id) = split_source(Some(&input.new_prd));
        Self {
            old_prd,
            new_prd,
            old_prd_id,
            new_prd_id,
            config: &input.config,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EnhanceRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    test_cases: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    test_cases_id: Option<&'a str>,
    config: &'a RequestConfig,
}

impl<'a> From<&'a EnhanceInput> for EnhanceRequest<'a> {
    fn from(input: &'a EnhanceInput) -> Self {
        let (test_cases, test_cases_id) = split_source(Some(&input.test_cases));
        Self {
            test_cases,
            test_cases_id,
            config: &input.config,
        }
    }
}

/// Inline text goes in the content field, stored documents by id.
fn split_source(source: Option<&ContentSource>) -> (Option<&str>, Option<&str>) {
    match source {
        Some(ContentSource::Inline(text)) => (Some(text.as_str()), None),
        Some(ContentSource::Stored(id)) => (None, Some(id.as_str())),
        None => (None, None),
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct IngestRequest<'a> {
    pub(crate) name: &'a str,
    pub(crate) prd_content: &'a str,
}

#[derive(Debug, Serialize)]
pub(crate) struct KbGenerateRequest<'a> {
    pub(crate) doc_id: &'a str,
    pub(crate) config: &'a RequestConfig,
}

#[derive(Debug, Serialize)]
pub(crate) struct SearchRequest<'a> {
    pub(crate) query: &'a str,
    pub(crate) top_k: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) doc_id: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadRequest<'a> {
    pub(crate) name: &'a str,
    pub(crate) content: &'a str,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    pub(crate) error: Option<String>,
}

/// Outcome of an async start call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStart {
    /// The backend already had the answer; no polling needed.
    Cached(JobOutput),
    Pending { job_id: String },
}

#[derive(Debug, Deserialize)]
pub(crate) struct StartResponse {
    #[serde(default)]
    cached: bool,
    #[serde(default)]
    job_id: Option<String>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    meta: Option<ResultMeta>,
}

impl TryFrom<StartResponse> for JobStart {
    type Error = ApiError;

    fn try_from(response: StartResponse) -> Result<Self, Self::Error> {
        if response.cached {
            return Ok(JobStart::Cached(JobOutput {
                text: value_text(response.result),
                meta: response.meta,
            }));
        }
        match response.job_id {
            Some(job_id) if !job_id.is_empty() => Ok(JobStart::Pending { job_id }),
            _ => Err(ApiError::new(
                FailureKind::Decode,
                "start response carried neither a cached result nor a job id",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    Pending,
    Running,
    Done,
    Error,
    #[serde(other)]
    Unknown,
}

/// One `/api/job_status/{id}` response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct JobStatus {
    pub status: JobState,
    #[serde(default)]
    pub result: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub progress: Option<JobProgress>,
    #[serde(default)]
    pub eta_seconds: Option<i64>,
    #[serde(default)]
    pub meta: Option<ResultMeta>,
}

impl JobStatus {
    pub fn pending() -> Self {
        Self {
            status: JobState::Pending,
            result: None,
            error: None,
            progress: None,
            eta_seconds: None,
            meta: None,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct GenerateResponse {
    #[serde(default)]
    test_cases: Option<Value>,
    #[serde(default)]
    meta: Option<ResultMeta>,
}

impl From<GenerateResponse> for JobOutput {
    fn from(response: GenerateResponse) -> Self {
        JobOutput {
            text: value_text(response.test_cases),
            meta: response.meta,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct EnhanceResponse {
    #[serde(default)]
    enhanced_cases: Option<Value>,
    #[serde(default)]
    meta: Option<ResultMeta>,
}

impl From<EnhanceResponse> for JobOutput {
    fn from(response: EnhanceResponse) -> Self {
        JobOutput {
            text: value_text(response.enhanced_cases),
            meta: response.meta,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct KbDocsResponse {
    #[serde(default)]
    pub(crate) docs: Vec<KbDoc>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct KbDoc {
    doc_id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    created_at: i64,
    #[serde(default)]
    sections: u32,
    #[serde(default)]
    total_images: u32,
}

impl From<KbDoc> for IngestedDoc {
    fn from(doc: KbDoc) -> Self {
        IngestedDoc {
            doc_id: doc.doc_id,
            name: doc.name,
            created_at: doc.created_at,
            sections: doc.sections,
            total_images: doc.total_images,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResponse {
    #[serde(default)]
    pub(crate) results: Vec<SearchResult>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SearchResult {
    #[serde(default)]
    doc_id: String,
    #[serde(default)]
    doc_name: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    text: String,
    #[serde(default)]
    similarity: f64,
}

impl From<SearchResult> for SearchHit {
    fn from(result: SearchResult) -> Self {
        SearchHit {
            doc_id: result.doc_id,
            doc_name: result.doc_name,
            title: result.title,
            text: result.text,
            similarity: result.similarity,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(crate) struct UploadList {
    #[serde(default)]
    pub(crate) items: Vec<UploadItem>,
}

/// Listing entry and upload acknowledgement share this shape.
#[derive(Debug, Deserialize)]
pub(crate) struct UploadItem {
    id: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    created_at: i64,
}

impl UploadItem {
    pub(crate) fn into_summary(self, kind: DocKind) -> DocumentSummary {
        DocumentSummary {
            id: self.id,
            name: self.name,
            kind,
            created_at: self.created_at,
        }
    }
}

/// A stored upload fetched by id, content included.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoredDocument {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub content: String,
}

/// Result payloads are normally strings; anything else is shown as compact JSON.
pub(crate) fn value_text(value: Option<Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(text)) => text,
        Some(other) => other.to_string(),
    }
}
