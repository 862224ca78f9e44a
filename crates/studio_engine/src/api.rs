use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use serde::de::DeserializeOwned;
use serde::Serialize;
use studio_core::{
    DocKind, DocumentPreview, DocumentSummary, EnhanceInput, GenerationInput, IngestedDoc,
    JobOutput, RequestConfig, SearchHit,
};
use studio_logging::{studio_debug, studio_warn};
use url::Url;

use crate::types::{ApiError, FailureKind};
use crate::wire::{
    EnhanceRequest, EnhanceResponse, ErrorBody, GenerateRequest, GenerateResponse, IngestRequest,
    JobStart, KbDocsResponse, KbGenerateRequest, SearchRequest, SearchResponse, StartResponse,
    StoredDocument, UploadItem, UploadList, UploadRequest,
};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    /// Inference calls can take minutes, so this is generous.
    pub request_timeout: Duration,
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(300),
        }
    }
}

/// Typed access to every backend endpoint the client uses.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: Url,
}

impl ApiClient {
    pub fn new(settings: &ApiSettings) -> Result<Self, ApiError> {
        let mut base = Url::parse(&settings.base_url)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let client = reqwest::Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()
            .map_err(|err| ApiError::new(FailureKind::Network, err.to_string()))?;
        Ok(Self { client, base })
    }

    /// `POST /api/generate`: one request, final result.
    pub async fn generate(&self, input: &GenerationInput) -> Result<JobOutput, ApiError> {
        let response: GenerateResponse = self
            .post("api/generate", &GenerateRequest::from(input))
            .await?;
        Ok(response.into())
    }

    /// Starts a generation job. A backend without the job routes answers 404;
    /// the single-request endpoint is used instead and its result comes back
    /// as an already finished job.
    pub async fn start_generation(&self, input: &GenerationInput) -> Result<JobStart, ApiError> {
        let started: Result<StartResponse, ApiError> = self
            .post("api/generate_async", &GenerateRequest::from(input))
            .await;
        match started {
            Err(err) if is_missing_route(&err) => {
                studio_warn!("generate_async unavailable; using /api/generate");
                self.generate(input).await.map(JobStart::Cached)
            }
            started => started?.try_into(),
        }
    }

    /// `POST /api/enhance`: one request, final result.
    pub async fn enhance(&self, input: &EnhanceInput) -> Result<JobOutput, ApiError> {
        let response: EnhanceResponse = self
            .post("api/enhance", &EnhanceRequest::from(input))
            .await?;
        Ok(response.into())
    }

    /// Same fallback as [`ApiClient::start_generation`], onto `/api/enhance`.
    pub async fn start_enhancement(&self, input: &EnhanceInput) -> Result<JobStart, ApiError> {
        let started: Result<StartResponse, ApiError> = self
            .post("api/enhance_async", &EnhanceRequest::from(input))
            .await;
        match started {
            Err(err) if is_missing_route(&err) => {
                studio_warn!("enhance_async unavailable; using /api/enhance");
                self.enhance(input).await.map(JobStart::Cached)
            }
            started => started?.try_into(),
        }
    }

    pub async fn start_ingest(&self, name: &str, content: &str) -> Result<JobStart, ApiError> {
        let response: StartResponse = self
            .post(
                "api/kb/ingest_async",
                &IngestRequest {
                    name,
                    prd_content: content,
                },
            )
            .await?;
        response.try_into()
    }

    pub async fn generate_from_kb(
        &self,
        doc_id: &str,
        config: &RequestConfig,
    ) -> Result<JobOutput, ApiError> {
        let response: GenerateResponse = self
            .post("api/kb/generate_from_kb", &KbGenerateRequest { doc_id, config })
            .await?;
        Ok(response.into())
    }

    pub async fn search_kb(
        &self,
        query: &str,
        top_k: usize,
        doc_id: Option<&str>,
    ) -> Result<Vec<SearchHit>, ApiError> {
        let response: SearchResponse = self
            .post(
                "api/kb/search",
                &SearchRequest {
                    query,
                    top_k,
                    doc_id,
                },
            )
            .await?;
        Ok(response.results.into_iter().map(SearchHit::from).collect())
    }

    pub async fn list_ingested(&self) -> Result<Vec<IngestedDoc>, ApiError> {
        let response: KbDocsResponse = self.get("api/kb/docs").await?;
        Ok(response.docs.into_iter().map(IngestedDoc::from).collect())
    }

    /// Uploaded PRDs followed by uploaded test-case files.
    pub async fn list_documents(&self) -> Result<Vec<DocumentSummary>, ApiError> {
        let mut documents = Vec::new();
        for kind in [DocKind::Prd, DocKind::TestCase] {
            let list: UploadList = self.get(uploads_path(kind)).await?;
            documents.extend(list.items.into_iter().map(|item| item.into_summary(kind)));
        }
        Ok(documents)
    }

    /// Stores text as a PRD upload.
    pub async fn upload_document(
        &self,
        name: &str,
        content: &str,
    ) -> Result<DocumentSummary, ApiError> {
        let created: UploadItem = self
            .post(uploads_path(DocKind::Prd), &UploadRequest { name, content })
            .await?;
        Ok(created.into_summary(DocKind::Prd))
    }

    pub async fn fetch_document(
        &self,
        kind: DocKind,
        id: &str,
    ) -> Result<StoredDocument, ApiError> {
        self.get(&format!("{}/{id}", uploads_path(kind))).await
    }

    pub async fn load_preview(
        &self,
        kind: DocKind,
        id: &str,
    ) -> Result<DocumentPreview, ApiError> {
        let document = self.fetch_document(kind, id).await?;
        Ok(DocumentPreview::from_content(document.name, &document.content))
    }

    pub(crate) async fn get<R: DeserializeOwned>(&self, path: &str) -> Result<R, ApiError> {
        let url = self.endpoint(path)?;
        studio_debug!("GET {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }

    async fn post<B, R>(&self, path: &str, body: &B) -> Result<R, ApiError>
    where
        B: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = self.endpoint(path)?;
        let payload = serde_json::to_vec(body)
            .map_err(|err| ApiError::new(FailureKind::Decode, err.to_string()))?;
        studio_debug!("POST {} ({} bytes)", url, payload.len());
        let response = self
            .client
            .post(url)
            .header(CONTENT_TYPE, "application/json")
            .body(payload)
            .send()
            .await
            .map_err(map_reqwest_error)?;
        read_json(response).await
    }

    fn endpoint(&self, path: &str) -> Result<Url, ApiError> {
        self.base
            .join(path)
            .map_err(|err| ApiError::new(FailureKind::InvalidUrl, err.to_string()))
    }
}

fn is_missing_route(err: &ApiError) -> bool {
    err.kind == FailureKind::HttpStatus(404)
}

fn uploads_path(kind: DocKind) -> &'static str {
    match kind {
        DocKind::Prd => "api/uploads/prds",
        DocKind::TestCase => "api/uploads/testcases",
    }
}

async fn read_json<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, ApiError> {
    let status = response.status();
    let body = response.bytes().await.map_err(map_reqwest_error)?;
    if !status.is_success() {
        let detail = serde_json::from_slice::<ErrorBody>(&body)
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| "unknown error".to_string());
        studio_warn!("Backend answered {}: {}", status, detail);
        return Err(ApiError::new(
            FailureKind::HttpStatus(status.as_u16()),
            format!("request failed {}: {detail}", status.as_u16()),
        ));
    }
    serde_json::from_slice(&body)
        .map_err(|err| ApiError::new(FailureKind::Decode, format!("malformed response: {err}")))
}

fn map_reqwest_error(err: reqwest::Error) -> ApiError {
    if err.is_timeout() {
        return ApiError::new(FailureKind::Timeout, format!("request timed out: {err}"));
    }
    ApiError::new(FailureKind::Network, format!("network error: {err}"))
}
