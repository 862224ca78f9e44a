use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use pretty_assertions::assert_eq;
use serde_json::json;
use studio_core::{JobOutput, JobProgress, ResultMeta};
use studio_engine::{
    ApiError, EngineEvent, FailureKind, JobApi, JobClient, JobStart, JobStatus, PollSettings,
    ProgressSink,
};
use tokio_util::sync::CancellationToken;

#[derive(Default)]
struct TestSink {
    events: Arc<Mutex<Vec<EngineEvent>>>,
}

impl TestSink {
    fn percentages(&self) -> Vec<Option<u8>> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                EngineEvent::JobProgress { progress, .. } => {
                    Some(progress.and_then(|p| p.percent()))
                }
                _ => None,
            })
            .collect()
    }
}

impl ProgressSink for TestSink {
    fn emit(&self, event: EngineEvent) {
        self.events.lock().unwrap().push(event);
    }
}

/// Replays canned status responses, then reports pending forever.
#[derive(Default)]
struct ScriptedApi {
    script: Mutex<VecDeque<Result<JobStatus, ApiError>>>,
    calls: AtomicUsize,
}

impl ScriptedApi {
    fn new(responses: Vec<serde_json::Value>) -> Self {
        let script = responses
            .into_iter()
            .map(|value| Ok(serde_json::from_value(value).unwrap()))
            .collect();
        Self {
            script: Mutex::new(script),
            calls: AtomicUsize::new(0),
        }
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl JobApi for ScriptedApi {
    async fn job_status(&self, job_id: &str) -> Result<JobStatus, ApiError> {
        assert_eq!(job_id, "job-1");
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(JobStatus::pending()))
    }
}

fn fast_client(max_polls: u32) -> JobClient {
    JobClient::new(PollSettings {
        interval: Duration::from_millis(1),
        max_polls,
    })
}

fn pending_start() -> JobStart {
    JobStart::Pending {
        job_id: "job-1".to_string(),
    }
}

#[tokio::test]
async fn scripted_polls_report_progress_then_result() {
    studio_logging::initialize_for_tests();
    let api = ScriptedApi::new(vec![
        json!({"status": "pending", "progress": {"current": 1, "total": 4}, "eta_seconds": 30}),
        json!({"status": "running", "progress": {"current": 3, "total": 4}, "eta_seconds": 10}),
        json!({"status": "done", "result": "R", "meta": {"mode": "full", "model_used": "m", "use_vision": true}}),
    ]);
    let sink = TestSink::default();

    let output = fast_client(10)
        .complete(&api, 7, pending_start(), &sink, &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        output,
        JobOutput {
            text: "R".to_string(),
            meta: Some(ResultMeta {
                mode: Some("full".to_string()),
                model_used: Some("m".to_string()),
                use_vision: true,
            }),
        }
    );
    assert_eq!(sink.percentages(), vec![Some(25), Some(75)]);
    assert_eq!(api.calls(), 3);

    let events = sink.events.lock().unwrap();
    assert_eq!(
        events[0],
        EngineEvent::JobProgress {
            ticket: 7,
            progress: Some(JobProgress {
                current: 1,
                total: 4
            }),
            eta_seconds: Some(30),
        }
    );
}

#[tokio::test]
async fn cached_start_skips_polling() {
    let api = ScriptedApi::default();
    let sink = TestSink::default();

    let output = fast_client(10)
        .complete(
            &api,
            1,
            JobStart::Cached(JobOutput::new("cached table")),
            &sink,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(output.text, "cached table");
    assert_eq!(api.calls(), 0);
    assert!(sink.events.lock().unwrap().is_empty());
}

#[tokio::test]
async fn backend_error_status_fails_the_job() {
    let api = ScriptedApi::new(vec![
        json!({"status": "pending", "progress": {"current": 0, "total": 0}}),
        json!({"status": "error", "error": "model overloaded"}),
    ]);
    let sink = TestSink::default();

    let err = fast_client(10)
        .complete(&api, 2, pending_start(), &sink, &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::JobFailed);
    assert_eq!(err.message, "model overloaded");
    assert_eq!(sink.percentages(), vec![None]);
}

#[tokio::test]
async fn error_without_message_uses_fallback() {
    let api = ScriptedApi::new(vec![json!({"status": "error"})]);

    let err = fast_client(10)
        .complete(
            &api,
            3,
            pending_start(),
            &TestSink::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.message, "job failed");
}

#[tokio::test]
async fn done_without_result_yields_empty_text() {
    let api = ScriptedApi::new(vec![json!({"status": "done"})]);

    let output = fast_client(10)
        .complete(
            &api,
            4,
            pending_start(),
            &TestSink::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(output, JobOutput::default());
}

#[tokio::test]
async fn polling_stops_at_the_ceiling() {
    let api = ScriptedApi::default();

    let err = fast_client(3)
        .complete(
            &api,
            5,
            pending_start(),
            &TestSink::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::PollLimitExceeded);
    assert_eq!(api.calls(), 3);
}

#[tokio::test]
async fn cancelled_token_abandons_the_job() {
    let api = ScriptedApi::default();
    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = fast_client(10)
        .complete(&api, 6, pending_start(), &TestSink::default(), &cancel)
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::Cancelled);
    assert_eq!(api.calls(), 0);
}

#[tokio::test]
async fn failed_start_is_not_polled() {
    let api = ScriptedApi::default();
    let start = async {
        Err::<JobStart, _>(ApiError {
            kind: FailureKind::HttpStatus(400),
            message: "request failed 400: PRD is empty".to_string(),
        })
    };

    let err = fast_client(10)
        .run(&api, 8, start, &TestSink::default(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind, FailureKind::HttpStatus(400));
    assert_eq!(api.calls(), 0);
}

#[tokio::test]
async fn single_request_pattern_returns_response() {
    let output = fast_client(1)
        .request(
            async { Ok(JobOutput::new("sync result")) },
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(output.text, "sync result");
}
