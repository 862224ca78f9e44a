use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use studio_core::{Effect, Msg};
use studio_engine::{
    export_csv_file, AtomicFileWriter, EngineEvent, EngineHandle, ExportError, FormatError,
};
use studio_logging::{studio_info, studio_warn};

use super::app::AppEvent;

const NO_TABLE_NOTICE: &str = "No table was found in the result; nothing was exported.";

/// Monotonic milliseconds since the shell started.
#[derive(Debug, Clone, Copy)]
pub struct Clock {
    origin: Instant,
}

impl Clock {
    pub fn start() -> Self {
        Self {
            origin: Instant::now(),
        }
    }

    pub fn now_ms(&self) -> u64 {
        u64::try_from(self.origin.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

/// Executes effects produced by `update`: network work goes to the engine,
/// exports are written here, notices are printed.
pub struct EffectRunner {
    engine: EngineHandle,
    output: AtomicFileWriter,
    events: mpsc::Sender<AppEvent>,
}

impl EffectRunner {
    pub fn new(
        engine: EngineHandle,
        output: AtomicFileWriter,
        events: mpsc::Sender<AppEvent>,
        clock: Clock,
    ) -> Self {
        let runner = Self {
            engine,
            output,
            events,
        };
        runner.spawn_event_loop(clock);
        runner
    }

    pub fn output(&self) -> &AtomicFileWriter {
        &self.output
    }

    pub fn enqueue(&self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::StartGeneration { ticket, input } => {
                    studio_info!(
                        "StartGeneration ticket={} incremental={}",
                        ticket,
                        input.is_incremental()
                    );
                    self.engine.start_generation(ticket, input);
                }
                Effect::StartEnhancement { ticket, input } => {
                    studio_info!("StartEnhancement ticket={}", ticket);
                    self.engine.start_enhancement(ticket, input);
                }
                Effect::StartIngest {
                    ticket,
                    name,
                    content,
                } => {
                    studio_info!(
                        "StartIngest ticket={} name={} content_len={}",
                        ticket,
                        name,
                        content.len()
                    );
                    self.engine.start_ingest(ticket, name, content);
                }
                Effect::GenerateFromKb {
                    ticket,
                    doc_id,
                    config,
                } => {
                    studio_info!("GenerateFromKb ticket={} doc_id={}", ticket, doc_id);
                    self.engine.generate_from_kb(ticket, doc_id, config);
                }
                Effect::SearchKb { query, top_k } => {
                    self.engine.search(query, top_k as usize);
                }
                Effect::LoadDocuments => self.engine.load_documents(),
                Effect::LoadIngestedDocs => self.engine.load_ingested_docs(),
                Effect::UploadDocument { name, content } => {
                    self.engine.upload_document(name, content);
                }
                Effect::LoadPreview { doc_id, kind } => self.engine.load_preview(doc_id, kind),
                Effect::ExportCsv {
                    panel,
                    content,
                    filename,
                } => {
                    studio_info!("ExportCsv panel={} filename={}", panel, filename);
                    let result = export_csv_file(&self.output, &filename, &content);
                    let msg = Msg::ExportFinished(export_message(result));
                    let _ = self.events.send(AppEvent::Msg(msg));
                }
                Effect::ShowNotice(text) => println!("! {text}"),
            }
        }
    }

    pub fn shutdown(&self) {
        self.engine.shutdown();
    }

    fn spawn_event_loop(&self, clock: Clock) {
        let engine = self.engine.clone();
        let events = self.events.clone();
        thread::spawn(move || loop {
            if let Some(event) = engine.try_recv() {
                let msg = map_event(event, clock.now_ms());
                if events.send(AppEvent::Msg(msg)).is_err() {
                    break;
                }
            } else {
                thread::sleep(Duration::from_millis(20));
            }
        });
    }
}

/// Translates an engine report into the message the state machine expects.
pub fn map_event(event: EngineEvent, now_ms: u64) -> Msg {
    match event {
        EngineEvent::JobProgress {
            ticket,
            progress,
            eta_seconds,
        } => Msg::JobProgress {
            ticket,
            progress,
            eta_seconds,
        },
        EngineEvent::JobCompleted { ticket, result } => {
            if let Err(err) = &result {
                studio_warn!("Job {} failed ({}): {}", ticket, err.kind, err);
            }
            Msg::JobDone {
                ticket,
                result: result.map_err(|err| err.to_string()),
                now_ms,
            }
        }
        EngineEvent::DocumentsLoaded(result) => {
            Msg::DocumentsLoaded(result.map_err(|err| err.to_string()))
        }
        EngineEvent::IngestedDocsLoaded(result) => {
            Msg::IngestedDocsLoaded(result.map_err(|err| err.to_string()))
        }
        EngineEvent::SearchCompleted(result) => {
            Msg::SearchCompleted(result.map_err(|err| err.to_string()))
        }
        EngineEvent::DocumentUploaded(result) => {
            Msg::DocumentUploaded(result.map_err(|err| err.to_string()))
        }
        EngineEvent::PreviewLoaded(result) => {
            Msg::PreviewLoaded(result.map_err(|err| err.to_string()))
        }
    }
}

fn export_message(result: Result<std::path::PathBuf, ExportError>) -> Result<String, String> {
    match result {
        Ok(path) => {
            studio_info!("Exported {:?}", path);
            Ok(path.display().to_string())
        }
        Err(ExportError::Format(FormatError::NoTable)) => Err(NO_TABLE_NOTICE.to_string()),
        Err(err) => {
            studio_warn!("Export failed: {}", err);
            Err(format!("Export failed: {err}"))
        }
    }
}
