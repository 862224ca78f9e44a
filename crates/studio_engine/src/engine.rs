use std::sync::{mpsc, Arc, Mutex, PoisonError};
use std::thread;

use studio_core::{DocKind, EnhanceInput, GenerationInput, RequestConfig, Ticket};
use studio_logging::{studio_debug, studio_info};
use tokio_util::sync::CancellationToken;

use crate::api::{ApiClient, ApiSettings};
use crate::jobs::{ChannelProgressSink, JobClient, PollSettings};
use crate::types::{EngineError, EngineEvent};

#[derive(Debug, Clone, Default)]
pub struct EngineSettings {
    pub api: ApiSettings,
    pub poll: PollSettings,
}

enum EngineCommand {
    StartGeneration {
        ticket: Ticket,
        input: GenerationInput,
    },
    StartEnhancement {
        ticket: Ticket,
        input: EnhanceInput,
    },
    StartIngest {
        ticket: Ticket,
        name: String,
        content: String,
    },
    GenerateFromKb {
        ticket: Ticket,
        doc_id: String,
        config: RequestConfig,
    },
    Search {
        query: String,
        top_k: usize,
    },
    LoadDocuments,
    LoadIngestedDocs,
    UploadDocument {
        name: String,
        content: String,
    },
    LoadPreview {
        doc_id: String,
        kind: DocKind,
    },
}

/// Runs network work on a dedicated tokio runtime thread and reports back
/// through a channel the UI loop drains. Clones share both channels.
#[derive(Clone)]
pub struct EngineHandle {
    cmd_tx: mpsc::Sender<EngineCommand>,
    event_rx: Arc<Mutex<mpsc::Receiver<EngineEvent>>>,
    cancel: CancellationToken,
}

#[derive(Clone)]
struct Worker {
    api: Arc<ApiClient>,
    jobs: JobClient,
    events: mpsc::Sender<EngineEvent>,
    cancel: CancellationToken,
}

impl EngineHandle {
    pub fn new(settings: EngineSettings) -> Result<Self, EngineError> {
        let api = Arc::new(ApiClient::new(&settings.api).map_err(EngineError::Client)?);
        let runtime = tokio::runtime::Runtime::new()?;
        let (cmd_tx, cmd_rx) = mpsc::channel();
        let (event_tx, event_rx) = mpsc::channel();
        let cancel = CancellationToken::new();

        let worker = Worker {
            api,
            jobs: JobClient::new(settings.poll),
            events: event_tx,
            cancel: cancel.clone(),
        };
        thread::spawn(move || {
            while let Ok(command) = cmd_rx.recv() {
                let worker = worker.clone();
                runtime.spawn(async move {
                    worker.handle(command).await;
                });
            }
            studio_debug!("Engine command channel closed");
        });

        studio_info!("Engine started against {}", settings.api.base_url);
        Ok(Self {
            cmd_tx,
            event_rx: Arc::new(Mutex::new(event_rx)),
            cancel,
        })
    }

    pub fn start_generation(&self, ticket: Ticket, input: GenerationInput) {
        self.send(EngineCommand::StartGeneration { ticket, input });
    }

    pub fn start_enhancement(&self, ticket: Ticket, input: EnhanceInput) {
        self.send(EngineCommand::StartEnhancement { ticket, input });
    }

    pub fn start_ingest(
        &self,
        ticket: Ticket,
        name: impl Into<String>,
        content: impl Into<String>,
    ) {
        self.send(EngineCommand::StartIngest {
            ticket,
            name: name.into(),
            content: content.into(),
        });
    }

    pub fn generate_from_kb(
        &self,
        ticket: Ticket,
        doc_id: impl Into<String>,
        config: RequestConfig,
    ) {
        self.send(EngineCommand::GenerateFromKb {
            ticket,
            doc_id: doc_id.into(),
            config,
        });
    }

    pub fn search(&self, query: impl Into<String>, top_k: usize) {
        self.send(EngineCommand::Search {
            query: query.into(),
            top_k,
        });
    }

    pub fn load_documents(&self) {
        self.send(EngineCommand::LoadDocuments);
    }

    pub fn load_ingested_docs(&self) {
        self.send(EngineCommand::LoadIngestedDocs);
    }

    pub fn upload_document(&self, name: impl Into<String>, content: impl Into<String>) {
        self.send(EngineCommand::UploadDocument {
            name: name.into(),
            content: content.into(),
        });
    }

    pub fn load_preview(&self, doc_id: impl Into<String>, kind: DocKind) {
        self.send(EngineCommand::LoadPreview {
            doc_id: doc_id.into(),
            kind,
        });
    }

    pub fn try_recv(&self) -> Option<EngineEvent> {
        self.event_rx
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .try_recv()
            .ok()
    }

    /// Abandons outstanding jobs. The backend keeps running them.
    pub fn shutdown(&self) {
        if !self.cancel.is_cancelled() {
            studio_info!("Engine shutting down; outstanding polls cancelled");
            self.cancel.cancel();
        }
    }

    fn send(&self, command: EngineCommand) {
        let _ = self.cmd_tx.send(command);
    }
}

impl Worker {
    async fn handle(&self, command: EngineCommand) {
        let api = self.api.as_ref();
        let event = match command {
            EngineCommand::StartGeneration { ticket, input } => {
                let sink = ChannelProgressSink::new(self.events.clone());
                let result = self
                    .jobs
                    .run(api, ticket, api.start_generation(&input), &sink, &self.cancel)
                    .await;
                EngineEvent::JobCompleted { ticket, result }
            }
            EngineCommand::StartEnhancement { ticket, input } => {
                let sink = ChannelProgressSink::new(self.events.clone());
                let result = self
                    .jobs
                    .run(api, ticket, api.start_enhancement(&input), &sink, &self.cancel)
                    .await;
                EngineEvent::JobCompleted { ticket, result }
            }
            EngineCommand::StartIngest {
                ticket,
                name,
                content,
            } => {
                let sink = ChannelProgressSink::new(self.events.clone());
                let result = self
                    .jobs
                    .run(
                        api,
                        ticket,
                        api.start_ingest(&name, &content),
                        &sink,
                        &self.cancel,
                    )
                    .await;
                EngineEvent::JobCompleted { ticket, result }
            }
            EngineCommand::GenerateFromKb {
                ticket,
                doc_id,
                config,
            } => {
                let result = self
                    .jobs
                    .request(api.generate_from_kb(&doc_id, &config), &self.cancel)
                    .await;
                EngineEvent::JobCompleted { ticket, result }
            }
            EngineCommand::Search { query, top_k } => {
                EngineEvent::SearchCompleted(api.search_kb(&query, top_k, None).await)
            }
            EngineCommand::LoadDocuments => {
                EngineEvent::DocumentsLoaded(api.list_documents().await)
            }
            EngineCommand::LoadIngestedDocs => {
                EngineEvent::IngestedDocsLoaded(api.list_ingested().await)
            }
            EngineCommand::UploadDocument { name, content } => {
                EngineEvent::DocumentUploaded(api.upload_document(&name, &content).await)
            }
            EngineCommand::LoadPreview { doc_id, kind } => {
                EngineEvent::PreviewLoaded(api.load_preview(kind, &doc_id).await)
            }
        };
        let _ = self.events.send(event);
    }
}
