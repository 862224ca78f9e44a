use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::Context;
use studio_core::{update, AppState, ConfigStore, Msg, Panel, SelectionTarget};
use studio_engine::{
    format, read_upload, ApiSettings, AtomicFileWriter, EngineHandle, EngineSettings,
    PollSettings, UploadedText, WorkbookReader, DEFAULT_BASE_URL,
};
use studio_logging::{studio_error, studio_info, studio_warn};

use super::effects::{Clock, EffectRunner};
use super::logging::{self, LogDestination};
use super::persistence::FileStorage;
use super::ui::commands::{self, Command, HELP};
use super::ui::config_panel::ConfigPanel;
use super::ui::render::Renderer;

/// Overrides the backend address.
const API_URL_VAR: &str = "TC_STUDIO_API";
const TICK_INTERVAL: Duration = Duration::from_millis(200);

/// Everything the main loop reacts to.
pub(crate) enum AppEvent {
    Msg(Msg),
    Line(String),
    InputClosed,
}

pub fn run_app() -> anyhow::Result<()> {
    logging::initialize(LogDestination::from_env());

    let data_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let settings = engine_settings(std::env::var(API_URL_VAR).ok());
    studio_info!("Starting studio shell in {:?}", data_dir);

    let engine = EngineHandle::new(settings.clone())
        .with_context(|| format!("could not start the engine for {}", settings.api.base_url))?;
    let storage = FileStorage::open(&data_dir);
    let store = ConfigStore::load(&storage);
    let panel = ConfigPanel::attach(store.clone());

    let clock = Clock::start();
    let (event_tx, event_rx) = mpsc::channel::<AppEvent>();
    let runner = EffectRunner::new(
        engine,
        AtomicFileWriter::new(data_dir.join("output")),
        event_tx.clone(),
        clock,
    );
    spawn_ticker(event_tx.clone(), clock);
    spawn_input_reader(event_tx);

    let mut shell = Shell {
        state: AppState::new(),
        runner,
        renderer: Renderer::new(),
        clock,
        store,
        panel,
        storage,
    };

    println!("Test-Case Studio ({}). Type `help` for commands.", settings.api.base_url);
    shell.dispatch(Msg::RefreshDocsRequested);

    while let Ok(event) = event_rx.recv() {
        match event {
            AppEvent::Msg(msg) => shell.dispatch(msg),
            AppEvent::Line(line) => match commands::parse(&line) {
                Ok(Some(Command::Quit)) => break,
                Ok(Some(command)) => shell.execute(command),
                Ok(None) => {}
                Err(err) => println!("! {err}"),
            },
            AppEvent::InputClosed => break,
        }
    }

    shell.close();
    studio_info!("Studio shell stopped");
    Ok(())
}

fn engine_settings(api_url: Option<String>) -> EngineSettings {
    let base_url = api_url
        .map(|url| url.trim().to_string())
        .filter(|url| !url.is_empty())
        .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
    EngineSettings {
        api: ApiSettings {
            base_url,
            ..ApiSettings::default()
        },
        poll: PollSettings::default(),
    }
}

fn spawn_ticker(events: mpsc::Sender<AppEvent>, clock: Clock) {
    thread::spawn(move || {
        while events
            .send(AppEvent::Msg(Msg::Tick {
                now_ms: clock.now_ms(),
            }))
            .is_ok()
        {
            thread::sleep(TICK_INTERVAL);
        }
    });
}

fn spawn_input_reader(events: mpsc::Sender<AppEvent>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(line) => {
                    if events.send(AppEvent::Line(line)).is_err() {
                        return;
                    }
                }
                Err(err) => {
                    studio_warn!("Failed to read input: {}", err);
                    break;
                }
            }
        }
        let _ = events.send(AppEvent::InputClosed);
    });
}

struct Shell {
    state: AppState,
    runner: EffectRunner,
    renderer: Renderer,
    clock: Clock,
    store: ConfigStore,
    panel: ConfigPanel,
    storage: FileStorage,
}

impl Shell {
    fn dispatch(&mut self, msg: Msg) {
        let state = std::mem::take(&mut self.state);
        let (mut state, effects) = update(state, msg);
        if state.consume_dirty() {
            for line in self.renderer.render(&state.view()) {
                println!("{line}");
            }
        }
        self.state = state;
        self.runner.enqueue(effects);
    }

    fn execute(&mut self, command: Command) {
        let now_ms = self.clock.now_ms();
        match command {
            Command::Help => println!("{HELP}"),
            Command::Quit => {}
            Command::ConfigShow => {
                for line in self.panel.lines() {
                    println!("{line}");
                }
            }
            Command::ConfigSet { key, value } => {
                if let Err(err) = self.panel.set(&key, &value) {
                    studio_error!("Rejected config update: {}", err);
                    println!("! {err}");
                }
            }
            Command::ConfigSave => match self.panel.save(&mut self.storage) {
                Ok(()) => println!("settings saved"),
                Err(err) => {
                    studio_error!("Saving settings failed: {}", err);
                    println!("! could not save settings: {err}");
                }
            },
            Command::ConfigEnv => println!("{}", self.panel.env()),
            Command::Load { target, path } => {
                if let Some(upload) = load_file(&path) {
                    let chars = upload.text.chars().count();
                    println!("loaded {} ({} chars)", upload.file_name, chars);
                    self.dispatch(match target {
                        SelectionTarget::OldPrd => Msg::OldPrdLoaded(upload.text),
                        SelectionTarget::NewPrd => Msg::NewPrdLoaded(upload.text),
                        SelectionTarget::TestCases => Msg::TestCasesLoaded(upload.text),
                    });
                }
            }
            Command::Generate => self.dispatch(Msg::GenerateSubmitted {
                config: self.store.build_request_payload(),
                now_ms,
            }),
            Command::Enhance => self.dispatch(Msg::EnhanceSubmitted {
                config: self.store.build_request_payload(),
                now_ms,
            }),
            Command::Ingest { path, name } => {
                if let Some(upload) = load_file(&path) {
                    self.dispatch(Msg::IngestSubmitted {
                        name: name.unwrap_or(upload.file_name),
                        content: upload.text,
                        now_ms,
                    });
                }
            }
            Command::KbGenerate { doc_id } => self.dispatch(Msg::KbGenerateClicked {
                doc_id,
                config: self.store.build_request_payload(),
                now_ms,
            }),
            Command::Search { query } => self.dispatch(Msg::SearchSubmitted { query }),
            Command::Docs => self.dispatch(Msg::RefreshDocsRequested),
            Command::Upload { path } => {
                if let Some(upload) = load_file(&path) {
                    self.dispatch(Msg::UploadSubmitted {
                        file_name: upload.file_name,
                        content: upload.text,
                    });
                }
            }
            Command::Preview { doc_id } => self.dispatch(Msg::PreviewRequested { doc_id }),
            Command::Select { target, doc_id } => {
                self.dispatch(Msg::DocumentSelected { target, doc_id })
            }
            Command::Clear(target) => self.dispatch(Msg::SelectionCleared(target)),
            Command::Export(panel) => self.dispatch(Msg::ExportClicked(panel)),
            Command::Show(panel) => match self.state.result(panel) {
                "" => println!("({panel} has no result yet)"),
                text => println!("{text}"),
            },
            Command::Html(panel) => self.write_html(panel),
        }
    }

    /// Writes the rendered result next to the CSV exports.
    fn write_html(&self, panel: Panel) {
        let html = format::render(self.state.result(panel));
        let filename = format!("{}_result.html", panel.label().replace('-', "_"));
        match self.runner.output().write(&filename, &html) {
            Ok(path) => println!("wrote {}", path.display()),
            Err(err) => {
                studio_error!("Writing {} failed: {}", filename, err);
                println!("! could not write {filename}: {err}");
            }
        }
    }

    fn close(self) {
        self.runner.shutdown();
        self.panel.detach();
    }
}

fn load_file(path: &Path) -> Option<UploadedText> {
    match read_upload(path, &WorkbookReader) {
        Ok(upload) => Some(upload),
        Err(err) => {
            studio_warn!("Loading {:?} failed: {}", path, err);
            println!("! {err}");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_url_defaults_when_unset_or_blank() {
        assert_eq!(engine_settings(None).api.base_url, DEFAULT_BASE_URL);
        assert_eq!(
            engine_settings(Some("  ".to_string())).api.base_url,
            DEFAULT_BASE_URL
        );
    }

    #[test]
    fn api_url_override_keeps_other_defaults() {
        let settings = engine_settings(Some(" http://10.0.0.5:8080 ".to_string()));

        assert_eq!(settings.api.base_url, "http://10.0.0.5:8080");
        assert_eq!(settings.api.request_timeout, Duration::from_secs(300));
        assert_eq!(settings.poll.max_polls, 3600);
    }
}
