use std::fmt;
use std::str::FromStr;

use crate::request::{ContentSource, JobOutput, JobProgress, ResultMeta};
use crate::view_model::{AppViewModel, PanelView, SelectionView};

pub type Ticket = u64;

/// Longest excerpt shown by a document preview, in characters.
pub const PREVIEW_CHARS: usize = 500;

/// One job-running area of the UI. Each panel owns its own busy flag and timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Panel {
    Generate,
    Enhance,
    KbGenerate,
    KbIngest,
}

impl Panel {
    pub const ALL: [Panel; 4] = [
        Panel::Generate,
        Panel::Enhance,
        Panel::KbGenerate,
        Panel::KbIngest,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Panel::Generate => "generate",
            Panel::Enhance => "enhance",
            Panel::KbGenerate => "kb-generate",
            Panel::KbIngest => "kb-ingest",
        }
    }

    /// File name used when the panel's result is exported, if it has one.
    pub fn export_filename(self) -> Option<&'static str> {
        match self {
            Panel::Generate => Some("test_cases.csv"),
            Panel::Enhance => Some("enhanced_test_cases.csv"),
            Panel::KbGenerate => Some("kb_test_cases.csv"),
            Panel::KbIngest => None,
        }
    }

    pub(crate) fn pending_message(self) -> &'static str {
        match self {
            Panel::Generate => "Analyzing the PRD, please wait...",
            Panel::Enhance => "Enhancing the test cases, please wait...",
            Panel::KbGenerate => "Generating test cases from the knowledge base...",
            Panel::KbIngest => "Ingesting the document into the knowledge base...",
        }
    }

    pub(crate) fn failure_prefix(self) -> &'static str {
        match self {
            Panel::Generate | Panel::KbGenerate => "Generation failed",
            Panel::Enhance => "Enhancement failed",
            Panel::KbIngest => "Ingest failed",
        }
    }
}

impl fmt::Display for Panel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Panel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Panel::ALL
            .into_iter()
            .find(|panel| panel.label() == s)
            .ok_or_else(|| format!("unknown panel: {s}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocKind {
    Prd,
    TestCase,
}

impl DocKind {
    pub fn label(self) -> &'static str {
        match self {
            DocKind::Prd => "PRD",
            DocKind::TestCase => "test cases",
        }
    }
}

/// Input slot a stored document can stand in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SelectionTarget {
    OldPrd,
    NewPrd,
    TestCases,
}

impl SelectionTarget {
    pub fn accepts(self, kind: DocKind) -> bool {
        match self {
            SelectionTarget::OldPrd | SelectionTarget::NewPrd => kind == DocKind::Prd,
            SelectionTarget::TestCases => kind == DocKind::TestCase,
        }
    }
}

impl FromStr for SelectionTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "old" => Ok(SelectionTarget::OldPrd),
            "new" => Ok(SelectionTarget::NewPrd),
            "testcases" => Ok(SelectionTarget::TestCases),
            other => Err(format!("unknown selection target: {other}")),
        }
    }
}

/// Uploaded document as listed by the backend (content fetched on demand).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentSummary {
    pub id: String,
    pub name: String,
    pub kind: DocKind,
    pub created_at: i64,
}

/// Document ingested into the knowledge base, split into sections.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestedDoc {
    pub doc_id: String,
    pub name: String,
    pub created_at: i64,
    pub sections: u32,
    pub total_images: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub doc_id: String,
    pub doc_name: Option<String>,
    pub title: Option<String>,
    pub text: String,
    pub similarity: f64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentPreview {
    pub name: String,
    pub excerpt: String,
}

impl DocumentPreview {
    pub fn from_content(name: impl Into<String>, content: &str) -> Self {
        let mut chars = content.char_indices();
        let excerpt = match chars.nth(PREVIEW_CHARS) {
            Some((cut, _)) => format!("{}...", &content[..cut]),
            None => content.to_string(),
        };
        Self {
            name: name.into(),
            excerpt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PanelOutput {
    #[default]
    Empty,
    Pending(String),
    Result(String),
    Error(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressView {
    /// Total not known yet.
    Preparing,
    Batches { current: u64, total: u64, percent: u8 },
}

impl From<JobProgress> for ProgressView {
    fn from(progress: JobProgress) -> Self {
        match progress.percent() {
            Some(percent) => ProgressView::Batches {
                current: progress.current,
                total: progress.total,
                percent,
            },
            None => ProgressView::Preparing,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimerState {
    #[default]
    Idle,
    Running { started_ms: u64, elapsed_ms: u64 },
    Finished { total_ms: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct PanelState {
    pub(crate) ticket: Option<Ticket>,
    pub(crate) timer: TimerState,
    pub(crate) progress: Option<ProgressView>,
    pub(crate) eta_seconds: Option<u64>,
    pub(crate) output: PanelOutput,
    pub(crate) result: String,
    pub(crate) meta: Option<ResultMeta>,
    pub(crate) incremental: bool,
}

impl PanelState {
    pub(crate) fn is_busy(&self) -> bool {
        self.ticket.is_some()
    }

    fn start(&mut self, ticket: Ticket, now_ms: u64, pending: &str) {
        *self = PanelState {
            ticket: Some(ticket),
            timer: TimerState::Running {
                started_ms: now_ms,
                elapsed_ms: 0,
            },
            output: PanelOutput::Pending(pending.to_string()),
            ..PanelState::default()
        };
    }

    fn stop_timer(&mut self, now_ms: u64) {
        if let TimerState::Running { started_ms, .. } = self.timer {
            self.timer = TimerState::Finished {
                total_ms: now_ms.saturating_sub(started_ms),
            };
        }
    }

    fn tick(&mut self, now_ms: u64) -> bool {
        match &mut self.timer {
            TimerState::Running {
                started_ms,
                elapsed_ms,
            } => {
                *elapsed_ms = now_ms.saturating_sub(*started_ms);
                true
            }
            _ => false,
        }
    }
}

/// Content loaded by the user, held until replaced.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Inputs {
    pub(crate) old_prd: String,
    pub(crate) new_prd: String,
    pub(crate) test_cases: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub(crate) struct Selection {
    pub(crate) old_prd: Option<DocumentSummary>,
    pub(crate) new_prd: Option<DocumentSummary>,
    pub(crate) test_cases: Option<DocumentSummary>,
}

impl Selection {
    pub(crate) fn slot(&mut self, target: SelectionTarget) -> &mut Option<DocumentSummary> {
        match target {
            SelectionTarget::OldPrd => &mut self.old_prd,
            SelectionTarget::NewPrd => &mut self.new_prd,
            SelectionTarget::TestCases => &mut self.test_cases,
        }
    }
}

/// Explicit session object: every piece of per-page state lives here and is
/// owned by the composition root.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppState {
    last_ticket: Ticket,
    pub(crate) inputs: Inputs,
    pub(crate) selection: Selection,
    generate: PanelState,
    enhance: PanelState,
    kb_generate: PanelState,
    kb_ingest: PanelState,
    pub(crate) documents: Vec<DocumentSummary>,
    pub(crate) ingested: Vec<IngestedDoc>,
    pub(crate) search_busy: bool,
    pub(crate) search_results: Option<Vec<SearchHit>>,
    pub(crate) preview: Option<DocumentPreview>,
    pub(crate) library_error: Option<String>,
    pub(crate) last_export: Option<String>,
    dirty: bool,
}

impl AppState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn view(&self) -> AppViewModel {
        AppViewModel {
            panels: Panel::ALL
                .into_iter()
                .map(|panel| PanelView::from_state(panel, self.panel(panel)))
                .collect(),
            selection: SelectionView {
                old_prd: self.selection.old_prd.as_ref().map(|d| d.name.clone()),
                new_prd: self.selection.new_prd.as_ref().map(|d| d.name.clone()),
                test_cases: self.selection.test_cases.as_ref().map(|d| d.name.clone()),
            },
            documents: self.documents.clone(),
            ingested: self.ingested.clone(),
            search_busy: self.search_busy,
            search_results: self.search_results.clone(),
            preview: self.preview.clone(),
            library_error: self.library_error.clone(),
            last_export: self.last_export.clone(),
            dirty: self.dirty,
        }
    }

    /// Returns whether a render is due and clears the flag.
    pub fn consume_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    pub fn is_busy(&self, panel: Panel) -> bool {
        self.panel(panel).is_busy()
    }

    /// Raw result text of a panel, as returned by the backend.
    pub fn result(&self, panel: Panel) -> &str {
        &self.panel(panel).result
    }

    pub(crate) fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub(crate) fn panel(&self, panel: Panel) -> &PanelState {
        match panel {
            Panel::Generate => &self.generate,
            Panel::Enhance => &self.enhance,
            Panel::KbGenerate => &self.kb_generate,
            Panel::KbIngest => &self.kb_ingest,
        }
    }

    pub(crate) fn panel_mut(&mut self, panel: Panel) -> &mut PanelState {
        match panel {
            Panel::Generate => &mut self.generate,
            Panel::Enhance => &mut self.enhance,
            Panel::KbGenerate => &mut self.kb_generate,
            Panel::KbIngest => &mut self.kb_ingest,
        }
    }

    pub(crate) fn begin_job(&mut self, panel: Panel, now_ms: u64) -> Ticket {
        self.last_ticket += 1;
        let ticket = self.last_ticket;
        self.panel_mut(panel)
            .start(ticket, now_ms, panel.pending_message());
        self.dirty = true;
        ticket
    }

    /// Panel currently waiting on `ticket`; `None` for stale tickets.
    pub(crate) fn panel_for_ticket(&self, ticket: Ticket) -> Option<Panel> {
        Panel::ALL
            .into_iter()
            .find(|panel| self.panel(*panel).ticket == Some(ticket))
    }

    pub(crate) fn apply_progress(
        &mut self,
        panel: Panel,
        progress: Option<JobProgress>,
        eta_seconds: Option<i64>,
    ) {
        let state = self.panel_mut(panel);
        if let Some(progress) = progress {
            state.progress = Some(progress.into());
        }
        if let Some(eta) = eta_seconds {
            state.eta_seconds = Some(eta.max(0) as u64);
        }
        self.dirty = true;
    }

    pub(crate) fn apply_done(
        &mut self,
        panel: Panel,
        result: Result<JobOutput, String>,
        now_ms: u64,
    ) {
        let state = self.panel_mut(panel);
        state.ticket = None;
        state.stop_timer(now_ms);
        match result {
            Ok(output) => {
                state.output = PanelOutput::Result(output.text.clone());
                state.result = output.text;
                state.meta = output.meta;
            }
            Err(message) => {
                state.output =
                    PanelOutput::Error(format!("{}: {}", panel.failure_prefix(), message));
                state.result.clear();
                state.meta = None;
            }
        }
        self.dirty = true;
    }

    pub(crate) fn set_incremental(&mut self, panel: Panel, incremental: bool) {
        self.panel_mut(panel).incremental = incremental;
    }

    pub(crate) fn tick(&mut self, now_ms: u64) {
        let mut any_running = false;
        for panel in Panel::ALL {
            any_running |= self.panel_mut(panel).tick(now_ms);
        }
        if any_running {
            self.dirty = true;
        }
    }

    pub(crate) fn generation_sources(&self) -> (Option<ContentSource>, Option<ContentSource>) {
        let old = match &self.selection.old_prd {
            Some(doc) => Some(ContentSource::Stored(doc.id.clone())),
            None if !self.inputs.old_prd.trim().is_empty() => {
                Some(ContentSource::Inline(self.inputs.old_prd.clone()))
            }
            None => None,
        };
        let new = match &self.selection.new_prd {
            Some(doc) => Some(ContentSource::Stored(doc.id.clone())),
            None if !self.inputs.new_prd.trim().is_empty() => {
                Some(ContentSource::Inline(self.inputs.new_prd.clone()))
            }
            None => None,
        };
        (old, new)
    }

    pub(crate) fn test_case_source(&self) -> Option<ContentSource> {
        match &self.selection.test_cases {
            Some(doc) => Some(ContentSource::Stored(doc.id.clone())),
            None if !self.inputs.test_cases.trim().is_empty() => {
                Some(ContentSource::Inline(self.inputs.test_cases.clone()))
            }
            None => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_truncates_on_char_boundary() {
        let content = "é".repeat(PREVIEW_CHARS + 3);
        let preview = DocumentPreview::from_content("doc", &content);
        assert!(preview.excerpt.ends_with("..."));
        assert_eq!(preview.excerpt.chars().count(), PREVIEW_CHARS + 3);
    }

    #[test]
    fn short_preview_is_kept_whole() {
        let preview = DocumentPreview::from_content("doc", "hello");
        assert_eq!(preview.excerpt, "hello");
    }

    #[test]
    fn progress_without_total_is_preparing() {
        let view = ProgressView::from(JobProgress {
            current: 0,
            total: 0,
        });
        assert_eq!(view, ProgressView::Preparing);
    }

    #[test]
    fn tick_only_advances_running_timers() {
        let mut panel = PanelState::default();
        assert!(!panel.tick(500));
        panel.start(1, 100, "wait");
        assert!(panel.tick(350));
        assert_eq!(
            panel.timer,
            TimerState::Running {
                started_ms: 100,
                elapsed_ms: 250
            }
        );
        panel.stop_timer(600);
        assert_eq!(panel.timer, TimerState::Finished { total_ms: 500 });
        assert!(!panel.tick(900));
    }
}
