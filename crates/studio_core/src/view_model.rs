use crate::state::{
    DocumentPreview, DocumentSummary, IngestedDoc, Panel, PanelOutput, PanelState, ProgressView,
    SearchHit, TimerState,
};

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppViewModel {
    pub panels: Vec<PanelView>,
    pub selection: SelectionView,
    pub documents: Vec<DocumentSummary>,
    pub ingested: Vec<IngestedDoc>,
    pub search_busy: bool,
    pub search_results: Option<Vec<SearchHit>>,
    pub preview: Option<DocumentPreview>,
    pub library_error: Option<String>,
    pub last_export: Option<String>,
    pub dirty: bool,
}

impl AppViewModel {
    pub fn panel(&self, panel: Panel) -> Option<&PanelView> {
        self.panels.iter().find(|view| view.panel == panel)
    }
}

/// Names of the stored documents standing in for uploads.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SelectionView {
    pub old_prd: Option<String>,
    pub new_prd: Option<String>,
    pub test_cases: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelView {
    pub panel: Panel,
    pub busy: bool,
    pub output: PanelOutput,
    pub progress: Option<ProgressView>,
    pub timer_label: Option<String>,
    pub progress_label: Option<String>,
    pub eta_label: Option<String>,
    pub mode_label: Option<String>,
    pub meta_label: Option<String>,
    pub export_available: bool,
}

impl PanelView {
    pub(crate) fn from_state(panel: Panel, state: &PanelState) -> Self {
        let has_result = matches!(state.output, PanelOutput::Result(_));
        let mode_label = (panel == Panel::Generate && has_result).then(|| {
            let vision = state.meta.as_ref().is_some_and(|meta| meta.use_vision);
            format!(
                "{} | {}",
                mode_text(state.incremental),
                if vision {
                    "vision model enabled"
                } else {
                    "text model enabled"
                }
            )
        });
        // Ingest jobs report indexing stats, not generation metadata.
        let meta_label = state
            .meta
            .as_ref()
            .filter(|_| has_result && panel != Panel::KbIngest)
            .map(|meta| {
                let mode = meta.mode.as_deref().unwrap_or(if state.incremental {
                    "incremental"
                } else {
                    "full"
                });
                format!(
                    "mode={}, model={}, vision={}",
                    mode,
                    meta.model_used.as_deref().unwrap_or("unknown"),
                    if meta.use_vision { "on" } else { "off" }
                )
            });
        Self {
            panel,
            busy: state.is_busy(),
            output: state.output.clone(),
            progress: state.progress,
            timer_label: timer_label(state.timer),
            progress_label: state.progress.map(progress_label),
            eta_label: state.eta_seconds.filter(|_| state.is_busy()).map(eta_label),
            mode_label,
            meta_label,
            export_available: has_result
                && panel.export_filename().is_some()
                && !state.result.trim().is_empty(),
        }
    }
}

fn mode_text(incremental: bool) -> &'static str {
    if incremental {
        "incremental mode"
    } else {
        "full mode"
    }
}

pub fn timer_label(timer: TimerState) -> Option<String> {
    match timer {
        TimerState::Idle => None,
        TimerState::Running { elapsed_ms, .. } => {
            Some(format!("elapsed {:.1}s", elapsed_ms as f64 / 1000.0))
        }
        TimerState::Finished { total_ms } => {
            Some(format!("total {:.1}s", total_ms as f64 / 1000.0))
        }
    }
}

pub fn progress_label(progress: ProgressView) -> String {
    match progress {
        ProgressView::Preparing => "preparing...".to_string(),
        ProgressView::Batches {
            current,
            total,
            percent,
        } => format!("batch {current}/{total} ({percent}%)"),
    }
}

pub fn eta_label(eta_seconds: u64) -> String {
    format!(
        "about {}m {}s remaining",
        eta_seconds / 60,
        eta_seconds % 60
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn eta_is_split_into_minutes_and_seconds() {
        assert_eq!(eta_label(0), "about 0m 0s remaining");
        assert_eq!(eta_label(125), "about 2m 5s remaining");
    }

    #[test]
    fn timer_labels_use_one_decimal() {
        assert_eq!(timer_label(TimerState::Idle), None);
        assert_eq!(
            timer_label(TimerState::Running {
                started_ms: 0,
                elapsed_ms: 1240
            })
            .as_deref(),
            Some("elapsed 1.2s")
        );
        assert_eq!(
            timer_label(TimerState::Finished { total_ms: 3400 }).as_deref(),
            Some("total 3.4s")
        );
    }
}
