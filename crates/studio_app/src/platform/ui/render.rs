use std::collections::BTreeMap;

use chrono::DateTime;
use studio_core::{
    AppViewModel, DocumentPreview, DocumentSummary, IngestedDoc, PanelOutput, PanelView, SearchHit,
};

const SNIPPET_CHARS: usize = 120;

/// Prints only the parts of the view that changed since the last render.
/// Timer labels alone never trigger output.
#[derive(Default)]
pub struct Renderer {
    shown: BTreeMap<String, Vec<String>>,
}

impl Renderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn render(&mut self, view: &AppViewModel) -> Vec<String> {
        let mut out = Vec::new();
        for (name, key_lines, lines) in sections(view) {
            let previous = self.shown.get(&name);
            if previous == Some(&key_lines) || (previous.is_none() && key_lines.is_empty()) {
                continue;
            }
            out.extend(lines);
            self.shown.insert(name, key_lines);
        }
        out
    }
}

type Section = (String, Vec<String>, Vec<String>);

fn sections(view: &AppViewModel) -> Vec<Section> {
    let mut sections: Vec<Section> = view
        .panels
        .iter()
        .map(|panel| {
            (
                panel.panel.label().to_string(),
                panel_lines(panel, false),
                panel_lines(panel, true),
            )
        })
        .collect();

    let mut plain = |name: &str, lines: Vec<String>| {
        sections.push((name.to_string(), lines.clone(), lines));
    };
    plain("selection", selection_lines(view));
    plain("library", library_lines(&view.documents, &view.ingested));
    plain(
        "library_error",
        view.library_error
            .iter()
            .map(|err| format!("! document library unavailable: {err}"))
            .collect(),
    );
    plain("search", search_lines(view.search_busy, view.search_results.as_deref()));
    plain("preview", view.preview.iter().flat_map(preview_lines).collect());
    plain(
        "export",
        view.last_export
            .iter()
            .map(|path| format!("exported to {path}"))
            .collect(),
    );
    sections
}

pub fn panel_lines(view: &PanelView, with_timer: bool) -> Vec<String> {
    let label = view.panel.label();
    let timer = view.timer_label.as_ref().filter(|_| with_timer);

    let mut head = match &view.output {
        PanelOutput::Empty => return Vec::new(),
        PanelOutput::Pending(message) => format!("[{label}] {message}"),
        PanelOutput::Error(message) => format!("[{label}] {message}"),
        PanelOutput::Result(text) => {
            format!("[{label}] done, {} lines", text.lines().count())
        }
    };
    for part in [&view.progress_label, &view.eta_label]
        .into_iter()
        .flatten()
        .chain(timer)
    {
        head.push_str(" | ");
        head.push_str(part);
    }

    let mut lines = vec![head];
    lines.extend(view.mode_label.iter().map(|mode| format!("  {mode}")));
    lines.extend(view.meta_label.iter().map(|meta| format!("  {meta}")));
    if matches!(view.output, PanelOutput::Result(_)) {
        let mut hint = format!("  `show {label}` prints the result");
        if view.export_available {
            hint.push_str(&format!(", `export {label}` saves it as CSV"));
        }
        lines.push(hint);
    }
    lines
}

fn selection_lines(view: &AppViewModel) -> Vec<String> {
    let selection = &view.selection;
    [
        ("old PRD", &selection.old_prd),
        ("new PRD", &selection.new_prd),
        ("test cases", &selection.test_cases),
    ]
    .into_iter()
    .filter_map(|(slot, name)| name.as_ref().map(|name| format!("using stored {slot}: {name}")))
    .collect()
}

fn library_lines(documents: &[DocumentSummary], ingested: &[IngestedDoc]) -> Vec<String> {
    let mut lines = Vec::new();
    if !documents.is_empty() {
        lines.push(format!("stored documents ({}):", documents.len()));
        lines.extend(documents.iter().map(|doc| {
            format!(
                "  {:<12} {:<10} {}  {}",
                doc.id,
                doc.kind.label(),
                format_timestamp(doc.created_at),
                doc.name
            )
        }));
    }
    if !ingested.is_empty() {
        lines.push(format!("knowledge base ({}):", ingested.len()));
        lines.extend(ingested.iter().map(|doc| {
            format!(
                "  {:<12} {}  {} ({} sections, {} images)",
                doc.doc_id,
                format_timestamp(doc.created_at),
                doc.name,
                doc.sections,
                doc.total_images
            )
        }));
    }
    lines
}

fn search_lines(busy: bool, results: Option<&[SearchHit]>) -> Vec<String> {
    if busy {
        return vec!["searching...".to_string()];
    }
    let Some(hits) = results else {
        return Vec::new();
    };
    if hits.is_empty() {
        return vec!["search: no matches".to_string()];
    }
    let mut lines = vec![format!("search: {} matches", hits.len())];
    lines.extend(hits.iter().map(|hit| {
        let source = hit.doc_name.as_deref().unwrap_or(&hit.doc_id);
        let title = hit.title.as_deref().map(|t| format!(" / {t}")).unwrap_or_default();
        format!(
            "  {:.3}  {source}{title}: {}",
            hit.similarity,
            snippet(&hit.text)
        )
    }));
    lines
}

fn preview_lines(preview: &DocumentPreview) -> Vec<String> {
    let mut lines = vec![format!("preview of {}:", preview.name)];
    lines.extend(preview.excerpt.lines().map(|line| format!("  {line}")));
    lines
}

fn snippet(text: &str) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SNIPPET_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(SNIPPET_CHARS).collect();
    format!("{cut}...")
}

/// Backend timestamps are Unix seconds, shown in UTC.
pub fn format_timestamp(seconds: i64) -> String {
    match DateTime::from_timestamp(seconds, 0) {
        Some(time) if seconds > 0 => time.format("%Y-%m-%d %H:%M").to_string(),
        _ => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use studio_core::{DocKind, Panel, ProgressView};

    fn running_panel(timer: &str, progress: Option<&str>) -> PanelView {
        PanelView {
            panel: Panel::Generate,
            busy: true,
            output: PanelOutput::Pending("Analyzing the PRD, please wait...".to_string()),
            progress: progress.map(|_| ProgressView::Preparing),
            timer_label: Some(timer.to_string()),
            progress_label: progress.map(str::to_string),
            eta_label: None,
            mode_label: None,
            meta_label: None,
            export_available: false,
        }
    }

    fn view_with(panel: PanelView) -> AppViewModel {
        AppViewModel {
            panels: vec![panel],
            ..AppViewModel::default()
        }
    }

    #[test]
    fn empty_view_prints_nothing() {
        let mut renderer = Renderer::new();
        assert!(renderer.render(&AppViewModel::default()).is_empty());
    }

    #[test]
    fn timer_ticks_alone_are_not_reprinted() {
        let mut renderer = Renderer::new();

        let first = renderer.render(&view_with(running_panel("elapsed 0.2s", None)));
        let second = renderer.render(&view_with(running_panel("elapsed 0.4s", None)));
        let third = renderer.render(&view_with(running_panel(
            "elapsed 0.6s",
            Some("batch 1/4 (25%)"),
        )));

        assert_eq!(
            first,
            vec!["[generate] Analyzing the PRD, please wait... | elapsed 0.2s".to_string()]
        );
        assert!(second.is_empty());
        assert_eq!(
            third,
            vec![
                "[generate] Analyzing the PRD, please wait... | batch 1/4 (25%) | elapsed 0.6s"
                    .to_string()
            ]
        );
    }

    #[test]
    fn finished_panel_shows_labels_and_hints() {
        let panel = PanelView {
            panel: Panel::Generate,
            busy: false,
            output: PanelOutput::Result("a,b\n1,2".to_string()),
            progress: None,
            timer_label: Some("total 3.0s".to_string()),
            progress_label: None,
            eta_label: None,
            mode_label: Some("full mode | text model enabled".to_string()),
            meta_label: Some("mode=full, model=gpt, vision=off".to_string()),
            export_available: true,
        };

        assert_eq!(
            panel_lines(&panel, true),
            vec![
                "[generate] done, 2 lines | total 3.0s".to_string(),
                "  full mode | text model enabled".to_string(),
                "  mode=full, model=gpt, vision=off".to_string(),
                "  `show generate` prints the result, `export generate` saves it as CSV"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn library_lists_both_kinds_with_dates() {
        let view = AppViewModel {
            documents: vec![DocumentSummary {
                id: "p1".to_string(),
                name: "checkout.md".to_string(),
                kind: DocKind::Prd,
                created_at: 1_700_000_000,
            }],
            ..AppViewModel::default()
        };
        let mut renderer = Renderer::new();

        let lines = renderer.render(&view);

        assert_eq!(lines[0], "stored documents (1):");
        assert!(lines[1].contains("2023-11-14 22:13"));
        assert!(lines[1].ends_with("checkout.md"));
        assert!(renderer.render(&view).is_empty());
    }

    #[test]
    fn search_results_are_summarised() {
        let hits = vec![SearchHit {
            doc_id: "kb-1".to_string(),
            doc_name: Some("Payments".to_string()),
            title: Some("Refunds".to_string()),
            text: "Refunds are\nissued within 7 days.".to_string(),
            similarity: 0.91234,
        }];

        assert_eq!(
            search_lines(false, Some(hits.as_slice())),
            vec![
                "search: 1 matches".to_string(),
                "  0.912  Payments / Refunds: Refunds are issued within 7 days.".to_string(),
            ]
        );
        assert_eq!(
            search_lines(false, Some(&[][..])),
            vec!["search: no matches".to_string()]
        );
        assert_eq!(search_lines(true, None), vec!["searching...".to_string()]);
    }

    #[test]
    fn unknown_timestamps_render_as_dash() {
        assert_eq!(format_timestamp(0), "-");
        assert_eq!(format_timestamp(86_400), "1970-01-02 00:00");
    }
}
