use crate::effect::SEARCH_TOP_K;
use crate::request::{EnhanceInput, GenerationInput};
use crate::{AppState, Effect, Msg, Panel, SelectionTarget};

/// Extensions accepted for knowledge-base uploads.
pub const UPLOAD_EXTENSIONS: [&str; 3] = ["md", "csv", "txt"];

/// Pure update function: applies a message to state and returns any effects.
pub fn update(mut state: AppState, msg: Msg) -> (AppState, Vec<Effect>) {
    let effects = match msg {
        Msg::OldPrdLoaded(text) => {
            state.inputs.old_prd = text;
            state.selection.old_prd = None;
            state.mark_dirty();
            Vec::new()
        }
        Msg::NewPrdLoaded(text) => {
            state.inputs.new_prd = text;
            state.selection.new_prd = None;
            state.mark_dirty();
            Vec::new()
        }
        Msg::TestCasesLoaded(text) => {
            state.inputs.test_cases = text;
            state.selection.test_cases = None;
            state.mark_dirty();
            Vec::new()
        }
        Msg::GenerateSubmitted { config, now_ms } => {
            if let Some(notice) = busy_notice(&state, Panel::Generate) {
                return (state, vec![notice]);
            }
            let (old_prd, new_prd) = state.generation_sources();
            let Some(new_prd) = new_prd else {
                return (state, vec![notice("Please upload the new PRD file.")]);
            };
            let input = GenerationInput {
                old_prd,
                new_prd,
                config,
            };
            let ticket = state.begin_job(Panel::Generate, now_ms);
            state.set_incremental(Panel::Generate, input.is_incremental());
            vec![Effect::StartGeneration { ticket, input }]
        }
        Msg::EnhanceSubmitted { config, now_ms } => {
            if let Some(notice) = busy_notice(&state, Panel::Enhance) {
                return (state, vec![notice]);
            }
            let Some(test_cases) = state.test_case_source() else {
                return (state, vec![notice("Please upload a test case file.")]);
            };
            let ticket = state.begin_job(Panel::Enhance, now_ms);
            vec![Effect::StartEnhancement {
                ticket,
                input: EnhanceInput { test_cases, config },
            }]
        }
        Msg::IngestSubmitted {
            name,
            content,
            now_ms,
        } => {
            if let Some(notice) = busy_notice(&state, Panel::KbIngest) {
                return (state, vec![notice]);
            }
            let content = content.trim().to_string();
            if content.is_empty() {
                return (state, vec![notice("Please paste the PRD text to ingest.")]);
            }
            let ticket = state.begin_job(Panel::KbIngest, now_ms);
            vec![Effect::StartIngest {
                ticket,
                name: name.trim().to_string(),
                content,
            }]
        }
        Msg::KbGenerateClicked {
            doc_id,
            config,
            now_ms,
        } => {
            if let Some(notice) = busy_notice(&state, Panel::KbGenerate) {
                return (state, vec![notice]);
            }
            if doc_id.trim().is_empty() {
                return (state, vec![notice("Please choose a knowledge-base document.")]);
            }
            let ticket = state.begin_job(Panel::KbGenerate, now_ms);
            vec![Effect::GenerateFromKb {
                ticket,
                doc_id,
                config,
            }]
        }
        Msg::SearchSubmitted { query } => {
            let query = query.trim().to_string();
            if query.is_empty() {
                return (state, vec![notice("Please enter a search query.")]);
            }
            if state.search_busy {
                return (state, vec![notice("A search is already running.")]);
            }
            state.search_busy = true;
            state.mark_dirty();
            vec![Effect::SearchKb {
                query,
                top_k: SEARCH_TOP_K,
            }]
        }
        Msg::RefreshDocsRequested => vec![Effect::LoadDocuments, Effect::LoadIngestedDocs],
        Msg::UploadSubmitted { file_name, content } => {
            let extension = file_name
                .rsplit_once('.')
                .map(|(_, ext)| ext.to_ascii_lowercase())
                .unwrap_or_default();
            if !UPLOAD_EXTENSIONS.contains(&extension.as_str()) {
                return (state, vec![notice("Only .md / .csv / .txt files are supported.")]);
            }
            vec![Effect::UploadDocument {
                name: file_name,
                content,
            }]
        }
        Msg::PreviewRequested { doc_id } => {
            match state.documents.iter().find(|doc| doc.id == doc_id) {
                Some(doc) => vec![Effect::LoadPreview {
                    doc_id,
                    kind: doc.kind,
                }],
                None => vec![notice("Unknown document; refresh the list and try again.")],
            }
        }
        Msg::DocumentSelected { target, doc_id } => {
            let Some(doc) = state.documents.iter().find(|doc| doc.id == doc_id).cloned() else {
                return (state, vec![notice("Unknown document; refresh the list and try again.")]);
            };
            if !target.accepts(doc.kind) {
                return (
                    state,
                    vec![notice("That document type cannot be used here.")],
                );
            }
            let name = doc.name.clone();
            *state.selection.slot(target) = Some(doc);
            state.mark_dirty();
            vec![notice(&format!("Selected document: {name}"))]
        }
        Msg::SelectionCleared(target) => {
            if state.selection.slot(target).take().is_some() {
                state.mark_dirty();
            }
            Vec::new()
        }
        Msg::ExportClicked(panel) => {
            let Some(filename) = panel.export_filename() else {
                return (state, vec![notice("This panel has nothing to export.")]);
            };
            let content = state.result(panel);
            if content.trim().is_empty() {
                return (state, vec![notice(empty_export_notice(panel))]);
            }
            vec![Effect::ExportCsv {
                panel,
                content: content.to_string(),
                filename: filename.to_string(),
            }]
        }
        Msg::Tick { now_ms } => {
            state.tick(now_ms);
            Vec::new()
        }
        Msg::JobProgress {
            ticket,
            progress,
            eta_seconds,
        } => {
            if let Some(panel) = state.panel_for_ticket(ticket) {
                state.apply_progress(panel, progress, eta_seconds);
            }
            Vec::new()
        }
        Msg::JobDone {
            ticket,
            result,
            now_ms,
        } => {
            let Some(panel) = state.panel_for_ticket(ticket) else {
                return (state, Vec::new());
            };
            let succeeded = result.is_ok();
            state.apply_done(panel, result, now_ms);
            if panel == Panel::KbIngest && succeeded {
                vec![Effect::LoadIngestedDocs]
            } else {
                Vec::new()
            }
        }
        Msg::DocumentsLoaded(result) => {
            match result {
                Ok(documents) => {
                    state.documents = documents;
                    state.library_error = None;
                    drop_stale_selections(&mut state);
                }
                Err(message) => state.library_error = Some(message),
            }
            state.mark_dirty();
            Vec::new()
        }
        Msg::IngestedDocsLoaded(result) => {
            match result {
                Ok(docs) => {
                    state.ingested = docs;
                    state.library_error = None;
                }
                Err(message) => state.library_error = Some(message),
            }
            state.mark_dirty();
            Vec::new()
        }
        Msg::SearchCompleted(result) => {
            state.search_busy = false;
            state.mark_dirty();
            match result {
                Ok(hits) => {
                    state.search_results = Some(hits);
                    Vec::new()
                }
                Err(message) => vec![notice(&format!("Search failed: {message}"))],
            }
        }
        Msg::DocumentUploaded(result) => match result {
            Ok(doc) => vec![
                notice(&format!("Document uploaded and indexed: {}", doc.name)),
                Effect::LoadDocuments,
            ],
            Err(message) => vec![notice(&format!("Upload failed: {message}"))],
        },
        Msg::PreviewLoaded(result) => match result {
            Ok(preview) => {
                state.preview = Some(preview);
                state.mark_dirty();
                Vec::new()
            }
            Err(message) => vec![notice(&format!("Preview failed: {message}"))],
        },
        Msg::ExportFinished(result) => match result {
            Ok(path) => {
                state.last_export = Some(path);
                state.mark_dirty();
                Vec::new()
            }
            Err(message) => vec![notice(&message)],
        },
    };

    (state, effects)
}

fn notice(message: &str) -> Effect {
    Effect::ShowNotice(message.to_string())
}

fn busy_notice(state: &AppState, panel: Panel) -> Option<Effect> {
    state
        .is_busy(panel)
        .then(|| notice("A job is already running here; wait for it to finish."))
}

fn empty_export_notice(panel: Panel) -> &'static str {
    match panel {
        Panel::Enhance => "Enhance some test cases first.",
        _ => "Generate some test cases first.",
    }
}

/// Selections pointing at documents no longer listed fall back to inline content.
fn drop_stale_selections(state: &mut AppState) {
    for target in [
        SelectionTarget::OldPrd,
        SelectionTarget::NewPrd,
        SelectionTarget::TestCases,
    ] {
        let listed = state
            .selection
            .slot(target)
            .as_ref()
            .map(|selected| state.documents.iter().any(|doc| doc.id == selected.id));
        if listed == Some(false) {
            *state.selection.slot(target) = None;
        }
    }
}
