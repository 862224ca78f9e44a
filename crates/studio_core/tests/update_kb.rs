use std::sync::Once;

use pretty_assertions::assert_eq;
use studio_core::{
    update, AppState, DocKind, DocumentPreview, DocumentSummary, Effect, IngestedDoc, JobOutput,
    JobProgress, Msg, Panel, PanelOutput, ProgressView, RequestConfig, ResultMeta, SearchHit,
    SEARCH_TOP_K,
};

fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(studio_logging::initialize_for_tests);
}

fn ingested(doc_id: &str) -> IngestedDoc {
    IngestedDoc {
        doc_id: doc_id.to_string(),
        name: "payments".to_string(),
        created_at: 1_700_000_000,
        sections: 12,
        total_images: 3,
    }
}

#[test]
fn ingest_requires_content() {
    init_logging();
    let (state, effects) = update(
        AppState::new(),
        Msg::IngestSubmitted {
            name: "doc".to_string(),
            content: "   ".to_string(),
            now_ms: 0,
        },
    );

    assert_eq!(
        effects,
        vec![Effect::ShowNotice(
            "Please paste the PRD text to ingest.".to_string()
        )]
    );
    assert!(!state.is_busy(Panel::KbIngest));
}

#[test]
fn finished_ingest_reloads_ingested_list() {
    init_logging();
    let (state, effects) = update(
        AppState::new(),
        Msg::IngestSubmitted {
            name: " payments ".to_string(),
            content: "# Payments\nbody".to_string(),
            now_ms: 0,
        },
    );
    assert_eq!(
        effects,
        vec![Effect::StartIngest {
            ticket: 1,
            name: "payments".to_string(),
            content: "# Payments\nbody".to_string(),
        }]
    );

    let (state, _) = update(
        state,
        Msg::JobProgress {
            ticket: 1,
            progress: Some(JobProgress {
                current: 2,
                total: 3,
            }),
            eta_seconds: Some(4),
        },
    );
    assert_eq!(
        state.view().panel(Panel::KbIngest).unwrap().progress,
        Some(ProgressView::Batches {
            current: 2,
            total: 3,
            percent: 67,
        })
    );

    let (state, effects) = update(
        state,
        Msg::JobDone {
            ticket: 1,
            result: Ok(JobOutput::new("Ingested payments (doc_id=kb-1)")),
            now_ms: 5,
        },
    );
    assert_eq!(effects, vec![Effect::LoadIngestedDocs]);

    let (state, _) = update(state, Msg::IngestedDocsLoaded(Ok(vec![ingested("kb-1")])));
    assert_eq!(state.view().ingested, vec![ingested("kb-1")]);
}

#[test]
fn finished_ingest_has_no_generation_meta_label() {
    let (state, _) = update(
        AppState::new(),
        Msg::IngestSubmitted {
            name: "payments".to_string(),
            content: "# Payments".to_string(),
            now_ms: 0,
        },
    );

    let (state, _) = update(
        state,
        Msg::JobDone {
            ticket: 1,
            result: Ok(JobOutput {
                text: "Ingested payments".to_string(),
                meta: Some(ResultMeta::default()),
            }),
            now_ms: 10,
        },
    );

    let view = state.view();
    let panel = view.panel(Panel::KbIngest).unwrap();
    assert_eq!(panel.output, PanelOutput::Result("Ingested payments".to_string()));
    assert_eq!(panel.meta_label, None);
    assert_eq!(panel.mode_label, None);
}

#[test]
fn failed_ingest_does_not_reload() {
    let (state, _) = update(
        AppState::new(),
        Msg::IngestSubmitted {
            name: String::new(),
            content: "text".to_string(),
            now_ms: 0,
        },
    );
    let (state, effects) = update(
        state,
        Msg::JobDone {
            ticket: 1,
            result: Err("job failed: parse error".to_string()),
            now_ms: 1,
        },
    );

    assert!(effects.is_empty());
    assert_eq!(
        state.view().panel(Panel::KbIngest).unwrap().output,
        PanelOutput::Error("Ingest failed: job failed: parse error".to_string())
    );
}

#[test]
fn kb_generate_needs_a_document() {
    let (_, effects) = update(
        AppState::new(),
        Msg::KbGenerateClicked {
            doc_id: String::new(),
            config: RequestConfig::default(),
            now_ms: 0,
        },
    );

    assert_eq!(
        effects,
        vec![Effect::ShowNotice(
            "Please choose a knowledge-base document.".to_string()
        )]
    );
}

#[test]
fn kb_generate_result_exports_under_its_own_name() {
    init_logging();
    let (state, effects) = update(
        AppState::new(),
        Msg::KbGenerateClicked {
            doc_id: "kb-1".to_string(),
            config: RequestConfig::default(),
            now_ms: 0,
        },
    );
    assert_eq!(
        effects,
        vec![Effect::GenerateFromKb {
            ticket: 1,
            doc_id: "kb-1".to_string(),
            config: RequestConfig::default(),
        }]
    );

    let (state, _) = update(
        state,
        Msg::JobDone {
            ticket: 1,
            result: Ok(JobOutput::new("a,b\n1,2\n3,4")),
            now_ms: 10,
        },
    );
    let (_, effects) = update(state, Msg::ExportClicked(Panel::KbGenerate));

    assert!(matches!(
        &effects[0],
        Effect::ExportCsv { filename, panel: Panel::KbGenerate, .. } if filename == "kb_test_cases.csv"
    ));
}

#[test]
fn ingest_panel_has_nothing_to_export() {
    let (_, effects) = update(AppState::new(), Msg::ExportClicked(Panel::KbIngest));

    assert_eq!(
        effects,
        vec![Effect::ShowNotice("This panel has nothing to export.".to_string())]
    );
}

#[test]
fn search_trims_query_and_blocks_overlap() {
    init_logging();
    let (state, effects) = update(
        AppState::new(),
        Msg::SearchSubmitted {
            query: "  refund flow ".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::SearchKb {
            query: "refund flow".to_string(),
            top_k: SEARCH_TOP_K,
        }]
    );
    assert!(state.view().search_busy);

    let (state, effects) = update(
        state,
        Msg::SearchSubmitted {
            query: "again".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::ShowNotice("A search is already running.".to_string())]
    );

    let hit = SearchHit {
        doc_id: "kb-1".to_string(),
        doc_name: Some("payments".to_string()),
        title: Some("Refunds".to_string()),
        text: "Refunds are issued within 7 days.".to_string(),
        similarity: 0.87,
    };
    let (state, effects) = update(state, Msg::SearchCompleted(Ok(vec![hit.clone()])));
    assert!(effects.is_empty());
    let view = state.view();
    assert!(!view.search_busy);
    assert_eq!(view.search_results, Some(vec![hit]));
}

#[test]
fn empty_search_and_failed_search_notify() {
    let (_, effects) = update(
        AppState::new(),
        Msg::SearchSubmitted {
            query: " ".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::ShowNotice("Please enter a search query.".to_string())]
    );

    let (state, _) = update(
        AppState::new(),
        Msg::SearchSubmitted {
            query: "q".to_string(),
        },
    );
    let (state, effects) = update(
        state,
        Msg::SearchCompleted(Err("request failed 503: unknown error".to_string())),
    );
    assert_eq!(
        effects,
        vec![Effect::ShowNotice(
            "Search failed: request failed 503: unknown error".to_string()
        )]
    );
    assert!(!state.view().search_busy);
}

#[test]
fn refresh_loads_both_listings() {
    let (_, effects) = update(AppState::new(), Msg::RefreshDocsRequested);

    assert_eq!(effects, vec![Effect::LoadDocuments, Effect::LoadIngestedDocs]);
}

#[test]
fn upload_accepts_only_text_formats() {
    init_logging();
    let (_, effects) = update(
        AppState::new(),
        Msg::UploadSubmitted {
            file_name: "slides.pdf".to_string(),
            content: "%PDF".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::ShowNotice(
            "Only .md / .csv / .txt files are supported.".to_string()
        )]
    );

    let (state, effects) = update(
        AppState::new(),
        Msg::UploadSubmitted {
            file_name: "Cases.CSV".to_string(),
            content: "a,b".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::UploadDocument {
            name: "Cases.CSV".to_string(),
            content: "a,b".to_string(),
        }]
    );

    let uploaded = DocumentSummary {
        id: "u-1".to_string(),
        name: "Cases.CSV".to_string(),
        kind: DocKind::TestCase,
        created_at: 5,
    };
    let (_, effects) = update(state, Msg::DocumentUploaded(Ok(uploaded)));
    assert_eq!(
        effects,
        vec![
            Effect::ShowNotice("Document uploaded and indexed: Cases.CSV".to_string()),
            Effect::LoadDocuments,
        ]
    );
}

#[test]
fn preview_is_loaded_for_listed_documents() {
    let doc = DocumentSummary {
        id: "p-1".to_string(),
        name: "prd.md".to_string(),
        kind: DocKind::Prd,
        created_at: 0,
    };
    let (state, _) = update(AppState::new(), Msg::DocumentsLoaded(Ok(vec![doc])));

    let (state, effects) = update(
        state,
        Msg::PreviewRequested {
            doc_id: "p-1".to_string(),
        },
    );
    assert_eq!(
        effects,
        vec![Effect::LoadPreview {
            doc_id: "p-1".to_string(),
            kind: DocKind::Prd,
        }]
    );

    let preview = DocumentPreview::from_content("prd.md", "# Title");
    let (state, _) = update(state, Msg::PreviewLoaded(Ok(preview.clone())));
    assert_eq!(state.view().preview, Some(preview));

    let (_, effects) = update(
        state,
        Msg::PreviewRequested {
            doc_id: "missing".to_string(),
        },
    );
    assert!(matches!(effects.as_slice(), [Effect::ShowNotice(_)]));
}

#[test]
fn library_errors_are_kept_until_next_success() {
    let (state, _) = update(
        AppState::new(),
        Msg::IngestedDocsLoaded(Err("network error".to_string())),
    );
    assert_eq!(state.view().library_error.as_deref(), Some("network error"));

    let (state, _) = update(state, Msg::IngestedDocsLoaded(Ok(Vec::new())));
    assert_eq!(state.view().library_error, None);
}
