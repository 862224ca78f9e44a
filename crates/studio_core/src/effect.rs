use crate::request::{EnhanceInput, GenerationInput, RequestConfig};
use crate::state::{DocKind, Panel, Ticket};

/// Number of hits requested by a knowledge-base search.
pub const SEARCH_TOP_K: u32 = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
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
    SearchKb {
        query: String,
        top_k: u32,
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
    ExportCsv {
        panel: Panel,
        content: String,
        filename: String,
    },
    /// Blocking notice the user has to acknowledge.
    ShowNotice(String),
}
