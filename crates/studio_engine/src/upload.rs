//! Reading local files into the text buffers the tabs submit.
use std::fs;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use chardetng::EncodingDetector;
use encoding_rs::{Encoding, UTF_8};
use studio_logging::studio_debug;

use crate::format::sheet_csv_to_markdown;

#[derive(Debug, thiserror::Error)]
pub enum UploadError {
    #[error("could not read {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to decode bytes as {encoding}")]
    Decode { encoding: String },
    #[error("spreadsheet has no usable sheet")]
    EmptyWorkbook,
    #[error("could not read spreadsheet: {0}")]
    Spreadsheet(String),
}

/// Renders the first sheet of a workbook as CSV.
pub trait SpreadsheetReader: Send + Sync {
    fn first_sheet_csv(&self, bytes: &[u8]) -> Result<String, UploadError>;
}

/// Reads `.xlsx` and `.xls` workbooks with calamine.
#[derive(Debug, Default)]
pub struct WorkbookReader;

impl SpreadsheetReader for WorkbookReader {
    fn first_sheet_csv(&self, bytes: &[u8]) -> Result<String, UploadError> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
            .map_err(|err| UploadError::Spreadsheet(err.to_string()))?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or(UploadError::EmptyWorkbook)?
            .map_err(|err| UploadError::Spreadsheet(err.to_string()))?;

        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in range.rows() {
            writer
                .write_record(row.iter().map(cell_text))
                .map_err(|err| UploadError::Spreadsheet(err.to_string()))?;
        }
        let bytes = writer
            .into_inner()
            .map_err(|err| UploadError::Spreadsheet(err.to_string()))?;
        String::from_utf8(bytes).map_err(|_| UploadError::Decode {
            encoding: "UTF-8".to_string(),
        })
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedText {
    pub file_name: String,
    pub text: String,
}

/// Loads a file; `.xlsx`/`.xls` become a Markdown table, everything else is
/// decoded as text.
pub fn read_upload(
    path: &Path,
    spreadsheets: &dyn SpreadsheetReader,
) -> Result<UploadedText, UploadError> {
    let bytes = fs::read(path).map_err(|source| UploadError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let extension = path
        .extension()
        .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default();

    let text = if matches!(extension.as_str(), "xlsx" | "xls") {
        let csv = spreadsheets.first_sheet_csv(&bytes)?;
        let markdown = sheet_csv_to_markdown(&csv);
        if markdown.is_empty() {
            return Err(UploadError::EmptyWorkbook);
        }
        markdown
    } else {
        decode_text(&bytes)?
    };
    studio_debug!("Loaded {} ({} chars)", file_name, text.chars().count());
    Ok(UploadedText { file_name, text })
}

/// BOM first, then strict UTF-8, then a chardetng guess.
pub fn decode_text(bytes: &[u8]) -> Result<String, UploadError> {
    if let Some((encoding, bom_len)) = Encoding::for_bom(bytes) {
        return decode_with(&bytes[bom_len..], encoding);
    }
    if let Ok(text) = std::str::from_utf8(bytes) {
        return Ok(text.to_string());
    }
    let mut detector = EncodingDetector::new();
    detector.feed(bytes, true);
    decode_with(bytes, detector.guess(None, true))
}

fn decode_with(bytes: &[u8], encoding: &'static Encoding) -> Result<String, UploadError> {
    let (text, had_errors) = encoding.decode_without_bom_handling(bytes);
    if had_errors && encoding == UTF_8 {
        return Err(UploadError::Decode {
            encoding: encoding.name().to_string(),
        });
    }
    Ok(text.into_owned())
}
