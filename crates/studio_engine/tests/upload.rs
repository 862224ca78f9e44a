use std::fs;
use std::path::PathBuf;

use pretty_assertions::assert_eq;
use studio_engine::{read_upload, SpreadsheetReader, UploadError, WorkbookReader};
use tempfile::TempDir;

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn first_worksheet_becomes_a_markdown_table() {
    studio_logging::initialize_for_tests();

    let upload = read_upload(&fixture("cases.xlsx"), &WorkbookReader).unwrap();

    assert_eq!(upload.file_name, "cases.xlsx");
    assert_eq!(
        upload.text,
        "| ID | Title | Steps |\n\
         | --- | --- | --- |\n\
         | 1 | Login, then logout | open \\| close |\n\
         | 2 | Refund |  |\n"
    );
}

#[test]
fn workbook_rows_are_written_as_quoted_csv() {
    let bytes = fs::read(fixture("cases.xlsx")).unwrap();

    let csv = WorkbookReader.first_sheet_csv(&bytes).unwrap();

    assert_eq!(
        csv,
        "ID,Title,Steps\n1,\"Login, then logout\",open | close\n2,Refund,\n"
    );
}

#[test]
fn corrupt_workbook_is_reported() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.xlsx");
    fs::write(&path, b"not a workbook").unwrap();

    let err = read_upload(&path, &WorkbookReader).unwrap_err();

    assert!(matches!(err, UploadError::Spreadsheet(_)));
}

#[test]
fn text_files_bypass_the_workbook_reader() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("prd.md");
    fs::write(&path, "# Checkout\nPay with card.").unwrap();

    let upload = read_upload(&path, &WorkbookReader).unwrap();

    assert_eq!(upload.text, "# Checkout\nPay with card.");
}
