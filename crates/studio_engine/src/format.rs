//! Result formatting shared by every tab: CSV or Markdown in, HTML table or
//! CSV export out.
use pulldown_cmark::{html, Options, Parser};
use scraper::{Html, Selector};

/// Shown when there is nothing to render.
pub const PLACEHOLDER_HTML: &str = "<p class=\"placeholder\">Nothing to display yet.</p>";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultFormat {
    Csv,
    Markdown,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FormatError {
    #[error("no table found in the result")]
    NoTable,
}

/// CSV needs a comma, at least two non-empty lines, and neither pipes nor tabs.
pub fn classify(text: &str) -> ResultFormat {
    let filled_lines = text.lines().filter(|line| !line.trim().is_empty()).count();
    if text.contains(',') && !text.contains('|') && !text.contains('\t') && filled_lines >= 2 {
        ResultFormat::Csv
    } else {
        ResultFormat::Markdown
    }
}

/// Quote-aware CSV parse. Blank lines are skipped; ragged rows are kept as is.
pub fn parse_csv(text: &str) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    reader
        .records()
        .map_while(Result::ok)
        .map(|record| record.iter().map(str::to_string).collect())
        .collect()
}

/// First CSV row becomes the header; cell text is HTML-escaped.
pub fn csv_to_table(text: &str) -> String {
    let rows = parse_csv(text);
    let Some((header, body)) = rows.split_first() else {
        return PLACEHOLDER_HTML.to_string();
    };

    let mut out = String::from("<table><thead><tr>");
    for cell in header {
        out.push_str("<th>");
        out.push_str(&escape_html(cell));
        out.push_str("</th>");
    }
    out.push_str("</tr></thead><tbody>");
    for row in body {
        out.push_str("<tr>");
        for cell in row {
            out.push_str("<td>");
            out.push_str(&escape_html(cell));
            out.push_str("</td>");
        }
        out.push_str("</tr>");
    }
    out.push_str("</tbody></table>");
    out
}

pub fn markdown_to_html(text: &str) -> String {
    let parser = Parser::new_ext(text, Options::ENABLE_TABLES);
    let mut out = String::with_capacity(text.len() * 3 / 2);
    html::push_html(&mut out, parser);
    out
}

pub fn render(text: &str) -> String {
    if text.trim().is_empty() {
        return PLACEHOLDER_HTML.to_string();
    }
    match classify(text) {
        ResultFormat::Csv => csv_to_table(text),
        ResultFormat::Markdown => markdown_to_html(text),
    }
}

/// Serializes the first `<table>` in `html`, every cell quoted, rows joined by CRLF.
pub fn table_to_csv(html: &str) -> Result<String, FormatError> {
    let document = Html::parse_fragment(html);
    let (Some(table_sel), Some(row_sel), Some(cell_sel)) = (
        Selector::parse("table").ok(),
        Selector::parse("tr").ok(),
        Selector::parse("th, td").ok(),
    ) else {
        return Err(FormatError::NoTable);
    };

    let table = document
        .select(&table_sel)
        .next()
        .ok_or(FormatError::NoTable)?;
    let lines: Vec<String> = table
        .select(&row_sel)
        .map(|row| {
            row.select(&cell_sel)
                .map(|cell| quote_cell(cell.text().collect::<String>().trim()))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect();
    Ok(lines.join("\r\n"))
}

/// CSV results are exported verbatim; Markdown goes through its first table.
pub fn export_csv(text: &str) -> Result<String, FormatError> {
    match classify(text) {
        ResultFormat::Csv => Ok(text.to_string()),
        ResultFormat::Markdown => table_to_csv(&markdown_to_html(text)),
    }
}

/// Turns a spreadsheet's first sheet, already rendered as CSV, into a Markdown table.
pub fn sheet_csv_to_markdown(csv_text: &str) -> String {
    let rows: Vec<Vec<String>> = parse_csv(csv_text)
        .into_iter()
        .filter(|row| row.iter().any(|cell| !cell.trim().is_empty()))
        .collect();
    let Some((header, body)) = rows.split_first() else {
        return String::new();
    };

    let mut out = markdown_row(header);
    out.push_str(&markdown_row(&vec!["---".to_string(); header.len()]));
    for row in body {
        out.push_str(&markdown_row(row));
    }
    out
}

fn markdown_row(cells: &[String]) -> String {
    let cells: Vec<String> = cells
        .iter()
        .map(|cell| cell.replace('|', "\\|").replace('\n', " "))
        .collect();
    format!("| {} |\n", cells.join(" | "))
}

fn quote_cell(text: &str) -> String {
    format!("\"{}\"", text.replace('"', "\"\""))
}

pub fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
