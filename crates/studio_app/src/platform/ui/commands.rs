//! Line-oriented command syntax of the shell.

use std::path::PathBuf;

use studio_core::{Panel, SelectionTarget};

pub const HELP: &str = "\
commands:
  config show | set <key> [value] | save | env
  load old|new|testcases <path>
  generate                     generate test cases from the loaded PRDs
  enhance                      enhance the loaded test cases
  ingest <path> [name]         ingest a PRD into the knowledge base
  kb-generate <doc_id>         generate test cases from an ingested document
  search <query>               search the knowledge base
  docs                         refresh the document lists
  upload <path>                store a .md/.csv/.txt file as a PRD
  preview <doc_id>             show the start of a stored document
  select old|new|testcases <doc_id>
  clear old|new|testcases
  export|show|html <panel>     panels: generate, enhance, kb-generate, kb-ingest
  help | quit";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    ConfigShow,
    ConfigSet { key: String, value: String },
    ConfigSave,
    ConfigEnv,
    Load { target: SelectionTarget, path: PathBuf },
    Generate,
    Enhance,
    Ingest { path: PathBuf, name: Option<String> },
    KbGenerate { doc_id: String },
    Search { query: String },
    Docs,
    Upload { path: PathBuf },
    Preview { doc_id: String },
    Select { target: SelectionTarget, doc_id: String },
    Clear(SelectionTarget),
    Export(Panel),
    Show(Panel),
    Html(Panel),
}

/// Parses one input line. Blank lines yield `Ok(None)`.
pub fn parse(line: &str) -> Result<Option<Command>, String> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }
    let (word, rest) = split_word(line);

    let command = match word {
        "help" | "?" => Command::Help,
        "quit" | "exit" => Command::Quit,
        "config" => parse_config(rest)?,
        "load" => {
            let (target, path) = split_word(rest);
            Command::Load {
                target: target.parse()?,
                path: required_path(path, "load")?,
            }
        }
        "generate" => Command::Generate,
        "enhance" => Command::Enhance,
        "ingest" => {
            let (path, name) = split_word(rest);
            Command::Ingest {
                path: required_path(path, "ingest")?,
                name: (!name.is_empty()).then(|| name.to_string()),
            }
        }
        "kb-generate" => Command::KbGenerate {
            doc_id: required(rest, "kb-generate <doc_id>")?,
        },
        "search" => Command::Search {
            query: rest.to_string(),
        },
        "docs" => Command::Docs,
        "upload" => Command::Upload {
            path: required_path(rest, "upload")?,
        },
        "preview" => Command::Preview {
            doc_id: required(rest, "preview <doc_id>")?,
        },
        "select" => {
            let (target, doc_id) = split_word(rest);
            Command::Select {
                target: target.parse()?,
                doc_id: required(doc_id, "select <target> <doc_id>")?,
            }
        }
        "clear" => Command::Clear(rest.parse()?),
        "export" => Command::Export(rest.parse()?),
        "show" => Command::Show(rest.parse()?),
        "html" => Command::Html(rest.parse()?),
        other => return Err(format!("unknown command: {other} (try `help`)")),
    };
    Ok(Some(command))
}

fn parse_config(rest: &str) -> Result<Command, String> {
    let (action, args) = split_word(rest);
    match action {
        "" | "show" => Ok(Command::ConfigShow),
        "save" => Ok(Command::ConfigSave),
        "env" => Ok(Command::ConfigEnv),
        "set" => {
            let (key, value) = split_word(args);
            Ok(Command::ConfigSet {
                key: required(key, "config set <key> [value]")?,
                value: value.to_string(),
            })
        }
        other => Err(format!("unknown config action: {other}")),
    }
}

fn split_word(text: &str) -> (&str, &str) {
    let text = text.trim();
    match text.split_once(char::is_whitespace) {
        Some((word, rest)) => (word, rest.trim()),
        None => (text, ""),
    }
}

fn required(value: &str, usage: &str) -> Result<String, String> {
    if value.is_empty() {
        Err(format!("usage: {usage}"))
    } else {
        Ok(value.to_string())
    }
}

fn required_path(value: &str, command: &str) -> Result<PathBuf, String> {
    if value.is_empty() {
        Err(format!("{command}: a file path is required"))
    } else {
        Ok(PathBuf::from(value))
    }
}
