//! Corpus loading and writing.
//!
//! The corpus is line-delimited JSON, one record per line:
//! `{"text": ..., "title"?: ..., "source"?: ..., "domain"?: ..., "id"?: ...}`.
//! Collector output (`pmid`, `abstract`) is accepted as well.
//!
//! Parsing is strict: the first malformed line aborts the load.

use crate::types::{Document, DEFAULT_DOMAIN, DEFAULT_SOURCE};
use medrag_core::{AppError, AppResult};
use serde::Deserialize;
use std::fs;
use std::io::Write;
use std::path::Path;

/// Raw corpus line before defaults are applied.
#[derive(Debug, Deserialize)]
struct RawRecord {
    #[serde(default, alias = "pmid")]
    id: Option<serde_json::Value>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default, alias = "abstract")]
    text: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    domain: Option<String>,
}

/// Load documents from a JSONL corpus file.
///
/// # Errors
/// * `NotFound` if the file does not exist
/// * `Input` if the file is not UTF-8 or a line is malformed
pub fn load_documents(path: &Path) -> AppResult<Vec<Document>> {
    if !path.exists() {
        return Err(AppError::NotFound(format!(
            "Corpus file does not exist: {:?}",
            path
        )));
    }

    let bytes = fs::read(path)?;
    let contents = String::from_utf8(bytes).map_err(|e| {
        AppError::Input(format!(
            "Corpus file {:?} is not valid UTF-8 (byte offset {})",
            path,
            e.utf8_error().valid_up_to()
        ))
    })?;

    let documents = parse_documents(&contents)?;

    tracing::info!(count = documents.len(), "Loaded corpus from {:?}", path);

    Ok(documents)
}

/// Parse JSONL text into documents.
pub fn parse_documents(contents: &str) -> AppResult<Vec<Document>> {
    let contents = contents.strip_prefix('\u{feff}').unwrap_or(contents);
    let mut documents = Vec::new();

    for (line_idx, line) in contents.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }

        let document = parse_line(line, line_idx + 1, documents.len())?;
        documents.push(document);
    }

    Ok(documents)
}

/// Parse one line; `ordinal` is the record's position among records.
fn parse_line(line: &str, line_no: usize, ordinal: usize) -> AppResult<Document> {
    let raw: RawRecord = serde_json::from_str(line)
        .map_err(|e| AppError::Input(format!("line {}: {}", line_no, e)))?;

    let text = raw
        .text
        .filter(|t| !t.trim().is_empty())
        .ok_or_else(|| {
            AppError::Input(format!("line {}: missing required field 'text'", line_no))
        })?;

    let id = match raw.id {
        None | Some(serde_json::Value::Null) => format!("id_{}", ordinal),
        Some(serde_json::Value::String(s)) if !s.trim().is_empty() => s.trim().to_string(),
        Some(serde_json::Value::Number(n)) => n.to_string(),
        Some(other) => {
            return Err(AppError::Input(format!(
                "line {}: field 'id' must be a string or number, got {}",
                line_no, other
            )))
        }
    };

    Ok(Document {
        id,
        title: raw.title.unwrap_or_default().trim().to_string(),
        text,
        source: non_blank(raw.source, DEFAULT_SOURCE),
        domain: non_blank(raw.domain, DEFAULT_DOMAIN),
    })
}

fn non_blank(value: Option<String>, default: &str) -> String {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

/// Write documents as JSONL, creating the parent directory.
///
/// Returns the number of records written.
pub fn save_jsonl(path: &Path, documents: &[Document]) -> AppResult<usize> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = std::io::BufWriter::new(fs::File::create(path)?);
    for document in documents {
        let line = serde_json::to_string(document)?;
        writeln!(file, "{}", line)?;
    }
    file.flush()?;

    tracing::info!(count = documents.len(), "Wrote corpus to {:?}", path);

    Ok(documents.len())
}
