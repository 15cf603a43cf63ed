//! Text shapes handed back to the agent. Everything here is a pure function
//! over already-fetched values.

use std::fmt::Write;

use super::extractor::ExtractionResult;
use super::resolver::ResolutionOutcome;
use super::types::FileRecord;
use super::DriveError;

pub const VALIDATION_MESSAGE: &str = "Error: Either 'file_id' or 'file_name' must be provided.";

const FILE_ID_HINT: &str = "Please use the 'file_id' parameter to read a specific file.";

const SEARCH_SEPARATOR: &str = "\n---\n";

/// Bytes as MiB with two decimals, e.g. `15.00 MB`.
pub fn format_size_mb(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / (1024.0 * 1024.0))
}

fn format_limit_mb(bytes: u64) -> String {
    let mb = bytes as f64 / (1024.0 * 1024.0);
    if mb.fract() == 0.0 {
        format!("{} MB", mb as u64)
    } else {
        format!("{:.2} MB", mb)
    }
}

pub fn render_search_results(query: &str, records: &[FileRecord]) -> String {
    if records.is_empty() {
        return format!("No files found matching query: {}", query);
    }
    records
        .iter()
        .map(search_entry)
        .collect::<Vec<_>>()
        .join(SEARCH_SEPARATOR)
}

fn search_entry(r: &FileRecord) -> String {
    let mut lines = vec![
        format!("ID: {}", r.id),
        format!("Name: {}", r.name),
        format!("Type: {}", r.mime_type),
    ];
    if let Some(link) = &r.web_view_link {
        lines.push(format!("Link: {}", link));
    }
    if let Some(created) = &r.created_time {
        lines.push(format!("Created: {}", created));
    }
    if let Some(modified) = &r.modified_time {
        lines.push(format!("Modified: {}", modified));
    }
    lines.join("\n")
}

pub fn render_resolution(name: &str, outcome: &ResolutionOutcome) -> String {
    match outcome {
        ResolutionOutcome::SingleExactMatch(record) => {
            let mut out = format!("Found 1 file with the exact name '{}':\n\n", name);
            candidate_list(&mut out, std::slice::from_ref(record), true);
            out.push('\n');
            out.push_str(FILE_ID_HINT);
            out
        }
        ResolutionOutcome::MultipleExactMatches(records) => {
            let mut out = format!(
                "Found {} files with the exact name '{}':\n\n",
                records.len(),
                name
            );
            candidate_list(&mut out, records, true);
            out.push('\n');
            out.push_str(FILE_ID_HINT);
            out
        }
        ResolutionOutcome::NoExactMatchSimilarFound(records) => {
            let mut out = format!(
                "No exact match found for '{}', but found {} similar file(s):\n\n",
                name,
                records.len()
            );
            candidate_list(&mut out, records, false);
            out.push('\n');
            out.push_str(FILE_ID_HINT);
            out
        }
        ResolutionOutcome::NoMatch => format!("No files found with the name '{}'.", name),
    }
}

fn candidate_list(out: &mut String, records: &[FileRecord], detailed: bool) {
    for (i, r) in records.iter().enumerate() {
        let _ = writeln!(out, "{}. Name: '{}'", i + 1, r.name);
        let _ = writeln!(out, "   File ID: {}", r.id);
        if detailed {
            let _ = writeln!(out, "   Type: {}", r.mime_type);
            if let Some(modified) = &r.modified_time {
                let _ = writeln!(out, "   Modified: {}", modified);
            }
        }
        if let Some(link) = &r.web_view_link {
            let _ = writeln!(out, "   Link: {}", link);
        }
    }
}

pub fn render_extraction(result: &ExtractionResult) -> String {
    match result {
        ExtractionResult::TextContent(text) => text.clone(),
        ExtractionResult::Unsupported { mime_type, record } => {
            let mut out = format!(
                "File '{}' has MIME type '{}', which is not supported for reading as text.\nFile ID: {}",
                record.name, mime_type, record.id
            );
            if let Some(link) = &record.web_view_link {
                let _ = write!(out, "\nView it at: {}", link);
            }
            out
        }
        ExtractionResult::TooLarge {
            record,
            actual_bytes,
            limit_bytes,
        } => {
            let size = match actual_bytes {
                Some(bytes) => format_size_mb(*bytes),
                None => format!("over {}", format_limit_mb(*limit_bytes)),
            };
            format!(
                "File '{}' (ID: {}) is too large to read ({}). Maximum file size is {}.",
                record.name,
                record.id,
                size,
                format_limit_mb(*limit_bytes)
            )
        }
        ExtractionResult::NotFound(id) => format!("Error: File with ID '{}' not found.", id),
    }
}

/// Generic failure text for transport, auth and provider errors. `subject`
/// names what was being worked on (a file id, a name, a query).
pub fn render_failure(operation: &str, subject: &str, err: &DriveError) -> String {
    match err {
        DriveError::Authentication(msg) => format!(
            "Error: Google Drive authentication failed while trying to {} {}: {}",
            operation, subject, msg
        ),
        DriveError::NotFound { id } => format!("Error: File with ID '{}' not found.", id),
        other => format!("Error: Failed to {} {}: {}", operation, subject, other),
    }
}
