use std::cmp::Ordering;
use std::sync::Arc;
use tracing::debug;

use super::client::DriveApi;
use super::types::FileRecord;
use super::{DriveError, MAX_PAGE_SIZE};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    SingleExactMatch(FileRecord),
    MultipleExactMatches(Vec<FileRecord>),
    NoExactMatchSimilarFound(Vec<FileRecord>),
    NoMatch,
}

/// Maps a human file name onto Drive files with an exact query followed,
/// only when that finds nothing, by a `contains` query.
#[derive(Clone)]
pub struct FileResolver {
    api: Arc<dyn DriveApi>,
    similar_limit: usize,
}

impl FileResolver {
    pub fn new(api: Arc<dyn DriveApi>, similar_limit: usize) -> Self {
        Self {
            api,
            similar_limit: similar_limit.max(1),
        }
    }

    pub async fn resolve(&self, name: &str) -> Result<ResolutionOutcome, DriveError> {
        let mut exact = self
            .api
            .search_files(&exact_name_query(name), MAX_PAGE_SIZE)
            .await?;
        debug!(name, matches = exact.len(), "exact-name lookup");

        match exact.len() {
            1 => return Ok(ResolutionOutcome::SingleExactMatch(exact.remove(0))),
            n if n > 1 => {
                exact.sort_by(newest_first);
                return Ok(ResolutionOutcome::MultipleExactMatches(exact));
            }
            _ => {}
        }

        let mut similar = self
            .api
            .search_files(&similar_name_query(name), self.similar_limit as u32)
            .await?;
        similar.truncate(self.similar_limit);
        debug!(name, matches = similar.len(), "similar-name lookup");

        if similar.is_empty() {
            Ok(ResolutionOutcome::NoMatch)
        } else {
            Ok(ResolutionOutcome::NoExactMatchSimilarFound(similar))
        }
    }
}

/// Escape a literal for a Drive `q` string: backslash and single quote.
pub fn escape_query_literal(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        if c == '\\' || c == '\'' {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub fn exact_name_query(name: &str) -> String {
    format!(
        "name = '{}' and trashed = false",
        escape_query_literal(name)
    )
}

pub fn similar_name_query(name: &str) -> String {
    format!(
        "name contains '{}' and trashed = false",
        escape_query_literal(similar_term(name))
    )
}

/// The name without its extension, so `report.txt` also finds `report_v2.md`.
fn similar_term(name: &str) -> &str {
    let trimmed = name.trim();
    match trimmed.rfind('.') {
        Some(idx) if idx > 0 => &trimmed[..idx],
        _ => trimmed,
    }
}

// RFC 3339 timestamps in UTC sort lexically; missing ones go last.
fn newest_first(a: &FileRecord, b: &FileRecord) -> Ordering {
    match (&a.modified_time, &b.modified_time) {
        (Some(x), Some(y)) => y.cmp(x),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rec(id: &str, modified: Option<&str>) -> FileRecord {
        FileRecord {
            id: id.into(),
            name: "test.txt".into(),
            mime_type: "text/plain".into(),
            size_bytes: Some(1),
            web_view_link: None,
            created_time: None,
            modified_time: modified.map(str::to_string),
        }
    }

    #[test]
    fn queries_escape_quotes() {
        assert_eq!(
            exact_name_query("Bob's notes.txt"),
            r"name = 'Bob\'s notes.txt' and trashed = false"
        );
        assert_eq!(
            similar_name_query(r"C:\tmp.log"),
            r"name contains 'C:\\tmp' and trashed = false"
        );
    }

    #[test]
    fn similar_term_strips_extension_only() {
        assert_eq!(similar_term("test.txt"), "test");
        assert_eq!(similar_term("archive.tar.gz"), "archive.tar");
        assert_eq!(similar_term(".env"), ".env");
        assert_eq!(similar_term("README"), "README");
    }

    #[test]
    fn newest_first_puts_undated_last() {
        let mut v = vec![
            rec("old", Some("2024-01-01T00:00:00Z")),
            rec("none", None),
            rec("new", Some("2024-03-01T00:00:00Z")),
        ];
        v.sort_by(newest_first);
        let ids: Vec<_> = v.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["new", "old", "none"]);
    }
}
