use std::sync::Arc;
use tracing::{debug, info};

use super::client::DriveApi;
use super::types::FileRecord;
use super::{DriveError, MAX_FILE_BYTES};

/// How the bytes of a file are obtained, if at all.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentPolicy {
    /// `alt=media` download, decoded as UTF-8.
    Download,
    /// Server-side conversion to the given MIME type.
    Export { target_mime: &'static str },
    Unsupported,
}

#[derive(Debug, Clone, Copy)]
enum MimePattern {
    Exact(&'static str),
    Prefix(&'static str),
}

impl MimePattern {
    fn matches(self, mime: &str) -> bool {
        match self {
            MimePattern::Exact(m) => mime == m,
            MimePattern::Prefix(p) => mime.starts_with(p),
        }
    }
}

/// First matching row wins; anything unmatched is unsupported.
const POLICY_TABLE: &[(MimePattern, ContentPolicy)] = &[
    (MimePattern::Prefix("text/"), ContentPolicy::Download),
    (MimePattern::Exact("application/json"), ContentPolicy::Download),
    (MimePattern::Exact("application/xml"), ContentPolicy::Download),
    (MimePattern::Exact("application/javascript"), ContentPolicy::Download),
    (MimePattern::Exact("application/x-yaml"), ContentPolicy::Download),
    (MimePattern::Exact("application/yaml"), ContentPolicy::Download),
    (MimePattern::Exact("application/x-sh"), ContentPolicy::Download),
    (MimePattern::Exact("application/sql"), ContentPolicy::Download),
    (MimePattern::Exact("application/toml"), ContentPolicy::Download),
    (MimePattern::Exact("application/x-httpd-php"), ContentPolicy::Download),
    (
        MimePattern::Exact("application/vnd.google-apps.document"),
        ContentPolicy::Export {
            target_mime: "text/plain",
        },
    ),
    (
        MimePattern::Prefix("application/vnd.google-apps."),
        ContentPolicy::Unsupported,
    ),
];

impl ContentPolicy {
    pub fn for_mime(mime: &str) -> ContentPolicy {
        let mime = mime.trim().to_ascii_lowercase();
        // Ignore parameters such as "; charset=utf-8"
        let essence = mime.split(';').next().unwrap_or("").trim();
        POLICY_TABLE
            .iter()
            .find(|(pattern, _)| pattern.matches(essence))
            .map(|(_, policy)| *policy)
            .unwrap_or(ContentPolicy::Unsupported)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractionResult {
    TextContent(String),
    Unsupported {
        mime_type: String,
        record: FileRecord,
    },
    /// `actual_bytes` is unknown when a transfer was abandoned midway.
    TooLarge {
        record: FileRecord,
        actual_bytes: Option<u64>,
        limit_bytes: u64,
    },
    NotFound(String),
}

/// Picks a [`ContentPolicy`] for a file and carries it out.
#[derive(Clone)]
pub struct ContentExtractor {
    api: Arc<dyn DriveApi>,
    max_bytes: u64,
}

impl ContentExtractor {
    pub fn new(api: Arc<dyn DriveApi>) -> Self {
        Self {
            api,
            max_bytes: MAX_FILE_BYTES,
        }
    }

    /// Fetch metadata for `file_id`, then extract. A missing file is a
    /// result, not an error.
    pub async fn read_by_id(&self, file_id: &str) -> Result<ExtractionResult, DriveError> {
        match self.api.get_metadata(file_id).await {
            Ok(record) => self.extract(&record).await,
            Err(e) if e.is_not_found() => {
                info!(file_id, "drive file not found");
                Ok(ExtractionResult::NotFound(file_id.to_string()))
            }
            Err(e) => Err(e),
        }
    }

    pub async fn extract(&self, record: &FileRecord) -> Result<ExtractionResult, DriveError> {
        let policy = ContentPolicy::for_mime(&record.mime_type);
        debug!(file_id = %record.id, mime = %record.mime_type, ?policy, "extracting");

        if policy == ContentPolicy::Unsupported {
            return Ok(unsupported(record));
        }

        if let Some(size) = record.size_bytes {
            if size > self.max_bytes {
                info!(file_id = %record.id, size, "refusing oversized drive file");
                return Ok(self.too_large(record, Some(size)));
            }
        }

        let fetched = match policy {
            ContentPolicy::Download => self.api.download_bytes(&record.id, self.max_bytes).await,
            ContentPolicy::Export { target_mime } => {
                self.api
                    .export_bytes(&record.id, target_mime, self.max_bytes)
                    .await
            }
            ContentPolicy::Unsupported => return Ok(unsupported(record)),
        };

        match fetched {
            Ok(bytes) if bytes.len() as u64 > self.max_bytes => {
                Ok(self.too_large(record, Some(bytes.len() as u64)))
            }
            Ok(bytes) => Ok(ExtractionResult::TextContent(decode_text(bytes))),
            Err(DriveError::TooLarge { actual_bytes, .. }) => Ok(self.too_large(record, actual_bytes)),
            Err(e) if e.is_not_found() => Ok(ExtractionResult::NotFound(record.id.clone())),
            Err(e) => Err(e),
        }
    }

    fn too_large(&self, record: &FileRecord, actual_bytes: Option<u64>) -> ExtractionResult {
        ExtractionResult::TooLarge {
            record: record.clone(),
            actual_bytes,
            limit_bytes: self.max_bytes,
        }
    }
}

fn unsupported(record: &FileRecord) -> ExtractionResult {
    ExtractionResult::Unsupported {
        mime_type: record.mime_type.clone(),
        record: record.clone(),
    }
}

fn decode_text(bytes: Vec<u8>) -> String {
    match String::from_utf8(bytes) {
        Ok(s) => s,
        Err(e) => String::from_utf8_lossy(e.as_bytes()).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_table_lookup() {
        assert_eq!(ContentPolicy::for_mime("text/plain"), ContentPolicy::Download);
        assert_eq!(
            ContentPolicy::for_mime("text/csv; charset=utf-8"),
            ContentPolicy::Download
        );
        assert_eq!(
            ContentPolicy::for_mime("application/json"),
            ContentPolicy::Download
        );
        assert_eq!(
            ContentPolicy::for_mime("application/vnd.google-apps.document"),
            ContentPolicy::Export {
                target_mime: "text/plain"
            }
        );
        assert_eq!(
            ContentPolicy::for_mime("application/vnd.google-apps.spreadsheet"),
            ContentPolicy::Unsupported
        );
        assert_eq!(
            ContentPolicy::for_mime("application/vnd.google-apps.presentation"),
            ContentPolicy::Unsupported
        );
        assert_eq!(
            ContentPolicy::for_mime("application/pdf"),
            ContentPolicy::Unsupported
        );
        assert_eq!(ContentPolicy::for_mime(""), ContentPolicy::Unsupported);
    }

    #[test]
    fn invalid_utf8_is_decoded_lossily() {
        let text = decode_text(vec![b'o', b'k', 0xff]);
        assert!(text.starts_with("ok"));
        assert_eq!(decode_text(b"plain".to_vec()), "plain");
    }
}
