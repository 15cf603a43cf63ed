//! Google Drive document resolution and retrieval.
//!
//! The engine is split the same way a read flows through it:
//!
//! - [`client`]: the [`DriveApi`] seam and its reqwest implementation
//! - [`resolver`]: turns a human file name into a [`ResolutionOutcome`]
//! - [`extractor`]: MIME policy table, size ceiling, and byte decoding
//! - [`render`]: pure formatting of outcomes into agent-facing text
//! - [`tools`]: the `list_files` / `search_files` / `read_file` façade

pub mod client;
pub mod extractor;
pub mod render;
pub mod resolver;
pub mod tools;
pub mod types;

pub use client::{DriveApi, HttpDriveClient};
pub use extractor::{ContentExtractor, ContentPolicy, ExtractionResult};
pub use resolver::{FileResolver, ResolutionOutcome};
pub use tools::DriveTools;
pub use types::{FileRecord, ListPage};

/// Provider name handed to the access token supplier.
pub const GOOGLE_PROVIDER: &str = "google";

/// Hard ceiling on the bytes a single read will transfer (10 MiB).
pub const MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Upper bound Drive accepts for `pageSize`.
pub const MAX_PAGE_SIZE: u32 = 1000;

#[derive(Debug, thiserror::Error)]
pub enum DriveError {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("file '{id}' not found")]
    NotFound { id: String },

    #[error("drive {operation} returned HTTP {status}: {message}")]
    Api {
        operation: String,
        status: u16,
        message: String,
    },

    #[error("drive {operation} timed out")]
    Timeout { operation: String },

    #[error("drive {operation} request failed: {source}")]
    Transport {
        operation: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("could not decode drive {operation} response: {message}")]
    Decode { operation: String, message: String },

    /// `actual_bytes` is `None` when the transfer was cut off before its
    /// full length was known.
    #[error("content exceeds {limit_bytes} bytes")]
    TooLarge {
        actual_bytes: Option<u64>,
        limit_bytes: u64,
    },
}

impl DriveError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, DriveError::NotFound { .. })
    }

    pub fn is_auth(&self) -> bool {
        matches!(self, DriveError::Authentication(_))
    }

    /// Classify a reqwest failure for `operation`, keeping timeouts apart.
    pub(crate) fn from_reqwest(operation: &str, source: reqwest::Error) -> Self {
        if source.is_timeout() {
            DriveError::Timeout {
                operation: operation.to_string(),
            }
        } else {
            DriveError::Transport {
                operation: operation.to_string(),
                source,
            }
        }
    }
}
