#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use drivelens_core::drive::{DriveApi, DriveError, FileRecord, ListPage};

pub const MIB: u64 = 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List { offset: u32, limit: u32 },
    Search { query: String, max_results: u32 },
    Metadata(String),
    Download(String),
    Export { id: String, mime: String },
}

/// In-memory Drive. Search answers are scripted per query string; unknown
/// queries match nothing.
#[derive(Default)]
pub struct FakeDrive {
    files: Vec<FileRecord>,
    contents: HashMap<String, Vec<u8>>,
    searches: HashMap<String, Vec<FileRecord>>,
    failure: Option<Failure>,
    calls: Mutex<Vec<Call>>,
}

#[derive(Clone, Copy)]
pub enum Failure {
    Server,
    Auth,
}

impl FakeDrive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_file(mut self, record: FileRecord, content: &[u8]) -> Self {
        self.contents.insert(record.id.clone(), content.to_vec());
        self.files.push(record);
        self
    }

    pub fn with_search(mut self, query: &str, results: Vec<FileRecord>) -> Self {
        self.searches.insert(query.to_string(), results);
        self
    }

    pub fn failing(mut self, failure: Failure) -> Self {
        self.failure = Some(failure);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn content_calls(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Download(_) | Call::Export { .. }))
            .count()
    }

    pub fn search_queries(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::Search { query, .. } => Some(query),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) -> Result<(), DriveError> {
        self.calls.lock().unwrap().push(call);
        match self.failure {
            None => Ok(()),
            Some(Failure::Server) => Err(DriveError::Api {
                operation: "fake".into(),
                status: 500,
                message: "backend error".into(),
            }),
            Some(Failure::Auth) => Err(DriveError::Authentication("no session".into())),
        }
    }

    fn content(&self, id: &str, max_bytes: u64) -> Result<Vec<u8>, DriveError> {
        let bytes = self
            .contents
            .get(id)
            .cloned()
            .ok_or_else(|| DriveError::NotFound { id: id.into() })?;
        if bytes.len() as u64 > max_bytes {
            return Err(DriveError::TooLarge {
                actual_bytes: Some(bytes.len() as u64),
                limit_bytes: max_bytes,
            });
        }
        Ok(bytes)
    }
}

#[async_trait]
impl DriveApi for FakeDrive {
    async fn list_files(&self, offset: u32, limit: u32) -> Result<ListPage, DriveError> {
        self.record(Call::List { offset, limit })?;
        let items = self
            .files
            .iter()
            .skip(offset as usize)
            .take(limit as usize)
            .cloned()
            .collect();
        Ok(ListPage::new(items, offset, limit))
    }

    async fn search_files(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<FileRecord>, DriveError> {
        self.record(Call::Search {
            query: query.into(),
            max_results,
        })?;
        let mut hits = self.searches.get(query).cloned().unwrap_or_default();
        hits.truncate(max_results as usize);
        Ok(hits)
    }

    async fn get_metadata(&self, file_id: &str) -> Result<FileRecord, DriveError> {
        self.record(Call::Metadata(file_id.into()))?;
        self.files
            .iter()
            .find(|f| f.id == file_id)
            .cloned()
            .ok_or_else(|| DriveError::NotFound { id: file_id.into() })
    }

    async fn download_bytes(&self, file_id: &str, max_bytes: u64) -> Result<Vec<u8>, DriveError> {
        self.record(Call::Download(file_id.into()))?;
        self.content(file_id, max_bytes)
    }

    async fn export_bytes(
        &self,
        file_id: &str,
        target_mime: &str,
        max_bytes: u64,
    ) -> Result<Vec<u8>, DriveError> {
        self.record(Call::Export {
            id: file_id.into(),
            mime: target_mime.into(),
        })?;
        self.content(file_id, max_bytes)
    }
}

pub fn file(id: &str, name: &str, mime: &str, size: Option<u64>) -> FileRecord {
    FileRecord {
        id: id.into(),
        name: name.into(),
        mime_type: mime.into(),
        size_bytes: size,
        web_view_link: Some(format!("https://drive.google.com/{}", id)),
        created_time: Some("2024-01-01T00:00:00Z".into()),
        modified_time: Some("2024-01-02T00:00:00Z".into()),
    }
}

pub fn text_file(id: &str, name: &str, content: &str) -> FileRecord {
    file(id, name, "text/plain", Some(content.len() as u64))
}
