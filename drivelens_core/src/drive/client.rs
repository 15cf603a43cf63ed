use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};
use url::Url;

use super::types::{FileRecord, ListPage, WireFile, WireFileList};
use super::{DriveError, GOOGLE_PROVIDER, MAX_PAGE_SIZE};
use crate::config::DriveConfig;
use crate::token::AccessTokenProvider;

const LIST_FIELDS: &str =
    "nextPageToken,files(id,name,mimeType,size,webViewLink,createdTime,modifiedTime)";
const FILE_FIELDS: &str = "id,name,mimeType,size,webViewLink,createdTime,modifiedTime";

/// Request/response layer over the Drive files endpoints.
#[async_trait]
pub trait DriveApi: Send + Sync {
    /// One page of the caller's files, skipping `offset` records client-side.
    async fn list_files(&self, offset: u32, limit: u32) -> Result<ListPage, DriveError>;

    /// Run a Drive `q` filter verbatim. No matches is `Ok(vec![])`.
    async fn search_files(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<FileRecord>, DriveError>;

    async fn get_metadata(&self, file_id: &str) -> Result<FileRecord, DriveError>;

    /// Raw bytes of a non-native file, abandoned past `max_bytes`.
    async fn download_bytes(&self, file_id: &str, max_bytes: u64) -> Result<Vec<u8>, DriveError>;

    /// Convert a Docs-native file to `target_mime`, abandoned past `max_bytes`.
    async fn export_bytes(
        &self,
        file_id: &str,
        target_mime: &str,
        max_bytes: u64,
    ) -> Result<Vec<u8>, DriveError>;
}

/// reqwest-backed [`DriveApi`]. A fresh bearer token is requested for
/// every call.
#[derive(Clone)]
pub struct HttpDriveClient {
    client: reqwest::Client,
    base: Url,
    tokens: Arc<dyn AccessTokenProvider>,
}

impl HttpDriveClient {
    pub fn new(
        config: &DriveConfig,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, DriveError> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| DriveError::from_reqwest("client setup", e))?;
        let base = Url::parse(&config.api_base).map_err(|e| DriveError::Decode {
            operation: "client setup".to_string(),
            message: format!("invalid api_base '{}': {}", config.api_base, e),
        })?;
        Ok(Self {
            client,
            base,
            tokens,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url, DriveError> {
        endpoint_url(&self.base, segments)
    }

    async fn bearer(&self) -> Result<String, DriveError> {
        self.tokens.access_token(GOOGLE_PROVIDER).await
    }

    async fn send(
        &self,
        operation: &str,
        url: Url,
        params: &[(&str, String)],
    ) -> Result<reqwest::Response, DriveError> {
        let token = self.bearer().await?;
        debug!(operation, url = %url, "drive request");
        self.client
            .get(url)
            .bearer_auth(token)
            .query(params)
            .send()
            .await
            .map_err(|e| DriveError::from_reqwest(operation, e))
    }

    /// One `files.list` page and the token for the next one, if any.
    async fn list_page(
        &self,
        operation: &str,
        query: Option<&str>,
        page_size: u32,
        page_token: Option<&str>,
    ) -> Result<(Vec<FileRecord>, Option<String>), DriveError> {
        let url = self.endpoint(&["files"])?;
        let resp = self
            .send(operation, url, &list_params(query, page_size, page_token))
            .await?;
        let resp = check_status(operation, None, resp).await?;
        let list: WireFileList = resp.json().await.map_err(|e| DriveError::Decode {
            operation: operation.to_string(),
            message: e.to_string(),
        })?;
        let next = list.next_page_token.clone().filter(|t| !t.is_empty());
        let records = list.into_records();
        debug!(operation, returned = records.len(), more = next.is_some(), "drive listing decoded");
        Ok((records, next))
    }

    async fn fetch_capped(
        &self,
        operation: &str,
        file_id: &str,
        url: Url,
        params: &[(&str, String)],
        max_bytes: u64,
    ) -> Result<Vec<u8>, DriveError> {
        let resp = self.send(operation, url, params).await?;
        let resp = check_status(operation, Some(file_id), resp).await?;
        let bytes = read_capped(resp, max_bytes, operation).await?;
        debug!(operation, file_id, bytes = bytes.len(), "drive content received");
        Ok(bytes)
    }
}

#[async_trait]
impl DriveApi for HttpDriveClient {
    /// Walks `nextPageToken` until `offset` records have gone by and `limit`
    /// have been kept. Small windows cost a single request.
    async fn list_files(&self, offset: u32, limit: u32) -> Result<ListPage, DriveError> {
        let limit = limit.max(1);
        let mut to_skip = offset as usize;
        let mut items: Vec<FileRecord> = Vec::new();
        let mut token: Option<String> = None;
        loop {
            let wanted = to_skip + (limit as usize - items.len());
            let page_size = u32::try_from(wanted).unwrap_or(MAX_PAGE_SIZE).min(MAX_PAGE_SIZE);
            let (records, next) = self
                .list_page("list", None, page_size, token.as_deref())
                .await?;
            let skipped = to_skip.min(records.len());
            to_skip -= skipped;
            let room = limit as usize - items.len();
            items.extend(records.into_iter().skip(skipped).take(room));

            match next {
                Some(next) if items.len() < limit as usize => token = Some(next),
                _ => break,
            }
        }
        Ok(ListPage::new(items, offset, limit))
    }

    async fn search_files(
        &self,
        query: &str,
        max_results: u32,
    ) -> Result<Vec<FileRecord>, DriveError> {
        let page_size = max_results.clamp(1, MAX_PAGE_SIZE);
        let (records, _) = self.list_page("search", Some(query), page_size, None).await?;
        Ok(records)
    }

    async fn get_metadata(&self, file_id: &str) -> Result<FileRecord, DriveError> {
        let operation = "metadata";
        let url = self.endpoint(&["files", file_id])?;
        let params = [
            ("fields", FILE_FIELDS.to_string()),
            ("supportsAllDrives", "true".to_string()),
        ];
        let resp = self.send(operation, url, &params).await?;
        let resp = check_status(operation, Some(file_id), resp).await?;
        let wire: WireFile = resp.json().await.map_err(|e| DriveError::Decode {
            operation: operation.to_string(),
            message: e.to_string(),
        })?;
        wire.into_record().ok_or_else(|| DriveError::Decode {
            operation: operation.to_string(),
            message: format!("metadata for '{}' has no id or name", file_id),
        })
    }

    async fn download_bytes(&self, file_id: &str, max_bytes: u64) -> Result<Vec<u8>, DriveError> {
        let url = self.endpoint(&["files", file_id])?;
        let params = [
            ("alt", "media".to_string()),
            ("supportsAllDrives", "true".to_string()),
        ];
        self.fetch_capped("download", file_id, url, &params, max_bytes)
            .await
    }

    async fn export_bytes(
        &self,
        file_id: &str,
        target_mime: &str,
        max_bytes: u64,
    ) -> Result<Vec<u8>, DriveError> {
        let url = self.endpoint(&["files", file_id, "export"])?;
        let params = [("mimeType", target_mime.to_string())];
        self.fetch_capped("export", file_id, url, &params, max_bytes)
            .await
    }
}

fn endpoint_url(base: &Url, segments: &[&str]) -> Result<Url, DriveError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| DriveError::Decode {
            operation: "url".to_string(),
            message: format!("api_base '{}' cannot carry a path", base),
        })?
        .pop_if_empty()
        .extend(segments);
    Ok(url)
}

fn list_params(
    query: Option<&str>,
    page_size: u32,
    page_token: Option<&str>,
) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("pageSize", page_size.to_string()),
        ("fields", LIST_FIELDS.to_string()),
        ("supportsAllDrives", "true".to_string()),
        ("includeItemsFromAllDrives", "true".to_string()),
    ];
    if let Some(q) = query {
        params.push(("q", q.to_string()));
    }
    if let Some(token) = page_token {
        params.push(("pageToken", token.to_string()));
    }
    params
}

/// Map non-2xx responses. A 404 on a per-file call is `NotFound`.
async fn check_status(
    operation: &str,
    file_id: Option<&str>,
    resp: reqwest::Response,
) -> Result<reqwest::Response, DriveError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    if status == reqwest::StatusCode::NOT_FOUND {
        if let Some(id) = file_id {
            return Err(DriveError::NotFound { id: id.to_string() });
        }
    }
    let body = resp.text().await.unwrap_or_default();
    warn!(operation, status = status.as_u16(), "drive request failed");
    Err(DriveError::Api {
        operation: operation.to_string(),
        status: status.as_u16(),
        message: api_error_message(&body),
    })
}

/// Pull `error.message` out of a Google error body, or fall back to a
/// trimmed copy of the raw text.
fn api_error_message(body: &str) -> String {
    if let Ok(v) = serde_json::from_str::<serde_json::Value>(body) {
        if let Some(msg) = v
            .get("error")
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
        {
            return msg.to_string();
        }
    }
    let trimmed = body.trim();
    if trimmed.chars().count() > 200 {
        let head: String = trimmed.chars().take(200).collect();
        format!("{}...", head)
    } else {
        trimmed.to_string()
    }
}

async fn read_capped(
    mut resp: reqwest::Response,
    max_bytes: u64,
    operation: &str,
) -> Result<Vec<u8>, DriveError> {
    if let Some(len) = resp.content_length() {
        if len > max_bytes {
            return Err(DriveError::TooLarge {
                actual_bytes: Some(len),
                limit_bytes: max_bytes,
            });
        }
    }
    let mut buf: Vec<u8> = Vec::new();
    while let Some(chunk) = resp
        .chunk()
        .await
        .map_err(|e| DriveError::from_reqwest(operation, e))?
    {
        let received = (buf.len() + chunk.len()) as u64;
        if received > max_bytes {
            debug!(operation, received, "abandoning oversized transfer");
            return Err(DriveError::TooLarge {
                actual_bytes: None,
                limit_bytes: max_bytes,
            });
        }
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}
