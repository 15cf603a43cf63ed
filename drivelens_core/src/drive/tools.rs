use std::sync::Arc;
use tracing::{info, warn};

use super::client::{DriveApi, HttpDriveClient};
use super::extractor::ContentExtractor;
use super::render::{
    render_extraction, render_failure, render_resolution, render_search_results,
    VALIDATION_MESSAGE,
};
use super::resolver::{FileResolver, ResolutionOutcome};
use super::DriveError;
use crate::config::DriveConfig;
use crate::token::AccessTokenProvider;

/// The three agent-facing operations. `search_files` and `read_file` always
/// answer with text; failures are described rather than raised.
#[derive(Clone)]
pub struct DriveTools {
    api: Arc<dyn DriveApi>,
    resolver: FileResolver,
    extractor: ContentExtractor,
    config: DriveConfig,
}

impl DriveTools {
    pub fn new(api: Arc<dyn DriveApi>, config: DriveConfig) -> Self {
        Self {
            resolver: FileResolver::new(api.clone(), config.similar_limit),
            extractor: ContentExtractor::new(api.clone()),
            api,
            config,
        }
    }

    /// Build over the HTTP client.
    pub fn from_config(
        config: DriveConfig,
        tokens: Arc<dyn AccessTokenProvider>,
    ) -> Result<Self, DriveError> {
        let client = HttpDriveClient::new(&config, tokens)?;
        Ok(Self::new(Arc::new(client), config))
    }

    pub fn config(&self) -> &DriveConfig {
        &self.config
    }

    /// `{data, count, offset, limit}`. A zero limit falls back to the
    /// configured default; any other limit is passed through and echoed as
    /// given.
    pub async fn list_files(
        &self,
        offset: u32,
        limit: Option<u32>,
    ) -> Result<serde_json::Value, DriveError> {
        let limit = match limit {
            Some(0) | None => self.config.default_list_limit.max(1),
            Some(n) => n,
        };
        let page = self.api.list_files(offset, limit).await?;
        info!(offset, limit, returned = page.total_returned, "listed drive files");
        Ok(page.to_json())
    }

    pub async fn search_files(&self, query: &str, max_results: Option<u32>) -> String {
        let max = match max_results {
            Some(0) | None => self.config.default_search_results.max(1),
            Some(n) => n,
        };
        match self.api.search_files(query, max).await {
            Ok(records) => {
                info!(returned = records.len(), "searched drive files");
                render_search_results(query, &records)
            }
            Err(e) => {
                warn!(error = %e, "drive search failed");
                render_failure("search files with query", &format!("'{}'", query), &e)
            }
        }
    }

    /// Read by id, or resolve a name first. The id wins when both are given;
    /// blank inputs count as absent.
    pub async fn read_file(&self, file_id: Option<&str>, file_name: Option<&str>) -> String {
        let file_id = file_id.map(str::trim).filter(|s| !s.is_empty());
        let file_name = file_name.map(str::trim).filter(|s| !s.is_empty());

        match (file_id, file_name) {
            (Some(id), _) => self.read_by_id(id).await,
            (None, Some(name)) => self.read_by_name(name).await,
            (None, None) => VALIDATION_MESSAGE.to_string(),
        }
    }

    async fn read_by_id(&self, id: &str) -> String {
        match self.extractor.read_by_id(id).await {
            Ok(result) => render_extraction(&result),
            Err(e) => {
                warn!(file_id = id, error = %e, "drive read failed");
                render_failure("read file", &format!("'{}'", id), &e)
            }
        }
    }

    async fn read_by_name(&self, name: &str) -> String {
        let outcome = match self.resolver.resolve(name).await {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!(file_name = name, error = %e, "drive name resolution failed");
                return render_failure("look up file named", &format!("'{}'", name), &e);
            }
        };

        match outcome {
            ResolutionOutcome::SingleExactMatch(record) if self.config.auto_read_single_match => {
                match self.extractor.extract(&record).await {
                    Ok(result) => render_extraction(&result),
                    Err(e) => render_failure("read file", &format!("'{}'", record.id), &e),
                }
            }
            other => render_resolution(name, &other),
        }
    }
}
