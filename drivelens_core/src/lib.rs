// src/lib.rs
pub mod auth;
pub mod auth_store;
pub mod capabilities;
pub mod config;
pub mod connectors;
pub mod drive;
pub mod error;
pub mod mcp_server;
pub mod oauth;
pub mod token;
pub mod transport;
pub mod utils;

#[cfg(test)]
pub(crate) mod test_http;

use std::sync::Arc;

// Re-export the rmcp model types that appear in the public API
pub use rmcp::model::{
    CallToolRequestParam, CallToolResult, Content, Implementation, InitializeRequestParam,
    InitializeResult, ListPromptsResult, ListResourcesResult, ListToolsResult,
    PaginatedRequestParam, Prompt, ProtocolVersion, ReadResourceRequestParam, ResourceContents,
    ServerCapabilities, Tool,
};

use crate::auth::AuthDetails;
pub use crate::capabilities::ConnectorConfigSchema;
pub use crate::config::DriveConfig;
pub use crate::error::ConnectorError;
use async_trait::async_trait;
use std::collections::HashMap;

#[async_trait]
pub trait Connector: Send + Sync {
    /// Unique connector name; also the tool prefix on the MCP surface.
    fn name(&self) -> &'static str;

    fn description(&self) -> &'static str;

    /// Key used to look up credentials in the auth store. Defaults to the
    /// connector name.
    fn credential_provider(&self) -> &'static str {
        self.name()
    }

    async fn capabilities(&self) -> ServerCapabilities;

    // --- MCP request handlers ---
    async fn initialize(
        &self,
        request: InitializeRequestParam,
    ) -> Result<InitializeResult, ConnectorError>;
    async fn list_resources(
        &self,
        request: Option<PaginatedRequestParam>,
    ) -> Result<ListResourcesResult, ConnectorError>;
    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
    ) -> Result<Vec<ResourceContents>, ConnectorError>;
    async fn list_tools(
        &self,
        request: Option<PaginatedRequestParam>,
    ) -> Result<ListToolsResult, ConnectorError>;
    async fn call_tool(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult, ConnectorError>;
    async fn list_prompts(
        &self,
        request: Option<PaginatedRequestParam>,
    ) -> Result<ListPromptsResult, ConnectorError>;
    async fn get_prompt(&self, name: &str) -> Result<Prompt, ConnectorError>;

    // --- Authentication and configuration ---
    async fn get_auth_details(&self) -> Result<AuthDetails, ConnectorError>;
    async fn set_auth_details(&mut self, details: AuthDetails) -> Result<(), ConnectorError>;
    async fn test_auth(&self) -> Result<(), ConnectorError>;
    fn config_schema(&self) -> ConnectorConfigSchema;
}

pub struct ProviderRegistry {
    pub providers: HashMap<String, Arc<tokio::sync::Mutex<Box<dyn Connector>>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        ProviderRegistry {
            providers: HashMap::new(),
        }
    }

    pub fn register_provider(&mut self, provider: Box<dyn Connector>) {
        self.providers.insert(
            provider.name().to_string(),
            Arc::new(tokio::sync::Mutex::new(provider)),
        );
    }

    pub fn get_provider(&self, name: &str) -> Option<&Arc<tokio::sync::Mutex<Box<dyn Connector>>>> {
        self.providers.get(name)
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry with the Google Drive connector wired to the HTTP client and the
/// default credential chain.
pub async fn build_registry() -> Result<ProviderRegistry, ConnectorError> {
    let mut registry = ProviderRegistry::new();
    let drive = connectors::google_drive::DriveConnector::new(AuthDetails::new()).await?;
    registry.register_provider(Box::new(drive));
    Ok(registry)
}
