use async_trait::async_trait;
use rmcp::model::*;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::borrow::Cow;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::AuthDetails;
use crate::auth_store::{AuthStore, FileAuthStore, MemoryAuthStore};
use crate::capabilities::{ConnectorConfigSchema, Field, FieldType};
use crate::config::DriveConfig;
use crate::drive::render::render_failure;
use crate::drive::{DriveApi, DriveTools, GOOGLE_PROVIDER};
use crate::error::ConnectorError;
use crate::oauth;
use crate::token::{AccessTokenProvider, StoredTokenProvider, STORE_KEYS};
use crate::utils::{structured_result_with_text, text_result};
use crate::Connector;

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ListFilesInput {
    /// Number of files to skip before the page starts
    #[serde(default)]
    pub offset: u32,
    /// Maximum number of files to return (default 25, at most 1000)
    pub limit: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SearchFilesInput {
    /// Drive query string, passed through unchanged (e.g. "mimeType='application/pdf'")
    pub query: String,
    /// Maximum number of matches to return (default 10)
    pub max_results: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ReadFileInput {
    /// Drive file id. Takes precedence over file_name.
    pub file_id: Option<String>,
    /// Exact file name. Ambiguous or near matches are listed, not read.
    pub file_name: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AuthStartInput {
    /// OAuth client id of an installed/TV app
    pub client_id: String,
    /// Space-separated scopes (default drive.readonly)
    pub scopes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AuthPollInput {
    pub client_id: String,
    pub client_secret: Option<String>,
    /// device_code returned by auth_start
    pub device_code: String,
}

enum Backend {
    /// Built from config; rebuilt when credentials change.
    Http,
    /// Caller-supplied `DriveApi`, left alone on credential changes.
    Injected,
}

pub struct DriveConnector {
    auth: AuthDetails,
    config: DriveConfig,
    store: Arc<dyn AuthStore>,
    tokens: Arc<dyn AccessTokenProvider>,
    tools: DriveTools,
    backend: Backend,
}

impl DriveConnector {
    /// Connector over the Drive REST API, configured from `DriveConfig::load`
    /// and the default auth store.
    pub async fn new(auth: AuthDetails) -> Result<Self, ConnectorError> {
        let config = DriveConfig::load()
            .map_err(|e| ConnectorError::InvalidInput(format!("configuration: {}", e)))?;
        Self::with_config(auth, config, Arc::new(FileAuthStore::new_default()))
    }

    pub fn with_config(
        auth: AuthDetails,
        config: DriveConfig,
        store: Arc<dyn AuthStore>,
    ) -> Result<Self, ConnectorError> {
        let tokens: Arc<dyn AccessTokenProvider> =
            Arc::new(StoredTokenProvider::new(auth.clone(), store.clone()));
        let tools = DriveTools::from_config(config.clone(), tokens.clone())?;
        Ok(Self {
            auth,
            config,
            store,
            tokens,
            tools,
            backend: Backend::Http,
        })
    }

    /// Connector over an arbitrary `DriveApi`; device-flow results go to an
    /// in-memory store.
    pub fn with_api(
        api: Arc<dyn DriveApi>,
        tokens: Arc<dyn AccessTokenProvider>,
        config: DriveConfig,
    ) -> Self {
        Self {
            auth: AuthDetails::new(),
            tools: DriveTools::new(api, config.clone()),
            config,
            store: Arc::new(MemoryAuthStore::new()),
            tokens,
            backend: Backend::Injected,
        }
    }

    async fn auth_poll(&self, input: AuthPollInput) -> Result<CallToolResult, ConnectorError> {
        let secret = input.client_secret.as_deref().filter(|s| !s.is_empty());
        let tokens = oauth::google_device_poll(&input.client_id, secret, &input.device_code).await?;

        let mut details = self.auth.clone();
        details.insert("client_id".to_string(), input.client_id.clone());
        if let Some(s) = secret {
            details.insert("client_secret".to_string(), s.to_string());
        }
        let details = oauth::apply_tokens(details, &tokens);

        let mut persisted = true;
        for key in STORE_KEYS {
            if let Err(e) = self.store.save(key, &details) {
                warn!(store_key = key, "could not persist google tokens: {}", e);
                persisted = false;
            }
        }
        info!(persisted, "google device authorization completed");

        let v = json!({
            "authorized": true,
            "persisted": persisted,
            "expires_in": tokens.expires_in,
            "scope": tokens.scope,
            "refresh_token_stored": tokens.refresh_token.is_some(),
        });
        structured_result_with_text(&v, None)
    }
}

fn parse_args<T: DeserializeOwned>(args: JsonObject) -> Result<T, ConnectorError> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| ConnectorError::InvalidParams(e.to_string()))
}

fn input_schema<T: JsonSchema>() -> Result<Arc<JsonObject>, ConnectorError> {
    match serde_json::to_value(schemars::schema_for!(T))? {
        Value::Object(map) => Ok(Arc::new(map)),
        _ => Err(ConnectorError::Other("input schema is not an object".into())),
    }
}

fn tool(
    name: &'static str,
    description: &'static str,
    input_schema: Arc<JsonObject>,
) -> Tool {
    Tool {
        name: Cow::Borrowed(name),
        title: None,
        description: Some(Cow::Borrowed(description)),
        input_schema,
        output_schema: None,
        annotations: None,
        icons: None,
    }
}

#[async_trait]
impl Connector for DriveConnector {
    fn name(&self) -> &'static str {
        "google-drive"
    }

    fn description(&self) -> &'static str {
        "Google Drive connector: list, search, and read files as text by id or by name."
    }

    async fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            tools: Some(Default::default()),
            ..Default::default()
        }
    }

    async fn initialize(
        &self,
        _request: InitializeRequestParam,
    ) -> Result<InitializeResult, ConnectorError> {
        Ok(InitializeResult {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: self.capabilities().await,
            server_info: Implementation {
                name: self.name().to_string(),
                title: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Authenticate with the Google device flow (auth_start, then auth_poll) or set DRIVELENS_GOOGLE_ACCESS_TOKEN. \
                 read_file never guesses between files with the same name; pass file_id once a listing shows the candidates."
                    .to_string(),
            ),
        })
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
    ) -> Result<ListResourcesResult, ConnectorError> {
        Ok(ListResourcesResult {
            resources: vec![],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        _request: ReadResourceRequestParam,
    ) -> Result<Vec<ResourceContents>, ConnectorError> {
        Err(ConnectorError::ResourceNotFound)
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
    ) -> Result<ListToolsResult, ConnectorError> {
        let tools = vec![
            tool(
                "list_files",
                "List Drive files in provider order. Returns {data, count, offset, limit}.",
                input_schema::<ListFilesInput>()?,
            ),
            tool(
                "search_files",
                "Search Drive with a native query string (e.g. name contains 'report'). Returns one block per match.",
                input_schema::<SearchFilesInput>()?,
            ),
            tool(
                "read_file",
                "Read a text file or Google Doc by file_id or exact file_name. Files over 10 MB, Sheets, Slides, and binary formats are refused with an explanation.",
                input_schema::<ReadFileInput>()?,
            ),
            tool(
                "auth_start",
                "Start Google device authorization (returns user_code and verification URL).",
                input_schema::<AuthStartInput>()?,
            ),
            tool(
                "auth_poll",
                "Poll the Google token endpoint with a device_code and store the resulting tokens.",
                input_schema::<AuthPollInput>()?,
            ),
        ];
        Ok(ListToolsResult {
            tools,
            next_cursor: None,
        })
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult, ConnectorError> {
        let args = request.arguments.unwrap_or_default();
        match request.name.as_ref() {
            "list_files" => {
                let input: ListFilesInput = parse_args(args)?;
                match self.tools.list_files(input.offset, input.limit).await {
                    Ok(page) => structured_result_with_text(&page, None),
                    Err(e) => {
                        warn!(error = %e, "drive listing failed");
                        let offset = input.offset.to_string();
                        let mut r = text_result(render_failure("list files at offset", &offset, &e));
                        r.is_error = Some(true);
                        Ok(r)
                    }
                }
            }
            "search_files" => {
                let input: SearchFilesInput = parse_args(args)?;
                let text = self.tools.search_files(&input.query, input.max_results).await;
                Ok(text_result(text))
            }
            "read_file" => {
                let input: ReadFileInput = parse_args(args)?;
                let text = self
                    .tools
                    .read_file(input.file_id.as_deref(), input.file_name.as_deref())
                    .await;
                Ok(text_result(text))
            }
            "auth_start" => {
                let input: AuthStartInput = parse_args(args)?;
                let scopes = input
                    .scopes
                    .as_deref()
                    .filter(|s| !s.trim().is_empty())
                    .unwrap_or(oauth::DRIVE_READONLY_SCOPE);
                let start = oauth::google_device_authorize(&input.client_id, scopes).await?;
                let text = format!(
                    "Visit {} and enter code {}. Then call auth_poll with device_code {}.",
                    start
                        .verification_uri_complete
                        .as_deref()
                        .unwrap_or(&start.verification_uri),
                    start.user_code,
                    start.device_code
                );
                structured_result_with_text(&start, Some(text))
            }
            "auth_poll" => {
                let input: AuthPollInput = parse_args(args)?;
                self.auth_poll(input).await
            }
            _ => Err(ConnectorError::ToolNotFound),
        }
    }

    async fn list_prompts(
        &self,
        _request: Option<PaginatedRequestParam>,
    ) -> Result<ListPromptsResult, ConnectorError> {
        Ok(ListPromptsResult {
            prompts: vec![],
            next_cursor: None,
        })
    }

    async fn get_prompt(&self, _name: &str) -> Result<Prompt, ConnectorError> {
        Err(ConnectorError::InvalidParams("Prompt not found".to_string()))
    }

    async fn get_auth_details(&self) -> Result<AuthDetails, ConnectorError> {
        Ok(self.auth.clone())
    }

    async fn set_auth_details(&mut self, details: AuthDetails) -> Result<(), ConnectorError> {
        self.auth = details;
        if let Backend::Http = self.backend {
            self.tokens = Arc::new(StoredTokenProvider::new(
                self.auth.clone(),
                self.store.clone(),
            ));
            self.tools = DriveTools::from_config(self.config.clone(), self.tokens.clone())?;
        }
        Ok(())
    }

    async fn test_auth(&self) -> Result<(), ConnectorError> {
        self.tokens.access_token(GOOGLE_PROVIDER).await?;
        Ok(())
    }

    fn config_schema(&self) -> ConnectorConfigSchema {
        ConnectorConfigSchema {
            fields: vec![
                Field::new(
                    "access_token",
                    "Access Token",
                    FieldType::Secret,
                    "Google OAuth access token with a Drive read scope.",
                ),
                Field::new(
                    "refresh_token",
                    "Refresh Token",
                    FieldType::Secret,
                    "Used to mint new access tokens once expires_at has passed.",
                ),
                Field::new(
                    "client_id",
                    "Client ID",
                    FieldType::Text,
                    "OAuth client ID used for the device flow and refresh.",
                ),
                Field::new(
                    "client_secret",
                    "Client Secret",
                    FieldType::Secret,
                    "OAuth client secret, if the client type has one.",
                ),
                Field::new(
                    "expires_at",
                    "Expires At",
                    FieldType::Number,
                    "Unix time after which access_token is treated as expired.",
                ),
            ],
        }
    }
}
