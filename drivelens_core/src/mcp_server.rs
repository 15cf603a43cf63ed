use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info};

use crate::{
    auth::AuthDetails,
    capabilities::{ConnectorConfigSchema, FieldType},
    utils::structured_result_with_text,
    ConnectorError, ProviderRegistry,
};
use rmcp::model::*;

/// Connectors whose `auth_start` / `auth_poll` tools are surfaced as
/// `auth/<connector>/start_device` and `auth/<connector>/poll_device`.
const DEVICE_FLOW_CONNECTORS: &[&str] = &["google-drive"];

/// MCP server over a [`ProviderRegistry`].
pub struct McpServer {
    registry: Arc<Mutex<ProviderRegistry>>,
}

impl McpServer {
    pub fn new(registry: Arc<Mutex<ProviderRegistry>>) -> Self {
        Self { registry }
    }

    /// Union of the connectors' capabilities.
    pub async fn get_capabilities(&self) -> ServerCapabilities {
        let registry = self.registry.lock().await;
        let mut capabilities = ServerCapabilities::default();

        for connector in registry.providers.values() {
            let conn_caps = connector.lock().await.capabilities().await;
            if conn_caps.tools.is_some() {
                capabilities.tools = conn_caps.tools;
            }
            if conn_caps.resources.is_some() {
                capabilities.resources = conn_caps.resources;
            }
            if conn_caps.prompts.is_some() {
                capabilities.prompts = conn_caps.prompts;
            }
        }

        capabilities
    }

    pub async fn handle_initialize(
        &self,
        _request: InitializeRequestParam,
    ) -> Result<InitializeResult, ConnectorError> {
        info!("MCP server initializing");

        Ok(InitializeResult {
            protocol_version: ProtocolVersion::LATEST,
            capabilities: self.get_capabilities().await,
            server_info: Implementation {
                name: "drivelens".to_string(),
                title: None,
                version: env!("CARGO_PKG_VERSION").to_string(),
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Google Drive retrieval for agents. Tools are named '<connector>/<tool>'; \
                 credentials are managed through 'auth/<connector>/<action>'."
                    .to_string(),
            ),
        })
    }

    pub async fn handle_list_resources(
        &self,
        request: Option<PaginatedRequestParam>,
    ) -> Result<ListResourcesResult, ConnectorError> {
        let registry = self.registry.lock().await;
        let mut all_resources = Vec::new();

        for (name, connector) in registry.providers.iter() {
            let c = connector.lock().await;
            match c.list_resources(request.clone()).await {
                Ok(response) => all_resources.extend(response.resources),
                Err(e) => error!("Error listing resources from connector {}: {:?}", name, e),
            }
        }

        Ok(ListResourcesResult {
            resources: all_resources,
            next_cursor: None,
        })
    }

    /// First connector that claims the resource wins.
    pub async fn handle_read_resource(
        &self,
        request: ReadResourceRequestParam,
    ) -> Result<Vec<ResourceContents>, ConnectorError> {
        let registry = self.registry.lock().await;

        for connector in registry.providers.values() {
            let c = connector.lock().await;
            match c.read_resource(request.clone()).await {
                Ok(contents) => return Ok(contents),
                Err(ConnectorError::ResourceNotFound) => continue,
                Err(e) => return Err(e),
            }
        }

        Err(ConnectorError::ResourceNotFound)
    }

    /// Connector tools prefixed as `<connector>/<tool>`, followed by the
    /// per-connector auth tools.
    pub async fn handle_list_tools(
        &self,
        request: Option<PaginatedRequestParam>,
    ) -> Result<ListToolsResult, ConnectorError> {
        let registry = self.registry.lock().await;
        let mut names: Vec<&String> = registry.providers.keys().collect();
        names.sort();

        let mut all_tools = Vec::new();
        for connector_name in &names {
            let Some(connector) = registry.get_provider(connector_name.as_str()) else {
                continue;
            };
            let c = connector.lock().await;
            match c.list_tools(request.clone()).await {
                Ok(response) => {
                    all_tools.extend(response.tools.into_iter().map(|mut tool| {
                        tool.name = format!("{}/{}", connector_name, tool.name).into();
                        tool
                    }));
                }
                Err(e) => {
                    error!(
                        "Error listing tools from connector {}: {:?}",
                        connector_name, e
                    );
                }
            }
        }

        for connector_name in &names {
            let Some(connector) = registry.get_provider(connector_name.as_str()) else {
                continue;
            };
            let schema = connector.lock().await.config_schema();
            all_tools.extend(auth_tools(connector_name, &schema));
        }

        Ok(ListToolsResult {
            tools: all_tools,
            next_cursor: None,
        })
    }

    pub async fn handle_call_tool(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult, ConnectorError> {
        if request.name.starts_with("auth/") {
            return self.handle_auth_tool(request).await;
        }

        let (connector_name, tool_name) = match request.name.split_once('/') {
            Some((c, t)) if !c.is_empty() && !t.is_empty() && !t.contains('/') => (c, t),
            _ => {
                return Err(ConnectorError::InvalidInput(format!(
                    "Tool name must be in format 'connector/tool' or 'auth/<connector>/<action>', got: {}",
                    request.name
                )))
            }
        };

        let registry = self.registry.lock().await;
        let connector = registry.get_provider(connector_name).ok_or_else(|| {
            ConnectorError::InvalidInput(format!("Unknown connector: {}", connector_name))
        })?;

        debug!(connector = connector_name, tool = tool_name, "dispatching tool call");
        let unprefixed_request = CallToolRequestParam {
            name: tool_name.to_string().into(),
            arguments: request.arguments.clone(),
        };
        let c = connector.lock().await;
        c.call_tool(unprefixed_request).await
    }

    async fn handle_auth_tool(
        &self,
        request: CallToolRequestParam,
    ) -> Result<CallToolResult, ConnectorError> {
        let parts: Vec<&str> = request.name.split('/').collect();
        let [_, provider, action] = parts.as_slice() else {
            return Err(ConnectorError::InvalidInput(
                "Auth tool must be 'auth/<connector>/<action>'".into(),
            ));
        };

        let connector = {
            let registry = self.registry.lock().await;
            registry
                .get_provider(provider)
                .ok_or_else(|| {
                    ConnectorError::InvalidInput(format!("Unknown connector: {}", provider))
                })?
                .clone()
        };

        match *action {
            "set" => {
                let details = auth_details_from_args(request.arguments.clone().unwrap_or_default());
                let mut c = connector.lock().await;
                c.set_auth_details(details).await?;
                info!(connector = *provider, "credentials updated");
                structured_result_with_text(&json!({"ok": true}), None)
            }
            "test" => {
                let c = connector.lock().await;
                c.test_auth().await?;
                structured_result_with_text(&json!({"ok": true}), None)
            }
            "get_schema" => {
                let c = connector.lock().await;
                let js = config_schema_to_jsonschema(&c.config_schema());
                structured_result_with_text(&json!({"schema": js}), None)
            }
            "start_device" | "poll_device" if DEVICE_FLOW_CONNECTORS.contains(provider) => {
                let tool = if *action == "start_device" {
                    "auth_start"
                } else {
                    "auth_poll"
                };
                let req = CallToolRequestParam {
                    name: tool.into(),
                    arguments: request.arguments.clone(),
                };
                let c = connector.lock().await;
                c.call_tool(req).await
            }
            _ => Err(ConnectorError::ToolNotFound),
        }
    }

    pub async fn handle_list_prompts(
        &self,
        request: Option<PaginatedRequestParam>,
    ) -> Result<ListPromptsResult, ConnectorError> {
        let registry = self.registry.lock().await;
        let mut all_prompts = Vec::new();

        for (connector_name, connector) in registry.providers.iter() {
            let c = connector.lock().await;
            match c.list_prompts(request.clone()).await {
                Ok(response) => {
                    all_prompts.extend(response.prompts.into_iter().map(|mut prompt| {
                        prompt.name = format!("{}/{}", connector_name, prompt.name);
                        prompt
                    }));
                }
                Err(e) => {
                    error!(
                        "Error listing prompts from connector {}: {:?}",
                        connector_name, e
                    );
                }
            }
        }

        Ok(ListPromptsResult {
            prompts: all_prompts,
            next_cursor: None,
        })
    }

    pub async fn handle_get_prompt(&self, name: &str) -> Result<Prompt, ConnectorError> {
        let (connector_name, prompt_name) = name.split_once('/').ok_or_else(|| {
            ConnectorError::InvalidInput(format!(
                "Prompt name must be in format 'connector/prompt', got: {}",
                name
            ))
        })?;

        let registry = self.registry.lock().await;
        let connector = registry.get_provider(connector_name).ok_or_else(|| {
            ConnectorError::InvalidInput(format!("Unknown connector: {}", connector_name))
        })?;
        let c = connector.lock().await;
        let mut prompt = c.get_prompt(prompt_name).await?;
        prompt.name = name.to_string();
        Ok(prompt)
    }
}

fn auth_tools(connector_name: &str, schema: &ConnectorConfigSchema) -> Vec<Tool> {
    let mut tools = vec![
        auth_tool(
            format!("auth/{}/set", connector_name),
            format!(
                "Set credentials for '{}' (tokens or OAuth client settings).",
                connector_name
            ),
            config_schema_to_jsonschema(schema),
        ),
        auth_tool(
            format!("auth/{}/test", connector_name),
            "Test authentication for the connector.".to_string(),
            object_schema(json!({}), &[]),
        ),
        auth_tool(
            format!("auth/{}/get_schema", connector_name),
            "Return JSON schema for connector credentials (fields/types).".to_string(),
            object_schema(json!({}), &[]),
        ),
    ];

    if DEVICE_FLOW_CONNECTORS.contains(&connector_name) {
        tools.push(auth_tool(
            format!("auth/{}/start_device", connector_name),
            "Start Google device authorization (returns user_code and verification URL)."
                .to_string(),
            object_schema(
                json!({
                    "client_id": {"type": "string"},
                    "scopes": {"type": "string", "description": "space-separated scopes"}
                }),
                &["client_id"],
            ),
        ));
        tools.push(auth_tool(
            format!("auth/{}/poll_device", connector_name),
            "Poll the Google token endpoint with device_code and store the tokens.".to_string(),
            object_schema(
                json!({
                    "client_id": {"type": "string"},
                    "client_secret": {"type": "string"},
                    "device_code": {"type": "string"}
                }),
                &["client_id", "device_code"],
            ),
        ));
    }
    tools
}

fn auth_tool(name: String, description: String, schema: JsonObject) -> Tool {
    Tool {
        name: name.into(),
        title: None,
        description: Some(description.into()),
        input_schema: Arc::new(schema),
        output_schema: None,
        annotations: None,
        icons: None,
    }
}

fn object_schema(properties: Value, required: &[&str]) -> JsonObject {
    let mut root = JsonObject::new();
    root.insert("type".to_string(), json!("object"));
    root.insert("properties".to_string(), properties);
    if !required.is_empty() {
        root.insert("required".to_string(), json!(required));
    }
    root
}

/// Strings are taken as-is; numbers and booleans are stringified; anything
/// else is dropped.
fn auth_details_from_args(args: JsonObject) -> AuthDetails {
    let mut details = AuthDetails::new();
    for (k, v) in args {
        match v {
            Value::String(s) => {
                details.insert(k, s);
            }
            Value::Number(_) | Value::Bool(_) => {
                details.insert(k, v.to_string());
            }
            _ => {}
        }
    }
    details
}

fn config_schema_to_jsonschema(schema: &ConnectorConfigSchema) -> JsonObject {
    let mut props = serde_json::Map::new();
    let mut required: Vec<&str> = Vec::new();
    for f in &schema.fields {
        let mut obj = serde_json::Map::new();
        let ty = match f.field_type {
            FieldType::Text | FieldType::Secret => "string",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
        };
        obj.insert("type".to_string(), json!(ty));
        if f.field_type == FieldType::Secret {
            obj.insert("format".to_string(), json!("password"));
        }
        if let Some(desc) = &f.description {
            obj.insert("description".to_string(), json!(desc));
        }
        props.insert(f.name.clone(), Value::Object(obj));
        if f.required {
            required.push(&f.name);
        }
    }
    object_schema(Value::Object(props), &required)
}

/// JSON-RPC message handler for the MCP server
pub struct JsonRpcHandler {
    server: McpServer,
}

impl JsonRpcHandler {
    pub fn new(server: McpServer) -> Self {
        Self { server }
    }

    /// Process one JSON-RPC message. Notifications (no `id`) are handled but
    /// produce `None`.
    pub async fn handle_message(&self, request: Value) -> Option<Value> {
        let is_notification = request.get("id").is_none();
        let response = self.handle_request(request).await;
        if is_notification {
            None
        } else {
            Some(response)
        }
    }

    /// Process a JSON-RPC request and return a response
    pub async fn handle_request(&self, request: Value) -> Value {
        debug!("Handling JSON-RPC request: {:?}", request);

        let id = request.get("id").cloned();
        let method = request.get("method").and_then(|m| m.as_str()).unwrap_or("");
        let params = request.get("params").cloned().unwrap_or(json!({}));

        let result = match method {
            "initialize" => match serde_json::from_value::<InitializeRequestParam>(params) {
                Ok(req) => to_rpc(self.server.handle_initialize(req).await),
                Err(e) => Err(ConnectorError::SerdeJson(e).to_jsonrpc_error()),
            },
            "notifications/initialized" | "ping" => Ok(json!({})),
            "resources/list" => {
                match serde_json::from_value::<Option<PaginatedRequestParam>>(params) {
                    Ok(req) => to_rpc(self.server.handle_list_resources(req).await),
                    Err(e) => Err(ConnectorError::SerdeJson(e).to_jsonrpc_error()),
                }
            }
            "resources/read" => match serde_json::from_value::<ReadResourceRequestParam>(params) {
                Ok(req) => to_rpc(
                    self.server
                        .handle_read_resource(req)
                        .await
                        .map(|contents| json!({"contents": contents})),
                ),
                Err(e) => Err(ConnectorError::SerdeJson(e).to_jsonrpc_error()),
            },
            "tools/list" => match serde_json::from_value::<Option<PaginatedRequestParam>>(params) {
                Ok(req) => to_rpc(self.server.handle_list_tools(req).await),
                Err(e) => Err(ConnectorError::SerdeJson(e).to_jsonrpc_error()),
            },
            "tools/call" => match serde_json::from_value::<CallToolRequestParam>(params) {
                Ok(req) => to_rpc(self.server.handle_call_tool(req).await),
                Err(e) => Err(ConnectorError::SerdeJson(e).to_jsonrpc_error()),
            },
            "prompts/list" => {
                match serde_json::from_value::<Option<PaginatedRequestParam>>(params) {
                    Ok(req) => to_rpc(self.server.handle_list_prompts(req).await),
                    Err(e) => Err(ConnectorError::SerdeJson(e).to_jsonrpc_error()),
                }
            }
            "prompts/get" => match params.get("name").and_then(|n| n.as_str()) {
                Some(name) => to_rpc(self.server.handle_get_prompt(name).await),
                None => Err(
                    ConnectorError::InvalidInput("Missing 'name' parameter".to_string())
                        .to_jsonrpc_error(),
                ),
            },
            _ => Err(ConnectorError::MethodNotFound.to_jsonrpc_error()),
        };

        match result {
            Ok(result) => json!({
                "jsonrpc": "2.0",
                "result": result,
                "id": id,
            }),
            Err(error) => json!({
                "jsonrpc": "2.0",
                "error": error,
                "id": id,
            }),
        }
    }
}

fn to_rpc<T: serde::Serialize>(result: Result<T, ConnectorError>) -> Result<Value, Value> {
    result
        .and_then(|r| serde_json::to_value(r).map_err(ConnectorError::SerdeJson))
        .map_err(|e| e.to_jsonrpc_error())
}
