use crate::error::ConnectorError;
use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use serde_json::{Map as JsonMap, Value as JsonValue};

/// Tool result carrying `data` as structured content. When `text_fallback` is
/// given it becomes the text content; otherwise the JSON is rendered compactly
/// so clients that ignore `structuredContent` still see the payload.
pub fn structured_result_with_text<T: Serialize>(
    data: &T,
    text_fallback: Option<String>,
) -> Result<CallToolResult, ConnectorError> {
    let value = serde_json::to_value(data).map_err(|e| ConnectorError::Other(e.to_string()))?;

    // Non-object payloads are wrapped under a `data` key.
    let map: JsonMap<String, JsonValue> = match value {
        JsonValue::Object(m) => m,
        other => {
            let mut m = JsonMap::new();
            m.insert("data".to_string(), other);
            m
        }
    };
    let structured = JsonValue::Object(map);
    let text = match text_fallback {
        Some(t) => t,
        None => serde_json::to_string(&structured)?,
    };

    Ok(CallToolResult {
        content: vec![Content::text(text)],
        structured_content: Some(structured),
        is_error: Some(false),
        meta: None,
    })
}

/// Plain text tool result.
pub fn text_result(text: impl Into<String>) -> CallToolResult {
    CallToolResult {
        content: vec![Content::text(text.into())],
        structured_content: None,
        is_error: Some(false),
        meta: None,
    }
}

/// First text block of a tool result, if any.
pub fn first_text(result: &CallToolResult) -> Option<&str> {
    result
        .content
        .iter()
        .find_map(|c| c.as_text().map(|t| t.text.as_str()))
}
