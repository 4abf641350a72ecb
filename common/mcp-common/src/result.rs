//! Tool result rendering
//!
//! Bridge outcomes are data, not protocol errors: a failed command or an
//! unreachable editor is returned as an error *result* the model can read,
//! never as an MCP error.

use editor_bridge::protocol::{ResultEnvelope, ERROR_TIMEOUT, ERROR_UNREACHABLE};
use rmcp::{
    model::{CallToolResult, Content},
    ErrorData as McpError,
};
use serde::Serialize;

/// Render a bridge result
///
/// Success becomes pretty-printed `data`; failure becomes an error result
/// with [`failure_message`] text.
pub fn bridge_result(result: &ResultEnvelope) -> CallToolResult {
    match (result.is_success(), result.data(), result.error()) {
        (true, Some(data), _) => match serde_json::to_string_pretty(data) {
            Ok(json) => CallToolResult::success(vec![Content::text(json)]),
            Err(e) => CallToolResult::error(vec![Content::text(e.to_string())]),
        },
        (true, None, _) => CallToolResult::success(vec![Content::text("{}")]),
        (false, _, error) => CallToolResult::error(vec![Content::text(failure_message(
            error.unwrap_or("command failed"),
        ))]),
    }
}

/// Human-readable text for a bridge error string
pub fn failure_message(error: &str) -> String {
    match error {
        ERROR_UNREACHABLE => {
            "Editor is not reachable. Make sure the editor is running with the bridge listener enabled."
                .to_string()
        }
        ERROR_TIMEOUT => {
            "Editor did not respond in time. It may be busy (loading, compiling) or paused."
                .to_string()
        }
        other => other.to_string(),
    }
}

/// Pretty-printed JSON success from any serializable value
pub fn json_success<T: Serialize>(data: &T) -> Result<CallToolResult, McpError> {
    let json = serde_json::to_string_pretty(data)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(json)]))
}

pub fn text_success(text: impl Into<String>) -> CallToolResult {
    CallToolResult::success(vec![Content::text(text.into())])
}
