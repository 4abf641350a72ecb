//! Error conversion for tool bodies
//!
//! Only setup-level failures become MCP errors. Command failures coming back
//! from the editor are results, see [`bridge_result`](crate::bridge_result).

use editor_bridge::{BridgeError, CommandError};
use rmcp::ErrorData as McpError;

pub type McpResult<T> = Result<T, McpError>;

/// Conversion into an MCP error, so `?` works via [`ResultExt::to_mcp_err`]
pub trait IntoMcpError {
    fn into_mcp_error(self) -> McpError;
}

impl IntoMcpError for BridgeError {
    fn into_mcp_error(self) -> McpError {
        match self {
            BridgeError::Config(msg) => {
                McpError::invalid_params(format!("bridge config error: {}", msg), None)
            }
            other => McpError::internal_error(other.to_string(), None),
        }
    }
}

impl IntoMcpError for CommandError {
    fn into_mcp_error(self) -> McpError {
        match self {
            CommandError::Validation { field, message } => McpError::invalid_params(
                message,
                Some(serde_json::json!({ "field": field })),
            ),
            other => McpError::internal_error(other.to_string(), None),
        }
    }
}

impl IntoMcpError for serde_json::Error {
    fn into_mcp_error(self) -> McpError {
        McpError::invalid_params(format!("JSON error: {}", self), None)
    }
}

impl IntoMcpError for std::io::Error {
    fn into_mcp_error(self) -> McpError {
        McpError::internal_error(format!("IO error: {}", self), None)
    }
}

impl IntoMcpError for anyhow::Error {
    fn into_mcp_error(self) -> McpError {
        McpError::internal_error(self.to_string(), None)
    }
}

impl IntoMcpError for String {
    fn into_mcp_error(self) -> McpError {
        McpError::internal_error(self, None)
    }
}

pub trait ResultExt<T> {
    fn to_mcp_err(self) -> Result<T, McpError>;
}

impl<T, E: IntoMcpError> ResultExt<T> for Result<T, E> {
    fn to_mcp_err(self) -> Result<T, McpError> {
        self.map_err(|e| e.into_mcp_error())
    }
}

pub fn internal_error(message: impl Into<String>) -> McpError {
    McpError::internal_error(message.into(), None)
}

/// Invalid-params error, for arguments rejected before reaching the editor
pub fn invalid_params(message: impl Into<String>) -> McpError {
    McpError::invalid_params(message.into(), None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rmcp::model::ErrorCode;

    #[test]
    fn test_validation_error_is_invalid_params() {
        let err = CommandError::validation("class", "missing required parameter: class")
            .into_mcp_error();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
        assert!(err.message.contains("class"));
    }

    #[test]
    fn test_bridge_error_is_internal() {
        let err = BridgeError::DuplicateCommand("ping".to_string()).into_mcp_error();
        assert_eq!(err.code, ErrorCode::INTERNAL_ERROR);
        assert!(err.message.contains("ping"));
    }

    #[test]
    fn test_result_ext() {
        let result: Result<(), serde_json::Error> = serde_json::from_str::<()>("{").map(|_| ());
        let err = result.to_mcp_err().unwrap_err();
        assert_eq!(err.code, ErrorCode::INVALID_PARAMS);
    }

    #[test]
    fn test_helpers() {
        assert!(internal_error("boom").message.contains("boom"));
        assert!(invalid_params("bad vector").message.contains("bad vector"));
    }
}
