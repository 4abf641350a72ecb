//! In-process tool execution
//!
//! Lets a host call a server's tools directly, without a stdio transport.
//!
//! ```rust,ignore
//! use mcp_common::EmbeddableMcp;
//! use editor_mcp::EditorMcpServer;
//!
//! let server = EditorMcpServer::new(config);
//! let result = server.call_tool("level_actors", serde_json::json!({ "limit": 5 })).await?;
//! ```

use async_trait::async_trait;
use rmcp::model::{CallToolResult, Tool};
use serde_json::Value;

#[derive(Debug, thiserror::Error)]
pub enum EmbeddableError {
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    #[error("mcp error: {0}")]
    Mcp(String),
}

impl From<serde_json::Error> for EmbeddableError {
    fn from(err: serde_json::Error) -> Self {
        EmbeddableError::InvalidParams(err.to_string())
    }
}

impl From<rmcp::ErrorData> for EmbeddableError {
    fn from(err: rmcp::ErrorData) -> Self {
        EmbeddableError::Mcp(err.message.to_string())
    }
}

pub type EmbeddableResult<T> = Result<T, EmbeddableError>;

/// A tool server callable in-process
///
/// Editor failures (unreachable, timeout, handler errors) come back as
/// `Ok` error results; `Err` is reserved for unknown tools and bad arguments.
#[async_trait]
pub trait EmbeddableMcp: Send + Sync {
    fn server_name(&self) -> &str;

    fn list_tools(&self) -> Vec<Tool>;

    async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult>;

    fn has_tool(&self, name: &str) -> bool {
        self.list_tools().iter().any(|tool| tool.name == name)
    }

    fn server_version(&self) -> Option<&str> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct EchoServer;

    #[async_trait]
    impl EmbeddableMcp for EchoServer {
        fn server_name(&self) -> &str {
            "echo"
        }

        fn list_tools(&self) -> Vec<Tool> {
            let schema = serde_json::json!({ "type": "object" });
            let schema = schema.as_object().cloned().unwrap_or_default();
            vec![Tool::new("echo", "Echo the parameters", Arc::new(schema))]
        }

        async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult> {
            if name != "echo" {
                return Err(EmbeddableError::ToolNotFound(name.to_string()));
            }
            crate::json_success(&params).map_err(Into::into)
        }
    }

    #[test]
    fn test_has_tool() {
        assert!(EchoServer.has_tool("echo"));
        assert!(!EchoServer.has_tool("spawn"));
    }

    #[tokio::test]
    async fn test_call_known_and_unknown() {
        let ok = EchoServer
            .call_tool("echo", serde_json::json!({ "x": 1 }))
            .await
            .unwrap();
        assert!(!ok.is_error.unwrap_or(false));

        let missing = EchoServer.call_tool("spawn", serde_json::json!({})).await;
        assert!(matches!(missing, Err(EmbeddableError::ToolNotFound(_))));
    }
}
