//! MCP Common - shared plumbing for bridge-backed MCP servers
//!
//! - **Tracing**: [`init_tracing`] sets up stderr logging (stdout carries MCP)
//! - **Results**: [`bridge_result`] turns a bridge [`ResultEnvelope`] into a
//!   `CallToolResult`, with readable text for transport failures
//! - **Errors**: [`IntoMcpError`] / [`ResultExt`] for `?` in tool bodies
//! - **Embeddable**: [`EmbeddableMcp`] for in-process execution
//!
//! ```rust,ignore
//! use mcp_common::bridge_result;
//!
//! async fn level_actors(&self) -> Result<CallToolResult, McpError> {
//!     let result = self.client.call_default("list_actors", Params::new()).await;
//!     Ok(bridge_result(&result))
//! }
//! ```
//!
//! [`ResultEnvelope`]: editor_bridge::protocol::ResultEnvelope

pub mod embeddable;
pub mod error;
pub mod init;
pub mod result;

pub use embeddable::{EmbeddableError, EmbeddableMcp, EmbeddableResult};
pub use error::{internal_error, invalid_params, IntoMcpError, McpResult, ResultExt};
pub use init::init_tracing;
pub use result::{bridge_result, failure_message, json_success, text_success};

pub use rmcp::{
    model::{CallToolResult, Content, Tool},
    ErrorData as McpError,
};

pub use async_trait::async_trait;
