//! Editor MCP Library
//!
//! Exposes a running editor's bridge commands as MCP tools: spawning,
//! deleting and modifying actors, listing the level, and a generic
//! `run_command` for anything else the editor registers.
//!
//! # Usage as Library
//!
//! ```rust,ignore
//! use editor_mcp::{EditorMcpServer, EmbeddableMcp};
//!
//! let server = EditorMcpServer::new(&BridgeConfig::load()?)?;
//! let result = server.call_tool("project_info", serde_json::json!({})).await?;
//! ```
//!
//! # Usage as Binary
//!
//! Run directly: `editor-mcp`
//!
//! Or configure in `.mcp.json`:
//! ```json
//! { "mcpServers": { "editor": { "command": "./editor-mcp" } } }
//! ```

pub mod params;
pub mod server;

pub use server::EditorMcpServer;

pub use params::*;

pub use mcp_common::{EmbeddableError, EmbeddableMcp, EmbeddableResult};
