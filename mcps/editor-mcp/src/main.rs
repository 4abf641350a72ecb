//! Editor MCP - tool facade over the editor command bridge
//!
//! Connection settings come from `EDITOR_BRIDGE_*` variables or
//! `.editor-bridge.toml`, same as the `editor-bridge` CLI.

use editor_bridge::BridgeConfig;
use editor_mcp::EditorMcpServer;
use rmcp::ServiceExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    mcp_common::init_tracing("editor_mcp")?;

    let config = BridgeConfig::load()?;
    let server = EditorMcpServer::new(&config)?;
    tracing::info!(addr = %config.listen_addr()?, "Starting editor_mcp MCP Server");

    let monitor = server.spawn_monitor(config.health_interval());
    let service = server.serve(rmcp::transport::stdio()).await?;

    tracing::info!("Server running, waiting for requests...");
    service.waiting().await?;

    monitor.abort();
    tracing::info!("Server shutting down");
    Ok(())
}
