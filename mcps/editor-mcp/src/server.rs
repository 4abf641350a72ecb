//! MCP server exposing editor commands as tools
//!
//! Every tool is exactly one bridge call. Editor-side failures and an
//! unreachable editor come back as readable error results, so a model can
//! tell "the actor does not exist" apart from "the editor is closed".

use std::time::Duration;

use editor_bridge::monitor::HealthMonitor;
use editor_bridge::protocol::{Params, ERROR_UNREACHABLE, HELP_COMMAND};
use editor_bridge::{BridgeClient, BridgeConfig, BridgeError, ClientConfig, SharedBridgeState};
use mcp_common::{
    async_trait, bridge_result, failure_message, invalid_params, json_success, CallToolResult,
    EmbeddableError, EmbeddableMcp, EmbeddableResult, McpError, ResultExt, Tool,
};
use rmcp::{
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::{ServerCapabilities, ServerInfo},
    tool, tool_handler, tool_router,
};
use serde::Serialize;
use serde_json::{json, Value};
use tokio::task::JoinHandle;

use crate::params::*;

/// The Editor MCP Server
#[derive(Clone)]
pub struct EditorMcpServer {
    client: BridgeClient,
    state: SharedBridgeState,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl EditorMcpServer {
    /// Create a server talking to the editor described by `config`
    pub fn new(config: &BridgeConfig) -> Result<Self, BridgeError> {
        Ok(Self::with_client_config(ClientConfig::from_bridge_config(
            config,
        )?))
    }

    pub fn with_client_config(config: ClientConfig) -> Self {
        let state = SharedBridgeState::new();
        Self {
            client: BridgeClient::with_state(config, state.clone()),
            state,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(description = "Check whether the editor is running and reachable")]
    async fn test_connection(&self) -> Result<CallToolResult, McpError> {
        let connected = self.client.probe().await;
        self.state.record(connected);
        let snapshot = self.state.snapshot();

        let message = if connected {
            "Editor is connected.".to_string()
        } else {
            failure_message(ERROR_UNREACHABLE)
        };
        json_success(&json!({
            "connected": connected,
            "address": self.client.config().addr.to_string(),
            "lastCheckedAt": snapshot.last_checked_at,
            "message": message,
        }))
    }

    #[tool(description = "List the commands the editor accepts, with their parameters")]
    async fn list_commands(
        &self,
        Parameters(params): Parameters<ListCommandsParams>,
    ) -> Result<CallToolResult, McpError> {
        self.forward(HELP_COMMAND, &params).await
    }

    #[tool(description = "Run any registered editor command with JSON parameters")]
    async fn run_command(
        &self,
        Parameters(params): Parameters<RunCommandParams>,
    ) -> Result<CallToolResult, McpError> {
        let command = params.command.trim();
        if command.is_empty() {
            return Err(invalid_params("command cannot be empty"));
        }
        let args = params.params.unwrap_or_default();
        let result = match params.timeout_ms {
            Some(ms) => {
                self.client
                    .call(command, args, Duration::from_millis(ms))
                    .await
            }
            None => self.client.call_default(command, args).await,
        };
        Ok(bridge_result(&result))
    }

    #[tool(description = "Spawn an actor of the given class in the current level")]
    async fn actor_spawn(
        &self,
        Parameters(params): Parameters<ActorSpawnParams>,
    ) -> Result<CallToolResult, McpError> {
        self.forward("spawn_actor", &params).await
    }

    #[tool(description = "Delete an actor from the current level by name")]
    async fn actor_delete(
        &self,
        Parameters(params): Parameters<ActorDeleteParams>,
    ) -> Result<CallToolResult, McpError> {
        self.forward("delete_actor", &params).await
    }

    #[tool(description = "Change an actor's transform or folder")]
    async fn actor_modify(
        &self,
        Parameters(params): Parameters<ActorModifyParams>,
    ) -> Result<CallToolResult, McpError> {
        self.forward("modify_actor", &params).await
    }

    #[tool(description = "List actors in the current level, optionally filtered by class or name")]
    async fn level_actors(
        &self,
        Parameters(params): Parameters<LevelActorsParams>,
    ) -> Result<CallToolResult, McpError> {
        self.forward("list_actors", &params).await
    }

    #[tool(description = "Get project name, engine version and current level")]
    async fn project_info(&self) -> Result<CallToolResult, McpError> {
        let result = self.client.call_default("project_info", Params::new()).await;
        Ok(bridge_result(&result))
    }
}

impl EditorMcpServer {
    /// Keep the connection state fresh in the background
    pub fn spawn_monitor(&self, interval: Duration) -> JoinHandle<()> {
        HealthMonitor::new(self.client.clone(), self.state.clone(), interval).spawn()
    }

    pub fn state(&self) -> &SharedBridgeState {
        &self.state
    }

    async fn forward<T: Serialize>(
        &self,
        command: &str,
        params: &T,
    ) -> Result<CallToolResult, McpError> {
        let params = to_params(params)?;
        let result = self.client.call_default(command, params).await;
        Ok(bridge_result(&result))
    }
}

fn to_params<T: Serialize>(params: &T) -> Result<Params, McpError> {
    match serde_json::to_value(params).to_mcp_err()? {
        Value::Object(map) => Ok(map),
        _ => Err(invalid_params("tool parameters must be a JSON object")),
    }
}

#[tool_handler]
impl rmcp::ServerHandler for EditorMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            instructions: Some(
                "Controls a running game editor through its command bridge. \
                 Use test_connection first if calls report the editor as unreachable, \
                 and list_commands to discover what run_command accepts."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}

#[async_trait]
impl EmbeddableMcp for EditorMcpServer {
    fn server_name(&self) -> &str {
        "editor"
    }

    fn server_version(&self) -> Option<&str> {
        Some(env!("CARGO_PKG_VERSION"))
    }

    fn list_tools(&self) -> Vec<Tool> {
        self.tool_router.list_all()
    }

    async fn call_tool(&self, name: &str, params: Value) -> EmbeddableResult<CallToolResult> {
        match name {
            "test_connection" => self.test_connection().await.map_err(Into::into),

            "list_commands" => {
                let params: ListCommandsParams = serde_json::from_value(params)?;
                self.list_commands(Parameters(params)).await.map_err(Into::into)
            }

            "run_command" => {
                let params: RunCommandParams = serde_json::from_value(params)?;
                self.run_command(Parameters(params)).await.map_err(Into::into)
            }

            "actor_spawn" => {
                let params: ActorSpawnParams = serde_json::from_value(params)?;
                self.actor_spawn(Parameters(params)).await.map_err(Into::into)
            }

            "actor_delete" => {
                let params: ActorDeleteParams = serde_json::from_value(params)?;
                self.actor_delete(Parameters(params)).await.map_err(Into::into)
            }

            "actor_modify" => {
                let params: ActorModifyParams = serde_json::from_value(params)?;
                self.actor_modify(Parameters(params)).await.map_err(Into::into)
            }

            "level_actors" => {
                let params: LevelActorsParams = serde_json::from_value(params)?;
                self.level_actors(Parameters(params)).await.map_err(Into::into)
            }

            "project_info" => self.project_info().await.map_err(Into::into),

            _ => Err(EmbeddableError::ToolNotFound(name.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use editor_bridge::host;
    use editor_bridge::listener::pump::{self, PumpHandle};
    use editor_bridge::{Listener, ListenerConfig};
    use std::net::SocketAddr;

    fn start_host() -> (PumpHandle, SocketAddr) {
        let (registry, _scene) = host::reference_registry().unwrap();
        let mut listener = Listener::new(registry, ListenerConfig::default());
        let addr = listener.start("127.0.0.1:0".parse().unwrap()).unwrap();
        (pump::spawn(listener, Duration::from_millis(2)).unwrap(), addr)
    }

    /// Address nothing listens on
    fn stopped_editor() -> SocketAddr {
        let (registry, _scene) = host::reference_registry().unwrap();
        let mut listener = Listener::new(registry, ListenerConfig::default());
        let addr = listener.start("127.0.0.1:0".parse().unwrap()).unwrap();
        listener.stop();
        addr
    }

    fn text(result: &CallToolResult) -> String {
        result.content[0]
            .as_text()
            .map(|t| t.text.to_string())
            .unwrap_or_default()
    }

    fn is_error(result: &CallToolResult) -> bool {
        result.is_error.unwrap_or(false)
    }

    #[test]
    fn test_lists_all_tools() {
        let server = EditorMcpServer::with_client_config(ClientConfig::new(stopped_editor()));
        let names: Vec<String> = server
            .list_tools()
            .iter()
            .map(|t| t.name.to_string())
            .collect();
        for expected in [
            "test_connection",
            "list_commands",
            "run_command",
            "actor_spawn",
            "actor_delete",
            "actor_modify",
            "level_actors",
            "project_info",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {}", expected);
        }
        assert_eq!(server.server_name(), "editor");
    }

    #[tokio::test]
    async fn test_stopped_editor_gives_readable_error() {
        let server = EditorMcpServer::with_client_config(ClientConfig::new(stopped_editor()));

        let result = server
            .call_tool("actor_spawn", json!({ "class": "PointLight" }))
            .await
            .unwrap();
        assert!(is_error(&result));
        assert!(text(&result).contains("not reachable"));
        assert!(!server.state().is_connected());

        let status = server.call_tool("test_connection", json!({})).await.unwrap();
        assert!(!is_error(&status));
        assert!(text(&status).contains("\"connected\": false"));
    }

    #[tokio::test]
    async fn test_running_host_returns_data() {
        let (pump, addr) = start_host();
        let server = EditorMcpServer::with_client_config(ClientConfig::new(addr));

        let spawned = server
            .call_tool(
                "actor_spawn",
                json!({ "class": "PointLight", "location": [0.0, 0.0, 200.0] }),
            )
            .await
            .unwrap();
        assert!(!is_error(&spawned), "{}", text(&spawned));
        assert!(text(&spawned).contains("PointLight_1"));
        assert!(server.state().is_connected());

        let listed = server
            .call_tool("level_actors", json!({ "filter": "light" }))
            .await
            .unwrap();
        let listed: Value = serde_json::from_str(&text(&listed)).unwrap();
        assert_eq!(listed["totalCount"], 1);
        assert_eq!(listed["currentLevel"], "Main");

        let deleted = server
            .call_tool("actor_delete", json!({ "name": "Ghost" }))
            .await
            .unwrap();
        assert!(is_error(&deleted));
        assert_eq!(text(&deleted), "actor not found: Ghost");

        pump.shutdown();
    }

    #[tokio::test]
    async fn test_run_command_and_help() {
        let (pump, addr) = start_host();
        let server = EditorMcpServer::with_client_config(ClientConfig::new(addr));

        let echoed = server
            .call_tool(
                "run_command",
                json!({ "command": "echo", "params": { "x": 1 } }),
            )
            .await
            .unwrap();
        let echoed: Value = serde_json::from_str(&text(&echoed)).unwrap();
        assert_eq!(echoed["x"], 1);

        let help = server.call_tool("list_commands", json!({})).await.unwrap();
        assert!(text(&help).contains("spawn_actor"));

        let empty = server
            .call_tool("run_command", json!({ "command": "  " }))
            .await;
        assert!(matches!(empty, Err(EmbeddableError::Mcp(_))));

        pump.shutdown();
    }

    #[tokio::test]
    async fn test_bad_arguments_and_unknown_tool() {
        let server = EditorMcpServer::with_client_config(ClientConfig::new(stopped_editor()));

        let missing_class = server.call_tool("actor_spawn", json!({})).await;
        assert!(matches!(missing_class, Err(EmbeddableError::InvalidParams(_))));

        let unknown = server.call_tool("spawn_tree", json!({})).await;
        assert!(matches!(unknown, Err(EmbeddableError::ToolNotFound(_))));
    }

    #[tokio::test]
    async fn test_monitor_tracks_host() {
        let (pump, addr) = start_host();
        let server = EditorMcpServer::with_client_config(ClientConfig::new(addr));

        let monitor = server.spawn_monitor(Duration::from_millis(20));
        for _ in 0..100 {
            if server.state().is_connected() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(server.state().is_connected());

        monitor.abort();
        pump.shutdown();
    }
}
