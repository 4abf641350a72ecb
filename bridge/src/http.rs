//! HTTP binding of the listener
//!
//! - `GET /` reports status and the available commands.
//! - `POST /` takes a command envelope (`{"type": ..., "params": ...}` or any
//!   other accepted shape) and returns the result envelope.
//!
//! Commands are not run on the HTTP task. They go through the listener's
//! command queue and are dispatched on its next tick, like TCP traffic.

use std::future::Future;
use std::net::SocketAddr;
use std::time::Duration;

use axum::{body::Bytes, extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

use crate::error::BridgeError;
use crate::listener::{CommandSender, QueueError};
use crate::protocol::{parse_command, ResultEnvelope};
use crate::registry::CommandRegistry;

/// How long a request waits for the tick loop before answering 504
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone)]
pub struct HttpState {
    commands: CommandSender,
    registry: CommandRegistry,
    request_timeout: Duration,
}

impl HttpState {
    pub fn new(commands: CommandSender, registry: CommandRegistry) -> Self {
        Self {
            commands,
            registry,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub service: &'static str,
    pub version: &'static str,
    pub ready: bool,
    pub available_commands: Vec<String>,
}

pub fn router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(status).post(command))
        .with_state(state)
}

/// Bind the HTTP socket
pub async fn bind(addr: SocketAddr) -> Result<tokio::net::TcpListener, BridgeError> {
    tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| BridgeError::Bind { addr, source })
}

/// Serve until `shutdown` resolves
pub async fn serve(
    listener: tokio::net::TcpListener,
    state: HttpState,
    shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), BridgeError> {
    if let Ok(addr) = listener.local_addr() {
        tracing::info!("HTTP binding listening on http://{}", addr);
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    Ok(())
}

async fn status(State(state): State<HttpState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "online",
        service: env!("CARGO_PKG_NAME"),
        version: env!("CARGO_PKG_VERSION"),
        ready: !state.commands.is_closed(),
        available_commands: state.registry.names(),
    })
}

async fn command(
    State(state): State<HttpState>,
    body: Bytes,
) -> (StatusCode, Json<ResultEnvelope>) {
    let envelope = match parse_command(&body) {
        Ok(envelope) => envelope,
        Err(e) => {
            tracing::warn!("Rejected HTTP command: {}", e);
            return (
                StatusCode::BAD_REQUEST,
                Json(ResultEnvelope::failure(e.to_string())),
            );
        }
    };

    let name = envelope.name.clone();
    match state.commands.dispatch(envelope, state.request_timeout).await {
        Ok(result) => (StatusCode::OK, Json(result)),
        Err(QueueError::Timeout) => {
            tracing::warn!("HTTP command timed out: {}", name);
            (StatusCode::GATEWAY_TIMEOUT, Json(ResultEnvelope::timeout()))
        }
        Err(e @ QueueError::Closed) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ResultEnvelope::failure(e.to_string())),
        ),
    }
}
