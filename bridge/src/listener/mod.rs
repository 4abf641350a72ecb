//! Tick-driven command listener
//!
//! The listener lives inside the host and never blocks it: all socket work
//! happens in [`Listener::tick`], which does a bounded amount of accepting,
//! reading, dispatching and writing, then returns. The host calls `tick`
//! from its own loop (a tokio interval in the `serve` binary, or
//! [`pump::spawn`] for a dedicated thread).

mod connection;
pub mod pump;

use std::net::{SocketAddr, TcpListener};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::error::BridgeError;
use crate::protocol::{CommandEnvelope, DecodeError, ResultEnvelope, DEFAULT_MAX_FRAME_BYTES};
use crate::registry::CommandRegistry;
use connection::Connection;

/// Limits applied by each tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerConfig {
    pub max_connections: usize,
    pub accept_per_tick: usize,
    pub frames_per_tick: usize,
    pub read_budget_bytes: usize,
    pub max_frame_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            max_connections: 32,
            accept_per_tick: 8,
            frames_per_tick: 16,
            read_budget_bytes: 64 * 1024,
            max_frame_bytes: DEFAULT_MAX_FRAME_BYTES,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ListenerState {
    Stopped,
    Starting,
    Running,
    Stopping,
}

/// Work done by one tick
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickStats {
    pub accepted: usize,
    pub frames: usize,
    pub queued: usize,
    pub closed: usize,
}

impl TickStats {
    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

// ============================================================================
// In-process command queue
// ============================================================================

struct QueuedCommand {
    envelope: CommandEnvelope,
    reply: oneshot::Sender<ResultEnvelope>,
}

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueueError {
    /// The listener was dropped or stopped before answering
    #[error("listener is not running")]
    Closed,

    #[error("timed out waiting for the listener")]
    Timeout,
}

/// Handle for submitting commands that are dispatched on the listener's tick
#[derive(Clone)]
pub struct CommandSender {
    tx: mpsc::UnboundedSender<QueuedCommand>,
}

impl CommandSender {
    /// Queue `envelope` and wait up to `timeout` for its result
    pub async fn dispatch(
        &self,
        envelope: CommandEnvelope,
        timeout: Duration,
    ) -> Result<ResultEnvelope, QueueError> {
        let (reply, rx) = oneshot::channel();
        self.tx
            .send(QueuedCommand { envelope, reply })
            .map_err(|_| QueueError::Closed)?;
        match tokio::time::timeout(timeout, rx).await {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(_)) => Err(QueueError::Closed),
            Err(_) => Err(QueueError::Timeout),
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

// ============================================================================
// Listener
// ============================================================================

pub struct Listener {
    registry: CommandRegistry,
    config: ListenerConfig,
    state: ListenerState,
    socket: Option<TcpListener>,
    local_addr: Option<SocketAddr>,
    connections: Vec<Connection>,
    next_conn_id: u64,
    queue_tx: mpsc::UnboundedSender<QueuedCommand>,
    queue_rx: mpsc::UnboundedReceiver<QueuedCommand>,
}

impl Listener {
    pub fn new(registry: CommandRegistry, config: ListenerConfig) -> Self {
        let (queue_tx, queue_rx) = mpsc::unbounded_channel();
        Self {
            registry,
            config,
            state: ListenerState::Stopped,
            socket: None,
            local_addr: None,
            connections: Vec::new(),
            next_conn_id: 1,
            queue_tx,
            queue_rx,
        }
    }

    /// Bind and start accepting connections
    ///
    /// Returns the bound address (useful with port 0). Calling this while
    /// already running does nothing and returns the current address. A bind
    /// failure is reported and not retried.
    pub fn start(&mut self, addr: SocketAddr) -> Result<SocketAddr, BridgeError> {
        if let (ListenerState::Running, Some(bound)) = (self.state, self.local_addr) {
            debug!(addr = %bound, "Listener already running");
            return Ok(bound);
        }

        self.state = ListenerState::Starting;
        let socket = match TcpListener::bind(addr) {
            Ok(socket) => socket,
            Err(source) => {
                self.state = ListenerState::Stopped;
                return Err(BridgeError::Bind { addr, source });
            }
        };
        let bound = match socket.set_nonblocking(true).and_then(|_| socket.local_addr()) {
            Ok(bound) => bound,
            Err(e) => {
                self.state = ListenerState::Stopped;
                return Err(e.into());
            }
        };

        // A previous stop() closed the queue; senders from before it stay closed
        if self.queue_tx.is_closed() {
            let (queue_tx, queue_rx) = mpsc::unbounded_channel();
            self.queue_tx = queue_tx;
            self.queue_rx = queue_rx;
        }

        self.socket = Some(socket);
        self.local_addr = Some(bound);
        self.state = ListenerState::Running;
        info!(addr = %bound, commands = self.registry.len(), "Listener started");
        Ok(bound)
    }

    /// Close every connection and the listening socket
    ///
    /// Safe to call in any state. Commands waiting in the queue are answered
    /// with a failure, and existing [`CommandSender`]s report `Closed` from
    /// now on; `start` opens a fresh queue.
    pub fn stop(&mut self) {
        if self.state == ListenerState::Stopped && self.socket.is_none() {
            return;
        }
        self.state = ListenerState::Stopping;

        let closed = self.connections.len();
        for conn in self.connections.drain(..) {
            conn.shutdown();
        }
        self.socket = None;

        self.queue_rx.close();
        while let Ok(queued) = self.queue_rx.try_recv() {
            let _ = queued.reply.send(ResultEnvelope::failure("listener stopped"));
        }

        self.state = ListenerState::Stopped;
        info!(
            addr = ?self.local_addr,
            connections = closed,
            "Listener stopped"
        );
    }

    /// Do one bounded unit of work
    pub fn tick(&mut self) -> TickStats {
        let mut stats = TickStats::default();
        if self.state != ListenerState::Running {
            return stats;
        }

        stats.accepted = self.accept_pending();

        let config = self.config;
        for conn in &mut self.connections {
            // Backpressure: leave bytes in the socket until the backlog drains
            if !conn.is_backlogged(config.max_frame_bytes) {
                conn.read_available(config.read_budget_bytes);
            }

            // Once the peer is done sending, finish what it sent
            let limit = if conn.at_eof() {
                usize::MAX
            } else {
                config.frames_per_tick
            };
            let mut handled = 0;
            while handled < limit && conn.pending_out() < config.max_frame_bytes {
                match conn.next_command() {
                    Ok(Some(envelope)) => {
                        let result = self
                            .registry
                            .dispatch(&envelope.name, &envelope.params)
                            .with_id(envelope.id);
                        conn.queue(&result);
                        handled += 1;
                    }
                    Ok(None) => break,
                    Err(err @ DecodeError::Malformed(_)) => {
                        warn!(conn = conn.id, peer = %conn.peer, error = %err, "Malformed frame");
                        conn.queue(&ResultEnvelope::failure(err.to_string()));
                        handled += 1;
                    }
                    Err(err @ DecodeError::FrameTooLarge { .. }) => {
                        warn!(conn = conn.id, peer = %conn.peer, error = %err, "Closing connection");
                        conn.queue(&ResultEnvelope::failure(err.to_string()));
                        conn.close_after_flush();
                        break;
                    }
                }
            }
            stats.frames += handled;
            conn.flush();
        }

        stats.queued = self.drain_queue();

        let before = self.connections.len();
        self.connections.retain(|conn| {
            if conn.is_finished() {
                debug!(conn = conn.id, peer = %conn.peer, "Connection removed");
                conn.shutdown();
                false
            } else {
                true
            }
        });
        stats.closed = before - self.connections.len();

        stats
    }

    fn accept_pending(&mut self) -> usize {
        let Some(socket) = &self.socket else {
            return 0;
        };

        let mut accepted = 0;
        while accepted < self.config.accept_per_tick
            && self.connections.len() < self.config.max_connections
        {
            match socket.accept() {
                Ok((stream, peer)) => {
                    let id = self.next_conn_id;
                    self.next_conn_id += 1;
                    match Connection::new(id, stream, peer, self.config.max_frame_bytes) {
                        Ok(conn) => {
                            debug!(conn = id, peer = %peer, "Accepted connection");
                            self.connections.push(conn);
                            accepted += 1;
                        }
                        Err(e) => warn!(peer = %peer, error = %e, "Failed to set up connection"),
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break,
                Err(e) => {
                    warn!(error = %e, "Accept failed");
                    break;
                }
            }
        }
        accepted
    }

    fn drain_queue(&mut self) -> usize {
        let mut handled = 0;
        while handled < self.config.frames_per_tick {
            let Ok(queued) = self.queue_rx.try_recv() else {
                break;
            };
            let envelope = queued.envelope;
            let result = self
                .registry
                .dispatch(&envelope.name, &envelope.params)
                .with_id(envelope.id);
            // The submitter may have given up already
            let _ = queued.reply.send(result);
            handled += 1;
        }
        handled
    }

    /// Sender for in-process commands dispatched on this listener's tick
    pub fn command_queue(&self) -> CommandSender {
        CommandSender {
            tx: self.queue_tx.clone(),
        }
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    pub fn is_running(&self) -> bool {
        self.state == ListenerState::Running
    }

    /// Address bound by the last successful `start`
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }
}

impl Drop for Listener {
    fn drop(&mut self) {
        self.stop();
    }
}
