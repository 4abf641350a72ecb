//! Caller-side client for the editor bridge
//!
//! `call` always produces a [`ResultEnvelope`]: transport problems become
//! `failure("unreachable")`, `failure("timeout")` or
//! `failure("protocol error: ...")` rather than errors the caller must
//! handle.
//!
//! Connections are kept in a small idle pool. A connection is checked out
//! for exactly one call, so requests never interleave on a socket. A
//! connection that timed out or failed is dropped, which also discards any
//! late response still in flight on it.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tracing::{debug, trace};

use crate::config::BridgeConfig;
use crate::error::BridgeError;
use crate::monitor::{Probe, SharedBridgeState};
use crate::protocol::{
    encode_command, CommandEnvelope, DecodeError, FrameDecoder, Params, ResultEnvelope,
    PING_COMMAND,
};

const READ_CHUNK: usize = 8 * 1024;

/// Why a call produced no result from the listener
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CallFailure {
    #[error("timeout")]
    Timeout,

    #[error("unreachable")]
    Unreachable,

    #[error("protocol error: {0}")]
    Protocol(String),
}

impl CallFailure {
    pub fn into_envelope(self) -> ResultEnvelope {
        match self {
            CallFailure::Timeout => ResultEnvelope::timeout(),
            CallFailure::Unreachable => ResultEnvelope::unreachable(),
            other => ResultEnvelope::failure(other.to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub addr: SocketAddr,
    pub call_timeout: Duration,
    pub probe_timeout: Duration,
    /// Idle connections kept for reuse
    pub pool_size: usize,
    pub max_frame_bytes: usize,
}

impl ClientConfig {
    pub fn new(addr: SocketAddr) -> Self {
        Self {
            addr,
            call_timeout: Duration::from_secs(10),
            probe_timeout: Duration::from_secs(1),
            pool_size: 4,
            max_frame_bytes: crate::protocol::DEFAULT_MAX_FRAME_BYTES,
        }
    }

    pub fn from_bridge_config(config: &BridgeConfig) -> Result<Self, BridgeError> {
        Ok(Self {
            call_timeout: config.call_timeout(),
            probe_timeout: config.probe_timeout(),
            max_frame_bytes: config.listener.limits.max_frame_bytes,
            ..Self::new(config.listen_addr()?)
        })
    }
}

struct PooledConn {
    stream: TcpStream,
    decoder: FrameDecoder,
}

/// How a single request/response exchange ended without a result
enum ExchangeError {
    /// A reused connection was already dead; worth one retry
    Stale,
    Failed(CallFailure),
}

/// Failures inside one exchange, before classification
enum RoundTripError {
    Io(io::Error),
    Closed,
    Decode(DecodeError),
}

struct ClientInner {
    config: ClientConfig,
    pool: Mutex<Vec<PooledConn>>,
    next_id: AtomicU64,
    state: Option<SharedBridgeState>,
}

/// Cheap-to-clone handle; clones share the pool and id counter
#[derive(Clone)]
pub struct BridgeClient {
    inner: Arc<ClientInner>,
}

impl BridgeClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                pool: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                state: None,
            }),
        }
    }

    /// Client that keeps `state` up to date from call outcomes
    pub fn with_state(config: ClientConfig, state: SharedBridgeState) -> Self {
        Self {
            inner: Arc::new(ClientInner {
                config,
                pool: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                state: Some(state),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    pub fn state(&self) -> Option<&SharedBridgeState> {
        self.inner.state.as_ref()
    }

    /// Run `name` on the listener and wait up to `timeout` for the result
    pub async fn call(&self, name: &str, params: Params, timeout: Duration) -> ResultEnvelope {
        let outcome = self.try_call(name, params, timeout).await;
        if let Some(state) = &self.inner.state {
            match &outcome {
                Ok(_) => {
                    state.record(true);
                }
                Err(CallFailure::Unreachable) => {
                    state.record(false);
                }
                Err(_) => {}
            }
        }
        match outcome {
            Ok(result) => result,
            Err(failure) => {
                debug!(command = %name, error = %failure, "Bridge call failed");
                failure.into_envelope()
            }
        }
    }

    /// [`call`](Self::call) with the configured default timeout
    pub async fn call_default(&self, name: &str, params: Params) -> ResultEnvelope {
        self.call(name, params, self.inner.config.call_timeout).await
    }

    /// Send `ping` with the short probe timeout
    ///
    /// Logs only at trace level and does not touch the shared state; the
    /// health monitor records the outcome.
    pub async fn probe(&self) -> bool {
        let reachable = match self
            .try_call(PING_COMMAND, Params::new(), self.inner.config.probe_timeout)
            .await
        {
            Ok(result) => result.is_success(),
            Err(_) => false,
        };
        trace!(addr = %self.inner.config.addr, reachable, "Probe");
        reachable
    }

    /// Like [`call`](Self::call) but keeps transport failures typed
    pub async fn try_call(
        &self,
        name: &str,
        params: Params,
        timeout: Duration,
    ) -> Result<ResultEnvelope, CallFailure> {
        let deadline = Instant::now() + timeout;
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        let frame = encode_command(&CommandEnvelope::new(name, params).with_id(id));

        if let Some(conn) = self.checkout() {
            match self.exchange(conn, &frame, id, deadline, true).await {
                Ok(result) => return Ok(result),
                Err(ExchangeError::Failed(failure)) => return Err(failure),
                Err(ExchangeError::Stale) => {
                    trace!("Pooled connection was closed, reconnecting");
                }
            }
        }

        let conn = self.connect(deadline).await?;
        match self.exchange(conn, &frame, id, deadline, false).await {
            Ok(result) => Ok(result),
            Err(ExchangeError::Failed(failure)) => Err(failure),
            Err(ExchangeError::Stale) => Err(CallFailure::Unreachable),
        }
    }

    /// Drop all idle connections
    pub fn reset_pool(&self) {
        self.inner.pool.lock().clear();
    }

    pub fn idle_connections(&self) -> usize {
        self.inner.pool.lock().len()
    }

    fn checkout(&self) -> Option<PooledConn> {
        self.inner.pool.lock().pop()
    }

    fn checkin(&self, conn: PooledConn) {
        // Leftover bytes mean the stream is out of step; don't reuse it
        if conn.decoder.buffered() > 0 {
            return;
        }
        let mut pool = self.inner.pool.lock();
        if pool.len() < self.inner.config.pool_size {
            pool.push(conn);
        }
    }

    async fn connect(&self, deadline: Instant) -> Result<PooledConn, CallFailure> {
        let addr = self.inner.config.addr;
        let stream = match tokio::time::timeout_at(deadline, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                trace!(%addr, error = %e, "Connect failed");
                return Err(CallFailure::Unreachable);
            }
            Err(_) => {
                trace!(%addr, "Connect timed out");
                return Err(CallFailure::Unreachable);
            }
        };
        let _ = stream.set_nodelay(true);
        Ok(PooledConn {
            stream,
            decoder: FrameDecoder::new(self.inner.config.max_frame_bytes),
        })
    }

    async fn exchange(
        &self,
        mut conn: PooledConn,
        frame: &[u8],
        id: u64,
        deadline: Instant,
        reused: bool,
    ) -> Result<ResultEnvelope, ExchangeError> {
        match tokio::time::timeout_at(deadline, round_trip(&mut conn, frame, id)).await {
            Ok(Ok(result)) => {
                self.checkin(conn);
                Ok(result)
            }
            Ok(Err(RoundTripError::Decode(e))) => {
                Err(ExchangeError::Failed(CallFailure::Protocol(e.to_string())))
            }
            Ok(Err(RoundTripError::Io(_) | RoundTripError::Closed)) if reused => {
                Err(ExchangeError::Stale)
            }
            Ok(Err(RoundTripError::Io(e))) => {
                trace!(error = %e, "Connection failed during call");
                Err(ExchangeError::Failed(CallFailure::Unreachable))
            }
            Ok(Err(RoundTripError::Closed)) => {
                Err(ExchangeError::Failed(CallFailure::Unreachable))
            }
            Err(_) => Err(ExchangeError::Failed(CallFailure::Timeout)),
        }
    }
}

/// Write one request and read until the matching response arrives
async fn round_trip(
    conn: &mut PooledConn,
    frame: &[u8],
    id: u64,
) -> Result<ResultEnvelope, RoundTripError> {
    conn.stream.write_all(frame).await.map_err(RoundTripError::Io)?;

    let mut chunk = [0u8; READ_CHUNK];
    loop {
        while let Some(result) = conn.decoder.next_result().map_err(RoundTripError::Decode)? {
            match result.id() {
                // Listeners that don't echo ids can't be correlated; take the line
                Some(got) if got != id => {
                    trace!(expected = id, got, "Discarding response for another request");
                }
                _ => return Ok(result),
            }
        }

        let n = conn
            .stream
            .read(&mut chunk)
            .await
            .map_err(RoundTripError::Io)?;
        if n == 0 {
            return Err(RoundTripError::Closed);
        }
        conn.decoder.push(&chunk[..n]);
    }
}

#[async_trait]
impl Probe for BridgeClient {
    async fn probe(&self) -> bool {
        BridgeClient::probe(self).await
    }
}

impl std::fmt::Debug for BridgeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BridgeClient")
            .field("addr", &self.inner.config.addr)
            .field("idle", &self.idle_connections())
            .finish()
    }
}
