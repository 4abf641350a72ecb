//! Connection health tracking
//!
//! [`SharedBridgeState`] holds whether the editor is currently reachable. It
//! is updated by the [`HealthMonitor`] on a fixed interval and by client
//! calls that discover a change. Each connected/disconnected transition is
//! logged once at info level; steady-state probes only at trace.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{info, trace};

/// Default delay between probes
pub const DEFAULT_HEALTH_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BridgeState {
    pub connected: bool,
    pub last_checked_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    Connected,
    Disconnected,
}

/// Process-wide bridge state, cheap to clone
#[derive(Debug, Clone, Default)]
pub struct SharedBridgeState {
    inner: Arc<RwLock<BridgeState>>,
}

impl SharedBridgeState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> BridgeState {
        *self.inner.read()
    }

    pub fn is_connected(&self) -> bool {
        self.inner.read().connected
    }

    /// Record one observation; returns the transition if the state flipped
    pub fn record(&self, reachable: bool) -> Option<Transition> {
        let transition = {
            let mut state = self.inner.write();
            let was = state.connected;
            state.connected = reachable;
            state.last_checked_at = Some(Utc::now());
            match (was, reachable) {
                (false, true) => Some(Transition::Connected),
                (true, false) => Some(Transition::Disconnected),
                _ => None,
            }
        };

        match transition {
            Some(Transition::Connected) => info!("Editor bridge connected"),
            Some(Transition::Disconnected) => info!("Editor bridge disconnected"),
            None => trace!(connected = reachable, "Editor bridge state unchanged"),
        }
        transition
    }
}

/// Liveness check used by the monitor
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self) -> bool;
}

pub struct HealthMonitor<P> {
    probe: P,
    state: SharedBridgeState,
    interval: Duration,
}

impl<P: Probe + 'static> HealthMonitor<P> {
    pub fn new(probe: P, state: SharedBridgeState, interval: Duration) -> Self {
        Self {
            probe,
            state,
            interval,
        }
    }

    /// Run one probe and record the result
    pub async fn check_once(&self) -> Option<Transition> {
        let reachable = self.probe.probe().await;
        self.state.record(reachable)
    }

    /// Probe immediately, then every interval, until the task is aborted
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                self.check_once().await;
            }
        })
    }

    pub fn state(&self) -> &SharedBridgeState {
        &self.state
    }
}
