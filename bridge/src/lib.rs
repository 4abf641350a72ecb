//! Editor Bridge
//!
//! Moves named commands with JSON parameters from an external tool-caller
//! into a running editor process and brings structured results back.
//!
//! - [`protocol`]: envelopes and newline-delimited JSON framing
//! - [`registry`]: command table with parameter validation
//! - [`listener`]: tick-driven TCP listener living inside the editor
//! - [`client`]: caller-side client with pooling and timeouts
//! - [`monitor`]: connection state and periodic health probes
//! - [`host`]: in-memory reference host used by `serve` and tests
//!
//! ```no_run
//! use editor_bridge::client::{BridgeClient, ClientConfig};
//! use editor_bridge::protocol::Params;
//! use std::time::Duration;
//!
//! # async fn example() {
//! let client = BridgeClient::new(ClientConfig::new("127.0.0.1:7000".parse().unwrap()));
//! let result = client.call("list_actors", Params::new(), Duration::from_secs(5)).await;
//! if result.is_success() {
//!     println!("{:?}", result.data());
//! }
//! # }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod host;
#[cfg(feature = "http")]
pub mod http;
pub mod listener;
pub mod monitor;
pub mod protocol;
pub mod registry;

pub use client::{BridgeClient, CallFailure, ClientConfig};
pub use config::BridgeConfig;
pub use error::{BridgeError, CommandError, HandlerError};
pub use listener::{CommandSender, Listener, ListenerConfig, ListenerState, TickStats};
pub use monitor::{BridgeState, HealthMonitor, Probe, SharedBridgeState, Transition};
pub use protocol::{CommandEnvelope, Params, ResultEnvelope};
pub use registry::{CommandInfo, CommandRegistry, ParamKind, ParamSchema};
