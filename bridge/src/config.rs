//! Configuration for the bridge
//!
//! Values come from, in increasing priority: built-in defaults, a TOML file,
//! `EDITOR_BRIDGE_*` environment variables, then command-line flags (applied
//! by the binaries).
//!
//! File search order:
//! 1. `EDITOR_BRIDGE_CONFIG` (must exist if set)
//! 2. `.editor-bridge.toml` in the current directory or any parent
//! 3. `~/.config/editor-bridge/config.toml`
//!
//! ```toml
//! [bridge]
//! host = "127.0.0.1"
//! port = 7000
//! call_timeout_ms = 10000
//!
//! [listener]
//! tick_interval_ms = 16
//! max_connections = 32
//! ```

use std::net::{SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::BridgeError;
use crate::listener::ListenerConfig;

pub const CONFIG_FILE_NAME: &str = ".editor-bridge.toml";

pub const ENV_CONFIG: &str = "EDITOR_BRIDGE_CONFIG";
pub const ENV_HOST: &str = "EDITOR_BRIDGE_HOST";
pub const ENV_PORT: &str = "EDITOR_BRIDGE_PORT";
pub const ENV_HTTP_PORT: &str = "EDITOR_BRIDGE_HTTP_PORT";
pub const ENV_TIMEOUT_MS: &str = "EDITOR_BRIDGE_TIMEOUT_MS";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub bridge: BridgeSection,
    pub listener: ListenerSection,
}

/// Where the listener lives and how long callers wait for it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeSection {
    pub host: String,
    pub port: u16,
    pub http_port: u16,
    pub call_timeout_ms: u64,
    pub probe_timeout_ms: u64,
    pub health_interval_secs: u64,
}

impl Default for BridgeSection {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7000,
            http_port: 8765,
            call_timeout_ms: 10_000,
            probe_timeout_ms: 1_000,
            health_interval_secs: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListenerSection {
    /// Delay between ticks when the host has no frame loop of its own
    pub tick_interval_ms: u64,
    #[serde(flatten)]
    pub limits: ListenerConfig,
}

impl Default for ListenerSection {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            limits: ListenerConfig::default(),
        }
    }
}

impl BridgeConfig {
    /// Load from the first config file found, then apply the environment
    pub fn load() -> Result<Self, BridgeError> {
        let mut config = match std::env::var(ENV_CONFIG) {
            Ok(path) => {
                let path = PathBuf::from(path);
                if !path.exists() {
                    return Err(BridgeError::Config(format!(
                        "{}={} does not exist",
                        ENV_CONFIG,
                        path.display()
                    )));
                }
                Self::load_from(&path)?
            }
            Err(_) => match find_config_file() {
                Some(path) => Self::load_from(&path)?,
                None => {
                    tracing::debug!("No config file found, using defaults");
                    Self::default()
                }
            },
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        Ok(config)
    }

    pub fn load_from(path: &Path) -> Result<Self, BridgeError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content).map_err(|e| {
            BridgeError::Config(format!("failed to parse {}: {}", path.display(), e))
        })?;
        tracing::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Override file values with `EDITOR_BRIDGE_*` variables
    ///
    /// `lookup` is `std::env::var` in production; tests pass a map.
    pub fn apply_env(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), BridgeError> {
        if let Some(host) = lookup(ENV_HOST).filter(|h| !h.is_empty()) {
            self.bridge.host = host;
        }
        if let Some(port) = lookup(ENV_PORT) {
            self.bridge.port = parse_env(ENV_PORT, &port)?;
        }
        if let Some(port) = lookup(ENV_HTTP_PORT) {
            self.bridge.http_port = parse_env(ENV_HTTP_PORT, &port)?;
        }
        if let Some(ms) = lookup(ENV_TIMEOUT_MS) {
            self.bridge.call_timeout_ms = parse_env(ENV_TIMEOUT_MS, &ms)?;
        }
        Ok(())
    }

    /// TCP listener address
    pub fn listen_addr(&self) -> Result<SocketAddr, BridgeError> {
        resolve(&self.bridge.host, self.bridge.port)
    }

    /// HTTP binding address (same host)
    pub fn http_addr(&self) -> Result<SocketAddr, BridgeError> {
        resolve(&self.bridge.host, self.bridge.http_port)
    }

    pub fn call_timeout(&self) -> Duration {
        Duration::from_millis(self.bridge.call_timeout_ms)
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.bridge.probe_timeout_ms)
    }

    pub fn health_interval(&self) -> Duration {
        Duration::from_secs(self.bridge.health_interval_secs.max(1))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.listener.tick_interval_ms.max(1))
    }
}

fn parse_env<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, BridgeError> {
    value
        .trim()
        .parse()
        .map_err(|_| BridgeError::Config(format!("invalid value for {}: {:?}", key, value)))
}

fn resolve(host: &str, port: u16) -> Result<SocketAddr, BridgeError> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| BridgeError::Config(format!("cannot resolve {}:{}: {}", host, port, e)))?
        .next()
        .ok_or_else(|| BridgeError::Config(format!("no address for {}:{}", host, port)))
}

/// Find the config file, walking up from the current directory
pub fn find_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;
    find_config_file_from(&cwd).or_else(|| {
        let global = dirs::config_dir()?.join("editor-bridge").join("config.toml");
        global.exists().then_some(global)
    })
}

/// Walk up from `start` looking for [`CONFIG_FILE_NAME`]
pub fn find_config_file_from(start: &Path) -> Option<PathBuf> {
    start
        .ancestors()
        .map(|dir| dir.join(CONFIG_FILE_NAME))
        .find(|candidate| candidate.exists())
}
