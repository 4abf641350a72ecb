//! Command handlers for the `editor-bridge` binary
//!
//! [`CommandContext`] carries the resolved configuration shared by every
//! handler.

use anyhow::{Context, Result};

use editor_bridge::client::{BridgeClient, ClientConfig};
use editor_bridge::config::BridgeConfig;

use crate::cli::Cli;

pub mod call;
pub mod commands;
pub mod probe;
pub mod serve;
pub mod watch;

pub use call::run_call;
pub use commands::run_commands;
pub use probe::run_probe;
pub use serve::run_serve;
pub use watch::run_watch;

pub struct CommandContext {
    pub config: BridgeConfig,
    pub verbose: u8,
}

impl CommandContext {
    /// Resolve config with priority: CLI flags > env > config file > defaults
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let mut config = match &cli.config {
            Some(path) => {
                let mut config = BridgeConfig::load_from(path)
                    .with_context(|| format!("Failed to load config {}", path.display()))?;
                config.apply_env(|key| std::env::var(key).ok())?;
                config
            }
            None => BridgeConfig::load()?,
        };

        if let Some(host) = &cli.host {
            config.bridge.host = host.clone();
        }
        if let Some(port) = cli.port {
            config.bridge.port = port;
        }

        Ok(Self {
            config,
            verbose: cli.verbose,
        })
    }

    pub fn client(&self) -> Result<BridgeClient> {
        let config = ClientConfig::from_bridge_config(&self.config)?;
        Ok(BridgeClient::new(config))
    }
}
