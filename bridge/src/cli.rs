//! CLI argument definitions

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "editor-bridge")]
#[command(about = "Command bridge between AI tool-callers and a running editor")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: .editor-bridge.toml, searched upwards)
    #[arg(long, env = "EDITOR_BRIDGE_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Listener host
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Listener TCP port
    #[arg(short, long, global = true)]
    pub port: Option<u16>,

    /// Increase verbosity (-v info, -vv debug, -vvv trace). Default is warn.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the reference host behind a listener until Ctrl-C
    Serve {
        /// HTTP binding port
        #[arg(long)]
        http_port: Option<u16>,

        /// Don't start the HTTP binding
        #[arg(long)]
        no_http: bool,
    },

    /// Send one command and print the result
    Call {
        /// Command name
        command: String,

        /// Parameters as a JSON object
        #[arg(long, short = 'P', default_value = "{}")]
        params: String,

        /// Timeout in milliseconds (default: from config)
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Check whether the listener answers
    Probe,

    /// List the commands the listener offers
    Commands,

    /// Watch connection health and print transitions
    Watch {
        /// Seconds between probes (default: from config)
        #[arg(long)]
        interval_secs: Option<u64>,
    },
}
