use anyhow::Result;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod handlers;

use cli::{Cli, Commands};
use handlers::CommandContext;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let ctx = CommandContext::from_cli(&cli)?;

    match cli.command {
        Commands::Serve { http_port, no_http } => {
            handlers::run_serve(&ctx, http_port, no_http).await?;
        }
        Commands::Call {
            command,
            params,
            timeout_ms,
        } => {
            handlers::run_call(&ctx, &command, &params, timeout_ms).await?;
        }
        Commands::Probe => handlers::run_probe(&ctx).await?,
        Commands::Commands => handlers::run_commands(&ctx).await?,
        Commands::Watch { interval_secs } => handlers::run_watch(&ctx, interval_secs).await?,
    }

    Ok(())
}

/// `RUST_LOG` wins; otherwise `-v` flags pick the level (default warn)
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("editor_bridge={level}")));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}
