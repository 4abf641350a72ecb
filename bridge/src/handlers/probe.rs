//! Probe command handler

use anyhow::Result;

use super::CommandContext;

/// Handle the `probe` command
pub async fn run_probe(ctx: &CommandContext) -> Result<()> {
    let client = ctx.client()?;
    let addr = client.config().addr;

    if client.probe().await {
        println!("✓ Editor bridge reachable at {}", addr);
        Ok(())
    } else {
        println!("✗ Editor bridge unreachable at {}", addr);
        std::process::exit(1);
    }
}
