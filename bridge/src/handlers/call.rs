//! Call command handler

use std::time::Duration;

use anyhow::{Context, Result};

use editor_bridge::protocol::Params;

use super::CommandContext;

/// Handle the `call` command - send one command and print the result
pub async fn run_call(
    ctx: &CommandContext,
    command: &str,
    params: &str,
    timeout_ms: Option<u64>,
) -> Result<()> {
    let params: Params = serde_json::from_str(params)
        .context("--params must be a JSON object, e.g. '{\"class\":\"PointLight\"}'")?;
    let timeout = timeout_ms
        .map(Duration::from_millis)
        .unwrap_or_else(|| ctx.config.call_timeout());

    let client = ctx.client()?;
    let result = client.call(command, params, timeout).await;
    println!("{}", serde_json::to_string_pretty(&result)?);

    if !result.is_success() {
        std::process::exit(1);
    }
    Ok(())
}
