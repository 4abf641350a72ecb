//! Commands listing handler

use anyhow::{bail, Result};
use serde::Deserialize;

use editor_bridge::protocol::{Params, HELP_COMMAND};

use super::CommandContext;

#[derive(Deserialize)]
struct Listing {
    commands: Vec<Entry>,
}

#[derive(Deserialize)]
struct Entry {
    name: String,
    #[serde(default)]
    description: String,
}

/// Handle the `commands` command - print what the listener offers
pub async fn run_commands(ctx: &CommandContext) -> Result<()> {
    let client = ctx.client()?;
    let result = client.call_default(HELP_COMMAND, Params::new()).await;

    let data = match result.into_result() {
        Ok(data) => data,
        Err(error) => bail!("help failed: {}", error),
    };
    let listing: Listing = serde_json::from_value(serde_json::Value::Object(data))?;

    let width = listing
        .commands
        .iter()
        .map(|c| c.name.len())
        .max()
        .unwrap_or(0);
    for entry in &listing.commands {
        println!("{:width$}  {}", entry.name, entry.description, width = width);
    }
    println!("\n{} commands", listing.commands.len());
    Ok(())
}
