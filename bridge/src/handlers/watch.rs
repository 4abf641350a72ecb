//! Watch command handler
//!
//! Runs the health monitor in the foreground and prints each transition.

use std::time::Duration;

use anyhow::Result;
use chrono::Local;

use editor_bridge::monitor::{HealthMonitor, SharedBridgeState, Transition};

use super::CommandContext;

/// Handle the `watch` command
pub async fn run_watch(ctx: &CommandContext, interval_secs: Option<u64>) -> Result<()> {
    let interval = interval_secs
        .map(|s| Duration::from_secs(s.max(1)))
        .unwrap_or_else(|| ctx.config.health_interval());
    let client = ctx.client()?;
    let addr = client.config().addr;

    let state = SharedBridgeState::new();
    let monitor = HealthMonitor::new(client, state.clone(), interval);
    println!("Watching {} every {:?} (Ctrl-C to stop)", addr, interval);

    let mut ticker = tokio::time::interval(interval);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let mut first = true;
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let transition = monitor.check_once().await;
                let now = Local::now().format("%Y-%m-%d %H:%M:%S");
                match transition {
                    Some(Transition::Connected) => println!("[{}] connected", now),
                    Some(Transition::Disconnected) => println!("[{}] disconnected", now),
                    // Initial state starts disconnected, so only report it once
                    None if first => println!("[{}] disconnected", now),
                    None => {}
                }
                first = false;
            }
            _ = &mut ctrl_c => break,
        }
    }

    Ok(())
}
