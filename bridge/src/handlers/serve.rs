//! Serve command handler
//!
//! Runs the reference host: the listener is ticked from a tokio interval on
//! this task, and the optional HTTP binding feeds the same tick through the
//! command queue.

use anyhow::Result;
use tokio::sync::oneshot;

use editor_bridge::host;
use editor_bridge::listener::Listener;

use super::CommandContext;

/// Handle the `serve` command
pub async fn run_serve(ctx: &CommandContext, http_port: Option<u16>, no_http: bool) -> Result<()> {
    let (registry, _scene) = host::reference_registry()?;
    let mut listener = Listener::new(registry.clone(), ctx.config.listener.limits);
    let addr = listener.start(ctx.config.listen_addr()?)?;
    println!("Listening on {} ({} commands)", addr, registry.len());

    let (stop_http, http_task) = if no_http {
        (None, None)
    } else {
        start_http(ctx, &listener, http_port).await?
    };

    let mut interval = tokio::time::interval(ctx.config.tick_interval());
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                let stats = listener.tick();
                if !stats.is_idle() {
                    tracing::trace!(?stats, "Tick");
                }
            }
            _ = &mut ctrl_c => {
                tracing::info!("Shutdown requested");
                break;
            }
        }
    }

    if let Some(stop) = stop_http {
        let _ = stop.send(());
    }
    listener.stop();
    if let Some(task) = http_task {
        task.await??;
    }
    Ok(())
}

type HttpTask = tokio::task::JoinHandle<Result<(), editor_bridge::BridgeError>>;

#[cfg(feature = "http")]
async fn start_http(
    ctx: &CommandContext,
    listener: &Listener,
    http_port: Option<u16>,
) -> Result<(Option<oneshot::Sender<()>>, Option<HttpTask>)> {
    use editor_bridge::http::{self, HttpState};

    let mut config = ctx.config.clone();
    if let Some(port) = http_port {
        config.bridge.http_port = port;
    }
    let socket = http::bind(config.http_addr()?).await?;
    println!("HTTP binding on http://{}", socket.local_addr()?);

    let state = HttpState::new(listener.command_queue(), listener.registry().clone());
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let task = tokio::spawn(http::serve(socket, state, async move {
        let _ = stop_rx.await;
    }));
    Ok((Some(stop_tx), Some(task)))
}

#[cfg(not(feature = "http"))]
async fn start_http(
    _ctx: &CommandContext,
    _listener: &Listener,
    _http_port: Option<u16>,
) -> Result<(Option<oneshot::Sender<()>>, Option<HttpTask>)> {
    tracing::warn!("Built without the http feature; HTTP binding disabled");
    Ok((None, None))
}
