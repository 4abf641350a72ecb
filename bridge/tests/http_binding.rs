//! HTTP binding: status and command dispatch through the listener's tick
#![cfg(feature = "http")]

use std::net::SocketAddr;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::sync::oneshot;

use editor_bridge::host;
use editor_bridge::http::{self, HttpState};
use editor_bridge::listener::pump::{self, PumpHandle};
use editor_bridge::listener::{Listener, ListenerConfig};

struct Harness {
    base: String,
    stop: Option<oneshot::Sender<()>>,
}

impl Harness {
    async fn start(state: HttpState) -> Self {
        let socket = http::bind("127.0.0.1:0".parse().unwrap()).await.unwrap();
        let addr: SocketAddr = socket.local_addr().unwrap();
        let (stop, stop_rx) = oneshot::channel::<()>();
        tokio::spawn(http::serve(socket, state, async move {
            let _ = stop_rx.await;
        }));
        Self {
            base: format!("http://{}/", addr),
            stop: Some(stop),
        }
    }
}

impl Drop for Harness {
    fn drop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
    }
}

fn host_listener() -> Listener {
    let (registry, _scene) = host::reference_registry().unwrap();
    let mut listener = Listener::new(registry, ListenerConfig::default());
    listener.start("127.0.0.1:0".parse().unwrap()).unwrap();
    listener
}

fn pumped(listener: Listener) -> (HttpState, PumpHandle) {
    let state = HttpState::new(listener.command_queue(), listener.registry().clone());
    (state, pump::spawn(listener, Duration::from_millis(2)).unwrap())
}

#[tokio::test]
async fn test_status_lists_commands() {
    let (state, pump) = pumped(host_listener());
    let harness = Harness::start(state).await;

    let body: Value = reqwest::get(&harness.base)
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body["status"], "online");
    assert_eq!(body["ready"], true);
    let commands: Vec<&str> = body["available_commands"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c.as_str().unwrap())
        .collect();
    assert!(commands.contains(&"spawn_actor"));
    assert!(commands.contains(&"ping"));

    pump.shutdown();
}

#[tokio::test]
async fn test_post_dispatches_through_tick() {
    let (state, pump) = pumped(host_listener());
    let harness = Harness::start(state).await;
    let client = reqwest::Client::new();

    let response = client
        .post(&harness.base)
        .json(&json!({ "type": "spawn_actor", "params": { "class": "CameraActor" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["actorName"], "CameraActor_1");

    // Handler failures are still 200 with a failure envelope
    let response = client
        .post(&harness.base)
        .json(&json!({ "type": "delete_actor", "params": { "name": "Ghost" } }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "actor not found: Ghost");

    pump.shutdown();
}

#[tokio::test]
async fn test_bad_body_is_400() {
    let (state, pump) = pumped(host_listener());
    let harness = Harness::start(state).await;

    let response = reqwest::Client::new()
        .post(&harness.base)
        .body("{\"params\":{}}")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["success"], false);

    pump.shutdown();
}

#[tokio::test]
async fn test_no_tick_is_504() {
    // Listener alive but nobody ticks it
    let listener = host_listener();
    let state = HttpState::new(listener.command_queue(), listener.registry().clone())
        .with_request_timeout(Duration::from_millis(100));
    let harness = Harness::start(state).await;

    let response = reqwest::Client::new()
        .post(&harness.base)
        .json(&json!({ "type": "ping" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::GATEWAY_TIMEOUT);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "timeout");

    drop(listener);
}

#[tokio::test]
async fn test_listener_gone_is_503() {
    let listener = host_listener();
    let state = HttpState::new(listener.command_queue(), listener.registry().clone());
    drop(listener);
    let harness = Harness::start(state).await;

    let status: Value = reqwest::get(&harness.base)
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(status["ready"], false);

    let response = reqwest::Client::new()
        .post(&harness.base)
        .json(&json!({ "type": "ping" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
}

#[tokio::test]
async fn test_stopped_listener_is_503_without_waiting() {
    let mut listener = host_listener();
    let state = HttpState::new(listener.command_queue(), listener.registry().clone());
    listener.stop();
    let harness = Harness::start(state).await;

    let started = std::time::Instant::now();
    let response = reqwest::Client::new()
        .post(&harness.base)
        .json(&json!({ "type": "ping" }))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::SERVICE_UNAVAILABLE);
    assert!(started.elapsed() < Duration::from_secs(5));

    drop(listener);
}
