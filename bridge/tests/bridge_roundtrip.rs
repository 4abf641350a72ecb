//! End-to-end tests: bridge client ↔ TCP listener ↔ reference host

use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpStream};
use std::time::{Duration, Instant};

use serde_json::{json, Value};

use editor_bridge::client::{BridgeClient, ClientConfig};
use editor_bridge::host;
use editor_bridge::listener::pump::{self, PumpHandle};
use editor_bridge::listener::{Listener, ListenerConfig};
use editor_bridge::monitor::{HealthMonitor, SharedBridgeState, Transition};
use editor_bridge::protocol::Params;

const TICK: Duration = Duration::from_millis(2);
const TIMEOUT: Duration = Duration::from_secs(5);
/// Allowed overshoot past a call's timeout
const SLACK: Duration = Duration::from_millis(250);

fn host_listener(config: ListenerConfig) -> Listener {
    let (registry, _scene) = host::reference_registry().unwrap();
    Listener::new(registry, config)
}

fn start_host(config: ListenerConfig) -> (PumpHandle, SocketAddr) {
    let mut listener = host_listener(config);
    let addr = listener.start("127.0.0.1:0".parse().unwrap()).unwrap();
    (pump::spawn(listener, TICK).unwrap(), addr)
}

fn params(value: Value) -> Params {
    value.as_object().cloned().unwrap()
}

fn read_json_line(reader: &mut impl BufRead) -> Value {
    let mut line = String::new();
    reader.read_line(&mut line).unwrap();
    serde_json::from_str(&line).unwrap()
}

#[tokio::test]
async fn test_echo_round_trip() {
    let (pump, addr) = start_host(ListenerConfig::default());
    let client = BridgeClient::new(ClientConfig::new(addr));

    let result = client
        .call("echo", params(json!({ "x": 1, "nested": { "y": [1, 2] } })), TIMEOUT)
        .await;
    assert!(result.is_success());
    assert_eq!(result.data().unwrap()["x"], 1);
    assert_eq!(result.data().unwrap()["nested"]["y"], json!([1, 2]));

    pump.shutdown();
}

#[tokio::test]
async fn test_handler_failures_come_back_as_results() {
    let (pump, addr) = start_host(ListenerConfig::default());
    let client = BridgeClient::new(ClientConfig::new(addr));

    let unknown = client.call("spawn_tree", Params::new(), TIMEOUT).await;
    assert_eq!(unknown.error(), Some("unknown command: spawn_tree"));

    let missing = client
        .call("spawn_actor", params(json!({ "class": "Dragon" })), TIMEOUT)
        .await;
    assert_eq!(missing.error(), Some("class not found: Dragon"));

    let invalid = client.call("spawn_actor", Params::new(), TIMEOUT).await;
    assert!(invalid.error().unwrap().contains("class"));

    // Connection still usable after failures
    assert!(client.probe().await);
    pump.shutdown();
}

#[tokio::test]
async fn test_spawn_then_list_over_the_wire() {
    let (pump, addr) = start_host(ListenerConfig::default());
    let client = BridgeClient::new(ClientConfig::new(addr));

    let spawned = client
        .call(
            "spawn_actor",
            params(json!({ "class": "PointLight", "location": [0, 0, 200] })),
            TIMEOUT,
        )
        .await;
    assert!(spawned.is_success());
    let name = spawned.data().unwrap()["actorName"].as_str().unwrap().to_string();

    let listed = client.call("list_actors", Params::new(), TIMEOUT).await;
    let actors = listed.data().unwrap()["actors"].as_array().unwrap().clone();
    assert_eq!(actors.len(), 1);
    assert_eq!(actors[0]["name"], name.as_str());

    pump.shutdown();
}

#[tokio::test]
async fn test_concurrent_calls_complete_independently() {
    let (pump, addr) = start_host(ListenerConfig::default());
    let client = BridgeClient::new(ClientConfig::new(addr));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let client = client.clone();
            tokio::spawn(async move {
                let result = client.call("echo", params(json!({ "i": i })), TIMEOUT).await;
                (i, result)
            })
        })
        .collect();

    for task in tasks {
        let (i, result) = task.await.unwrap();
        assert!(result.is_success());
        assert_eq!(result.data().unwrap()["i"], i);
    }
    assert!(client.idle_connections() <= client.config().pool_size);

    pump.shutdown();
}

#[test]
fn test_partial_frames_across_ticks() {
    let (pump, addr) = start_host(ListenerConfig::default());
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(TIMEOUT)).unwrap();

    let frame = b"{\"id\":1,\"name\":\"echo\",\"params\":{\"part\":true}}\n";
    let (head, tail) = frame.split_at(10);
    stream.write_all(head).unwrap();
    std::thread::sleep(Duration::from_millis(30));
    stream.write_all(tail).unwrap();

    let mut reader = BufReader::new(stream);
    let value = read_json_line(&mut reader);
    assert_eq!(value["success"], true);
    assert_eq!(value["data"]["part"], true);
    assert_eq!(value["id"], 1);

    pump.shutdown();
}

#[test]
fn test_malformed_line_answered_connection_kept() {
    let (pump, addr) = start_host(ListenerConfig::default());
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(TIMEOUT)).unwrap();

    stream
        .write_all(b"not json at all\n{\"name\":\"ping\"}\n")
        .unwrap();
    let mut reader = BufReader::new(stream);

    let first = read_json_line(&mut reader);
    assert_eq!(first["success"], false);
    assert!(first["error"].as_str().unwrap().starts_with("malformed frame"));

    let second = read_json_line(&mut reader);
    assert_eq!(second["success"], true);
    assert_eq!(second["data"]["pong"], true);

    pump.shutdown();
}

#[test]
fn test_intent_envelope_shape_accepted() {
    let (pump, addr) = start_host(ListenerConfig::default());
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(TIMEOUT)).unwrap();

    stream
        .write_all(b"{\"intent\":\"project_info\",\"parameters\":{}}\n")
        .unwrap();
    let value = read_json_line(&mut BufReader::new(stream));
    assert_eq!(value["success"], true);
    assert_eq!(value["data"]["currentLevel"], "Main");

    pump.shutdown();
}

#[test]
fn test_oversize_frame_closes_connection() {
    let config = ListenerConfig {
        max_frame_bytes: 64,
        ..ListenerConfig::default()
    };
    let (pump, addr) = start_host(config);
    let mut stream = TcpStream::connect(addr).unwrap();
    stream.set_read_timeout(Some(TIMEOUT)).unwrap();

    stream.write_all(&[b'x'; 200]).unwrap();
    let mut reader = BufReader::new(stream);
    let value = read_json_line(&mut reader);
    assert_eq!(value["success"], false);
    assert!(value["error"].as_str().unwrap().contains("exceeds"));

    // Closed by the listener: EOF or reset
    let mut rest = Vec::new();
    match reader.read_to_end(&mut rest) {
        Ok(_) => assert!(rest.is_empty()),
        Err(e) => assert_ne!(e.kind(), std::io::ErrorKind::WouldBlock),
    }

    pump.shutdown();
}

#[test]
fn test_peer_disconnect_removes_connection() {
    let mut listener = host_listener(ListenerConfig::default());
    let addr = listener.start("127.0.0.1:0".parse().unwrap()).unwrap();

    let stream = TcpStream::connect(addr).unwrap();
    for _ in 0..500 {
        listener.tick();
        if listener.connection_count() == 1 {
            break;
        }
        std::thread::sleep(TICK);
    }
    assert_eq!(listener.connection_count(), 1);

    drop(stream);
    for _ in 0..500 {
        listener.tick();
        if listener.connection_count() == 0 {
            break;
        }
        std::thread::sleep(TICK);
    }
    assert_eq!(listener.connection_count(), 0);
}

#[tokio::test]
async fn test_timeout_when_host_does_not_tick() {
    // Started but never ticked: connect succeeds, no answer ever comes
    let mut listener = host_listener(ListenerConfig::default());
    let addr = listener.start("127.0.0.1:0".parse().unwrap()).unwrap();

    let client = BridgeClient::new(ClientConfig::new(addr));
    let timeout = Duration::from_millis(200);
    let started = Instant::now();
    let result = client.call("echo", Params::new(), timeout).await;
    let elapsed = started.elapsed();
    assert!(result.is_timeout());
    assert!(elapsed >= timeout, "returned early after {:?}", elapsed);
    assert!(elapsed < timeout + SLACK, "took {:?}", elapsed);

    listener.stop();
}

#[tokio::test]
async fn test_pooled_client_survives_listener_restart() {
    let mut listener = host_listener(ListenerConfig::default());
    let addr = listener.start("127.0.0.1:0".parse().unwrap()).unwrap();
    let pump = pump::spawn(listener, TICK).unwrap();

    let client = BridgeClient::new(ClientConfig::new(addr));
    assert!(client.call("ping", Params::new(), TIMEOUT).await.is_success());
    assert_eq!(client.idle_connections(), 1);

    // Restart on the same address; the pooled socket is now dead
    let mut listener = pump.shutdown().unwrap();
    assert_eq!(listener.start(addr).unwrap(), addr);
    let pump = pump::spawn(listener, TICK).unwrap();

    let result = client.call("ping", Params::new(), TIMEOUT).await;
    assert!(result.is_success(), "{:?}", result.error());

    pump.shutdown();
}

#[tokio::test]
async fn test_state_follows_editor_availability() {
    let mut listener = host_listener(ListenerConfig::default());
    let addr = listener.start("127.0.0.1:0".parse().unwrap()).unwrap();
    listener.stop();

    let state = SharedBridgeState::new();
    let client = BridgeClient::with_state(ClientConfig::new(addr), state.clone());

    let timeout = Duration::from_millis(500);
    let started = Instant::now();
    let result = client.call("ping", Params::new(), timeout).await;
    let elapsed = started.elapsed();
    assert!(result.is_unreachable());
    assert!(elapsed < timeout + SLACK, "took {:?}", elapsed);
    assert!(!state.is_connected());

    assert_eq!(listener.start(addr).unwrap(), addr);
    let pump = pump::spawn(listener, TICK).unwrap();

    assert!(client.call("ping", Params::new(), TIMEOUT).await.is_success());
    assert!(state.is_connected());

    pump.shutdown();
}

#[tokio::test]
async fn test_monitor_with_real_client() {
    let (pump, addr) = start_host(ListenerConfig::default());
    let state = SharedBridgeState::new();
    let monitor = HealthMonitor::new(
        BridgeClient::new(ClientConfig::new(addr)),
        state.clone(),
        Duration::from_secs(5),
    );

    assert_eq!(monitor.check_once().await, Some(Transition::Connected));
    assert_eq!(monitor.check_once().await, None);

    pump.shutdown();
    assert_eq!(monitor.check_once().await, Some(Transition::Disconnected));
}

#[tokio::test]
async fn test_batch_over_the_wire() {
    let (pump, addr) = start_host(ListenerConfig::default());
    let client = BridgeClient::new(ClientConfig::new(addr));

    let result = client
        .call(
            "batch_operations",
            params(json!({
                "operations": [
                    { "operation": "spawn_actor", "params": { "class": "CameraActor" }, "id": "cam" },
                    { "operation": "spawn_actor", "params": { "class": "Dragon" } },
                    { "operation": "list_actors" }
                ]
            })),
            TIMEOUT,
        )
        .await;
    assert!(result.is_success());
    let data = result.data().unwrap();
    assert_eq!(data["successCount"], 2);
    assert_eq!(data["failureCount"], 1);
    assert_eq!(data["operations"][0]["result"]["actorName"], "CameraActor_1");
    assert_eq!(data["operations"][1]["error"], "class not found: Dragon");
    assert_eq!(data["operations"][2]["result"]["totalCount"], 1);

    pump.shutdown();
}
