//! Test helpers for IPC integration tests.
//!
//! This module plays the part of the runtime under test:
//! - Binding the event port to collect responses and events
//! - Sending request datagrams to the IPC port
//! - Decoding what comes back

use stack_core::config::StackConfig;
use stack_core::ipc::{Request, Response, WireMap};

use std::net::UdpSocket;
use std::thread::sleep;
use std::time::{Duration, Instant};

use serde_json::Value;

pub const RECEIVE_TIMEOUT: Duration = Duration::from_secs(2);
pub const QUIET_PERIOD: Duration = Duration::from_millis(500);

/// Config on a private port pair with a short read timeout so stop checks stay fast.
pub fn test_config(ipc_port: u16, event_port: u16) -> StackConfig {
    StackConfig {
        read_timeout_secs: 1,
        ..StackConfig::with_ports(ipc_port, event_port)
    }
}

/// Bind the event port the way the runtime would.
pub fn bind_event_listener(event_port: u16) -> UdpSocket {
    let socket = UdpSocket::bind(("127.0.0.1", event_port)).expect("Failed to bind event port");
    socket
        .set_read_timeout(Some(RECEIVE_TIMEOUT))
        .expect("Failed to set read timeout");
    socket
}

/// Send raw bytes to the IPC port from a fresh socket, returned so the ack can be read.
pub fn send_raw(ipc_port: u16, payload: &[u8]) -> UdpSocket {
    let socket = UdpSocket::bind("127.0.0.1:0").expect("Failed to bind client socket");
    socket
        .set_read_timeout(Some(RECEIVE_TIMEOUT))
        .expect("Failed to set read timeout");
    socket
        .send_to(payload, ("127.0.0.1", ipc_port))
        .expect("Failed to send request");
    socket
}

pub fn send_request(ipc_port: u16, request: &Request) -> UdpSocket {
    send_raw(ipc_port, request.to_json().as_bytes())
}

/// Receive one JSON object, or `None` if nothing arrives before the socket's timeout.
pub fn try_recv_map(socket: &UdpSocket) -> Option<WireMap> {
    let mut buf = [0u8; 65535];
    let (len, _) = socket.recv_from(&mut buf).ok()?;

    match serde_json::from_slice(&buf[..len]).expect("Received invalid JSON") {
        Value::Object(map) => Some(map),
        other => panic!("Expected JSON object, got {other}"),
    }
}

pub fn recv_map(socket: &UdpSocket) -> WireMap {
    try_recv_map(socket).expect("Nothing received before timeout")
}

/// Receive until an event of `event_type` arrives, skipping others.
pub fn recv_event_of_type(socket: &UdpSocket, event_type: &str) -> Option<WireMap> {
    let deadline = Instant::now() + RECEIVE_TIMEOUT;
    while Instant::now() < deadline {
        let map = try_recv_map(socket)?;
        if map.get("eventType").and_then(Value::as_str) == Some(event_type) {
            return Some(map);
        }
    }
    None
}

/// Receive the next IPC response, skipping out-of-band events.
pub fn recv_response(socket: &UdpSocket) -> Response {
    let map = recv_event_of_type(socket, "ipcResponse").expect("No response before timeout");
    Response::from_map(&map).expect("Failed to decode response")
}

/// Poll `condition` until it holds or `timeout` elapses.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if condition() {
            return true;
        }
        sleep(Duration::from_millis(20));
    }
    condition()
}

/// Drain whatever is already queued on `socket`, waiting at most `QUIET_PERIOD`.
pub fn drain(socket: &UdpSocket) {
    socket
        .set_read_timeout(Some(QUIET_PERIOD))
        .expect("Failed to set read timeout");
    while try_recv_map(socket).is_some() {}
    socket
        .set_read_timeout(Some(RECEIVE_TIMEOUT))
        .expect("Failed to set read timeout");
}
