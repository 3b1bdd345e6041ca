use mock_stack::runner::serve;

use stack_core::config::StackConfig;
use stack_core::ipc::{HeartbeatRequest, Request};

use std::net::UdpSocket;
use std::time::Duration;

use serde_json::{Value, json};
use tokio::sync::oneshot;

const RECEIVE_TIMEOUT: Duration = Duration::from_secs(2);

fn test_config(ipc_port: u16, event_port: u16) -> StackConfig {
    StackConfig {
        read_timeout_secs: 1,
        ..StackConfig::with_ports(ipc_port, event_port)
    }
}

fn bind(port: u16) -> UdpSocket {
    let socket = UdpSocket::bind(("127.0.0.1", port)).expect("Failed to bind socket");
    socket
        .set_read_timeout(Some(RECEIVE_TIMEOUT))
        .expect("Failed to set read timeout");
    socket
}

fn recv_json(socket: &UdpSocket) -> Option<Value> {
    let mut buf = [0u8; 65535];
    let (len, _) = socket.recv_from(&mut buf).ok()?;
    serde_json::from_slice(&buf[..len]).ok()
}

/// **VALUE**: Exercises the binary's whole lifecycle: start, announce, answer, stop.
///
/// **WHY THIS MATTERS**: This is exactly what `main` does between logger setup and
/// Ctrl-C, minus the signal.
///
/// **BUG THIS CATCHES**: Would catch `serve` returning before the shutdown future
/// resolves, never announcing startup, or leaving the IPC port bound after stop.
#[tokio::test]
async fn given_running_server_when_heartbeat_sent_then_answers_and_stops_on_shutdown() {
    // GIVEN: The event port owned by the test and a shutdown trigger
    let events = bind(28402);
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let client = async move {
        // THEN: A startup event arrives first
        let startup = recv_json(&events).expect("No startup event");
        assert_eq!(startup["eventType"], "startup");

        // WHEN: Sending a heartbeat
        let socket = bind(0);
        let request = Request::from(HeartbeatRequest::new(7));
        socket
            .send_to(request.to_json().as_bytes(), ("127.0.0.1", 28401))
            .expect("Failed to send heartbeat");

        // THEN: Acked on the sender socket and answered on the event port
        assert_eq!(recv_json(&socket), Some(json!({"resultCode": 0})));
        let response = recv_json(&events).expect("No heartbeat response");
        assert_eq!(response["responseType"], "heartbeatResponse");
        assert_eq!(response["requestId"], 7);

        shutdown_tx.send(()).expect("Server dropped the shutdown receiver");
    };

    let server = serve(test_config(28401, 28402), async {
        let _ = shutdown_rx.await;
    });

    // WHEN: Running both until the client triggers shutdown
    let (result, ()) = tokio::join!(server, client);

    // THEN: The server stopped cleanly and released the IPC port
    assert!(result.is_ok(), "serve failed: {result:?}");
    assert!(UdpSocket::bind(("127.0.0.1", 28401)).is_ok());
}

/// **VALUE**: Verifies an invalid config is rejected before anything binds.
///
/// **WHY THIS MATTERS**: A config with equal ports would make the stack send its
/// responses to its own request socket.
///
/// **BUG THIS CATCHES**: Would catch `serve` skipping validation for configs that
/// were built in code rather than loaded from a file.
#[tokio::test]
async fn given_invalid_config_when_serving_then_returns_error_without_waiting() {
    // GIVEN: Identical ports
    let config = test_config(28403, 28403);

    // WHEN: Serving with a shutdown that never resolves
    let result = serve(config, std::future::pending()).await;

    // THEN: Fails immediately
    assert!(result.is_err());
}
