use crate::ipc_tests::helpers::{
    QUIET_PERIOD, bind_event_listener, recv_map, recv_response, send_raw, send_request,
    test_config, try_recv_map, wait_until,
};

use stack_core::error::ipc::IpcError;
use stack_core::ipc::{
    HeartbeatRequest, REQUEST_RECEIVED_RESULT, Request, RequestHandler, RequestReceiver, WireMap,
};

use common::StatusCode;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

use serde_json::{Value, json};

/// Answers every request as a healthy, initialized stack and counts the calls.
#[derive(Default)]
struct CountingHandler {
    calls: AtomicUsize,
}

impl RequestHandler for CountingHandler {
    fn handle_request(&self, _request: &Request) -> Result<WireMap, IpcError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let mut result = WireMap::new();
        result.insert(String::from("resultCode"), json!(StatusCode::Ok.code()));
        result.insert(String::from("pid"), json!(std::process::id()));
        result.insert(String::from("initialized"), json!(true));
        Ok(result)
    }
}

/// Panics on the first request, answers normally afterwards.
#[derive(Default)]
struct PanicOnceHandler {
    inner: CountingHandler,
    panicked: AtomicUsize,
}

impl RequestHandler for PanicOnceHandler {
    fn handle_request(&self, request: &Request) -> Result<WireMap, IpcError> {
        if self.panicked.fetch_add(1, Ordering::SeqCst) == 0 {
            panic!("handler blew up");
        }
        self.inner.handle_request(request)
    }
}

fn receiver_for<H: RequestHandler + 'static>(
    handler: &Arc<H>,
    ipc_port: u16,
    event_port: u16,
) -> RequestReceiver {
    let weak: Weak<H> = Arc::downgrade(handler);
    let weak: Weak<dyn RequestHandler> = weak;
    RequestReceiver::new(test_config(ipc_port, event_port), weak)
}

/// **VALUE**: Verifies the sender gets the fixed acknowledgement and the event port gets the
/// response.
///
/// **WHY THIS MATTERS**: The runtime waits for the ack before it starts waiting for the
/// response. Missing either stalls the runtime.
///
/// **BUG THIS CATCHES**: Would catch the ack going to the event port, or the response going
/// back to the sender.
#[test]
fn given_running_receiver_when_heartbeat_sent_then_ack_and_response_arrive() {
    // GIVEN: A running receiver and an event listener
    let handler = Arc::new(CountingHandler::default());
    let events = bind_event_listener(28_202);
    let receiver = receiver_for(&handler, 28_201, 28_202);
    receiver.start().expect("receiver should start");

    // WHEN: Sending a heartbeat
    let client = send_request(28_201, &Request::from(HeartbeatRequest::new(7)));

    // THEN: The sender receives the ack
    let mut buf = [0u8; 64];
    let (len, _) = client.recv_from(&mut buf).expect("ack should arrive");
    assert_eq!(&buf[..len], REQUEST_RECEIVED_RESULT);

    // THEN: The event port receives the response
    let response = recv_response(&events);
    assert_eq!(response.request_id(), 7);
    assert_eq!(response.result_code(), StatusCode::Ok);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);

    receiver.stop();
}

/// **VALUE**: Verifies one bad datagram does not take the listener down.
///
/// **WHY THIS MATTERS**: The listener is shared by every test in a run. If garbage kills it,
/// every later test fails with timeouts that point nowhere near the cause.
///
/// **BUG THIS CATCHES**: Would catch a `?` in the listen loop that propagates a per-datagram
/// error out of the thread.
#[test]
fn given_bogus_request_when_sent_then_later_requests_still_processed() {
    // GIVEN: A running receiver
    let handler = Arc::new(CountingHandler::default());
    let events = bind_event_listener(28_204);
    let receiver = receiver_for(&handler, 28_203, 28_204);
    receiver.start().expect("receiver should start");

    // WHEN: Sending garbage, an unknown request, then a valid heartbeat
    let garbage = send_raw(28_203, b"{not json");
    let bogus = send_raw(28_203, br#"{"request":"bogus","requestId":1}"#);
    send_request(28_203, &Request::from(HeartbeatRequest::new(2)));

    // THEN: Garbage was still acknowledged (ack precedes validation)
    assert_eq!(Value::Object(recv_map(&garbage)), json!({"resultCode": 0}));
    assert!(try_recv_map(&bogus).is_some(), "bogus request should be acknowledged");

    // THEN: Only the valid request produced a response
    let response = recv_response(&events);
    assert_eq!(response.request_id(), 2);
    assert_eq!(handler.calls.load(Ordering::SeqCst), 1);
    assert!(receiver.is_running());

    receiver.stop();
}

#[test]
fn given_handler_that_panics_when_requests_sent_then_listener_survives() {
    let handler = Arc::new(PanicOnceHandler::default());
    let events = bind_event_listener(28_206);
    let receiver = receiver_for(&handler, 28_205, 28_206);
    receiver.start().expect("receiver should start");

    send_request(28_205, &Request::from(HeartbeatRequest::new(1)));
    send_request(28_205, &Request::from(HeartbeatRequest::new(2)));

    let response = recv_response(&events);
    assert_eq!(response.request_id(), 2);

    receiver.stop();
}

/// **VALUE**: Verifies a receiver whose handler is gone drops datagrams quietly.
///
/// **BUG THIS CATCHES**: Would catch answering with default values after the stack is dropped.
#[test]
fn given_dropped_handler_when_request_sent_then_no_response_and_listener_alive() {
    // GIVEN: A receiver whose handler has been dropped
    let handler = Arc::new(CountingHandler::default());
    let events = bind_event_listener(28_208);
    let receiver = receiver_for(&handler, 28_207, 28_208);
    drop(handler);
    receiver.start().expect("receiver should start");

    // WHEN: Sending a heartbeat
    let client = send_request(28_207, &Request::from(HeartbeatRequest::new(3)));

    // THEN: Acknowledged but never answered
    assert!(try_recv_map(&client).is_some(), "datagram should be acknowledged");
    events
        .set_read_timeout(Some(QUIET_PERIOD))
        .expect("set timeout");
    assert!(try_recv_map(&events).is_none(), "no response expected");
    assert!(receiver.is_running());

    receiver.stop();
}

/// **VALUE**: Verifies a port already in use is a startup error, not a silent failure.
///
/// **WHY THIS MATTERS**: A second mock (or a stale one from a crashed run) holding the port
/// means this mock never sees a request. The test must fail at `start()` with a clear cause.
///
/// **BUG THIS CATCHES**: Would catch binding inside the listener thread where the error is lost.
#[test]
fn given_port_in_use_when_started_then_returns_bind_error() {
    // GIVEN: The IPC port already taken
    let _squatter = std::net::UdpSocket::bind("127.0.0.1:28209").expect("bind squatter");
    let handler = Arc::new(CountingHandler::default());
    let receiver = receiver_for(&handler, 28_209, 28_210);

    // WHEN: Starting
    let result = receiver.start();

    // THEN: Bind error naming the port, still stopped
    match result {
        Err(IpcError::Bind { port, .. }) => assert_eq!(port, 28_209),
        other => panic!("Expected Bind error, got {other:?}"),
    }
    assert!(!receiver.is_running());
}

/// **VALUE**: Verifies `stop()` wakes the listener instead of waiting out the read timeout.
///
/// **BUG THIS CATCHES**: Would catch the interrupt not being delivered, making every stop take
/// a full timeout period.
#[test]
fn given_idle_receiver_with_long_timeout_when_stopped_then_returns_promptly() {
    // GIVEN: A receiver with a 10s read timeout
    let handler = Arc::new(CountingHandler::default());
    let mut config = test_config(28_211, 28_212);
    config.read_timeout_secs = 10;
    let weak: Weak<CountingHandler> = Arc::downgrade(&handler);
    let weak: Weak<dyn RequestHandler> = weak;
    let receiver = RequestReceiver::new(config, weak);
    receiver.start().expect("receiver should start");

    // WHEN: Stopping
    let started = Instant::now();
    receiver.stop();

    // THEN: Well under the timeout
    assert!(started.elapsed() < Duration::from_secs(3));
    assert!(!receiver.is_running());
}

/// **VALUE**: Verifies concurrent `stop()` calls are safe.
///
/// **WHY THIS MATTERS**: Test teardown and a drop guard can race to stop the same receiver.
///
/// **BUG THIS CATCHES**: Would catch a double join, or a second stop that panics because the
/// thread handle was already consumed.
#[test]
fn given_running_receiver_when_stopped_concurrently_then_both_return() {
    // GIVEN: A running receiver
    let handler = Arc::new(CountingHandler::default());
    let receiver = Arc::new(receiver_for(&handler, 28_213, 28_214));
    receiver.start().expect("receiver should start");

    // WHEN: Two threads stop it at once
    let stoppers: Vec<_> = (0..2)
        .map(|_| {
            let receiver = Arc::clone(&receiver);
            thread::spawn(move || receiver.stop())
        })
        .collect();
    for stopper in stoppers {
        stopper.join().expect("stop should not panic");
    }

    // THEN: Stopped, and a third stop is a no-op
    assert!(!receiver.is_running());
    receiver.stop();
}

#[test]
fn given_stopped_receiver_when_restarted_then_serves_again() {
    let handler = Arc::new(CountingHandler::default());
    let events = bind_event_listener(28_216);
    let receiver = receiver_for(&handler, 28_215, 28_216);

    receiver.start().expect("first start");
    receiver.start().expect("second start is a no-op");
    receiver.stop();
    assert!(!receiver.is_running());

    receiver.start().expect("restart should rebind the port");
    send_request(28_215, &Request::from(HeartbeatRequest::new(9)));

    assert_eq!(recv_response(&events).request_id(), 9);
    receiver.stop();
}

#[test]
fn given_running_receiver_when_dropped_then_port_is_released() {
    let handler = Arc::new(CountingHandler::default());
    let receiver = receiver_for(&handler, 28_217, 28_218);
    receiver.start().expect("receiver should start");

    drop(receiver);

    assert!(wait_until(Duration::from_secs(2), || {
        std::net::UdpSocket::bind("127.0.0.1:28217").is_ok()
    }));
}

#[test]
fn given_response_when_received_then_wire_shape_matches_protocol() {
    let handler = Arc::new(CountingHandler::default());
    let events = bind_event_listener(28_220);
    let receiver = receiver_for(&handler, 28_219, 28_220);
    receiver.start().expect("receiver should start");

    send_request(28_219, &Request::from(HeartbeatRequest::new(5)));
    let map = recv_map(&events);

    assert_eq!(map.get("eventType"), Some(&json!("ipcResponse")));
    assert_eq!(map.get("responseType"), Some(&json!("heartbeatResponse")));
    assert_eq!(map.get("requestId"), Some(&json!(5)));
    assert_eq!(map.get("resultCode"), Some(&json!(0)));
    assert_eq!(map.get("initialized"), Some(&Value::Bool(true)));
    assert!(map.get("timestamp").and_then(Value::as_i64).is_some());

    receiver.stop();
}
