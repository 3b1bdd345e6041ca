// Unit tests for request processing and encoding

use crate::error::ipc::IpcError;
use crate::ipc::event::WireMap;
use crate::ipc::request::{HeartbeatRequest, NetworkInitializeRequest, ProcessRequest, Request};
use crate::ipc::response::{HEARTBEAT_RESPONSE_TYPE, NETWORK_INITIALIZE_RESPONSE_TYPE, Response};
use crate::ipc::RequestHandler;

use common::StatusCode;

use serde_json::{Value, json};

/// Handler that answers every request with the same map.
struct FixedHandler(WireMap);

impl RequestHandler for FixedHandler {
    fn handle_request(&self, _request: &Request) -> Result<WireMap, IpcError> {
        Ok(self.0.clone())
    }
}

struct FailingHandler;

impl RequestHandler for FailingHandler {
    fn handle_request(&self, request: &Request) -> Result<WireMap, IpcError> {
        Err(IpcError::no_data(request.request_type()))
    }
}

fn fixed(value: Value) -> FixedHandler {
    match value {
        Value::Object(map) => FixedHandler(map),
        other => panic!("Expected object, got {other}"),
    }
}

/// **VALUE**: Verifies processing without a handler fails instead of inventing a response.
///
/// **WHY THIS MATTERS**: The receiver holds its handler weakly. Once the stack is gone, a late
/// datagram must be dropped rather than answered with made-up state.
///
/// **BUG THIS CATCHES**: Would catch a `process()` that builds a default response when the
/// handler is missing.
#[test]
fn given_no_handler_when_processed_then_returns_invalid_handler() {
    // GIVEN: A heartbeat and no handler
    let request = Request::from(HeartbeatRequest::new(1));

    // WHEN: Processing
    let result = request.process(None);

    // THEN: InvalidHandler
    assert!(matches!(result, Err(IpcError::InvalidHandler { .. })));
}

#[test]
fn given_handler_returning_empty_map_when_processed_then_returns_no_data() {
    let request = Request::from(HeartbeatRequest::new(1));
    let handler = FixedHandler(WireMap::new());

    let result = request.process(Some(&handler));

    assert!(matches!(result, Err(IpcError::HandlerReturnedNoData { .. })));
}

#[test]
fn given_failing_handler_when_processed_then_error_propagates() {
    let request = Request::from(NetworkInitializeRequest::new(3, "addr", "US"));

    let result = request.process(Some(&FailingHandler));

    assert!(result.is_err());
}

/// **VALUE**: Verifies a heartbeat response echoes the id and copies the handler's fields.
///
/// **WHY THIS MATTERS**: The runtime matches responses to requests by `requestId` and reads
/// `initialized` to decide whether to send networkInit.
///
/// **BUG THIS CATCHES**: Would catch the id not being echoed or `pid`/`initialized` being
/// taken from the wrong keys.
#[test]
fn given_heartbeat_result_when_processed_then_response_echoes_id_and_fields() {
    // GIVEN: A handler reporting a pid, initialized and NETWORK_BUSY
    let request = Request::from(HeartbeatRequest::new(7));
    let handler = fixed(json!({"pid": 4321, "initialized": true, "resultCode": -7}));

    // WHEN: Processing
    let response = request.process(Some(&handler)).expect("should process");

    // THEN: A heartbeat response with everything copied
    let Response::Heartbeat(heartbeat) = &response else {
        panic!("Expected heartbeat response, got {response:?}");
    };
    assert_eq!(heartbeat.header().response_type(), HEARTBEAT_RESPONSE_TYPE);
    assert_eq!(response.request_id(), 7);
    assert_eq!(response.result_code(), StatusCode::NetworkBusy);
    assert_eq!(heartbeat.pid(), 4321);
    assert!(heartbeat.initialized());
}

#[test]
fn given_network_init_result_when_processed_then_response_has_network_init_type() {
    let request = Request::from(NetworkInitializeRequest::new(9, "addr", "EU"));
    let handler = fixed(json!({"resultCode": 0}));

    let response = request.process(Some(&handler)).expect("should process");

    assert_eq!(
        response.header().response_type(),
        NETWORK_INITIALIZE_RESPONSE_TYPE
    );
    assert_eq!(response.request_id(), 9);
    assert_eq!(response.result_code(), StatusCode::Ok);
}

/// **VALUE**: Verifies a handler that forgets `resultCode` produces a failure code.
///
/// **BUG THIS CATCHES**: Would catch a missing code silently reported as success, which
/// would hide handler bugs behind passing tests.
#[test]
fn given_result_without_code_when_processed_then_reports_fail() {
    let request = Request::from(HeartbeatRequest::new(2));
    let handler = fixed(json!({"pid": 1, "initialized": false}));

    let response = request.process(Some(&handler)).expect("should process");

    assert_eq!(response.result_code(), StatusCode::Fail);
}

#[test]
fn given_unknown_result_code_when_processed_then_returns_malformed_payload() {
    let request = Request::from(HeartbeatRequest::new(2));
    let handler = fixed(json!({"resultCode": 99}));

    let result = request.process(Some(&handler));

    assert!(matches!(result, Err(IpcError::MalformedPayload { .. })));
}

#[test]
fn given_network_init_request_when_encoded_then_matches_wire_shape() {
    let request = Request::from(
        NetworkInitializeRequest::new(5, "00124b0001020304", "US").with_property("a", "b"),
    );

    assert_eq!(
        Value::Object(request.encode()),
        json!({
            "request": "networkInit",
            "requestId": 5,
            "address": "00124b0001020304",
            "region": "US",
            "properties": {"a": "b"}
        })
    );
}

#[test]
fn given_heartbeat_request_when_encoded_then_has_only_envelope_fields() {
    let request = Request::from(HeartbeatRequest::new(11));
    assert_eq!(
        Value::Object(request.encode()),
        json!({"request": "heartbeat", "requestId": 11})
    );
}
