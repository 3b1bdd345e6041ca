// Unit tests for response encoding and decoding

use crate::error::ipc::IpcError;
use crate::ipc::event::{WireEvent, WireMap};
use crate::ipc::response::{
    DEFAULT_RESPONSE_TYPE, HeartbeatResponse, IPC_RESPONSE_EVENT_TYPE,
    NetworkInitializeResponse, Response, ResponseHeader,
};

use common::StatusCode;

use serde_json::{Value, json};

fn map_of(value: Value) -> WireMap {
    match value {
        Value::Object(map) => map,
        other => panic!("Expected object, got {other}"),
    }
}

/// **VALUE**: Verifies the heartbeat response wire shape field by field.
///
/// **WHY THIS MATTERS**: The runtime parses these keys by name. The subtype fields must sit on
/// top of the header fields, which sit on top of the event fields.
///
/// **BUG THIS CATCHES**: Would catch a subtype `encode()` that replaces the base map instead of
/// extending it, losing `eventType` or `requestId`.
#[test]
fn given_heartbeat_response_when_encoded_then_all_layers_present() {
    // GIVEN: A heartbeat response
    let response = HeartbeatResponse::new(7, StatusCode::Ok, 1234, false);
    let timestamp = response.event().timestamp();

    // WHEN: Encoding
    let encoded = Value::Object(response.encode());

    // THEN: Event, header and heartbeat fields are all there
    assert_eq!(
        encoded,
        json!({
            "eventType": IPC_RESPONSE_EVENT_TYPE,
            "timestamp": timestamp,
            "responseType": "heartbeatResponse",
            "requestId": 7,
            "resultCode": 0,
            "pid": 1234,
            "initialized": false
        })
    );
}

#[test]
fn given_network_init_response_when_encoded_then_has_no_extra_fields() {
    let response = NetworkInitializeResponse::new(3, StatusCode::NotReady);

    let encoded = response.encode();

    assert_eq!(encoded.len(), 5);
    assert_eq!(encoded.get("responseType"), Some(&json!("networkInitResponse")));
    assert_eq!(encoded.get("resultCode"), Some(&json!(-8)));
}

#[test]
fn given_encoded_response_when_decoded_then_dispatches_on_response_type() {
    let original = Response::from(HeartbeatResponse::new(21, StatusCode::Timeout, 99, true));

    let decoded = Response::from_map(&original.encode()).expect("should decode");

    assert_eq!(decoded, original);
}

/// **VALUE**: Verifies header decoding fills defaults and ignores unknown keys.
///
/// **BUG THIS CATCHES**: Would catch a decoder that requires every key, which breaks test
/// clients whenever the runtime adds a field.
#[test]
fn given_sparse_header_map_when_decoded_then_defaults_apply() {
    // GIVEN: Only an unknown key
    let map = map_of(json!({"extra": 1}));

    // WHEN: Decoding
    let header = ResponseHeader::from_map(&map).expect("should decode");

    // THEN: Defaults
    assert_eq!(header.response_type(), DEFAULT_RESPONSE_TYPE);
    assert_eq!(header.request_id(), 0);
    assert_eq!(header.result_code(), StatusCode::Ok);
}

/// **VALUE**: Verifies a header carrying a code outside the known set is rejected, not coerced.
///
/// **BUG THIS CATCHES**: Would catch an unknown `resultCode` silently decoding as `Ok` (the
/// missing-key default) or as `Fail`, hiding a runtime sending codes the mock never defined.
#[test]
fn given_header_with_unknown_result_code_when_decoded_then_returns_malformed_payload() {
    // GIVEN: A code past the end of the table
    let map = map_of(json!({"resultCode": -42}));

    // WHEN/THEN
    assert!(matches!(
        ResponseHeader::from_map(&map),
        Err(IpcError::MalformedPayload { .. })
    ));
}

#[test]
fn given_unknown_response_type_when_decoded_then_returns_malformed_payload() {
    let map = map_of(json!({"responseType": "somethingElse"}));
    assert!(matches!(
        Response::from_map(&map),
        Err(IpcError::MalformedPayload { .. })
    ));
}

#[test]
fn given_response_when_addressed_then_destination_changes_and_fields_do_not() {
    let response = Response::from(NetworkInitializeResponse::new(1, StatusCode::Ok));
    let encoded_before = response.encode();

    let retargeted = response.addressed_to("127.0.0.1", 40001);

    assert_eq!(retargeted.event().destination_port(), 40001);
    assert_eq!(retargeted.request_id(), 1);
    assert_eq!(
        retargeted.encode().get("requestId"),
        encoded_before.get("requestId")
    );
}
