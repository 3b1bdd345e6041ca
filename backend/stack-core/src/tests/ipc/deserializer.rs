// Unit tests for datagram decoding

use crate::error::ipc::IpcError;
use crate::ipc::deserializer::deserialize_request;
use crate::ipc::request::{HeartbeatRequest, NetworkInitializeRequest, Request};

use serde_json::json;

/// **VALUE**: Verifies the canonical heartbeat datagram decodes to a typed request.
///
/// **WHY THIS MATTERS**: Heartbeats are how the runtime decides whether the stack is alive.
/// If they do not decode, every test that waits for the stack times out.
///
/// **BUG THIS CATCHES**: Would catch a renamed discriminator or a `requestId` that is not
/// read in camelCase.
#[test]
fn given_heartbeat_datagram_when_deserialized_then_returns_heartbeat_with_request_id() {
    // GIVEN: The datagram the runtime sends
    let raw = br#"{"request":"heartbeat","requestId":7}"#;

    // WHEN: Decoding it
    let request = deserialize_request(raw).expect("heartbeat should decode");

    // THEN: It is a heartbeat carrying the id
    assert_eq!(request, Request::Heartbeat(HeartbeatRequest::new(7)));
    assert_eq!(request.request_id(), 7);
}

/// **VALUE**: Verifies every networkInit field reaches the typed request.
///
/// **BUG THIS CATCHES**: Would catch `address`, `region` or `properties` being dropped during
/// decoding, which would make the stack form a network with empty parameters.
#[test]
fn given_network_init_datagram_when_deserialized_then_fields_are_carried() {
    // GIVEN: A full networkInit datagram
    let raw = json!({
        "request": "networkInit",
        "requestId": 12,
        "address": "00124b0001020304",
        "region": "US",
        "properties": {"txPower": 8}
    })
    .to_string();

    // WHEN: Decoding it
    let request = deserialize_request(raw.as_bytes()).expect("networkInit should decode");

    // THEN: All fields are present
    let expected = NetworkInitializeRequest::new(12, "00124b0001020304", "US")
        .with_property("txPower", 8);
    assert_eq!(request, Request::NetworkInitialize(expected));
}

#[test]
fn given_request_without_id_when_deserialized_then_id_defaults_to_zero() {
    let request = deserialize_request(br#"{"request":"heartbeat"}"#).expect("should decode");
    assert_eq!(request.request_id(), 0);
}

/// **VALUE**: Verifies unknown discriminators are reported with the offending value.
///
/// **WHY THIS MATTERS**: When the runtime grows a new request kind, the log must say which
/// one the mock does not understand, otherwise the failure is a silent timeout.
///
/// **BUG THIS CATCHES**: Would catch a catch-all arm that maps unknown requests to heartbeat.
#[test]
fn given_unknown_request_type_when_deserialized_then_returns_unknown_request_type() {
    // GIVEN: A bogus discriminator
    let raw = br#"{"request":"bogus","requestId":1}"#;

    // WHEN: Decoding it
    let result = deserialize_request(raw);

    // THEN: The error names the discriminator
    match result {
        Err(IpcError::UnknownRequestType { request_type, .. }) => {
            assert_eq!(request_type, "bogus");
        }
        other => panic!("Expected UnknownRequestType, got {other:?}"),
    }
}

/// **VALUE**: Verifies each flavor of garbage is rejected as a malformed payload.
///
/// **BUG THIS CATCHES**: Would catch a panic on invalid UTF-8 or a non-object payload, which
/// would kill the listener thread.
#[test]
fn given_malformed_payloads_when_deserialized_then_returns_malformed_payload() {
    // GIVEN: Payloads that are broken in different ways
    let payloads: [&[u8]; 5] = [
        &[0xff, 0xfe, 0xfd],
        b"not json",
        b"[1, 2, 3]",
        br#"{"requestId": 3}"#,
        br#"{"request": 42}"#,
    ];

    for raw in payloads {
        // WHEN: Decoding
        let result = deserialize_request(raw);

        // THEN: Malformed, never anything else
        assert!(
            matches!(result, Err(IpcError::MalformedPayload { .. })),
            "Expected MalformedPayload for {:?}, got {result:?}",
            String::from_utf8_lossy(raw)
        );
    }
}

#[test]
fn given_request_with_extra_keys_when_deserialized_then_extra_keys_are_ignored() {
    let raw = br#"{"request":"heartbeat","requestId":4,"future":"field"}"#;
    let request = deserialize_request(raw).expect("should decode");
    assert_eq!(request, Request::Heartbeat(HeartbeatRequest::new(4)));
}
