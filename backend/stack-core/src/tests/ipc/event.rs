// Unit tests for the base event envelope

use crate::error::ipc::IpcError;
use crate::ipc::event::{DEFAULT_EVENT_TYPE, Event, STARTUP_EVENT_TYPE, WireEvent, WireMap};
use crate::{STACK_EVENT_PORT, STACK_HOSTNAME};

use std::net::UdpSocket;
use std::time::Duration;

use serde_json::{Value, json};

fn map_of(value: Value) -> WireMap {
    match value {
        Value::Object(map) => map,
        other => panic!("Expected object, got {other}"),
    }
}

/// **VALUE**: Verifies new events are addressed to the fixed event endpoint.
///
/// **WHY THIS MATTERS**: The runtime under test only listens on its compiled-in event port.
/// An event addressed anywhere else is lost without any error.
///
/// **BUG THIS CATCHES**: Would catch swapped IPC/event ports in the defaults.
#[test]
fn given_new_event_when_created_then_targets_fixed_event_endpoint() {
    // GIVEN/WHEN: A startup event
    let event = Event::startup();

    // THEN: Fixed destination and a current timestamp
    assert_eq!(event.event_type(), STARTUP_EVENT_TYPE);
    assert_eq!(event.destination_address(), STACK_HOSTNAME);
    assert_eq!(event.destination_port(), STACK_EVENT_PORT);
    assert!(event.timestamp() > 0, "Timestamp should be epoch millis");
}

#[test]
fn given_event_when_encoded_then_carries_type_and_timestamp() {
    let event = Event::startup().with_timestamp(1_700_000_000_000);

    let encoded = event.encode();

    assert_eq!(
        Value::Object(encoded),
        json!({"eventType": "startup", "timestamp": 1_700_000_000_000_i64})
    );
}

/// **VALUE**: Verifies decoding tolerates missing and unknown keys.
///
/// **WHY THIS MATTERS**: Test clients decode whatever the runtime echoes back. New fields on
/// the wire must not break them.
///
/// **BUG THIS CATCHES**: Would catch a decoder that errors on unknown keys or leaves the
/// event type empty when it is absent.
#[test]
fn given_partial_map_when_decoded_then_missing_keys_take_defaults() {
    // GIVEN: A map with only an unknown key
    let map = map_of(json!({"somethingElse": true}));

    // WHEN: Decoding
    let event = Event::from_map(&map).expect("partial map should decode");

    // THEN: Defaults are used
    assert_eq!(event.event_type(), DEFAULT_EVENT_TYPE);
    assert!(event.timestamp() > 0);
}

#[test]
fn given_encoded_event_when_decoded_then_fields_match() {
    let event = Event::new("custom").with_timestamp(42);

    let decoded = Event::from_map(&event.encode()).expect("should decode");

    assert_eq!(decoded, event);
}

#[test]
fn given_empty_map_when_decoded_then_returns_malformed_payload() {
    let result = Event::from_map(&WireMap::new());
    assert!(matches!(result, Err(IpcError::MalformedPayload { .. })));
}

#[test]
fn given_wrongly_typed_field_when_decoded_then_returns_malformed_payload() {
    let map = map_of(json!({"eventType": 5, "timestamp": 1}));
    assert!(matches!(
        Event::from_map(&map),
        Err(IpcError::MalformedPayload { .. })
    ));
}

/// **VALUE**: Verifies `try_send()` puts the encoded JSON on the wire to the event's destination.
///
/// **BUG THIS CATCHES**: Would catch the payload being sent to the wrong port or being
/// something other than the `encode()` output.
#[test]
fn given_retargeted_event_when_sent_then_listener_receives_json() {
    // GIVEN: A listener on an ephemeral port and an event addressed to it
    let listener = UdpSocket::bind("127.0.0.1:0").expect("bind listener");
    listener
        .set_read_timeout(Some(Duration::from_secs(2)))
        .expect("set timeout");
    let port = listener.local_addr().expect("local addr").port();
    let event = Event::startup().addressed_to("127.0.0.1", port);

    // WHEN: Sending it
    event.try_send().expect("send should succeed");

    // THEN: The listener receives the encoded event
    let mut buf = [0u8; 1024];
    let (len, _) = listener.recv_from(&mut buf).expect("should receive event");
    let received: Value = serde_json::from_slice(&buf[..len]).expect("valid JSON");
    assert_eq!(received, Value::Object(event.encode()));
}

/// **VALUE**: Verifies `send()` swallows delivery failures.
///
/// **WHY THIS MATTERS**: A lost reply must never take the simulated stack down.
///
/// **BUG THIS CATCHES**: Would catch `send()` panicking when the destination cannot be resolved.
#[test]
fn given_unresolvable_destination_when_sent_then_does_not_panic() {
    // GIVEN: An address that cannot resolve
    let event = Event::startup().addressed_to("host.invalid.", 9);

    // WHEN/THEN: try_send reports, send swallows
    assert!(event.try_send().is_err());
    event.send();
}
