// Unit tests for network key redaction

use crate::RedactedNetworkKey;
use crate::redacted_key::INVALID_NETWORK_KEY;

/// **VALUE**: Verifies the network key never appears in Debug or Display output.
///
/// **WHY THIS MATTERS**: Mock stack state is logged liberally while debugging tests. A key that
/// leaks into logs trains people to treat real network keys the same way.
///
/// **BUG THIS CATCHES**: Would catch someone replacing the manual `Debug` impl with a derive.
#[test]
fn given_network_key_when_formatted_then_value_is_redacted() {
    // GIVEN: A key with a recognizable value
    let key = RedactedNetworkKey::new(String::from("deadbeefdeadbeefdeadbeefdeadbeef"));

    // WHEN: Formatting it both ways
    let debug = format!("{key:?}");
    let display = format!("{key}");

    // THEN: Neither contains the value
    assert!(!debug.contains("deadbeef"));
    assert!(!display.contains("deadbeef"));
    assert_eq!(key.len(), 32);
}

/// **VALUE**: Verifies serialization is refused so the key can't ride along in a JSON payload.
#[test]
fn given_network_key_when_serialized_then_returns_error() {
    let key = RedactedNetworkKey::invalid();

    let result = serde_json::to_string(&key);

    assert!(result.is_err(), "Serializing a network key must fail");
}

#[test]
fn given_default_key_when_checked_then_is_invalid_placeholder() {
    let key = RedactedNetworkKey::default();

    assert!(key.is_invalid());
    assert_eq!(key.as_str(), INVALID_NETWORK_KEY);
}
