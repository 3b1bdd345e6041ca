// Unit tests for the simulated stack's shared state

use crate::config::StackConfig;
use crate::ipc::RequestHandler;
use crate::ipc::request::{HeartbeatRequest, NetworkInitializeRequest, Request};
use crate::stack::state::{NetworkParameters, StackState};

use common::{RedactedNetworkKey, StatusCode};

use std::sync::Arc;
use std::thread;

use serde_json::json;

/// Port pair nothing listens on, so startup events go nowhere.
fn quiet_config() -> StackConfig {
    StackConfig::with_ports(28_101, 28_102)
}

/// **VALUE**: Verifies a generated network key is 16 random bytes in hex.
///
/// **WHY THIS MATTERS**: The runtime validates key length before using it. A short key makes
/// the runtime reject the network it was just told about.
///
/// **BUG THIS CATCHES**: Would catch encoding 8 bytes instead of 16, or emitting the
/// all-zero placeholder.
#[test]
fn given_generated_parameters_when_inspected_then_key_is_32_hex_chars() {
    // GIVEN/WHEN: Fresh parameters
    let params = NetworkParameters::generate("addr", "US", 25);

    // THEN: 32 hex chars, not the placeholder, channel as requested
    let key = params.network_key.as_str();
    assert_eq!(key.len(), 32);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(!params.network_key.is_invalid());
    assert_eq!(params.channel, 25);
}

/// **VALUE**: Verifies `apply()` only takes set values that differ.
///
/// **BUG THIS CATCHES**: Would catch an empty region in the request wiping the current one.
#[test]
fn given_partial_update_when_applied_then_only_set_fields_change() {
    // GIVEN: Existing parameters and an update with an empty region and zero channel
    let mut current = NetworkParameters {
        address: String::from("old"),
        region: String::from("US"),
        network_key: RedactedNetworkKey::invalid(),
        channel: 11,
        pan_id: 100,
    };
    let update = NetworkParameters {
        address: String::from("new"),
        region: String::new(),
        network_key: RedactedNetworkKey::default(),
        channel: 0,
        pan_id: 100,
    };

    // WHEN: Applying
    let changed = current.apply(update);

    // THEN: Only the address changed
    assert!(changed);
    assert_eq!(current.address, "new");
    assert_eq!(current.region, "US");
    assert_eq!(current.channel, 11);
    assert_eq!(current.pan_id, 100);
}

#[test]
fn given_identical_update_when_applied_then_reports_unchanged() {
    let mut current = NetworkParameters::generate("addr", "EU", 15);
    let changed = current.apply(current.clone());
    assert!(!changed);
}

/// **VALUE**: Verifies the pending result code is consumed by exactly one request.
///
/// **WHY THIS MATTERS**: Fault injection tests rely on "this request fails, the next one
/// succeeds". A sticky code would fail every later request.
///
/// **BUG THIS CATCHES**: Would catch read without reset, or reset before read.
#[test]
fn given_pending_code_when_two_heartbeats_handled_then_only_first_carries_it() {
    // GIVEN: NETWORK_BUSY pending
    let state = StackState::new(quiet_config());
    state.set_pending_result_code(StatusCode::NetworkBusy);
    let request = Request::from(HeartbeatRequest::new(1));

    // WHEN: Handling two requests
    let first = state.handle_request(&request).expect("first");
    let second = state.handle_request(&request).expect("second");

    // THEN: -7 then 0
    assert_eq!(first.get("resultCode"), Some(&json!(-7)));
    assert_eq!(second.get("resultCode"), Some(&json!(0)));
    assert_eq!(state.pending_result_code(), StatusCode::Ok);
}

#[test]
fn given_heartbeat_when_handled_then_reports_pid_and_initialized() {
    let state = StackState::new(quiet_config());

    let result = state
        .handle_request(&Request::from(HeartbeatRequest::new(3)))
        .expect("heartbeat");

    assert_eq!(result.get("pid"), Some(&json!(std::process::id())));
    assert_eq!(result.get("initialized"), Some(&json!(false)));
}

/// **VALUE**: Verifies the first networkInit forms a network and the second changes nothing.
///
/// **WHY THIS MATTERS**: The runtime may resend networkInit on retry. Re-forming the network
/// would change the key under its feet.
///
/// **BUG THIS CATCHES**: Would catch a non-atomic check-then-set, or a second request that
/// regenerates the key.
#[test]
fn given_network_init_twice_when_handled_then_second_is_no_op() {
    // GIVEN: A fresh state
    let state = StackState::new(quiet_config());
    let request = Request::from(NetworkInitializeRequest::new(1, "00124b00aabbccdd", "US"));

    // WHEN: First request
    state.handle_request(&request).expect("first");
    let formed = state.network();

    // THEN: Network formed with the test channel
    assert!(state.is_network_initialized());
    assert_eq!(formed.address, "00124b00aabbccdd");
    assert_eq!(formed.region, "US");
    assert_eq!(formed.channel, quiet_config().test_channel);
    assert_eq!(formed.network_key.len(), 32);

    // WHEN: Second request with different values
    let again = Request::from(NetworkInitializeRequest::new(2, "other", "EU"));
    let result = state.handle_request(&again).expect("second");

    // THEN: Nothing changed and the code is still reported
    assert_eq!(state.network(), formed);
    assert_eq!(result.get("resultCode"), Some(&json!(0)));
}

#[test]
fn given_initialized_network_when_reset_then_next_init_forms_again() {
    let state = StackState::new(quiet_config());
    assert!(state.begin_network_initialize());
    assert!(!state.begin_network_initialize());

    state.reset_network();

    assert!(!state.is_network_initialized());
    assert!(state.network().network_key.is_invalid());
    assert!(state.begin_network_initialize());
}

/// **VALUE**: Verifies compare-and-set admits exactly one winner under contention.
///
/// **BUG THIS CATCHES**: Would catch splitting the check and the set across two lock
/// acquisitions.
#[test]
fn given_concurrent_initializers_when_racing_then_exactly_one_wins() {
    // GIVEN: Shared state and several threads
    let state = Arc::new(StackState::new(quiet_config()));

    // WHEN: All try to begin initialization
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let state = Arc::clone(&state);
            thread::spawn(move || state.begin_network_initialize())
        })
        .collect();
    let winners = handles
        .into_iter()
        .map(|h| h.join().expect("thread"))
        .filter(|won| *won)
        .count();

    // THEN: One winner
    assert_eq!(winners, 1);
}
