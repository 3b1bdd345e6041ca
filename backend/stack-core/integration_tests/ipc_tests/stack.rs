use crate::ipc_tests::helpers::{
    QUIET_PERIOD, bind_event_listener, drain, recv_event_of_type, recv_response, send_request,
    test_config, wait_until,
};

use stack_core::config::StackConfig;
use stack_core::ipc::{HeartbeatRequest, NetworkInitializeRequest, Request, Response};
use stack_core::stack::MockStack;
use stack_core::{STACK_EVENT_PORT, STACK_IPC_PORT};

use common::StatusCode;

use std::time::Duration;

use serial_test::serial;

fn heartbeat(request_id: i64) -> Request {
    Request::from(HeartbeatRequest::new(request_id))
}

fn network_init(request_id: i64, address: &str, region: &str) -> Request {
    Request::from(NetworkInitializeRequest::new(request_id, address, region))
}

/// **VALUE**: End-to-end heartbeat against the fixed ports the runtime is compiled with.
///
/// **WHY THIS MATTERS**: This is exactly what the runtime does on boot. If it fails, no test
/// that uses the mock stack can pass.
///
/// **BUG THIS CATCHES**: Would catch a wrong default port, a missing `requestId` echo, or a
/// response type the runtime does not recognize.
#[test]
#[serial]
fn given_default_stack_when_heartbeat_sent_then_response_arrives_on_event_port() {
    // GIVEN: The runtime's event port and a stack on the default ports
    let events = bind_event_listener(STACK_EVENT_PORT);
    let stack = MockStack::started(StackConfig::default()).expect("stack should start");

    // WHEN: The runtime sends a heartbeat
    send_request(STACK_IPC_PORT, &heartbeat(7));

    // THEN: A heartbeat response with the same id, OK, and not yet initialized
    let response = recv_response(&events);
    let Response::Heartbeat(heartbeat) = &response else {
        panic!("Expected heartbeat response, got {response:?}");
    };
    assert_eq!(heartbeat.header().response_type(), "heartbeatResponse");
    assert_eq!(response.request_id(), 7);
    assert_eq!(response.result_code(), StatusCode::Ok);
    assert_eq!(heartbeat.pid(), std::process::id());
    assert!(!heartbeat.initialized());

    stack.stop();
}

/// **VALUE**: Verifies starting the stack announces it on the event port.
///
/// **BUG THIS CATCHES**: Would catch the startup event being sent before the receiver is bound
/// or not at all.
#[test]
fn given_stopped_stack_when_started_then_startup_event_sent() {
    // GIVEN: A listener on the event port
    let events = bind_event_listener(28_302);
    let stack = MockStack::new(test_config(28_301, 28_302));

    // WHEN: Starting
    stack.start().expect("stack should start");

    // THEN: A startup event arrives and the stack reports running
    assert!(recv_event_of_type(&events, "startup").is_some());
    assert!(stack.is_running());
}

/// **VALUE**: Verifies an injected fault is reported once, then cleared.
///
/// **WHY THIS MATTERS**: This is how tests exercise the runtime's error handling for stack
/// failures like NETWORK_BUSY.
///
/// **BUG THIS CATCHES**: Would catch the pending code never being reset, or being consumed
/// by something other than the next request.
#[test]
fn given_pending_network_busy_when_two_heartbeats_sent_then_only_first_fails() {
    // GIVEN: A running stack with NETWORK_BUSY pending
    let events = bind_event_listener(28_304);
    let stack = MockStack::started(test_config(28_303, 28_304)).expect("stack should start");
    drain(&events);
    stack.set_pending_result_code(StatusCode::NetworkBusy);

    // WHEN/THEN: The first request carries -7
    send_request(28_303, &heartbeat(1));
    let first = recv_response(&events);
    assert_eq!(first.request_id(), 1);
    assert_eq!(first.result_code().code(), -7);

    // WHEN/THEN: The next request is back to OK
    send_request(28_303, &heartbeat(2));
    let second = recv_response(&events);
    assert_eq!(second.request_id(), 2);
    assert_eq!(second.result_code().code(), 0);
    assert_eq!(stack.pending_result_code(), StatusCode::Ok);
}

/// **VALUE**: Verifies the first networkInit forms a network and announces it.
///
/// **WHY THIS MATTERS**: The runtime treats the second startup event as "network is up" and
/// reads the key and channel afterwards.
///
/// **BUG THIS CATCHES**: Would catch a key of the wrong length, the placeholder key being kept,
/// or the startup event not being re-sent.
#[test]
fn given_fresh_stack_when_network_init_sent_then_network_formed_and_announced() {
    // GIVEN: A running stack with its startup event already consumed
    let events = bind_event_listener(28_306);
    let stack = MockStack::started(test_config(28_305, 28_306)).expect("stack should start");
    assert!(recv_event_of_type(&events, "startup").is_some());

    // WHEN: Sending networkInit
    send_request(28_305, &network_init(3, "00124b0001020304", "US"));

    // THEN: Startup re-sent, response OK, network formed
    assert!(recv_event_of_type(&events, "startup").is_some());
    let response = recv_response(&events);
    assert_eq!(response.header().response_type(), "networkInitResponse");
    assert_eq!(response.request_id(), 3);
    assert_eq!(response.result_code(), StatusCode::Ok);

    assert!(stack.is_network_initialized());
    assert_eq!(stack.address(), "00124b0001020304");
    assert_eq!(stack.region(), "US");
    assert_eq!(stack.channel(), 25);
    let key = stack.network_key();
    assert_eq!(key.len(), 32);
    assert!(!key.is_invalid());
}

/// **VALUE**: Verifies a repeated networkInit changes nothing and announces nothing.
///
/// **BUG THIS CATCHES**: Would catch a retry regenerating the key or emitting a spurious
/// startup event that makes the runtime think the stack rebooted.
#[test]
fn given_initialized_network_when_network_init_repeated_then_no_change_and_no_startup() {
    // GIVEN: A formed network
    let events = bind_event_listener(28_308);
    let stack = MockStack::started(test_config(28_307, 28_308)).expect("stack should start");
    send_request(28_307, &network_init(1, "first", "US"));
    recv_response(&events);
    let formed = stack.network();

    // WHEN: Sending networkInit again with different values
    send_request(28_307, &network_init(2, "second", "EU"));

    // THEN: Response still arrives, nothing changed, no startup event
    let response = recv_response(&events);
    assert_eq!(response.request_id(), 2);
    assert_eq!(stack.network(), formed);

    events
        .set_read_timeout(Some(QUIET_PERIOD))
        .expect("set timeout");
    assert!(recv_event_of_type(&events, "startup").is_none());
}

#[test]
fn given_formed_network_when_heartbeat_sent_then_reports_initialized() {
    let events = bind_event_listener(28_310);
    let stack = MockStack::started(test_config(28_309, 28_310)).expect("stack should start");

    send_request(28_309, &network_init(1, "addr", "US"));
    recv_response(&events);
    send_request(28_309, &heartbeat(2));

    let Response::Heartbeat(heartbeat) = recv_response(&events) else {
        panic!("Expected heartbeat response");
    };
    assert!(heartbeat.initialized());

    stack.reset_network();
    assert!(!stack.is_network_initialized());
}

/// **VALUE**: Verifies start/stop idempotency and that the stack can be restarted.
///
/// **BUG THIS CATCHES**: Would catch a second `start()` failing with a bind error against
/// its own socket, or a second `stop()` panicking.
#[test]
fn given_stack_when_started_and_stopped_twice_then_both_are_no_ops() {
    // GIVEN: A stack
    let stack = MockStack::new(test_config(28_311, 28_312));

    // WHEN/THEN: Double start, double stop
    stack.start().expect("first start");
    stack.start().expect("second start is a no-op");
    assert!(stack.is_running());

    stack.stop();
    stack.stop();
    assert!(!stack.is_running());

    // WHEN/THEN: Restart works
    stack.start().expect("restart");
    assert!(stack.is_running());
}

#[test]
fn given_running_stack_when_dropped_then_ipc_port_is_released() {
    let stack = MockStack::started(test_config(28_313, 28_314)).expect("stack should start");

    drop(stack);

    assert!(wait_until(Duration::from_secs(2), || {
        std::net::UdpSocket::bind("127.0.0.1:28313").is_ok()
    }));
}

/// **VALUE**: Verifies two stacks on different ports keep separate state.
///
/// **BUG THIS CATCHES**: Would catch state stored in statics shared across instances.
#[test]
fn given_two_stacks_when_one_initialized_then_other_is_unaffected() {
    let events_a = bind_event_listener(28_316);
    let _events_b = bind_event_listener(28_318);
    let a = MockStack::started(test_config(28_315, 28_316)).expect("stack a");
    let b = MockStack::started(test_config(28_317, 28_318)).expect("stack b");

    send_request(28_315, &network_init(1, "addr", "US"));
    recv_response(&events_a);

    assert!(a.is_network_initialized());
    assert!(!b.is_network_initialized());
}

/// **VALUE**: Verifies `start()` racing a `stop()` never leaves the stack marked running with
/// no listener behind it.
///
/// **WHY THIS MATTERS**: Test fixtures restart the stack between cases. If the running flag
/// and the receiver disagree, the next heartbeat silently goes unanswered.
///
/// **BUG THIS CATCHES**: Would catch `stop()` clearing the running flag before the receiver
/// has joined, letting a concurrent `start()` see the old listener, skip binding, and still
/// mark the stack running.
#[test]
fn given_running_stack_when_start_races_stop_then_flag_matches_listener() {
    // GIVEN: The event port and a stack on a private port pair
    let events = bind_event_listener(28_320);
    let stack = MockStack::new(test_config(28_319, 28_320));

    for request_id in 0..5 {
        stack.start().expect("stack should start");

        // WHEN: Stop and start race each other
        std::thread::scope(|scope| {
            scope.spawn(|| stack.stop());
            scope.spawn(|| stack.start().expect("racing start should not fail"));
        });

        // THEN: A running stack answers, a stopped one has released its port
        if stack.is_running() {
            send_request(28_319, &heartbeat(request_id));
            let response = recv_response(&events);
            assert_eq!(response.request_id(), request_id);
        } else {
            assert!(std::net::UdpSocket::bind("127.0.0.1:28319").is_ok());
        }
    }
}
