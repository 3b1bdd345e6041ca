// Unit tests for MockStack construction and accessors (no sockets bound)

use crate::config::StackConfig;
use crate::stack::{MockStack, NetworkParameters};

use common::StatusCode;

/// **VALUE**: Verifies a stack can be built without binding anything and reports a clean slate.
///
/// **WHY THIS MATTERS**: Every test that uses the mock stack starts from `MockStack::new`.
/// Wiring the shared state into the receiver as its handler happens right here.
///
/// **BUG THIS CATCHES**: Would catch the state/handler wiring being broken, or a fresh stack
/// claiming to be running or initialized before `start()`.
#[test]
fn given_new_stack_when_inspected_then_stopped_with_default_network() {
    // GIVEN: A stack on a private port pair, never started
    let stack = MockStack::new(StackConfig::with_ports(28_103, 28_104));

    // WHEN/THEN: Nothing is running and the network is untouched
    assert!(!stack.is_running());
    assert!(!stack.is_network_initialized());
    assert_eq!(stack.network(), NetworkParameters::default());
    assert!(stack.network_key().is_invalid());
    assert_eq!(stack.config().ipc_port, 28_103);
}

/// **VALUE**: Verifies the pending result code set through the stack is visible through it.
///
/// **BUG THIS CATCHES**: Would catch the setter writing to a different state instance than
/// the one the receiver's handler reads.
#[test]
fn given_new_stack_when_pending_code_set_then_it_is_reported() {
    let stack = MockStack::new(StackConfig::with_ports(28_105, 28_106));

    stack.set_pending_result_code(StatusCode::NetworkBusy);

    assert_eq!(stack.pending_result_code(), StatusCode::NetworkBusy);
}

/// **VALUE**: Verifies stopping a stack that never started is a harmless no-op.
///
/// **BUG THIS CATCHES**: Would catch `stop()` touching the receiver when nothing is running,
/// or `Drop` stopping a stopped stack.
#[test]
fn given_stopped_stack_when_stopped_then_stays_stopped() {
    let stack = MockStack::new(StackConfig::with_ports(28_107, 28_108));

    stack.stop();

    assert!(!stack.is_running());
}
