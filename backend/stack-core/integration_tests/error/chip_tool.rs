use stack_core::error::chip_tool::ChipToolError;

use common::ErrorLocation;

use std::panic::Location;

/// **VALUE**: Verifies commissioning errors say which node failed.
///
/// **BUG THIS CATCHES**: Would catch the node id being dropped from the Display output, which
/// makes multi-device failures ambiguous.
#[test]
#[track_caller]
fn given_commission_error_when_formatted_then_includes_node_id() {
    let err = ChipToolError::Commission {
        node_id: 42,
        message: String::from("device did not respond"),
        location: ErrorLocation::from(Location::caller()),
    };

    let error_string = err.to_string();

    assert!(error_string.contains("Commission Error"));
    assert!(error_string.contains("node 42"));
    assert!(error_string.contains("device did not respond"));
}
