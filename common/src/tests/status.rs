// Unit tests for the shared status code set

use crate::StatusCode;

/// **VALUE**: Verifies every status code maps to the exact wire integer the stack protocol uses.
///
/// **WHY THIS MATTERS**: The runtime under test compares `resultCode` against its own compiled
/// constants. A single off-by-one here makes injected faults look like different faults.
///
/// **BUG THIS CATCHES**: Would catch reordering of the enum or a typo in `code()`.
#[test]
fn given_each_status_when_code_called_then_matches_wire_value() {
    // GIVEN: The expected wire table
    let expected = [
        (StatusCode::Ok, 0),
        (StatusCode::Fail, -1),
        (StatusCode::InvalidArg, -2),
        (StatusCode::NotImplemented, -3),
        (StatusCode::Timeout, -4),
        (StatusCode::OutOfMemory, -5),
        (StatusCode::MessageDeliveryFailed, -6),
        (StatusCode::NetworkBusy, -7),
        (StatusCode::NotReady, -8),
        (StatusCode::LowPowerMode, -9),
    ];

    // WHEN/THEN: Each code produces its wire value and maps back
    for (status, code) in expected {
        assert_eq!(status.code(), code, "Wrong wire value for {status}");
        assert_eq!(StatusCode::from_code(i64::from(code)), Some(status));
    }
}

/// **VALUE**: Verifies values outside the closed set are rejected instead of coerced.
///
/// **BUG THIS CATCHES**: Would catch a `from_code()` that silently maps unknown values to `Fail`.
#[test]
fn given_unknown_wire_value_when_from_code_called_then_returns_none() {
    assert_eq!(StatusCode::from_code(1), None);
    assert_eq!(StatusCode::from_code(-10), None);
}

#[test]
fn given_default_status_when_created_then_is_ok() {
    assert!(StatusCode::default().is_ok());
    assert_eq!(StatusCode::NetworkBusy.to_string(), "NETWORK_BUSY (-7)");
}
