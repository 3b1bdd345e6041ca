use stack_core::error::CoreError;
use stack_core::error::ipc::IpcError;

use common::ErrorLocation;

use std::error::Error;
use std::io::Error as IoError;
use std::io::ErrorKind;
use std::panic::Location;

/// **VALUE**: Verifies that `IpcError::Bind` names the port and keeps the OS error as its source.
///
/// **WHY THIS MATTERS**: "Address already in use" with no port is useless when several mocks
/// run side by side. The source chain is what tells a port clash apart from a permission issue.
///
/// **BUG THIS CATCHES**: Would catch if someone:
/// - Removes the `location` field from IpcError
/// - Drops `#[source]` from the bind variant
#[test]
#[track_caller]
fn given_bind_error_when_formatted_then_includes_message_location_and_source() {
    // GIVEN: A bind error
    let io_err = IoError::new(ErrorKind::AddrInUse, "address in use");
    let err = IpcError::Bind {
        message: String::from("Failed to bind 127.0.0.1:18443"),
        port: 18443,
        location: ErrorLocation::from(Location::caller()),
        source: io_err,
    };

    // WHEN: Formatting
    let error_string = err.to_string();

    // THEN: Type, message, location and source
    assert!(error_string.contains("Bind Error"));
    assert!(error_string.contains("127.0.0.1:18443"));
    assert!(error_string.contains("ipc.rs"));
    assert!(err.source().is_some(), "Bind error should keep its IO source");
}

/// **VALUE**: Verifies helper constructors record the caller's location, not their own.
///
/// **BUG THIS CATCHES**: Would catch a missing `#[track_caller]` on the helpers, which makes
/// every error point into the error module.
#[test]
fn given_helper_constructed_error_when_formatted_then_location_is_call_site() {
    // GIVEN/WHEN: An error from a helper
    let err = IpcError::unknown_request_type("bogus");

    // THEN: The location is this test file
    let error_string = err.to_string();
    assert!(error_string.contains("Unknown Request Type Error"));
    assert!(error_string.contains("'bogus'"));
    assert!(error_string.contains("integration_tests"));
}

#[test]
fn given_per_datagram_errors_when_classified_then_are_per_message() {
    assert!(IpcError::malformed("x").is_per_message());
    assert!(IpcError::unknown_request_type("x").is_per_message());
    assert!(IpcError::invalid_handler("x").is_per_message());
    assert!(IpcError::no_data("heartbeat").is_per_message());
    assert!(!IpcError::send("x").is_per_message());
}

#[test]
fn given_io_error_when_converted_then_becomes_io_variant() {
    let err: IpcError = IoError::new(ErrorKind::BrokenPipe, "pipe").into();
    assert!(matches!(err, IpcError::Io { .. }));

    let core: CoreError = err.into();
    assert!(core.to_string().starts_with("IO Error"));
}
