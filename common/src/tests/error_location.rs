use crate::ErrorLocation;

use std::panic::Location;

#[track_caller]
fn capture() -> ErrorLocation {
    ErrorLocation::from(Location::caller())
}

/// **VALUE**: Verifies a `#[track_caller]` constructor records where it was called from.
///
/// **WHY THIS MATTERS**: Every error conversion in the workspace (`From<io::Error>` and
/// friends) relies on this so `?` reports the failing line instead of the conversion.
///
/// **BUG THIS CATCHES**: Would catch `ErrorLocation::from` being handed a location
/// captured inside the helper rather than at the caller.
#[test]
fn given_track_caller_helper_when_called_then_location_is_call_site() {
    // GIVEN: The line of the call below
    let expected_line = line!() + 3;

    // WHEN: Capturing through the helper
    let location = capture();

    // THEN: File and line point here
    assert!(location.file.ends_with("error_location.rs"));
    assert_eq!(location.line, expected_line);
    assert!(location.column > 0);
}

/// **VALUE**: Verifies the `[file:line:column]` rendering used at the end of every error.
///
/// **WHY THIS MATTERS**: Log readers jump to source from this suffix.
///
/// **BUG THIS CATCHES**: Would catch a changed separator or missing brackets.
#[test]
fn given_error_location_when_formatted_then_is_bracketed_triple() {
    // GIVEN: A fixed location
    let location = ErrorLocation {
        file: "src/stack/state.rs",
        line: 42,
        column: 9,
    };

    // WHEN / THEN
    assert_eq!(location.to_string(), "[src/stack/state.rs:42:9]");
}
