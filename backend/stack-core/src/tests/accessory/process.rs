// Unit tests for accessory launch parameters and process tree helpers

use crate::accessory::process::{
    MAX_DISCRIMINATOR, MatterApp, descendants, is_alive, is_valid_passcode, with_process,
};
use crate::error::accessory::AccessoryError;

use std::path::Path;

/// **VALUE**: Verifies the passcodes Matter forbids are rejected.
///
/// **BUG THIS CATCHES**: Would catch a random generator that can emit `12345678` or a
/// repeated-digit code, which real devices refuse.
#[test]
fn given_forbidden_passcodes_when_checked_then_are_invalid() {
    for passcode in [0, 11_111_111, 12_345_678, 87_654_321, 99_999_999, 100_000_000] {
        assert!(!is_valid_passcode(passcode), "{passcode} should be invalid");
    }
    assert!(is_valid_passcode(20_202_021));
}

#[test]
fn given_new_app_when_created_then_setup_values_are_valid() {
    for _ in 0..32 {
        let app = MatterApp::new("chip-lighting-app", "light");
        assert!(is_valid_passcode(app.passcode));
        assert!(app.discriminator <= MAX_DISCRIMINATOR);
        assert!(app.validate().is_ok());
    }
}

/// **VALUE**: Verifies the sample-app command line carries every setup parameter.
///
/// **WHY THIS MATTERS**: The app advertises with exactly these values; if one is dropped the
/// commissioning code computed by the test no longer matches the device.
///
/// **BUG THIS CATCHES**: Would catch a missing `--KVS`, which makes parallel apps share storage.
#[test]
fn given_matter_app_when_args_built_then_contains_setup_and_kvs() {
    // GIVEN: Fixed setup values
    let app = MatterApp::new("chip-lighting-app", "light")
        .with_setup(20_202_021, 3840)
        .with_vendor(0xFFF1, 0x8000)
        .with_secured_device_port(5541);

    // WHEN: Building args
    let args = app.args(Path::new("/tmp/kvs"));

    // THEN: All flags in order
    assert_eq!(
        args,
        vec![
            "--passcode", "20202021", "--discriminator", "3840", "--vendor-id", "65521",
            "--product-id", "32768", "--secured-device-port", "5541", "--KVS",
            "/tmp/kvs/chip_kvs",
        ]
    );
}

#[test]
fn given_product_without_vendor_when_validated_then_returns_validation_error() {
    let app = MatterApp::new("chip-lighting-app", "light").with_vendor(0, 0x8000);
    assert!(matches!(
        app.validate(),
        Err(AccessoryError::Validation { .. })
    ));
}

#[test]
fn given_oversized_discriminator_when_validated_then_returns_validation_error() {
    let app = MatterApp::new("chip-lighting-app", "light").with_setup(20_202_021, 0x1000);
    assert!(app.validate().is_err());
}

/// **VALUE**: Verifies process lookups handle our own and nonexistent PIDs.
///
/// **BUG THIS CATCHES**: Would catch `is_alive()` treating a missing process as alive, which
/// would make every stop wait out its full backoff.
#[test]
fn given_own_and_missing_pid_when_queried_then_reports_correctly() {
    let our_pid = std::process::id();

    assert_eq!(with_process(our_pid, |p| p.pid().as_u32()), Some(our_pid));
    assert!(is_alive(our_pid));
    assert!(!is_alive(u32::MAX));
    assert!(descendants(u32::MAX).is_empty());
}
