// Unit tests for chip-tool output parsing and option building

use crate::accessory::chip_tool::{ChipTool, ChipToolOptions, parse_manual_pairing_code};
use crate::error::chip_tool::ChipToolError;

use std::path::PathBuf;

/// **VALUE**: Verifies the manual pairing code is pulled out of chip-tool's log line.
///
/// **WHY THIS MATTERS**: After opening a commissioning window, the only place the new code
/// appears is this log line. Multi-admin tests cannot pair a second controller without it.
///
/// **BUG THIS CATCHES**: Would catch a pattern that includes the brackets or misses the
/// `[SVR]` prefixed form.
#[test]
fn given_chip_tool_output_when_parsed_then_returns_manual_pairing_code() {
    // GIVEN: Output containing the code among other lines
    let output = "[1700000000.1] [CTL] Opening window\n\
                  [1700000000.2] [SVR] Manual pairing code: [34970112332]\n\
                  [1700000000.3] [SVR] SetupQRCode: [MT:-24J0AFN00KA0648G00]";

    // WHEN: Parsing
    let code = parse_manual_pairing_code(output);

    // THEN: Just the digits
    assert_eq!(code.as_deref(), Some("34970112332"));
}

#[test]
fn given_output_without_code_when_parsed_then_returns_none() {
    assert_eq!(parse_manual_pairing_code("[CTL] nothing to see"), None);
    assert_eq!(parse_manual_pairing_code("Manual pairing code: []"), None);
}

/// **VALUE**: Verifies a missing explicit executable is fatal at construction.
///
/// **WHY THIS MATTERS**: Without the CLI nothing can be commissioned; failing later would bury
/// the cause under a confusing timeout.
///
/// **BUG THIS CATCHES**: Would catch accepting a path without checking it exists.
#[test]
fn given_missing_executable_when_created_then_returns_not_found() {
    // GIVEN: A path that does not exist
    let options = ChipToolOptions {
        executable: Some(PathBuf::from("/definitely/not/here/chip-tool")),
        ..Default::default()
    };

    // WHEN: Creating the runner
    let result = ChipTool::new(options);

    // THEN: NotFound
    assert!(matches!(result, Err(ChipToolError::NotFound { .. })));
}

#[test]
fn given_trust_store_when_options_built_then_options_follow_storage_and_name() {
    // GIVEN: A runner using `/bin/sh` as a stand-in executable
    let options = ChipToolOptions {
        executable: Some(PathBuf::from("/bin/sh")),
        commissioner_name: String::from("beta"),
        paa_trust_store_path: Some(PathBuf::from("/tmp/paa")),
    };
    let tool = ChipTool::new(options).expect("runner");

    // WHEN: Building the shared options
    let built = tool.common_options();

    // THEN: Storage, name and trust store in order
    assert_eq!(
        built,
        vec![
            String::from("--storage-directory"),
            tool.storage_dir().to_string_lossy().to_string(),
            String::from("--commissioner-name"),
            String::from("beta"),
            String::from("--paa-trust-store-path"),
            String::from("/tmp/paa"),
        ]
    );
    assert!(tool.storage_dir().is_dir());
}
