use crate::accessory::helpers::FakeTool;

use stack_core::accessory::chip_tool::{
    ChipTool, ChipToolOptions, CommissionOptions, DEFAULT_COMMAND_TIMEOUT,
};
use stack_core::accessory::process::AccessoryProcess;
use stack_core::error::chip_tool::ChipToolError;

use std::time::Duration;

use serde_json::json;
use serial_test::serial;

fn tool_for(fake: &FakeTool) -> ChipTool {
    ChipTool::new(ChipToolOptions {
        executable: Some(fake.path().to_path_buf()),
        ..Default::default()
    })
    .expect("runner should be created")
}

/// **VALUE**: Verifies commissioning registers the node and picks up the new window's code.
///
/// **WHY THIS MATTERS**: Multi-admin tests pair the device to the runtime after chip-tool.
/// They need the code from the re-opened window, not the original one.
///
/// **BUG THIS CATCHES**: Would catch the node not being recorded, or the original code being
/// reported after a window was opened.
#[tokio::test]
#[serial(process)]
async fn given_working_tool_when_commissioned_then_device_registered_with_new_code() {
    // GIVEN: A runner around a working fake tool
    let fake = FakeTool::working();
    let mut tool = tool_for(&fake);

    // WHEN: Commissioning with defaults (window re-opened)
    let device = tool
        .commission("11223344556", &CommissionOptions::default())
        .await
        .expect("commissioning should succeed");

    // THEN: Node 1 registered with the new code
    assert_eq!(device.node_id, 1);
    assert_eq!(device.pairing_code, "34970112332");
    assert_eq!(tool.registered_device(1), Some(&device));
    assert!(fake.last_args().starts_with("pairing open-commissioning-window 1 1 180 1000 3840"));
}

#[tokio::test]
#[serial(process)]
async fn given_no_window_when_commissioned_then_keeps_original_code_and_node_ids_advance() {
    let fake = FakeTool::working();
    let mut tool = tool_for(&fake);
    let options = CommissionOptions {
        open_commissioning_window: false,
        ..Default::default()
    };

    let first = tool.commission("111", &options).await.expect("first");
    let second = tool.commission("222", &options).await.expect("second");

    assert_eq!(first.pairing_code, "111");
    assert_eq!((first.node_id, second.node_id), (1, 2));
    assert!(fake.last_args().starts_with("pairing code 2 222 --storage-directory"));
    assert_eq!(tool.registered_devices().len(), 2);
}

/// **VALUE**: Verifies a failed commissioning is an error carrying the node id.
///
/// **BUG THIS CATCHES**: Would catch a failed pairing being registered anyway.
#[tokio::test]
#[serial(process)]
async fn given_failing_tool_when_commissioned_then_returns_commission_error() {
    // GIVEN: A tool that always fails
    let fake = FakeTool::failing();
    let mut tool = tool_for(&fake);

    // WHEN: Commissioning as node 5
    let options = CommissionOptions {
        node_id: Some(5),
        ..Default::default()
    };
    let result = tool.commission("11223344556", &options).await;

    // THEN: Commission error for node 5, nothing registered
    match result {
        Err(ChipToolError::Commission { node_id, message, .. }) => {
            assert_eq!(node_id, 5);
            assert!(message.contains("Timeout waiting for device"));
        }
        other => panic!("Expected Commission error, got {other:?}"),
    }
    assert!(tool.registered_devices().is_empty());
}

/// **VALUE**: Verifies non-zero exits and timeouts are reported, never raised.
///
/// **WHY THIS MATTERS**: Tests assert on the result of interactions that are expected to fail.
/// A panic or error would abort the test before its assertion runs.
///
/// **BUG THIS CATCHES**: Would catch a hung command blocking the test forever.
#[tokio::test]
#[serial(process)]
async fn given_failing_and_slow_commands_when_run_then_results_describe_failure() {
    // GIVEN: A working tool
    let fake = FakeTool::working();
    let tool = tool_for(&fake);

    // WHEN: Running an unknown command
    let unknown = tool
        .run(&[String::from("bogus"), String::from("cmd")], DEFAULT_COMMAND_TIMEOUT)
        .await;

    // THEN: Exit code and stderr are reported
    assert!(!unknown.success);
    assert_eq!(unknown.return_code, 3);
    assert!(unknown.stderr.contains("Unknown command"));

    // WHEN: Running a command that outlives its timeout
    let slow = tool
        .run(&[String::from("slow"), String::from("command")], Duration::from_millis(300))
        .await;

    // THEN: Reported as timed out
    assert!(!slow.success);
    assert_eq!(slow.return_code, -1);
    assert!(slow.stderr.contains("timed out"));
}

#[tokio::test]
#[serial(process)]
async fn given_json_output_when_attribute_read_then_data_is_parsed() {
    let fake = FakeTool::working();
    let tool = tool_for(&fake);

    let result = tool
        .read_attribute(1, 1, "onoff", "on-off", DEFAULT_COMMAND_TIMEOUT)
        .await;

    assert!(result.success);
    assert_eq!(result.data, Some(json!({"onOff": true})));
    assert!(fake.last_args().starts_with("onoff read on-off 1 1"));
}

#[tokio::test]
#[serial(process)]
async fn given_arguments_when_command_invoked_then_passed_as_options() {
    let fake = FakeTool::working();
    let tool = tool_for(&fake);

    let result = tool
        .invoke_command(4, 2, "onoff", "toggle", &[("timedInteractionTimeoutMs", "500")], DEFAULT_COMMAND_TIMEOUT)
        .await;

    assert!(result.success);
    assert!(result.data.is_none());
    assert!(fake
        .last_args()
        .starts_with("onoff toggle 4 2 --timedInteractionTimeoutMs 500 --storage-directory"));
}

#[tokio::test]
#[serial(process)]
async fn given_registered_device_when_unpaired_then_forgotten() {
    let fake = FakeTool::working();
    let mut tool = tool_for(&fake);
    let options = CommissionOptions {
        open_commissioning_window: false,
        ..Default::default()
    };
    tool.commission("111", &options).await.expect("commission");

    let result = tool.unpair(1, DEFAULT_COMMAND_TIMEOUT).await;

    assert!(result.success);
    assert!(tool.registered_device(1).is_none());
}

#[tokio::test]
#[serial(process)]
async fn given_discovery_commands_when_run_then_args_match_cli() {
    let fake = FakeTool::working();
    let tool = tool_for(&fake);

    tool.discover_commissionable(DEFAULT_COMMAND_TIMEOUT).await;
    assert!(fake.last_args().starts_with("discover commissionables --storage-directory"));

    tool.resolve_node(3, 1, DEFAULT_COMMAND_TIMEOUT).await;
    assert!(fake.last_args().starts_with("discover resolve 3 1 --storage-directory"));

    tool.write_attribute(3, 1, "levelcontrol", "on-level", 128, DEFAULT_COMMAND_TIMEOUT)
        .await;
    assert!(fake.last_args().starts_with("levelcontrol write on-level 128 3 1"));
}

/// **VALUE**: Verifies commissioning an accessory hands it the new window's code.
///
/// **BUG THIS CATCHES**: Would catch the accessory keeping a code that no longer advertises.
#[tokio::test]
#[serial(process)]
async fn given_accessory_with_code_when_commissioned_then_accessory_code_updated() {
    // GIVEN: An accessory with a known code and a working tool
    let fake = FakeTool::working();
    let mut tool = tool_for(&fake);
    let mut accessory = AccessoryProcess::shell("light", "sleep 1").expect("accessory");
    accessory.set_commissioning_code("11223344556");

    // WHEN: Commissioning it
    tool.commission_accessory(&mut accessory, &CommissionOptions::default())
        .await
        .expect("commission");

    // THEN: The accessory advertises the new code
    assert_eq!(accessory.commissioning_code(), Some("34970112332"));
}

#[tokio::test]
#[serial(process)]
async fn given_accessory_without_code_when_commissioned_then_returns_commission_error() {
    let fake = FakeTool::working();
    let mut tool = tool_for(&fake);
    let mut accessory = AccessoryProcess::shell("light", "sleep 1").expect("accessory");

    let result = tool
        .commission_accessory(&mut accessory, &CommissionOptions::default())
        .await;

    assert!(matches!(result, Err(ChipToolError::Commission { .. })));
}
