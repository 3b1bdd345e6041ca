use stack_core::accessory::process::{AccessoryProcess, MatterApp};
use stack_core::error::accessory::AccessoryError;

use std::time::Duration;

use serial_test::serial;
use sysinfo::{Pid, ProcessStatus, ProcessesToUpdate, System};

fn is_alive(pid: u32) -> bool {
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, true);
    sys.process(Pid::from_u32(pid))
        .is_some_and(|p| p.status() != ProcessStatus::Zombie)
}

fn children_of(pid: u32) -> Vec<u32> {
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, true);
    sys.processes()
        .iter()
        .filter(|(_, p)| p.parent() == Some(Pid::from_u32(pid)))
        .map(|(child, _)| child.as_u32())
        .collect()
}

/// **VALUE**: Verifies an accessory can be started, observed and stopped.
///
/// **WHY THIS MATTERS**: Device tests start an accessory app, commission it and must stop it
/// afterwards. A leaked app keeps advertising and confuses the next test.
///
/// **BUG THIS CATCHES**: Would catch `stop()` returning before the process is gone.
#[test]
#[serial(process)]
fn given_started_accessory_when_stopped_then_process_is_gone() {
    // GIVEN: A long-running accessory
    let mut accessory = AccessoryProcess::shell("light", "sleep 30").expect("accessory");

    // WHEN: Starting it
    let pid = accessory.start().expect("should start");

    // THEN: Running with that pid
    assert_eq!(accessory.pid(), Some(pid));
    assert!(accessory.is_running());

    // WHEN: Stopping it
    let stopped = accessory.stop();

    // THEN: Gone
    assert!(stopped);
    assert!(!accessory.is_running());
    assert_eq!(accessory.pid(), None);
    assert!(!is_alive(pid));
}

/// **VALUE**: Verifies stopping terminates children of the launched process too.
///
/// **WHY THIS MATTERS**: Apps launched through a shell run as its child. Killing only the shell
/// orphans the app, which keeps holding its port.
///
/// **BUG THIS CATCHES**: Would catch a stop that only signals the top-level PID.
#[test]
#[serial(process)]
fn given_shell_with_child_when_stopped_then_child_is_gone_too() {
    // GIVEN: A shell that runs a child and waits for it
    let mut accessory =
        AccessoryProcess::shell("light", "sleep 30 & wait").expect("accessory");
    let pid = accessory.start().expect("should start");

    let mut children = Vec::new();
    for _ in 0..50 {
        children = children_of(pid);
        if !children.is_empty() {
            break;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    assert!(!children.is_empty(), "shell should have spawned a child");

    // WHEN: Stopping
    assert!(accessory.stop());

    // THEN: The child is gone as well
    for child in children {
        assert!(!is_alive(child), "child {child} should be terminated");
    }
}

#[test]
#[serial(process)]
fn given_running_accessory_when_started_again_then_same_pid_returned() {
    let mut accessory = AccessoryProcess::shell("light", "sleep 30").expect("accessory");

    let first = accessory.start().expect("first start");
    let second = accessory.start().expect("second start");

    assert_eq!(first, second);
}

#[test]
#[serial(process)]
fn given_short_lived_accessory_when_waited_then_exits() {
    let mut accessory = AccessoryProcess::shell("sensor", "exit 0").expect("accessory");
    accessory.start().expect("should start");

    accessory
        .wait_for_exit(Duration::from_secs(5))
        .expect("should exit on its own");
    assert!(!accessory.is_running());
}

#[test]
fn given_never_started_accessory_when_waited_then_returns_not_running() {
    let mut accessory = AccessoryProcess::shell("sensor", "exit 0").expect("accessory");

    let result = accessory.wait_for_exit(Duration::from_millis(100));

    assert!(matches!(result, Err(AccessoryError::NotRunning { .. })));
    assert!(accessory.stop(), "stopping an unstarted accessory is a no-op");
}

/// **VALUE**: Verifies the storage directory lives exactly as long as the accessory.
///
/// **BUG THIS CATCHES**: Would catch KVS files leaking between tests, which makes a fresh
/// accessory come up already commissioned.
#[test]
fn given_accessory_when_dropped_then_storage_is_removed() {
    // GIVEN: An accessory and its storage directory
    let accessory = AccessoryProcess::shell("light", "true").expect("accessory");
    let kvs = accessory.kvs_dir().to_path_buf();
    assert!(kvs.is_dir());

    // WHEN: Dropping
    drop(accessory);

    // THEN: Removed
    assert!(!kvs.exists());
}

#[test]
fn given_matter_app_when_prepared_then_command_line_points_kvs_into_storage() {
    let app = MatterApp::new("chip-lighting-app", "light").with_setup(20_202_021, 3840);

    let accessory = AccessoryProcess::matter_app(&app).expect("accessory");

    let command_line = accessory.command_line();
    assert!(command_line.starts_with("chip-lighting-app --passcode 20202021 --discriminator 3840"));
    assert!(command_line.ends_with(&format!("--KVS {}", accessory.kvs_file().display())));
    assert!(accessory.kvs_file().starts_with(accessory.kvs_dir()));
}

#[test]
fn given_invalid_app_when_prepared_then_returns_validation_error() {
    let app = MatterApp::new("chip-lighting-app", "light").with_setup(12_345_678, 3840);

    let result = AccessoryProcess::matter_app(&app);

    assert!(matches!(result, Err(AccessoryError::Validation { .. })));
}

#[test]
#[serial(process)]
fn given_missing_program_when_started_then_returns_spawn_error() {
    let mut accessory =
        AccessoryProcess::new("light", "/definitely/not/here/app", Vec::new()).expect("accessory");

    let result = accessory.start();

    assert!(matches!(result, Err(AccessoryError::Spawn { .. })));
}
