use stack_core::accessory::controller::{
    DeviceController, DeviceInfo, ResourceInfo, ResourceUpdatedEvent, commission_accessory,
    wait_for_resource_update,
};
use stack_core::error::controller::ControllerError;

use std::sync::Mutex;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread;
use std::time::Duration;

/// In-memory controller that accepts one pairing code.
struct FakeController {
    accepted_code: String,
    devices: Vec<DeviceInfo>,
    subscribers: Mutex<Vec<Sender<ResourceUpdatedEvent>>>,
}

impl FakeController {
    fn new(accepted_code: &str) -> Self {
        Self {
            accepted_code: accepted_code.to_string(),
            devices: vec![DeviceInfo {
                uuid: String::from("0011223344556677"),
                device_class: String::from("light"),
                uri: String::from("/0011223344556677"),
            }],
            subscribers: Mutex::new(Vec::new()),
        }
    }

    fn publish(&self, uri: &str, value: &str) {
        let event = ResourceUpdatedEvent {
            resource: ResourceInfo {
                uri: uri.to_string(),
                value: Some(value.to_string()),
            },
        };
        for subscriber in self.subscribers.lock().expect("lock").iter() {
            let _ = subscriber.send(event.clone());
        }
    }
}

impl DeviceController for FakeController {
    fn commission_device(&self, setup_payload: &str, _timeout: Duration) -> Result<bool, ControllerError> {
        Ok(setup_payload == self.accepted_code)
    }

    fn devices_by_class(&self, device_class: &str) -> Vec<DeviceInfo> {
        self.devices
            .iter()
            .filter(|d| d.device_class == device_class)
            .cloned()
            .collect()
    }

    fn resource_by_uri(&self, uri: &str) -> Option<ResourceInfo> {
        self.devices.iter().find(|d| d.uri == uri).map(|d| ResourceInfo {
            uri: d.uri.clone(),
            value: None,
        })
    }

    fn subscribe_resource_updates(&self) -> Receiver<ResourceUpdatedEvent> {
        let (tx, rx) = channel();
        self.subscribers.lock().expect("lock").push(tx);
        rx
    }
}

#[test]
fn given_accepted_code_when_commissioned_then_succeeds() {
    let controller = FakeController::new("34970112332");

    assert!(commission_accessory(&controller, "34970112332", Duration::from_secs(1)).is_ok());
    assert_eq!(controller.devices_by_class("light").len(), 1);
    assert!(controller.devices_by_class("lock").is_empty());
    assert!(controller.resource_by_uri("/0011223344556677").is_some());
}

#[test]
fn given_rejected_code_when_commissioned_then_returns_commission_error() {
    let controller = FakeController::new("34970112332");

    let result = commission_accessory(&controller, "00000000000", Duration::from_secs(1));

    assert!(matches!(result, Err(ControllerError::Commission { .. })));
}

/// **VALUE**: Verifies waiting skips unrelated updates and returns the one asked for.
///
/// **WHY THIS MATTERS**: Controllers publish updates for every resource. Tests wait for one
/// specific resource and must not be fooled by others.
///
/// **BUG THIS CATCHES**: Would catch returning the first update regardless of uri.
#[test]
fn given_unrelated_then_matching_update_when_waited_then_returns_matching() {
    // GIVEN: A subscription and a publisher thread
    let controller = std::sync::Arc::new(FakeController::new("code"));
    let events = controller.subscribe_resource_updates();
    let publisher = std::sync::Arc::clone(&controller);
    let handle = thread::spawn(move || {
        publisher.publish("/other/ep/1/r/label", "x");
        publisher.publish("/0011223344556677/ep/1/r/isOn", "true");
    });

    // WHEN: Waiting for the isOn resource
    let event = wait_for_resource_update(
        &events,
        "/0011223344556677/ep/1/r/isOn",
        Duration::from_secs(2),
    )
    .expect("update should arrive");

    // THEN: The matching update
    assert_eq!(event.resource.value.as_deref(), Some("true"));
    handle.join().expect("publisher");
}

#[test]
fn given_no_update_when_waited_then_returns_timeout() {
    let controller = FakeController::new("code");
    let events = controller.subscribe_resource_updates();

    let result = wait_for_resource_update(&events, "/nothing", Duration::from_millis(100));

    assert!(matches!(result, Err(ControllerError::Timeout { .. })));
}
