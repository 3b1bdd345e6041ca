//! Interface to the device-management controller under test.
//!
//! The controller itself lives in the system under test; tests only need a
//! narrow view of it to commission accessories and observe resource changes.

use crate::error::controller::ControllerError;

use common::ErrorLocation;

use std::panic::Location;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use log::{debug, info};

/// A device as the controller reports it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceInfo {
    pub uuid: String,
    pub device_class: String,
    pub uri: String,
}

/// A single resource of a device, addressed by uri.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceInfo {
    pub uri: String,
    pub value: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceUpdatedEvent {
    pub resource: ResourceInfo,
}

pub trait DeviceController: Send + Sync {
    /// Commission a device using its setup payload (manual pairing code).
    fn commission_device(&self, setup_payload: &str, timeout: Duration) -> Result<bool, ControllerError>;

    fn devices_by_class(&self, device_class: &str) -> Vec<DeviceInfo>;

    fn resource_by_uri(&self, uri: &str) -> Option<ResourceInfo>;

    /// A fresh stream of resource-updated events from now on.
    fn subscribe_resource_updates(&self) -> Receiver<ResourceUpdatedEvent>;
}

/// Commission through `controller` and fail unless it reports success.
#[track_caller]
pub fn commission_accessory(
    controller: &dyn DeviceController,
    setup_payload: &str,
    timeout: Duration,
) -> Result<(), ControllerError> {
    let location = ErrorLocation::from(Location::caller());

    info!("Commissioning accessory through controller");
    if controller.commission_device(setup_payload, timeout)? {
        Ok(())
    } else {
        Err(ControllerError::Commission {
            message: String::from("Controller reported commissioning failure"),
            location,
        })
    }
}

/// Wait until an update for `uri` arrives on `events`, skipping updates for other
/// resources. Fails when `timeout` elapses or the controller drops the subscription.
#[track_caller]
pub fn wait_for_resource_update(
    events: &Receiver<ResourceUpdatedEvent>,
    uri: &str,
    timeout: Duration,
) -> Result<ResourceUpdatedEvent, ControllerError> {
    let location = ErrorLocation::from(Location::caller());
    let deadline = Instant::now() + timeout;

    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match events.recv_timeout(remaining) {
            Ok(event) if event.resource.uri == uri => return Ok(event),
            Ok(event) => debug!("Skipping update for {}", event.resource.uri),
            Err(RecvTimeoutError::Timeout) => {
                return Err(ControllerError::Timeout {
                    message: format!("No update for {uri} within {timeout:?}"),
                    location,
                });
            }
            Err(RecvTimeoutError::Disconnected) => {
                return Err(ControllerError::Timeout {
                    message: format!("Subscription closed while waiting for {uri}"),
                    location,
                });
            }
        }
    }
}
