//! Collaborators that live next to the simulated stack in a test: device
//! applications, the commissioning CLI, and the controller under test.

pub mod chip_tool;
pub mod controller;
pub mod process;

pub use chip_tool::{ChipTool, ChipToolOptions, CommissionOptions, InteractionResult, RegisteredDevice};
pub use controller::{DeviceController, DeviceInfo, ResourceInfo, ResourceUpdatedEvent};
pub use process::{AccessoryProcess, MatterApp};
