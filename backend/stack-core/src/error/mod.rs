pub mod accessory;
pub mod chip_tool;
pub mod config;
pub mod controller;
pub mod ipc;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Ipc(#[from] ipc::IpcError),

    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Accessory(#[from] accessory::AccessoryError),

    #[error(transparent)]
    ChipTool(#[from] chip_tool::ChipToolError),

    #[error(transparent)]
    Controller(#[from] controller::ControllerError),
}
