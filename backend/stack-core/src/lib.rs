pub mod accessory;
pub mod config;
pub mod error;
pub mod ipc;
pub mod stack;

#[cfg(test)]
mod tests;

pub const STACK_HOSTNAME: &str = "127.0.0.1";
pub const STACK_IPC_PORT: u16 = 18443;
pub const STACK_EVENT_PORT: u16 = 8711;
pub const STACK_IPC_ENDPOINT: &str = const_format::concatcp!(STACK_HOSTNAME, ":", STACK_IPC_PORT);
pub const STACK_EVENT_ENDPOINT: &str =
    const_format::concatcp!(STACK_HOSTNAME, ":", STACK_EVENT_PORT);
