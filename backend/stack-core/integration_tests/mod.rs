mod accessory;
mod error;
mod ipc_tests;
