mod accessory;
mod ipc;
mod stack;
