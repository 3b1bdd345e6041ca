mod chip_tool;
mod ipc;
