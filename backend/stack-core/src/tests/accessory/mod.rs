mod chip_tool;
mod process;
