mod chip_tool;
mod controller;
mod helpers;
mod process;
