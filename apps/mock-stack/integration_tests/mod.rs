// Integration tests for the standalone mock stack runner
// The test plays the runtime: it owns the event port and talks UDP to the IPC port

mod runner;
