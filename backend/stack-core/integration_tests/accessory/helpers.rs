//! Test helpers for accessory integration tests.
//!
//! Real `chip-tool` and Matter sample apps are not available in CI, so these
//! tests drive the runners with small shell scripts that behave like them.

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

/// Canned `chip-tool`: records its arguments and answers like the real tool.
const FAKE_CHIP_TOOL: &str = r#"#!/bin/sh
echo "$@" > "$(dirname "$0")/last_args"
case "$1 $2" in
  "pairing code") echo "[CTL] Commissioning complete"; exit 0 ;;
  "pairing open-commissioning-window") echo "[SVR] Manual pairing code: [34970112332]"; exit 0 ;;
  "pairing unpair") exit 0 ;;
  "onoff read") echo '{"onOff": true}'; exit 0 ;;
  "onoff toggle") exit 0 ;;
  "slow command") sleep 10 ;;
  *) echo "Unknown command: $1 $2" >&2; exit 3 ;;
esac
"#;

/// Canned `chip-tool` whose commissioning always fails.
const FAILING_CHIP_TOOL: &str = r#"#!/bin/sh
echo "[CTL] Timeout waiting for device" >&2
exit 1
"#;

pub struct FakeTool {
    dir: TempDir,
    path: PathBuf,
}

impl FakeTool {
    pub fn working() -> Self {
        Self::with_script(FAKE_CHIP_TOOL)
    }

    pub fn failing() -> Self {
        Self::with_script(FAILING_CHIP_TOOL)
    }

    fn with_script(script: &str) -> Self {
        let dir = tempfile::tempdir().expect("Failed to create script dir");
        let path = dir.path().join("chip-tool");
        fs::write(&path, script).expect("Failed to write script");
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
            .expect("Failed to make script executable");
        Self { dir, path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Arguments of the most recent invocation, space separated.
    pub fn last_args(&self) -> String {
        fs::read_to_string(self.dir.path().join("last_args"))
            .expect("Script was never invoked")
            .trim()
            .to_string()
    }
}
