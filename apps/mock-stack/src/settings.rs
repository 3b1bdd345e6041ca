//! Environment-driven settings for the standalone binary.
//!
//! `.env` is loaded first (see `main.rs`), then:
//! - `MOCK_STACK_CONFIG`: path to a TOML [`StackConfig`]; defaults apply when unset
//! - `MOCK_STACK_LOG_DIR`: directory for `mock-stack.log`

use crate::error::MockStackError;

use common::ErrorLocation;

use stack_core::config::StackConfig;

use std::ffi::OsString;
use std::fs::create_dir_all;
use std::panic::Location;
use std::path::{Path, PathBuf};

pub const CONFIG_PATH_ENV: &str = "MOCK_STACK_CONFIG";
pub const LOG_DIR_ENV: &str = "MOCK_STACK_LOG_DIR";

const DEFAULT_LOG_DIR_NAME: &str = "mock-stack";

/// Resolved startup settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub config: StackConfig,
    pub log_dir: PathBuf,
}

impl Settings {
    /// Read settings from the process environment.
    pub fn from_env() -> Result<Self, MockStackError> {
        Self::resolve(
            std::env::var_os(CONFIG_PATH_ENV),
            std::env::var_os(LOG_DIR_ENV),
        )
    }

    /// Build settings from raw variable values. Empty values count as unset.
    pub fn resolve(
        config_path: Option<OsString>,
        log_dir: Option<OsString>,
    ) -> Result<Self, MockStackError> {
        let config = match non_empty(config_path) {
            Some(path) => StackConfig::load(Path::new(&path))?,
            None => StackConfig::default(),
        };

        let log_dir = non_empty(log_dir)
            .map(PathBuf::from)
            .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_LOG_DIR_NAME));

        Ok(Self { config, log_dir })
    }

    /// Ensure the log directory exists.
    #[track_caller]
    pub fn prepare_log_dir(&self) -> Result<(), MockStackError> {
        create_dir_all(&self.log_dir).map_err(|e| MockStackError::MockStack {
            message: format!(
                "Failed to create log directory {}: {e}",
                self.log_dir.display()
            ),
            location: ErrorLocation::from(Location::caller()),
        })?;

        Ok(())
    }
}

fn non_empty(value: Option<OsString>) -> Option<OsString> {
    value.filter(|v| !v.is_empty())
}
