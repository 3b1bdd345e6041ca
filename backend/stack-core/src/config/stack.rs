use crate::error::config::ConfigError;
use crate::{STACK_EVENT_PORT, STACK_HOSTNAME, STACK_IPC_PORT};

use common::ErrorLocation;

use std::panic::Location;
use std::path::Path;
use std::time::Duration;

use log::info;
use serde::{Deserialize, Serialize};

const DEFAULT_READ_TIMEOUT_SECS: u64 = 5;
const DEFAULT_TEST_CHANNEL: u8 = 25;

// ============================================
// STACK CONFIG
// ============================================

/// Endpoints and tunables for a simulated stack.
///
/// The defaults are the fixed constants the runtime under test is compiled with,
/// so `StackConfig::default()` is what almost every test wants. Overrides exist so
/// several simulated stacks can run side by side on distinct ports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StackConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_ipc_port")]
    pub ipc_port: u16,
    #[serde(default = "default_event_port")]
    pub event_port: u16,
    #[serde(default = "default_read_timeout_secs")]
    pub read_timeout_secs: u64,
    #[serde(default = "default_test_channel")]
    pub test_channel: u8,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            ipc_port: default_ipc_port(),
            event_port: default_event_port(),
            read_timeout_secs: default_read_timeout_secs(),
            test_channel: default_test_channel(),
        }
    }
}

fn default_host() -> String {
    STACK_HOSTNAME.to_string()
}

fn default_ipc_port() -> u16 {
    STACK_IPC_PORT
}

fn default_event_port() -> u16 {
    STACK_EVENT_PORT
}

fn default_read_timeout_secs() -> u64 {
    DEFAULT_READ_TIMEOUT_SECS
}

fn default_test_channel() -> u8 {
    DEFAULT_TEST_CHANNEL
}

// ============================================
// IMPLEMENTATION
// ============================================

impl StackConfig {
    /// Config with the default host and timeouts but custom ports.
    pub fn with_ports(ipc_port: u16, event_port: u16) -> Self {
        Self {
            ipc_port,
            event_port,
            ..Self::default()
        }
    }

    /// Load and validate a stack config from a TOML file.
    ///
    /// Missing keys take their defaults, so an empty file is a valid config.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Self = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            location: ErrorLocation::from(Location::caller()),
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;

        info!("Stack config loaded from {}", path.display());
        Ok(config)
    }

    /// Check the invariants the receiver and stack rely on.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.host.is_empty() {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: String::from("host cannot be empty"),
            });
        }

        if self.ipc_port == 0 || self.event_port == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!(
                    "ports must be non-zero (ipc_port={}, event_port={})",
                    self.ipc_port, self.event_port
                ),
            });
        }

        if self.ipc_port == self.event_port {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("ipc_port and event_port must differ (both {})", self.ipc_port),
            });
        }

        if self.read_timeout_secs == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: String::from("read_timeout_secs must be non-zero"),
            });
        }

        Ok(())
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_secs(self.read_timeout_secs)
    }

    pub fn ipc_endpoint(&self) -> String {
        format!("{}:{}", self.host, self.ipc_port)
    }

    pub fn event_endpoint(&self) -> String {
        format!("{}:{}", self.host, self.event_port)
    }
}
