use common::ErrorLocation;

use stack_core::error::CoreError;
use stack_core::error::config::ConfigError;
use stack_core::error::ipc::IpcError;

use std::panic::Location;

use thiserror::Error;

/// Errors surfaced by the standalone mock stack binary.
#[derive(Debug, Error)]
pub enum MockStackError {
    /// Error from this app (logger, directories, signals)
    #[error("Mock Stack Error: {message} {location}")]
    MockStack {
        message: String,
        location: ErrorLocation,
    },

    /// Error from stack-core (config, receiver bind, etc.)
    #[error("Core Error: {source} {location}")]
    Core {
        location: ErrorLocation,
        #[source]
        source: CoreError,
    },
}

impl From<CoreError> for MockStackError {
    #[track_caller]
    fn from(source: CoreError) -> Self {
        MockStackError::Core {
            location: ErrorLocation::from(Location::caller()),
            source,
        }
    }
}

impl From<IpcError> for MockStackError {
    #[track_caller]
    fn from(source: IpcError) -> Self {
        MockStackError::Core {
            location: ErrorLocation::from(Location::caller()),
            source: CoreError::from(source),
        }
    }
}

impl From<ConfigError> for MockStackError {
    #[track_caller]
    fn from(source: ConfigError) -> Self {
        MockStackError::Core {
            location: ErrorLocation::from(Location::caller()),
            source: CoreError::from(source),
        }
    }
}
