//! Error types for the stack IPC channel.
//!
//! Two families live here:
//! - startup failures (`Bind`, `Thread`) that abort `start()`
//! - per-datagram failures that the listener logs and drops

use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum IpcError {
    #[error("Bind Error: {message} {location}")]
    Bind {
        message: String,
        port: u16,
        location: ErrorLocation,
        #[source]
        source: IoError,
    },

    #[error("Thread Error: {message} {location}")]
    Thread {
        message: String,
        location: ErrorLocation,
    },

    #[error("IO Error: {message} {location}")]
    Io {
        message: String,
        location: ErrorLocation,
    },

    #[error("Malformed Payload Error: {message} {location}")]
    MalformedPayload {
        message: String,
        location: ErrorLocation,
    },

    #[error("Unknown Request Type Error: '{request_type}' {location}")]
    UnknownRequestType {
        request_type: String,
        location: ErrorLocation,
    },

    #[error("Invalid Handler Error: {message} {location}")]
    InvalidHandler {
        message: String,
        location: ErrorLocation,
    },

    #[error("Handler Returned No Data Error: {message} {location}")]
    HandlerReturnedNoData {
        message: String,
        location: ErrorLocation,
    },

    #[error("Send Error: {message} {location}")]
    Send {
        message: String,
        location: ErrorLocation,
    },
}

impl IpcError {
    #[track_caller]
    pub fn malformed(message: impl Into<String>) -> Self {
        IpcError::MalformedPayload {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn unknown_request_type(request_type: impl Into<String>) -> Self {
        IpcError::UnknownRequestType {
            request_type: request_type.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn invalid_handler(message: impl Into<String>) -> Self {
        IpcError::InvalidHandler {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn no_data(request_type: &str) -> Self {
        IpcError::HandlerReturnedNoData {
            message: format!("Handler returned no data for '{request_type}' request"),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn send(message: impl Into<String>) -> Self {
        IpcError::Send {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Whether this error is confined to one datagram (logged and dropped by the listener)
    /// rather than a failure of the channel itself.
    pub fn is_per_message(&self) -> bool {
        matches!(
            self,
            IpcError::MalformedPayload { .. }
                | IpcError::UnknownRequestType { .. }
                | IpcError::InvalidHandler { .. }
                | IpcError::HandlerReturnedNoData { .. }
        )
    }
}

impl From<IoError> for IpcError {
    #[track_caller]
    fn from(error: IoError) -> Self {
        IpcError::Io {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for IpcError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        IpcError::MalformedPayload {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
