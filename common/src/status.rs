//! Result codes shared by stack requests and responses.

use std::fmt;

/// Closed set of result codes the radio stack reports on the wire.
///
/// Stored as the signed integer the stack protocol uses rather than parsed
/// from any textual form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StatusCode {
    #[default]
    Ok,
    Fail,
    InvalidArg,
    NotImplemented,
    Timeout,
    OutOfMemory,
    MessageDeliveryFailed,
    NetworkBusy,
    NotReady,
    LowPowerMode,
}

impl StatusCode {
    pub const ALL: [StatusCode; 10] = [
        StatusCode::Ok,
        StatusCode::Fail,
        StatusCode::InvalidArg,
        StatusCode::NotImplemented,
        StatusCode::Timeout,
        StatusCode::OutOfMemory,
        StatusCode::MessageDeliveryFailed,
        StatusCode::NetworkBusy,
        StatusCode::NotReady,
        StatusCode::LowPowerMode,
    ];

    /// Wire value of this code.
    pub const fn code(self) -> i32 {
        match self {
            StatusCode::Ok => 0,
            StatusCode::Fail => -1,
            StatusCode::InvalidArg => -2,
            StatusCode::NotImplemented => -3,
            StatusCode::Timeout => -4,
            StatusCode::OutOfMemory => -5,
            StatusCode::MessageDeliveryFailed => -6,
            StatusCode::NetworkBusy => -7,
            StatusCode::NotReady => -8,
            StatusCode::LowPowerMode => -9,
        }
    }

    /// Map a wire value back to a code. Returns `None` for values outside the set.
    pub fn from_code(code: i64) -> Option<Self> {
        Self::ALL.into_iter().find(|status| i64::from(status.code()) == code)
    }

    pub fn is_ok(self) -> bool {
        self == StatusCode::Ok
    }

    pub fn name(self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::Fail => "FAIL",
            StatusCode::InvalidArg => "INVALID_ARG",
            StatusCode::NotImplemented => "NOT_IMPLEMENTED",
            StatusCode::Timeout => "TIMEOUT",
            StatusCode::OutOfMemory => "OUT_OF_MEMORY",
            StatusCode::MessageDeliveryFailed => "MESSAGE_DELIVERY_FAILED",
            StatusCode::NetworkBusy => "NETWORK_BUSY",
            StatusCode::NotReady => "NOT_READY",
            StatusCode::LowPowerMode => "LOW_POWER_MODE",
        }
    }
}

impl From<StatusCode> for i32 {
    fn from(status: StatusCode) -> Self {
        status.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name(), self.code())
    }
}
