//! Network key handling with redacted Debug output.

use crate::{ErrorLocation, RedactError};

use std::fmt;
use std::panic::Location;

use serde::ser::Error;
use zeroize::Zeroize;

/// Placeholder key the stack reports before a network has been formed.
pub const INVALID_NETWORK_KEY: &str = "00000000000000000000000000000000";

/// A radio network key that never exposes its value in logs or debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct RedactedNetworkKey {
    inner: String,
}

impl RedactedNetworkKey {
    /// Create a new redacted network key from its hex form.
    pub fn new(key: String) -> Self {
        Self { inner: key }
    }

    /// The all-zero placeholder meaning "no network formed yet".
    pub fn invalid() -> Self {
        Self::new(String::from(INVALID_NETWORK_KEY))
    }

    /// Get the actual key value.
    ///
    /// # Security Note
    /// Only call this when the raw value is genuinely needed (assertions, hand-off to a
    /// controller). Never log the result.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.inner
    }

    /// Get the key length (safe to log).
    #[inline]
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Check if the key is empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Check if this is the placeholder key.
    #[inline]
    pub fn is_invalid(&self) -> bool {
        self.inner == INVALID_NETWORK_KEY
    }
}

impl Default for RedactedNetworkKey {
    fn default() -> Self {
        Self::invalid()
    }
}

impl fmt::Debug for RedactedNetworkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RedactedNetworkKey([REDACTED])")
    }
}

impl fmt::Display for RedactedNetworkKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[REDACTED NETWORK KEY]")
    }
}

impl Drop for RedactedNetworkKey {
    fn drop(&mut self) {
        self.inner.zeroize();
    }
}

// Prevent accidental serialization
impl serde::Serialize for RedactedNetworkKey {
    fn serialize<S>(&self, _serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        Err(S::Error::custom(RedactError::Serialization {
            message: String::from(
                "RedactedNetworkKey cannot be serialized - use as_str() explicitly",
            ),
            location: ErrorLocation::from(Location::caller()),
        }))
    }
}
