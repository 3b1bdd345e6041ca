//! Shared primitives for the mock radio stack.
//!
//! This crate holds the small pieces every other crate in
//! the workspace agrees on:
//!
//! - **ErrorLocation**: call-site capture used by every error enum
//! - **StatusCode**: the closed set of result codes carried on the wire
//! - **RedactedNetworkKey**: a network key that never leaks into logs
//!
//! ## Architecture
//!
//! - **common** (this crate): Shared primitives
//! - **stack-core**: IPC mock, simulated stack and test collaborators
//! - **mock-stack**: Standalone binary wiring everything together

pub mod error;
pub mod redacted_key;
pub mod status;

#[cfg(test)]
mod tests;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use redacted_key::RedactedNetworkKey;
pub use status::StatusCode;
