//! Capability interface a simulated stack exposes to the receiver.

use crate::error::ipc::IpcError;
use crate::ipc::event::WireMap;
use crate::ipc::request::Request;

/// Handles decoded requests and reports their result fields.
///
/// The returned map carries `resultCode` plus any request-specific fields
/// (`pid`, `initialized` for heartbeats). Implementations must be callable from the
/// listener thread while test code touches the same state from other threads.
pub trait RequestHandler: Send + Sync {
    fn handle_request(&self, request: &Request) -> Result<WireMap, IpcError>;
}
