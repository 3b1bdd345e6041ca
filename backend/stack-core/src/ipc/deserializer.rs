//! Maps raw datagram bytes to a typed [`Request`].

use crate::error::ipc::IpcError;
use crate::ipc::request::{
    HEARTBEAT_REQUEST_TYPE, HeartbeatRequest, NETWORK_INITIALIZE_REQUEST_TYPE,
    NetworkInitializeRequest, REQUEST_KEY, Request,
};

use serde::Deserialize;
use serde_json::Value;

/// Decode one inbound datagram.
///
/// The payload must be a UTF-8 JSON object with a string `request` discriminator.
/// Unknown discriminators are reported with the offending value so the log says
/// exactly what the runtime sent.
///
/// # Errors
///
/// - [`IpcError::MalformedPayload`] for invalid UTF-8, invalid JSON, a non-object, or a
///   missing/non-string `request` field
/// - [`IpcError::UnknownRequestType`] for any discriminator other than `heartbeat` and
///   `networkInit`
#[track_caller]
pub fn deserialize_request(raw: &[u8]) -> Result<Request, IpcError> {
    let text = std::str::from_utf8(raw)
        .map_err(|e| IpcError::malformed(format!("Payload is not valid UTF-8: {e}")))?;

    let value: Value = serde_json::from_str(text)?;

    let Value::Object(map) = value else {
        return Err(IpcError::malformed(format!(
            "Payload must be a JSON object, got: {text}"
        )));
    };

    let request_type = match map.get(REQUEST_KEY) {
        Some(Value::String(request_type)) => request_type.clone(),
        Some(other) => {
            return Err(IpcError::malformed(format!(
                "Field '{REQUEST_KEY}' must be a string, got {other}"
            )));
        }
        None => {
            return Err(IpcError::malformed(format!(
                "Payload is missing the '{REQUEST_KEY}' field"
            )));
        }
    };

    let value = Value::Object(map);
    match request_type.as_str() {
        HEARTBEAT_REQUEST_TYPE => Ok(Request::Heartbeat(HeartbeatRequest::deserialize(value)?)),
        NETWORK_INITIALIZE_REQUEST_TYPE => Ok(Request::NetworkInitialize(
            NetworkInitializeRequest::deserialize(value)?,
        )),
        _ => Err(IpcError::unknown_request_type(request_type)),
    }
}
