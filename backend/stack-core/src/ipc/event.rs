//! Base envelope for everything the stack sends back over the channel.

use crate::error::ipc::IpcError;
use crate::{STACK_EVENT_PORT, STACK_HOSTNAME};

use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, ToSocketAddrs, UdpSocket};
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, error};
use serde_json::Value;

/// Flat key-value form every event serializes to.
pub type WireMap = serde_json::Map<String, Value>;

pub const EVENT_TYPE_KEY: &str = "eventType";
pub const TIMESTAMP_KEY: &str = "timestamp";
pub const DEFAULT_EVENT_TYPE: &str = "event";
pub const STARTUP_EVENT_TYPE: &str = "startup";

/// An event addressed to the event endpoint of the runtime under test.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    event_type: String,
    destination_address: String,
    destination_port: u16,
    timestamp: i64,
}

impl Event {
    /// Create an event stamped with the current time and addressed to the fixed event endpoint.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            destination_address: STACK_HOSTNAME.to_string(),
            destination_port: STACK_EVENT_PORT,
            timestamp: now_millis(),
        }
    }

    /// The out-of-band notification that the stack (re)initialized.
    pub fn startup() -> Self {
        Self::new(STARTUP_EVENT_TYPE)
    }

    pub fn addressed_to(mut self, address: impl Into<String>, port: u16) -> Self {
        self.destination_address = address.into();
        self.destination_port = port;
        self
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn event_type(&self) -> &str {
        &self.event_type
    }

    pub fn destination_address(&self) -> &str {
        &self.destination_address
    }

    pub fn destination_port(&self) -> u16 {
        self.destination_port
    }

    pub fn timestamp(&self) -> i64 {
        self.timestamp
    }

    /// Fields every event carries. Subtypes extend this map, never shrink it.
    pub fn base_fields(&self) -> WireMap {
        let mut map = WireMap::new();
        map.insert(EVENT_TYPE_KEY.to_string(), Value::from(self.event_type.as_str()));
        map.insert(TIMESTAMP_KEY.to_string(), Value::from(self.timestamp));
        map
    }

    /// Rebuild an event from a decoded payload.
    ///
    /// Missing keys keep their defaults and unknown keys are ignored. An empty map is
    /// rejected since there is nothing to decode.
    #[track_caller]
    pub fn from_map(map: &WireMap) -> Result<Self, IpcError> {
        if map.is_empty() {
            return Err(IpcError::malformed("Cannot decode an event from an empty map"));
        }

        let mut event = Self::new(DEFAULT_EVENT_TYPE);
        if let Some(event_type) = optional_str(map, EVENT_TYPE_KEY)? {
            event.event_type = event_type.to_string();
        }
        if let Some(timestamp) = optional_i64(map, TIMESTAMP_KEY)? {
            event.timestamp = timestamp;
        }
        Ok(event)
    }
}

/// Anything that can be encoded to a wire map and transmitted to its destination.
pub trait WireEvent {
    /// The envelope carrying type, destination and timestamp.
    fn event(&self) -> &Event;

    /// Encode to the flat wire map.
    fn encode(&self) -> WireMap;

    fn to_json(&self) -> String {
        Value::Object(self.encode()).to_string()
    }

    /// Transmit once over a fresh datagram socket, reporting failure to the caller.
    fn try_send(&self) -> Result<(), IpcError> {
        let event = self.event();
        let payload = self.to_json();
        transmit(
            payload.as_bytes(),
            event.destination_address(),
            event.destination_port(),
        )?;
        debug!("Sent event: {payload}");
        Ok(())
    }

    /// Best-effort transmit. Failures are logged and swallowed so a lost reply never takes
    /// the simulated stack down with it.
    fn send(&self) {
        if let Err(e) = self.try_send() {
            let event = self.event();
            error!(
                "Failed to send '{}' event to {}:{}: {e}",
                event.event_type(),
                event.destination_address(),
                event.destination_port()
            );
        }
    }
}

impl WireEvent for Event {
    fn event(&self) -> &Event {
        self
    }

    fn encode(&self) -> WireMap {
        self.base_fields()
    }
}

#[track_caller]
fn transmit(payload: &[u8], address: &str, port: u16) -> Result<(), IpcError> {
    let destination = resolve(address, port)?;
    let local: SocketAddr = if destination.is_ipv4() {
        (Ipv4Addr::UNSPECIFIED, 0).into()
    } else {
        (Ipv6Addr::UNSPECIFIED, 0).into()
    };

    let socket = UdpSocket::bind(local)?;
    let sent = socket.send_to(payload, destination)?;
    if sent != payload.len() {
        return Err(IpcError::send(format!(
            "Short send to {destination}: {sent} of {} bytes",
            payload.len()
        )));
    }
    Ok(())
}

#[track_caller]
fn resolve(address: &str, port: u16) -> Result<SocketAddr, IpcError> {
    (address, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| IpcError::send(format!("No address resolved for {address}:{port}")))
}

pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_millis()).unwrap_or(i64::MAX))
        .unwrap_or_default()
}

// ============================================
// DECODE HELPERS
// ============================================

#[track_caller]
pub(crate) fn optional_str<'a>(map: &'a WireMap, key: &str) -> Result<Option<&'a str>, IpcError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(IpcError::malformed(format!(
            "Field '{key}' must be a string, got {other}"
        ))),
    }
}

#[track_caller]
pub(crate) fn optional_i64(map: &WireMap, key: &str) -> Result<Option<i64>, IpcError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value.as_i64().map(Some).ok_or_else(|| {
            IpcError::malformed(format!("Field '{key}' must be an integer, got {value}"))
        }),
    }
}

#[track_caller]
pub(crate) fn optional_bool(map: &WireMap, key: &str) -> Result<Option<bool>, IpcError> {
    match map.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Bool(b)) => Ok(Some(*b)),
        Some(other) => Err(IpcError::malformed(format!(
            "Field '{key}' must be a boolean, got {other}"
        ))),
    }
}
