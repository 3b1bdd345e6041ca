//! Responses produced by processing a request.
//!
//! Each response composes a [`ResponseHeader`] (which in turn composes the base
//! [`Event`]) and appends its own fields on top of the header's wire map.

use crate::error::ipc::IpcError;
use crate::ipc::event::{Event, WireEvent, WireMap, optional_bool, optional_i64, optional_str};

use common::StatusCode;

use serde_json::Value;

pub const IPC_RESPONSE_EVENT_TYPE: &str = "ipcResponse";
pub const RESPONSE_TYPE_KEY: &str = "responseType";
pub const REQUEST_ID_KEY: &str = "requestId";
pub const RESULT_CODE_KEY: &str = "resultCode";
pub const PID_KEY: &str = "pid";
pub const INITIALIZED_KEY: &str = "initialized";

pub const DEFAULT_RESPONSE_TYPE: &str = "response";
pub const HEARTBEAT_RESPONSE_TYPE: &str = "heartbeatResponse";
pub const NETWORK_INITIALIZE_RESPONSE_TYPE: &str = "networkInitResponse";

// ============================================
// HEADER
// ============================================

/// Fields shared by every IPC response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHeader {
    event: Event,
    response_type: String,
    request_id: i64,
    result_code: StatusCode,
}

impl ResponseHeader {
    pub fn new(response_type: impl Into<String>, request_id: i64, result_code: StatusCode) -> Self {
        Self {
            event: Event::new(IPC_RESPONSE_EVENT_TYPE),
            response_type: response_type.into(),
            request_id,
            result_code,
        }
    }

    pub fn event(&self) -> &Event {
        &self.event
    }

    pub fn response_type(&self) -> &str {
        &self.response_type
    }

    pub fn request_id(&self) -> i64 {
        self.request_id
    }

    pub fn result_code(&self) -> StatusCode {
        self.result_code
    }

    fn addressed_to(mut self, address: impl Into<String>, port: u16) -> Self {
        self.event = self.event.addressed_to(address, port);
        self
    }

    pub fn base_fields(&self) -> WireMap {
        let mut map = self.event.base_fields();
        map.insert(
            RESPONSE_TYPE_KEY.to_string(),
            Value::from(self.response_type.as_str()),
        );
        map.insert(REQUEST_ID_KEY.to_string(), Value::from(self.request_id));
        map.insert(
            RESULT_CODE_KEY.to_string(),
            Value::from(self.result_code.code()),
        );
        map
    }

    /// Decode a header. Missing keys keep defaults, unknown keys are ignored.
    #[track_caller]
    pub fn from_map(map: &WireMap) -> Result<Self, IpcError> {
        let event = Event::from_map(map)?;

        let response_type = optional_str(map, RESPONSE_TYPE_KEY)?
            .unwrap_or(DEFAULT_RESPONSE_TYPE)
            .to_string();
        let request_id = optional_i64(map, REQUEST_ID_KEY)?.unwrap_or_default();
        let result_code = match optional_i64(map, RESULT_CODE_KEY)? {
            Some(code) => StatusCode::from_code(code)
                .ok_or_else(|| IpcError::malformed(format!("Unknown result code {code}")))?,
            None => StatusCode::Ok,
        };

        Ok(Self {
            event,
            response_type,
            request_id,
            result_code,
        })
    }
}

/// Pull the result code a handler reported. A handler that omits it is treated as failed.
#[track_caller]
fn result_code_from(result: &WireMap) -> Result<StatusCode, IpcError> {
    match optional_i64(result, RESULT_CODE_KEY)? {
        Some(code) => StatusCode::from_code(code)
            .ok_or_else(|| IpcError::malformed(format!("Handler reported unknown result code {code}"))),
        None => Ok(StatusCode::Fail),
    }
}

// ============================================
// HEARTBEAT
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatResponse {
    header: ResponseHeader,
    pid: u32,
    initialized: bool,
}

impl HeartbeatResponse {
    pub fn new(request_id: i64, result_code: StatusCode, pid: u32, initialized: bool) -> Self {
        Self {
            header: ResponseHeader::new(HEARTBEAT_RESPONSE_TYPE, request_id, result_code),
            pid,
            initialized,
        }
    }

    /// Build from the map a handler returned for a heartbeat request.
    #[track_caller]
    pub fn from_result(request_id: i64, result: &WireMap) -> Result<Self, IpcError> {
        let pid = optional_i64(result, PID_KEY)?.unwrap_or_default();
        let pid = u32::try_from(pid)
            .map_err(|_| IpcError::malformed(format!("Handler reported invalid pid {pid}")))?;
        let initialized = optional_bool(result, INITIALIZED_KEY)?.unwrap_or_default();

        Ok(Self::new(
            request_id,
            result_code_from(result)?,
            pid,
            initialized,
        ))
    }

    #[track_caller]
    pub fn from_map(map: &WireMap) -> Result<Self, IpcError> {
        let header = ResponseHeader::from_map(map)?;
        let pid = optional_i64(map, PID_KEY)?.unwrap_or_default();
        let pid = u32::try_from(pid)
            .map_err(|_| IpcError::malformed(format!("Invalid pid {pid}")))?;
        let initialized = optional_bool(map, INITIALIZED_KEY)?.unwrap_or_default();

        Ok(Self {
            header,
            pid,
            initialized,
        })
    }

    pub fn header(&self) -> &ResponseHeader {
        &self.header
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn initialized(&self) -> bool {
        self.initialized
    }
}

impl WireEvent for HeartbeatResponse {
    fn event(&self) -> &Event {
        self.header.event()
    }

    fn encode(&self) -> WireMap {
        let mut map = self.header.base_fields();
        map.insert(PID_KEY.to_string(), Value::from(self.pid));
        map.insert(INITIALIZED_KEY.to_string(), Value::from(self.initialized));
        map
    }
}

// ============================================
// NETWORK INITIALIZE
// ============================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInitializeResponse {
    header: ResponseHeader,
}

impl NetworkInitializeResponse {
    pub fn new(request_id: i64, result_code: StatusCode) -> Self {
        Self {
            header: ResponseHeader::new(NETWORK_INITIALIZE_RESPONSE_TYPE, request_id, result_code),
        }
    }

    #[track_caller]
    pub fn from_result(request_id: i64, result: &WireMap) -> Result<Self, IpcError> {
        Ok(Self::new(request_id, result_code_from(result)?))
    }

    #[track_caller]
    pub fn from_map(map: &WireMap) -> Result<Self, IpcError> {
        Ok(Self {
            header: ResponseHeader::from_map(map)?,
        })
    }

    pub fn header(&self) -> &ResponseHeader {
        &self.header
    }
}

impl WireEvent for NetworkInitializeResponse {
    fn event(&self) -> &Event {
        self.header.event()
    }

    fn encode(&self) -> WireMap {
        self.header.base_fields()
    }
}

// ============================================
// RESPONSE
// ============================================

/// A response to one of the known request kinds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    Heartbeat(HeartbeatResponse),
    NetworkInitialize(NetworkInitializeResponse),
}

impl Response {
    pub fn header(&self) -> &ResponseHeader {
        match self {
            Response::Heartbeat(response) => response.header(),
            Response::NetworkInitialize(response) => response.header(),
        }
    }

    pub fn request_id(&self) -> i64 {
        self.header().request_id()
    }

    pub fn result_code(&self) -> StatusCode {
        self.header().result_code()
    }

    /// Retarget the response before it is sent. Consumes the response so a sent response
    /// can never be altered.
    pub fn addressed_to(self, address: impl Into<String>, port: u16) -> Self {
        match self {
            Response::Heartbeat(mut response) => {
                response.header = response.header.addressed_to(address, port);
                Response::Heartbeat(response)
            }
            Response::NetworkInitialize(mut response) => {
                response.header = response.header.addressed_to(address, port);
                Response::NetworkInitialize(response)
            }
        }
    }

    /// Decode any known response, dispatching on `responseType`.
    #[track_caller]
    pub fn from_map(map: &WireMap) -> Result<Self, IpcError> {
        match optional_str(map, RESPONSE_TYPE_KEY)? {
            Some(HEARTBEAT_RESPONSE_TYPE) => Ok(Response::Heartbeat(HeartbeatResponse::from_map(map)?)),
            Some(NETWORK_INITIALIZE_RESPONSE_TYPE) => Ok(Response::NetworkInitialize(
                NetworkInitializeResponse::from_map(map)?,
            )),
            Some(other) => Err(IpcError::malformed(format!("Unknown response type '{other}'"))),
            None => Err(IpcError::malformed(format!(
                "Response is missing '{RESPONSE_TYPE_KEY}'"
            ))),
        }
    }
}

impl WireEvent for Response {
    fn event(&self) -> &Event {
        self.header().event()
    }

    fn encode(&self) -> WireMap {
        match self {
            Response::Heartbeat(response) => response.encode(),
            Response::NetworkInitialize(response) => response.encode(),
        }
    }
}

impl From<HeartbeatResponse> for Response {
    fn from(response: HeartbeatResponse) -> Self {
        Response::Heartbeat(response)
    }
}

impl From<NetworkInitializeResponse> for Response {
    fn from(response: NetworkInitializeResponse) -> Self {
        Response::NetworkInitialize(response)
    }
}
