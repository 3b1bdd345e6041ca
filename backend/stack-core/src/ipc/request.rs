//! Inbound requests, modeled as a closed sum over the request kinds the stack knows.

use crate::error::ipc::IpcError;
use crate::ipc::event::WireMap;
use crate::ipc::handler::RequestHandler;
use crate::ipc::response::{
    HeartbeatResponse, NetworkInitializeResponse, REQUEST_ID_KEY, Response,
};

use serde::Deserialize;
use serde_json::Value;

pub const REQUEST_KEY: &str = "request";
pub const HEARTBEAT_REQUEST_TYPE: &str = "heartbeat";
pub const NETWORK_INITIALIZE_REQUEST_TYPE: &str = "networkInit";

const ADDRESS_KEY: &str = "address";
const REGION_KEY: &str = "region";
const PROPERTIES_KEY: &str = "properties";

/// Turns a request into its response by consulting a handler.
pub trait ProcessRequest {
    /// Invoke `handler` and wrap what it returns into the matching response.
    ///
    /// # Errors
    ///
    /// - [`IpcError::InvalidHandler`] if there is no handler to consult
    /// - [`IpcError::HandlerReturnedNoData`] if the handler returned an empty map
    /// - whatever the handler itself fails with
    fn process(&self, handler: Option<&dyn RequestHandler>) -> Result<Response, IpcError>;
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HeartbeatRequest {
    #[serde(default)]
    pub request_id: i64,
}

impl HeartbeatRequest {
    pub fn new(request_id: i64) -> Self {
        Self { request_id }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInitializeRequest {
    #[serde(default)]
    pub request_id: i64,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub properties: WireMap,
}

impl NetworkInitializeRequest {
    pub fn new(request_id: i64, address: impl Into<String>, region: impl Into<String>) -> Self {
        Self {
            request_id,
            address: address.into(),
            region: region.into(),
            properties: WireMap::new(),
        }
    }

    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Heartbeat(HeartbeatRequest),
    NetworkInitialize(NetworkInitializeRequest),
}

impl Request {
    /// The discriminator this request travels under.
    pub fn request_type(&self) -> &'static str {
        match self {
            Request::Heartbeat(_) => HEARTBEAT_REQUEST_TYPE,
            Request::NetworkInitialize(_) => NETWORK_INITIALIZE_REQUEST_TYPE,
        }
    }

    pub fn request_id(&self) -> i64 {
        match self {
            Request::Heartbeat(request) => request.request_id,
            Request::NetworkInitialize(request) => request.request_id,
        }
    }

    /// Encode to the wire map a client would send.
    pub fn encode(&self) -> WireMap {
        let mut map = WireMap::new();
        map.insert(REQUEST_KEY.to_string(), Value::from(self.request_type()));
        map.insert(REQUEST_ID_KEY.to_string(), Value::from(self.request_id()));

        if let Request::NetworkInitialize(request) = self {
            map.insert(ADDRESS_KEY.to_string(), Value::from(request.address.as_str()));
            map.insert(REGION_KEY.to_string(), Value::from(request.region.as_str()));
            map.insert(
                PROPERTIES_KEY.to_string(),
                Value::Object(request.properties.clone()),
            );
        }

        map
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.encode()).to_string()
    }
}

impl ProcessRequest for Request {
    fn process(&self, handler: Option<&dyn RequestHandler>) -> Result<Response, IpcError> {
        let handler = handler.ok_or_else(|| {
            IpcError::invalid_handler(format!(
                "No handler available to process '{}' request {}",
                self.request_type(),
                self.request_id()
            ))
        })?;

        let result = handler.handle_request(self)?;
        if result.is_empty() {
            return Err(IpcError::no_data(self.request_type()));
        }

        let response = match self {
            Request::Heartbeat(request) => {
                HeartbeatResponse::from_result(request.request_id, &result)?.into()
            }
            Request::NetworkInitialize(request) => {
                NetworkInitializeResponse::from_result(request.request_id, &result)?.into()
            }
        };

        Ok(response)
    }
}

impl From<HeartbeatRequest> for Request {
    fn from(request: HeartbeatRequest) -> Self {
        Request::Heartbeat(request)
    }
}

impl From<NetworkInitializeRequest> for Request {
    fn from(request: NetworkInitializeRequest) -> Self {
        Request::NetworkInitialize(request)
    }
}
