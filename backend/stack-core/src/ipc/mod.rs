//! Datagram IPC layer that stands in for the radio stack process.
//!
//! The runtime under test talks to "the stack" over two fixed UDP ports using a
//! small JSON protocol. This module provides:
//!
//! - Wire events and responses (outbound, fire-and-forget)
//! - Requests and their deserializer (inbound, discriminated on `request`)
//! - The [`RequestHandler`] capability a simulated stack implements
//! - [`RequestReceiver`], the listener thread that ties them together
//!
//! # Protocol
//!
//! - Inbound: `{"request": <type>, "requestId": <int>, ...}` on the IPC port
//! - Immediate acknowledgement to the sender: `{"resultCode": 0}`
//! - Response: `{"eventType": "ipcResponse", "responseType": ..., "requestId": ..., "resultCode": ...}`
//!   to the event port
//! - Out-of-band: `{"eventType": "startup", "timestamp": ...}` to the event port

pub mod deserializer;
pub mod event;
mod handler;
mod receiver;
pub mod request;
pub mod response;

pub use deserializer::deserialize_request;
pub use event::{Event, WireEvent, WireMap};
pub use handler::RequestHandler;
pub use receiver::{REQUEST_RECEIVED_RESULT, RequestReceiver};
pub use request::{HeartbeatRequest, NetworkInitializeRequest, ProcessRequest, Request};
pub use response::{HeartbeatResponse, NetworkInitializeResponse, Response, ResponseHeader};
