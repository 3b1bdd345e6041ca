//! Shared state of a simulated stack.
//!
//! Each field has its own lock so the listener thread and test code can touch
//! unrelated fields without blocking each other. Compound operations
//! (compare-and-set of `network_initialized`, read-and-reset of the pending
//! result code) happen under a single lock acquisition.

use crate::config::StackConfig;
use crate::error::ipc::IpcError;
use crate::ipc::event::{Event, WireEvent, WireMap};
use crate::ipc::request::{HeartbeatRequest, NetworkInitializeRequest, Request};
use crate::ipc::response::{INITIALIZED_KEY, PID_KEY, RESULT_CODE_KEY};
use crate::ipc::RequestHandler;

use common::{RedactedNetworkKey, StatusCode};

use std::sync::{Mutex, MutexGuard, PoisonError};

use log::{debug, info, warn};
use rand::Rng;
use serde_json::Value;

/// Bytes of entropy in a generated network key (hex encoded to twice as many chars).
const NETWORK_KEY_BYTES: usize = 16;

/// Radio parameters a formed network carries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkParameters {
    pub address: String,
    pub region: String,
    pub network_key: RedactedNetworkKey,
    pub channel: u8,
    pub pan_id: i16,
}

impl NetworkParameters {
    /// Fresh parameters for a network being formed: random key and PAN id on `channel`.
    pub fn generate(address: &str, region: &str, channel: u8) -> Self {
        let mut rng = rand::rng();
        let key: [u8; NETWORK_KEY_BYTES] = rng.random();

        Self {
            address: address.to_string(),
            region: region.to_string(),
            network_key: RedactedNetworkKey::new(hex::encode(key)),
            channel,
            pan_id: rng.random_range(i16::MIN..=i16::MAX),
        }
    }

    /// Take every field of `update` that is set (non-empty, non-zero) and differs from the
    /// current value. Returns whether anything changed.
    pub fn apply(&mut self, update: NetworkParameters) -> bool {
        let mut changed = false;

        if !update.address.is_empty() && update.address != self.address {
            self.address = update.address;
            changed = true;
        }

        if !update.region.is_empty() && update.region != self.region {
            self.region = update.region;
            changed = true;
        }

        if !update.network_key.is_empty() && update.network_key != self.network_key {
            self.network_key = update.network_key;
            changed = true;
        }

        if update.channel != 0 && update.channel != self.channel {
            self.channel = update.channel;
            changed = true;
        }

        if update.pan_id != 0 && update.pan_id != self.pan_id {
            self.pan_id = update.pan_id;
            changed = true;
        }

        changed
    }
}

pub(crate) struct StackState {
    config: StackConfig,
    running: Mutex<bool>,
    network_initialized: Mutex<bool>,
    pending_result_code: Mutex<StatusCode>,
    network: Mutex<NetworkParameters>,
}

impl StackState {
    pub(crate) fn new(config: StackConfig) -> Self {
        Self {
            config,
            running: Mutex::new(false),
            network_initialized: Mutex::new(false),
            pending_result_code: Mutex::new(StatusCode::Ok),
            network: Mutex::new(NetworkParameters::default()),
        }
    }

    pub(crate) fn config(&self) -> &StackConfig {
        &self.config
    }

    pub(crate) fn running(&self) -> MutexGuard<'_, bool> {
        lock(&self.running)
    }

    pub(crate) fn is_network_initialized(&self) -> bool {
        *lock(&self.network_initialized)
    }

    /// Flip `network_initialized` from false to true. Returns whether this call flipped it.
    pub(crate) fn begin_network_initialize(&self) -> bool {
        let mut initialized = lock(&self.network_initialized);
        if *initialized {
            return false;
        }
        *initialized = true;
        true
    }

    pub(crate) fn reset_network(&self) {
        *lock(&self.network_initialized) = false;
        *lock(&self.network) = NetworkParameters::default();
    }

    pub(crate) fn network(&self) -> NetworkParameters {
        lock(&self.network).clone()
    }

    pub(crate) fn pending_result_code(&self) -> StatusCode {
        *lock(&self.pending_result_code)
    }

    pub(crate) fn set_pending_result_code(&self, code: StatusCode) {
        *lock(&self.pending_result_code) = code;
    }

    /// Read the pending code and reset it to `Ok` in one step.
    pub(crate) fn take_pending_result_code(&self) -> StatusCode {
        std::mem::take(&mut *lock(&self.pending_result_code))
    }

    /// Send a startup event to the configured event endpoint.
    pub(crate) fn announce_startup(&self) {
        Event::startup()
            .addressed_to(self.config.host.as_str(), self.config.event_port)
            .send();
    }

    fn handle_heartbeat(&self, request: &HeartbeatRequest) -> WireMap {
        let initialized = self.is_network_initialized();
        debug!(
            "Heartbeat request {}: initialized={initialized}",
            request.request_id
        );

        let mut result = WireMap::new();
        result.insert(PID_KEY.to_string(), Value::from(std::process::id()));
        result.insert(INITIALIZED_KEY.to_string(), Value::from(initialized));
        result
    }

    fn handle_network_initialize(&self, request: &NetworkInitializeRequest) -> WireMap {
        if self.begin_network_initialize() {
            let update = NetworkParameters::generate(
                &request.address,
                &request.region,
                self.config.test_channel,
            );
            let changed = lock(&self.network).apply(update);
            info!(
                "Network initialized by request {} (parameters changed: {changed})",
                request.request_id
            );
            self.announce_startup();
        } else {
            warn!(
                "Network already initialized, ignoring request {}",
                request.request_id
            );
        }

        WireMap::new()
    }
}

impl RequestHandler for StackState {
    fn handle_request(&self, request: &Request) -> Result<WireMap, IpcError> {
        let mut result = match request {
            Request::Heartbeat(request) => self.handle_heartbeat(request),
            Request::NetworkInitialize(request) => self.handle_network_initialize(request),
        };

        let code = self.take_pending_result_code();
        if !code.is_ok() {
            info!("Reporting injected result {code} for request {}", request.request_id());
        }
        result.insert(RESULT_CODE_KEY.to_string(), Value::from(code.code()));

        Ok(result)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
