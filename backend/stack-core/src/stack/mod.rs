//! Simulated radio stack answering the runtime's IPC requests.
//!
//! [`MockStack`] owns a [`RequestReceiver`] and the shared [`state`](state::StackState)
//! the receiver's handler operates on. Tests drive it from the outside:
//!
//! ```no_run
//! use common::StatusCode;
//! use stack_core::stack::MockStack;
//!
//! # fn run() -> Result<(), stack_core::error::ipc::IpcError> {
//! let stack = MockStack::new(Default::default());
//! stack.start()?;
//! stack.set_pending_result_code(StatusCode::NetworkBusy);
//! // ... exercise the runtime under test ...
//! stack.stop();
//! # Ok(())
//! # }
//! ```

pub(crate) mod state;

pub use state::NetworkParameters;

use crate::config::StackConfig;
use crate::error::ipc::IpcError;
use crate::ipc::{RequestHandler, RequestReceiver};

use state::StackState;

use common::{RedactedNetworkKey, StatusCode};

use std::sync::{Arc, Weak};

use log::{info, warn};

/// A simulated radio stack bound to one IPC/event port pair.
///
/// State is per instance, so several stacks on distinct ports can coexist in one process.
/// Dropping a running stack stops it.
pub struct MockStack {
    state: Arc<StackState>,
    receiver: RequestReceiver,
}

impl MockStack {
    pub fn new(config: StackConfig) -> Self {
        let state = Arc::new(StackState::new(config.clone()));
        let weak: Weak<StackState> = Arc::downgrade(&state);
        let handler: Weak<dyn RequestHandler> = weak;
        let receiver = RequestReceiver::new(config, handler);

        Self { state, receiver }
    }

    /// Construct and start a stack in one step.
    pub fn started(config: StackConfig) -> Result<Self, IpcError> {
        let stack = Self::new(config);
        stack.start()?;
        Ok(stack)
    }

    /// Start listening and announce startup on the event port.
    ///
    /// # Errors
    ///
    /// Returns the receiver's startup error (typically [`IpcError::Bind`]); the stack
    /// stays stopped in that case.
    pub fn start(&self) -> Result<(), IpcError> {
        let mut running = self.state.running();
        if *running {
            warn!("Asked to start but MockStack is already running");
            return Ok(());
        }

        self.receiver.start()?;
        self.state.announce_startup();
        *running = true;

        info!("MockStack started on {}", self.state.config().ipc_endpoint());
        Ok(())
    }

    /// Stop listening. The running flag stays locked until the listener has joined,
    /// so a concurrent [`start`](Self::start) waits for a fully stopped receiver.
    pub fn stop(&self) {
        let mut running = self.state.running();
        if !*running {
            warn!("Asked to stop but MockStack is not running");
            return;
        }

        self.receiver.stop();
        *running = false;
        drop(running);

        info!("MockStack stopped on {}", self.state.config().ipc_endpoint());
    }

    pub fn config(&self) -> &StackConfig {
        self.state.config()
    }

    pub fn is_running(&self) -> bool {
        *self.state.running()
    }

    pub fn is_network_initialized(&self) -> bool {
        self.state.is_network_initialized()
    }

    /// Forget the formed network so the next `networkInit` request forms a new one.
    pub fn reset_network(&self) {
        self.state.reset_network();
    }

    pub fn network(&self) -> NetworkParameters {
        self.state.network()
    }

    pub fn address(&self) -> String {
        self.state.network().address
    }

    pub fn region(&self) -> String {
        self.state.network().region
    }

    pub fn network_key(&self) -> RedactedNetworkKey {
        self.state.network().network_key
    }

    pub fn channel(&self) -> u8 {
        self.state.network().channel
    }

    pub fn pan_id(&self) -> i16 {
        self.state.network().pan_id
    }

    pub fn pending_result_code(&self) -> StatusCode {
        self.state.pending_result_code()
    }

    /// Make the next handled request (of any kind) report `code`. Consumed once.
    pub fn set_pending_result_code(&self, code: StatusCode) {
        self.state.set_pending_result_code(code);
    }
}

impl Drop for MockStack {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
        }
    }
}
