//! Listener thread that receives stack requests on the IPC port.
//!
//! The receiver owns one dedicated OS thread per running listener. That thread
//! drives a single-threaded tokio runtime and waits on three things at once:
//!
//! - the bound UDP socket
//! - an interrupt channel whose sending half the receiver keeps
//! - a bounded timeout, so the stop flag is re-checked even without traffic
//!
//! # Lifecycle
//!
//! `Stopped -> start() -> Listening -> stop() -> Stopped`, and a stopped receiver can be
//! started again. Starting twice or stopping twice is a logged no-op.
//!
//! # Failure handling
//!
//! Binding happens on the caller's thread inside [`RequestReceiver::start`], so a port
//! that is already taken is reported immediately. Everything that goes wrong with a
//! single datagram (bad JSON, unknown request, handler failure or panic) is logged and
//! the datagram is dropped; the listener keeps running.

use crate::config::StackConfig;
use crate::error::ipc::IpcError;
use crate::ipc::deserializer::deserialize_request;
use crate::ipc::event::WireEvent;
use crate::ipc::handler::RequestHandler;
use crate::ipc::request::ProcessRequest;
use crate::ipc::response::Response;

use common::ErrorLocation;

use std::net::{SocketAddr, UdpSocket as StdUdpSocket};
use std::panic::{AssertUnwindSafe, Location, catch_unwind};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use log::{debug, error, info, trace, warn};
use tokio::net::UdpSocket;
use tokio::runtime::Builder as RuntimeBuilder;
use tokio::sync::mpsc;
use tokio::time::sleep;

pub const UDP_READ_MAX_SIZE: usize = 65535;

/// Acknowledgement sent to the sender of every datagram before it is processed.
pub const REQUEST_RECEIVED_RESULT: &[u8] = br#"{"resultCode": 0}"#;

/// Receives requests on the IPC port and answers them through a [`RequestHandler`].
///
/// The handler is held weakly: the simulated stack owns the receiver, not the other way
/// round. If the handler is gone by the time a datagram arrives, processing fails with
/// [`IpcError::InvalidHandler`] and the datagram is dropped.
///
/// # Thread Safety
///
/// All methods take `&self`. `stop()` holds the internal lock for the whole join, so a
/// concurrent second `stop()` waits and then finds nothing to do.
pub struct RequestReceiver {
    config: StackConfig,
    handler: Weak<dyn RequestHandler>,
    listener: Mutex<Option<Listener>>,
}

/// A running listener thread and the means to stop it.
struct Listener {
    stop: Arc<AtomicBool>,
    interrupt: mpsc::Sender<()>,
    thread: JoinHandle<()>,
}

/// What the listener thread needs to turn a datagram into a response.
struct ListenerContext {
    handler: Weak<dyn RequestHandler>,
    event_address: String,
    event_port: u16,
}

impl RequestReceiver {
    pub fn new(config: StackConfig, handler: Weak<dyn RequestHandler>) -> Self {
        Self {
            config,
            handler,
            listener: Mutex::new(None),
        }
    }

    pub fn port(&self) -> u16 {
        self.config.ipc_port
    }

    pub fn is_running(&self) -> bool {
        self.lock_listener().is_some()
    }

    /// Bind the IPC port and spawn the listener thread.
    ///
    /// # Errors
    ///
    /// - [`IpcError::Bind`] if the port cannot be bound on the configured host
    /// - [`IpcError::Io`] if the socket cannot be switched to non-blocking mode
    /// - [`IpcError::Thread`] if the OS refuses to spawn the listener thread
    pub fn start(&self) -> Result<(), IpcError> {
        let mut listener = self.lock_listener();
        if listener.is_some() {
            warn!("RequestReceiver already running on port {}", self.port());
            return Ok(());
        }

        let socket = StdUdpSocket::bind((self.config.host.as_str(), self.config.ipc_port))
            .map_err(|e| IpcError::Bind {
                message: format!(
                    "Failed to bind {}:{}: {e}",
                    self.config.host, self.config.ipc_port
                ),
                port: self.config.ipc_port,
                location: ErrorLocation::from(Location::caller()),
                source: e,
            })?;
        socket.set_nonblocking(true)?;

        let (interrupt_tx, interrupt_rx) = mpsc::channel(1);
        let stop = Arc::new(AtomicBool::new(false));
        let context = ListenerContext {
            handler: Weak::clone(&self.handler),
            event_address: self.config.host.clone(),
            event_port: self.config.event_port,
        };
        let read_timeout = self.config.read_timeout();
        let thread_stop = Arc::clone(&stop);

        let thread = thread::Builder::new()
            .name(format!("stack-ipc-{}", self.port()))
            .spawn(move || run_listener(socket, interrupt_rx, thread_stop, read_timeout, context))
            .map_err(|e| IpcError::Thread {
                message: format!("Failed to spawn listener thread: {e}"),
                location: ErrorLocation::from(Location::caller()),
            })?;

        *listener = Some(Listener {
            stop,
            interrupt: interrupt_tx,
            thread,
        });

        info!("RequestReceiver started on port {}", self.port());
        Ok(())
    }

    /// Signal the listener thread and wait for it to finish.
    ///
    /// A datagram that is mid-processing is allowed to complete. There is no join
    /// timeout: a handler that never returns blocks this call.
    pub fn stop(&self) {
        let mut listener = self.lock_listener();
        let Some(running) = listener.take() else {
            warn!("RequestReceiver not running on port {}", self.port());
            return;
        };

        running.stop.store(true, Ordering::SeqCst);
        if let Err(e) = running.interrupt.try_send(()) {
            // The stop flag is still observed on the next timeout tick.
            debug!("Interrupt not delivered to listener: {e}");
        }

        if running.thread.join().is_err() {
            error!("Listener thread on port {} panicked", self.port());
        }

        info!("RequestReceiver stopped on port {}", self.port());
    }

    fn lock_listener(&self) -> MutexGuard<'_, Option<Listener>> {
        self.listener.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RequestReceiver {
    fn drop(&mut self) {
        if self.is_running() {
            self.stop();
        }
    }
}

fn run_listener(
    socket: StdUdpSocket,
    interrupt: mpsc::Receiver<()>,
    stop: Arc<AtomicBool>,
    read_timeout: Duration,
    context: ListenerContext,
) {
    let runtime = match RuntimeBuilder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to build listener runtime: {e}");
            return;
        }
    };

    runtime.block_on(listen(socket, interrupt, stop, read_timeout, context));
}

async fn listen(
    socket: StdUdpSocket,
    mut interrupt: mpsc::Receiver<()>,
    stop: Arc<AtomicBool>,
    read_timeout: Duration,
    context: ListenerContext,
) {
    let socket = match UdpSocket::from_std(socket) {
        Ok(socket) => socket,
        Err(e) => {
            error!("Failed to register listener socket: {e}");
            return;
        }
    };
    let local = socket
        .local_addr()
        .map(|addr| addr.to_string())
        .unwrap_or_else(|_| String::from("<unknown>"));

    info!("RequestReceiver listening on {local}");

    let mut buf = vec![0u8; UDP_READ_MAX_SIZE];

    while !stop.load(Ordering::SeqCst) {
        tokio::select! {
            biased;

            signal = interrupt.recv() => {
                if signal.is_none() {
                    debug!("Interrupt channel closed, listener on {local} exiting");
                    break;
                }
                trace!("Listener on {local} interrupted");
            }

            received = socket.recv_from(&mut buf) => match received {
                Ok((len, peer)) => context.handle_datagram(&socket, &buf[..len], peer).await,
                Err(e) => error!("Socket error while waiting for requests on {local}: {e}"),
            },

            _ = sleep(read_timeout) => {
                trace!("No traffic on {local} for {read_timeout:?}");
            }
        }
    }

    info!("RequestReceiver on {local} stopped listening");
}

impl ListenerContext {
    async fn handle_datagram(&self, socket: &UdpSocket, payload: &[u8], peer: SocketAddr) {
        debug!(
            "Received message from {peer}: {}",
            String::from_utf8_lossy(payload)
        );

        if let Err(e) = socket.send_to(REQUEST_RECEIVED_RESULT, peer).await {
            warn!("Failed to acknowledge datagram from {peer}: {e}");
        }

        match catch_unwind(AssertUnwindSafe(|| self.process(payload))) {
            Ok(Ok(response)) => response.send(),
            Ok(Err(e)) => error!("Dropping datagram from {peer}: {e}"),
            Err(_) => error!("Handler panicked on datagram from {peer}, dropping it"),
        }
    }

    fn process(&self, payload: &[u8]) -> Result<Response, IpcError> {
        let request = deserialize_request(payload)?;
        let handler = self.handler.upgrade();
        let response = request.process(handler.as_deref())?;

        Ok(response.addressed_to(self.event_address.as_str(), self.event_port))
    }
}
