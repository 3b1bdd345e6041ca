//! Accessory applications run as child processes of the test.
//!
//! An accessory is any OS process a test needs next to the simulated stack,
//! typically a Matter sample app that a controller commissions. Each accessory
//! gets its own temporary key-value-store directory, removed when the
//! [`AccessoryProcess`] is dropped.

use crate::error::accessory::AccessoryError;

use common::ErrorLocation;

use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::sleep;
use std::time::Duration;

use backoff::{ExponentialBackoff, backoff::Backoff};
use log::{debug, info, trace, warn};
use rand::Rng;
use sysinfo::{Pid, Process, ProcessStatus, ProcessesToUpdate, Signal, System};
use tempfile::{Builder as TempDirBuilder, TempDir};

const SHELL: &str = "sh";
const SHELL_COMMAND_FLAG: &str = "-c";
const KVS_FILE_NAME: &str = "chip_kvs";
const KILL_VERIFY_MAX_ELAPSED: Duration = Duration::from_secs(5);

pub const DEFAULT_SECURED_DEVICE_PORT: u16 = 5540;
pub const MAX_DISCRIMINATOR: u16 = 0x0FFF;
pub const MAX_PASSCODE: u32 = 99_999_998;

/// Passcodes Matter rejects as trivially guessable.
const INVALID_PASSCODES: [u32; 12] = [
    0, 11_111_111, 22_222_222, 33_333_333, 44_444_444, 55_555_555, 66_666_666, 77_777_777,
    88_888_888, 99_999_999, 12_345_678, 87_654_321,
];

// ============================================
// MATTER APP
// ============================================

/// Launch parameters for a Matter sample application (`chip-lighting-app` and friends).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatterApp {
    pub app_name: String,
    pub device_class: String,
    pub vendor_id: u16,
    pub product_id: u16,
    pub secured_device_port: u16,
    pub passcode: u32,
    pub discriminator: u16,
}

impl MatterApp {
    /// Parameters with a random valid passcode and discriminator.
    pub fn new(app_name: impl Into<String>, device_class: impl Into<String>) -> Self {
        Self {
            app_name: app_name.into(),
            device_class: device_class.into(),
            vendor_id: 0,
            product_id: 0,
            secured_device_port: DEFAULT_SECURED_DEVICE_PORT,
            passcode: random_passcode(),
            discriminator: rand::rng().random_range(0..=MAX_DISCRIMINATOR),
        }
    }

    pub fn with_vendor(mut self, vendor_id: u16, product_id: u16) -> Self {
        self.vendor_id = vendor_id;
        self.product_id = product_id;
        self
    }

    pub fn with_secured_device_port(mut self, port: u16) -> Self {
        self.secured_device_port = port;
        self
    }

    pub fn with_setup(mut self, passcode: u32, discriminator: u16) -> Self {
        self.passcode = passcode;
        self.discriminator = discriminator;
        self
    }

    #[track_caller]
    pub fn validate(&self) -> Result<(), AccessoryError> {
        if self.app_name.is_empty() {
            return Err(AccessoryError::Validation {
                message: String::from("app_name cannot be empty"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if !is_valid_passcode(self.passcode) {
            return Err(AccessoryError::Validation {
                message: format!("passcode {} is not allowed", self.passcode),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.discriminator > MAX_DISCRIMINATOR {
            return Err(AccessoryError::Validation {
                message: format!(
                    "discriminator {} exceeds {MAX_DISCRIMINATOR}",
                    self.discriminator
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        if self.vendor_id == 0 && self.product_id != 0 {
            return Err(AccessoryError::Validation {
                message: String::from("product_id can only be set together with vendor_id"),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        Ok(())
    }

    pub(crate) fn args(&self, kvs_dir: &Path) -> Vec<String> {
        vec![
            String::from("--passcode"),
            self.passcode.to_string(),
            String::from("--discriminator"),
            self.discriminator.to_string(),
            String::from("--vendor-id"),
            self.vendor_id.to_string(),
            String::from("--product-id"),
            self.product_id.to_string(),
            String::from("--secured-device-port"),
            self.secured_device_port.to_string(),
            String::from("--KVS"),
            kvs_dir.join(KVS_FILE_NAME).to_string_lossy().to_string(),
        ]
    }
}

pub fn is_valid_passcode(passcode: u32) -> bool {
    (1..=MAX_PASSCODE).contains(&passcode) && !INVALID_PASSCODES.contains(&passcode)
}

fn random_passcode() -> u32 {
    let mut rng = rand::rng();
    loop {
        let passcode = rng.random_range(1..=MAX_PASSCODE);
        if is_valid_passcode(passcode) {
            return passcode;
        }
    }
}

// ============================================
// ACCESSORY PROCESS
// ============================================

/// A child process standing in for a device, plus its private storage directory.
///
/// Stopping terminates the whole process tree (descendants first, then the
/// process itself), so shell wrappers do not leave orphaned apps behind.
pub struct AccessoryProcess {
    device_class: String,
    program: String,
    args: Vec<String>,
    kvs_dir: TempDir,
    commissioning_code: Option<String>,
    child: Option<Child>,
}

impl AccessoryProcess {
    /// Prepare (but do not start) `program args...`.
    pub fn new(
        device_class: impl Into<String>,
        program: impl Into<String>,
        args: Vec<String>,
    ) -> Result<Self, AccessoryError> {
        let device_class = device_class.into();
        let kvs_dir = TempDirBuilder::new()
            .prefix(&format!("accessory_{device_class}_"))
            .tempdir()
            .map_err(|e| AccessoryError::Spawn {
                message: format!("Failed to create storage directory for {device_class}: {e}"),
                location: ErrorLocation::from(Location::caller()),
                source: Box::new(e),
            })?;

        Ok(Self {
            device_class,
            program: program.into(),
            args,
            kvs_dir,
            commissioning_code: None,
            child: None,
        })
    }

    /// Prepare a free-form command line, run through `sh -c`.
    pub fn shell(
        device_class: impl Into<String>,
        command_line: impl Into<String>,
    ) -> Result<Self, AccessoryError> {
        Self::new(
            device_class,
            SHELL,
            vec![String::from(SHELL_COMMAND_FLAG), command_line.into()],
        )
    }

    /// Prepare a Matter sample app, pointing its KVS at this accessory's storage.
    pub fn matter_app(app: &MatterApp) -> Result<Self, AccessoryError> {
        app.validate()?;

        let mut accessory = Self::new(&app.device_class, &app.app_name, Vec::new())?;
        accessory.args = app.args(accessory.kvs_dir.path());
        Ok(accessory)
    }

    pub fn device_class(&self) -> &str {
        &self.device_class
    }

    pub fn kvs_dir(&self) -> &Path {
        self.kvs_dir.path()
    }

    /// Where a Matter app launched by [`AccessoryProcess::matter_app`] keeps its KVS.
    pub fn kvs_file(&self) -> PathBuf {
        self.kvs_dir.path().join(KVS_FILE_NAME)
    }

    pub fn command_line(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.program.as_str());
        parts.extend(self.args.iter().map(String::as_str));
        parts.join(" ")
    }

    /// The manual pairing code a controller should use, once known.
    pub fn commissioning_code(&self) -> Option<&str> {
        self.commissioning_code.as_deref()
    }

    pub fn set_commissioning_code(&mut self, code: impl Into<String>) {
        self.commissioning_code = Some(code.into());
    }

    pub fn pid(&self) -> Option<u32> {
        self.child.as_ref().map(Child::id)
    }

    /// Whether the process was started and has not exited yet.
    pub fn is_running(&mut self) -> bool {
        match self.child.as_mut().map(Child::try_wait) {
            Some(Ok(None)) => true,
            Some(Ok(Some(status))) => {
                debug!("{} exited with {status}", self.device_class);
                false
            }
            Some(Err(e)) => {
                warn!("Failed to poll {}: {e}", self.device_class);
                false
            }
            None => false,
        }
    }

    /// Spawn the process. Returns its PID; starting a running accessory is a no-op.
    pub fn start(&mut self) -> Result<u32, AccessoryError> {
        if let Some(pid) = self.pid()
            && self.is_running()
        {
            warn!("{} already running (PID: {pid})", self.device_class);
            return Ok(pid);
        }

        debug!("Starting {}: {}", self.device_class, self.command_line());

        let child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .spawn()
            .map_err(|e| AccessoryError::Spawn {
                message: format!("Failed to start {}: {e}", self.device_class),
                location: ErrorLocation::from(Location::caller()),
                source: Box::new(e),
            })?;

        let pid = child.id();
        self.child = Some(child);

        info!("Started {} (PID: {pid})", self.device_class);
        Ok(pid)
    }

    /// Terminate the process tree. Returns whether the process is gone afterwards.
    pub fn stop(&mut self) -> bool {
        let Some(mut child) = self.child.take() else {
            debug!("{} not started, nothing to stop", self.device_class);
            return true;
        };

        let pid = child.id();
        debug!("Stopping {} (PID: {pid})", self.device_class);

        for descendant in descendants(pid).into_iter().rev() {
            if !terminate_pid(descendant, || !is_alive(descendant)) {
                warn!("Descendant {descendant} of {} survived termination", self.device_class);
            }
        }

        let stopped = terminate_pid(pid, || matches!(child.try_wait(), Ok(Some(_))));
        if stopped {
            info!("Stopped {} (PID: {pid})", self.device_class);
        } else {
            warn!("{} (PID: {pid}) survived termination", self.device_class);
        }
        stopped
    }

    /// Wait up to `timeout` for the process to exit on its own.
    pub fn wait_for_exit(&mut self, timeout: Duration) -> Result<(), AccessoryError> {
        let Some(child) = self.child.as_mut() else {
            return Err(AccessoryError::NotRunning {
                message: format!("{} was never started", self.device_class),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        let mut backoff = ExponentialBackoff {
            max_elapsed_time: Some(timeout),
            ..Default::default()
        };

        loop {
            if let Ok(Some(status)) = child.try_wait() {
                debug!("{} exited with {status}", self.device_class);
                return Ok(());
            }

            match backoff.next_backoff() {
                Some(duration) => sleep(duration),
                None => {
                    return Err(AccessoryError::Timeout {
                        message: format!(
                            "{} did not exit within {timeout:?}",
                            self.device_class
                        ),
                        location: ErrorLocation::from(Location::caller()),
                    });
                }
            }
        }
    }
}

impl Drop for AccessoryProcess {
    fn drop(&mut self) {
        if self.child.is_some() {
            self.stop();
        }
    }
}

// ============================================
// PROCESS TREE
// ============================================

pub(crate) fn with_process<F, R>(pid: u32, f: F) -> Option<R>
where
    F: FnOnce(&Process) -> R,
{
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, true);

    sys.process(Pid::from_u32(pid)).map(f)
}

/// Alive means present and not a zombie waiting to be reaped.
pub(crate) fn is_alive(pid: u32) -> bool {
    with_process(pid, |p| p.status() != ProcessStatus::Zombie).unwrap_or(false)
}

/// All descendants of `pid`, parents before their children.
pub(crate) fn descendants(pid: u32) -> Vec<u32> {
    let mut sys = System::new();
    sys.refresh_processes(ProcessesToUpdate::All, true);

    let mut found = Vec::new();
    let mut frontier = vec![Pid::from_u32(pid)];

    while let Some(parent) = frontier.pop() {
        for (child_pid, process) in sys.processes() {
            if process.parent() == Some(parent) && !found.contains(&child_pid.as_u32()) {
                found.push(child_pid.as_u32());
                frontier.push(*child_pid);
            }
        }
    }

    found
}

/// Send SIGTERM and wait for `is_gone`; escalate to SIGKILL if it does not happen in time.
fn terminate_pid(pid: u32, mut is_gone: impl FnMut() -> bool) -> bool {
    for signal in [Signal::Term, Signal::Kill] {
        let sent = with_process(pid, |p| match p.kill_with(signal) {
            Some(sent) => sent,
            None => p.kill(),
        });

        match sent {
            Some(true) => debug!("Sent {signal:?} to PID {pid}"),
            Some(false) => debug!("Failed to send {signal:?} to PID {pid}"),
            None => trace!("PID {pid} already gone"),
        }

        let mut backoff = ExponentialBackoff {
            max_elapsed_time: Some(KILL_VERIFY_MAX_ELAPSED),
            ..Default::default()
        };

        loop {
            if is_gone() {
                debug!("Process {pid} terminated");
                return true;
            }

            match backoff.next_backoff() {
                Some(duration) => {
                    trace!("Process {pid} still alive, retrying after {duration:?}");
                    sleep(duration);
                }
                None => break,
            }
        }
    }

    false
}
