//! Runner for the `chip-tool` commissioning CLI.
//!
//! Every operation maps onto one CLI invocation of the form
//! `chip-tool <cluster|group> <command> <positional args> [--options]`, with the
//! shared options (storage directory, commissioner name, trust store) appended.
//!
//! Failures of the command itself (non-zero exit, timeout, spawn failure) are
//! reported through [`InteractionResult`], never raised. Only problems with the
//! runner's own setup are errors: a missing executable or storage directory.

use crate::accessory::process::AccessoryProcess;
use crate::error::chip_tool::ChipToolError;

use common::ErrorLocation;

use std::collections::BTreeMap;
use std::fmt::Display;
use std::panic::Location;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use log::{debug, error, info, warn};
use regex::Regex;
use serde_json::Value;
use tempfile::{Builder as TempDirBuilder, TempDir};
use tokio::process::Command as TokioCommand;
use tokio::time::timeout as TokioTimeout;

pub const CHIP_TOOL_BINARY: &str = "chip-tool";
pub const DEFAULT_COMMISSIONER_NAME: &str = "alpha";
pub const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(5);
/// Matter requires commissioning windows to stay open at least three minutes.
pub const DEFAULT_COMMISSIONING_WINDOW: Duration = Duration::from_secs(180);
/// Sent when a window is opened without an explicit discriminator.
pub const DEFAULT_WINDOW_DISCRIMINATOR: u16 = 3840;

const NO_EXIT_CODE: i32 = -1;
const ENHANCED_COMMISSIONING_METHOD: u8 = 1;
const PBKDF_ITERATIONS: u32 = 1000;

const STORAGE_DIRECTORY_FLAG: &str = "--storage-directory";
const COMMISSIONER_NAME_FLAG: &str = "--commissioner-name";
const PAA_TRUST_STORE_FLAG: &str = "--paa-trust-store-path";

const MANUAL_PAIRING_CODE_PATTERN: &str = r"Manual pairing code:\s*\[([0-9]+)\]";

static MANUAL_PAIRING_CODE_REGEX: OnceLock<Regex> = OnceLock::new();

pub(crate) fn get_manual_pairing_code_regex() -> &'static Regex {
    MANUAL_PAIRING_CODE_REGEX
        .get_or_init(|| Regex::new(MANUAL_PAIRING_CODE_PATTERN).expect("valid regex pattern"))
}

/// Extract the code from a line like `[SVR] Manual pairing code: [34970112332]`.
pub fn parse_manual_pairing_code(output: &str) -> Option<String> {
    get_manual_pairing_code_regex()
        .captures(output)
        .and_then(|cap| cap.get(1))
        .map(|code| code.as_str().to_string())
}

// ============================================
// RESULTS AND OPTIONS
// ============================================

/// Outcome of one CLI invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InteractionResult {
    pub success: bool,
    pub return_code: i32,
    pub stdout: String,
    pub stderr: String,
    /// Stdout parsed as JSON, when it is JSON.
    pub data: Option<Value>,
}

impl InteractionResult {
    fn not_run(message: String) -> Self {
        Self {
            success: false,
            return_code: NO_EXIT_CODE,
            stdout: String::new(),
            stderr: message,
            data: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChipToolOptions {
    /// Explicit executable. Looked up on `PATH` when absent.
    pub executable: Option<PathBuf>,
    /// `alpha`, `beta`, `gamma`, or an integer of 4 or more.
    pub commissioner_name: String,
    pub paa_trust_store_path: Option<PathBuf>,
}

impl Default for ChipToolOptions {
    fn default() -> Self {
        Self {
            executable: None,
            commissioner_name: String::from(DEFAULT_COMMISSIONER_NAME),
            paa_trust_store_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommissionOptions {
    /// Node id to assign. The next free id is used when absent.
    pub node_id: Option<u64>,
    pub timeout: Duration,
    /// Re-open a window afterwards so another controller can commission the device.
    pub open_commissioning_window: bool,
    pub window_timeout: Duration,
}

impl Default for CommissionOptions {
    fn default() -> Self {
        Self {
            node_id: None,
            timeout: DEFAULT_COMMAND_TIMEOUT,
            open_commissioning_window: true,
            window_timeout: DEFAULT_COMMISSIONING_WINDOW,
        }
    }
}

/// A device this runner commissioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredDevice {
    pub node_id: u64,
    /// Code other controllers should use next. Replaced when a new window is opened.
    pub pairing_code: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CommissioningWindow {
    pub result: InteractionResult,
    pub pairing_code: Option<String>,
}

// ============================================
// CHIP TOOL
// ============================================

/// One commissioner identity with its own fabric storage.
pub struct ChipTool {
    executable: PathBuf,
    storage: TempDir,
    commissioner_name: String,
    paa_trust_store_path: Option<PathBuf>,
    registered: BTreeMap<u64, RegisteredDevice>,
    next_node_id: u64,
}

impl ChipTool {
    /// Resolve the executable and create a fresh storage directory.
    ///
    /// # Errors
    ///
    /// - [`ChipToolError::NotFound`] if the executable is missing; nothing can run without it
    /// - [`ChipToolError::Storage`] if the storage directory cannot be created
    pub fn new(options: ChipToolOptions) -> Result<Self, ChipToolError> {
        let storage = TempDirBuilder::new()
            .prefix("chip_tool_storage_")
            .tempdir()
            .map_err(|e| ChipToolError::Storage {
                message: format!("Failed to create storage directory: {e}"),
                location: ErrorLocation::from(Location::caller()),
                source: e,
            })?;

        let executable = resolve_executable(options.executable)?;

        debug!(
            "ChipTool using {} with storage at {}",
            executable.display(),
            storage.path().display()
        );

        Ok(Self {
            executable,
            storage,
            commissioner_name: options.commissioner_name,
            paa_trust_store_path: options.paa_trust_store_path,
            registered: BTreeMap::new(),
            next_node_id: 1,
        })
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn storage_dir(&self) -> &Path {
        self.storage.path()
    }

    pub fn registered_device(&self, node_id: u64) -> Option<&RegisteredDevice> {
        self.registered.get(&node_id)
    }

    pub fn registered_devices(&self) -> &BTreeMap<u64, RegisteredDevice> {
        &self.registered
    }

    /// Options appended after the positional arguments of every command.
    pub(crate) fn common_options(&self) -> Vec<String> {
        let mut options = vec![
            String::from(STORAGE_DIRECTORY_FLAG),
            self.storage.path().to_string_lossy().to_string(),
            String::from(COMMISSIONER_NAME_FLAG),
            self.commissioner_name.clone(),
        ];

        if let Some(path) = &self.paa_trust_store_path {
            options.push(String::from(PAA_TRUST_STORE_FLAG));
            options.push(path.to_string_lossy().to_string());
        }

        options
    }

    /// Run `<executable> <args...> <common options...>` with a time limit.
    pub async fn run(&self, args: &[String], limit: Duration) -> InteractionResult {
        let options = self.common_options();

        debug!(
            "Running command: {} {} {}",
            self.executable.display(),
            args.join(" "),
            options.join(" ")
        );

        let mut command = TokioCommand::new(&self.executable);
        command
            .args(args)
            .args(&options)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match TokioTimeout(limit, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                error!("Failed to execute command: {e}");
                return InteractionResult::not_run(e.to_string());
            }
            Err(_) => {
                error!("Command timed out after {limit:?}");
                return InteractionResult::not_run(format!("Command timed out after {limit:?}"));
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let return_code = output.status.code().unwrap_or(NO_EXIT_CODE);
        let success = output.status.success();

        if !success {
            warn!("Command failed with return code {return_code}: stderr={stderr}");
        }

        InteractionResult {
            success,
            return_code,
            data: serde_json::from_str(&stdout).ok(),
            stdout,
            stderr,
        }
    }

    /// Commission a device by manual pairing code and remember it.
    ///
    /// With `open_commissioning_window` set, a failure to open the window is an error too,
    /// since multi-admin tests cannot proceed without it.
    pub async fn commission(
        &mut self,
        pairing_code: &str,
        options: &CommissionOptions,
    ) -> Result<RegisteredDevice, ChipToolError> {
        let node_id = options.node_id.unwrap_or(self.next_node_id);
        if node_id >= self.next_node_id {
            self.next_node_id = node_id + 1;
        }

        info!("Commissioning device with code {pairing_code} as node {node_id}");

        let args = vec![
            String::from("pairing"),
            String::from("code"),
            node_id.to_string(),
            pairing_code.to_string(),
        ];
        let result = self.run(&args, options.timeout).await;
        if !result.success {
            return Err(ChipToolError::Commission {
                node_id,
                message: format!(
                    "Failed to commission device: {}\nstdout: {}",
                    result.stderr, result.stdout
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        }

        let mut device = RegisteredDevice {
            node_id,
            pairing_code: pairing_code.to_string(),
        };
        info!("Commissioned device as node {node_id}");

        if options.open_commissioning_window {
            let window = self
                .open_commissioning_window(node_id, options.window_timeout)
                .await;

            if !window.result.success {
                return Err(ChipToolError::Commission {
                    node_id,
                    message: format!(
                        "Failed to open commissioning window: {}",
                        window.result.stderr
                    ),
                    location: ErrorLocation::from(Location::caller()),
                });
            }

            if let Some(code) = window.pairing_code {
                device.pairing_code = code;
            }
        }

        self.registered.insert(node_id, device.clone());
        Ok(device)
    }

    /// Commission a running accessory using its current code, and hand it the code its
    /// new commissioning window advertises.
    pub async fn commission_accessory(
        &mut self,
        accessory: &mut AccessoryProcess,
        options: &CommissionOptions,
    ) -> Result<RegisteredDevice, ChipToolError> {
        let Some(code) = accessory.commissioning_code().map(str::to_string) else {
            return Err(ChipToolError::Commission {
                node_id: options.node_id.unwrap_or(self.next_node_id),
                message: format!(
                    "{} has no commissioning code to pair with",
                    accessory.device_class()
                ),
                location: ErrorLocation::from(Location::caller()),
            });
        };

        let device = self.commission(&code, options).await?;
        if device.pairing_code != code {
            accessory.set_commissioning_code(device.pairing_code.clone());
            info!(
                "Updated {} commissioning code for multi-admin commissioning",
                accessory.device_class()
            );
        }
        Ok(device)
    }

    /// Open an enhanced commissioning window on an already commissioned node.
    ///
    /// Most sample apps only support the enhanced method, so the basic one is not offered.
    pub async fn open_commissioning_window(
        &self,
        node_id: u64,
        window_timeout: Duration,
    ) -> CommissioningWindow {
        info!("Opening commissioning window on node {node_id} for {window_timeout:?}");

        let args = vec![
            String::from("pairing"),
            String::from("open-commissioning-window"),
            node_id.to_string(),
            ENHANCED_COMMISSIONING_METHOD.to_string(),
            window_timeout.as_secs().to_string(),
            PBKDF_ITERATIONS.to_string(),
            DEFAULT_WINDOW_DISCRIMINATOR.to_string(),
        ];
        let result = self.run(&args, DEFAULT_COMMAND_TIMEOUT).await;

        let pairing_code = if result.success {
            let code = parse_manual_pairing_code(&result.stdout);
            if code.is_none() {
                warn!("Could not parse new commissioning code for node {node_id}");
            }
            code
        } else {
            warn!(
                "Failed to open commissioning window on node {node_id}: {}",
                result.stderr
            );
            None
        };

        CommissioningWindow {
            result,
            pairing_code,
        }
    }

    /// Unpair a node; it is forgotten only if the command succeeded.
    pub async fn unpair(&mut self, node_id: u64, limit: Duration) -> InteractionResult {
        let args = vec![
            String::from("pairing"),
            String::from("unpair"),
            node_id.to_string(),
        ];
        let result = self.run(&args, limit).await;

        if result.success && self.registered.remove(&node_id).is_some() {
            info!("Unregistered device with node id {node_id}");
        }
        result
    }

    pub async fn read_attribute(
        &self,
        node_id: u64,
        endpoint_id: u16,
        cluster: &str,
        attribute: &str,
        limit: Duration,
    ) -> InteractionResult {
        let args = vec![
            cluster.to_string(),
            String::from("read"),
            attribute.to_string(),
            node_id.to_string(),
            endpoint_id.to_string(),
        ];
        self.run(&args, limit).await
    }

    pub async fn write_attribute(
        &self,
        node_id: u64,
        endpoint_id: u16,
        cluster: &str,
        attribute: &str,
        value: impl Display,
        limit: Duration,
    ) -> InteractionResult {
        let args = vec![
            cluster.to_string(),
            String::from("write"),
            attribute.to_string(),
            value.to_string(),
            node_id.to_string(),
            endpoint_id.to_string(),
        ];
        self.run(&args, limit).await
    }

    /// Invoke a cluster command; each argument is passed as `--<key> <value>`.
    pub async fn invoke_command(
        &self,
        node_id: u64,
        endpoint_id: u16,
        cluster: &str,
        command: &str,
        arguments: &[(&str, &str)],
        limit: Duration,
    ) -> InteractionResult {
        let mut args = vec![
            cluster.to_string(),
            command.to_string(),
            node_id.to_string(),
            endpoint_id.to_string(),
        ];
        for (key, value) in arguments {
            args.push(format!("--{key}"));
            args.push((*value).to_string());
        }
        self.run(&args, limit).await
    }

    pub async fn discover_commissionable(&self, limit: Duration) -> InteractionResult {
        let args = vec![String::from("discover"), String::from("commissionables")];
        self.run(&args, limit).await
    }

    pub async fn resolve_node(&self, node_id: u64, fabric_id: u64, limit: Duration) -> InteractionResult {
        let args = vec![
            String::from("discover"),
            String::from("resolve"),
            node_id.to_string(),
            fabric_id.to_string(),
        ];
        self.run(&args, limit).await
    }
}

#[track_caller]
fn resolve_executable(explicit: Option<PathBuf>) -> Result<PathBuf, ChipToolError> {
    match explicit {
        Some(path) if path.is_file() => Ok(path),
        Some(path) => Err(ChipToolError::NotFound {
            message: format!("{} does not exist or is not a file", path.display()),
            location: ErrorLocation::from(Location::caller()),
        }),
        None => which::which(CHIP_TOOL_BINARY).map_err(|e| ChipToolError::NotFound {
            message: format!(
                "{CHIP_TOOL_BINARY} not found in PATH ({e}). Install it or provide the path explicitly"
            ),
            location: ErrorLocation::from(Location::caller()),
        }),
    }
}
