//! Runs a [`MockStack`] until a shutdown signal resolves.

use crate::error::MockStackError;

use common::ErrorLocation;

use stack_core::config::StackConfig;
use stack_core::stack::MockStack;

use std::future::Future;
use std::panic::Location;

use log::info;

/// Start a mock stack with `config`, serve until `shutdown` completes, then stop it.
///
/// The stack announces itself with a startup event as soon as it is listening.
pub async fn serve<F>(config: StackConfig, shutdown: F) -> Result<(), MockStackError>
where
    F: Future<Output = ()>,
{
    config.validate()?;

    let stack = MockStack::started(config)?;
    info!(
        "Mock stack listening on {}, events to {}",
        stack.config().ipc_endpoint(),
        stack.config().event_endpoint()
    );

    shutdown.await;

    info!("Shutdown requested, stopping mock stack");
    stack.stop();
    Ok(())
}

/// Resolve when the process receives Ctrl-C.
pub async fn ctrl_c() -> Result<(), MockStackError> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| MockStackError::MockStack {
            message: format!("Failed to listen for Ctrl-C: {e}"),
            location: ErrorLocation::from(Location::caller()),
        })
}
