use mock_stack::error::MockStackError;
use mock_stack::logger::initialize as LoggerInitialize;
use mock_stack::runner::{ctrl_c, serve};
use mock_stack::settings::Settings;

use std::process::ExitCode;

use log::{error, info, warn};

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run() -> Result<(), MockStackError> {
    let env_file = dotenvy::dotenv();

    let settings = Settings::from_env()?;
    settings.prepare_log_dir()?;

    // Initialize logger FIRST
    LoggerInitialize(&settings.log_dir)?;

    match env_file {
        Ok(path) => info!("Loaded environment from {}", path.display()),
        Err(e) if e.not_found() => {}
        Err(e) => warn!("Ignoring unreadable .env file: {e}"),
    }

    info!("Mock stack starting");
    info!("Log directory: {}", settings.log_dir.display());

    let mut signal_error = None;
    serve(settings.config, async {
        if let Err(e) = ctrl_c().await {
            signal_error = Some(e);
        }
    })
    .await?;

    match signal_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
