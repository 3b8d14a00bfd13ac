use clap::Parser;
use tracing_subscriber::EnvFilter;

use atomtile::{daemon, Config};

#[tokio::main]
async fn main() -> std::process::ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::parse();
    tracing::info!(port = %config.port, "atomtile starting");

    let result = tokio::select! {
        result = daemon::run(config) => result,
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("interrupt received, shutting down");
            return std::process::ExitCode::SUCCESS;
        }
    };

    match result {
        Ok(()) => std::process::ExitCode::SUCCESS,
        Err(err) => {
            // Non-zero exit hands the restart decision to the
            // supervisor.
            tracing::error!(error = %err, "daemon exited");
            std::process::ExitCode::FAILURE
        }
    }
}
