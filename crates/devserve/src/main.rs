//! `devserve` — local development file server entry point.
//!
//! Startup sequence:
//! 1. Parse the mode token from the command line.
//! 2. Load and validate [`Config`] from `DEVSERVE_*` environment variables.
//! 3. Initialise structured logging.
//! 4. Negotiate the transport (HTTPS with a fresh self-signed certificate, or
//!    HTTP), bind, and serve the root directory until interrupted.

mod cert;
mod cli;
mod config;
mod server;
mod telemetry;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use cli::Cli;
use config::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // -----------------------------------------------------------------------
    // 1. Command line
    // -----------------------------------------------------------------------
    let cli = Cli::parse();
    let mode = cli.mode();

    // -----------------------------------------------------------------------
    // 2. Configuration
    // -----------------------------------------------------------------------
    let cfg = Config::from_env().map_err(|e| {
        // Telemetry is not yet up; write to stderr directly.
        eprintln!("ERROR: configuration invalid: {e:#}");
        e
    })?;

    // -----------------------------------------------------------------------
    // 3. Telemetry
    // -----------------------------------------------------------------------
    telemetry::init(&cfg.log_level, cfg.log_format)?;
    info!(
        version = env!("CARGO_PKG_VERSION"),
        %mode,
        root = %cfg.root.display(),
        "devserve starting"
    );

    // -----------------------------------------------------------------------
    // 4. Serve
    // -----------------------------------------------------------------------
    server::run(&cfg, mode).await
}
