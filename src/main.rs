//! Production Insights session client.
//!
//! Main entry point that loads configuration, initializes logging, and
//! dispatches the session lifecycle commands.

use std::time::Duration;

use clap::Parser;

mod commands;
mod logging;
mod output;
mod terminal;

use commands::Cli;

/// How long blocking tasks (an unanswered password read) may hold up exit.
const SHUTDOWN_GRACE: Duration = Duration::from_millis(500);

fn main() {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    let log = logging::init(&config.logging);
    tracing::debug!(env = ?cli.env, dir = %cli.config_dir, "Configuration loaded");

    let runtime = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            output::print_error(&format!("Failed to start async runtime: {}", e));
            std::process::exit(1);
        }
    };

    let result = runtime.block_on(cli.execute(config, &log));
    runtime.shutdown_timeout(SHUTDOWN_GRACE);

    if let Err(e) = result {
        tracing::debug!(error = %e, kind = %e.kind, "Command failed");
        output::print_error(&e.message);
        std::process::exit(1);
    }
}
