//! Debug mode commands.

use clap::{Args, Subcommand};

use insights_core::result::AppResult;

use super::SessionContext;
use crate::logging::LogControl;
use crate::output;

/// Arguments for debug commands
#[derive(Debug, Args)]
pub struct DebugArgs {
    /// Debug subcommand
    #[command(subcommand)]
    pub command: DebugCommand,
}

/// Debug subcommands
#[derive(Debug, Subcommand)]
pub enum DebugCommand {
    /// Turn debug mode on
    On,
    /// Turn debug mode off
    Off,
    /// Flip debug mode
    Toggle,
    /// Show whether debug mode is on
    Status,
}

/// Execute debug commands
pub fn execute(args: &DebugArgs, ctx: &SessionContext, log: &LogControl) -> AppResult<()> {
    let enabled = match args.command {
        DebugCommand::On => {
            ctx.debug.set(true)?;
            true
        }
        DebugCommand::Off => {
            ctx.debug.set(false)?;
            false
        }
        DebugCommand::Toggle => ctx.debug.toggle()?,
        DebugCommand::Status => ctx.debug.is_enabled()?,
    };

    log.apply_debug_mode(enabled)?;
    output::print_kv("Debug mode", if enabled { "on" } else { "off" });
    Ok(())
}
