//! Route navigation through the guard.

use clap::Args;

use insights_auth::{GuardDecision, RouteGuard};
use insights_core::result::AppResult;
use insights_core::traits::Navigator;

use super::SessionContext;
use crate::output;

/// Arguments for the open command
#[derive(Debug, Args)]
pub struct OpenArgs {
    /// Route to open, e.g. /problems
    pub route: String,
}

/// Execute the open command
pub fn execute(args: &OpenArgs, ctx: &SessionContext) -> AppResult<()> {
    ctx.manager.startup();
    ctx.routes.push(&args.route);

    match RouteGuard::new(ctx.manager.clone()).enforce() {
        GuardDecision::Render => output::print_success(&format!("Showing {}", args.route)),
        GuardDecision::Placeholder => output::print_warning("Session is still settling"),
        GuardDecision::RedirectToLogin { remember } => output::print_warning(&format!(
            "Login required{}",
            remember
                .map(|p| format!("; {p} will open after login"))
                .unwrap_or_default()
        )),
        GuardDecision::RedirectToLanding => output::print_warning("Already logged in"),
    }
    output::print_kv("Route", &ctx.routes.current_path());
    Ok(())
}
