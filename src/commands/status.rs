//! Session status display.

use chrono::Utc;
use serde::Serialize;
use tabled::Tabled;

use insights_auth::SessionSnapshot;
use insights_core::result::AppResult;
use insights_core::traits::Navigator;

use super::SessionContext;
use crate::output::{self, OutputFormat};

/// Session display row
#[derive(Debug, Serialize, Tabled)]
struct StatusRow {
    /// Phase
    phase: String,
    /// User
    user: String,
    /// Personal number
    personal_number: String,
    /// Role
    role: String,
    /// Expires
    expires: String,
    /// Remaining
    remaining: String,
    /// Route
    route: String,
}

impl StatusRow {
    fn new(snapshot: &SessionSnapshot, route: String) -> Self {
        let dash = || "-".to_string();
        let user = snapshot.user.as_ref();
        let remaining = snapshot.expires_at.map(|at| {
            let secs = (at - Utc::now()).num_seconds().max(0);
            format!("{}m {:02}s", secs / 60, secs % 60)
        });
        Self {
            phase: snapshot.phase.to_string(),
            user: user.map(|u| u.display_name.clone()).unwrap_or_else(dash),
            personal_number: user.map(|u| u.personal_number.clone()).unwrap_or_else(dash),
            role: user.map(|u| u.role.to_string()).unwrap_or_else(dash),
            expires: snapshot
                .expires_at
                .map(|at| at.format("%Y-%m-%d %H:%M:%S UTC").to_string())
                .unwrap_or_else(dash),
            remaining: remaining.unwrap_or_else(dash),
            route,
        }
    }
}

/// Print a snapshot in the selected format
pub fn print_snapshot(snapshot: &SessionSnapshot, ctx: &SessionContext, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            output::print_row(&StatusRow::new(snapshot, ctx.routes.current_path()), format)
        }
        OutputFormat::Json => output::print_json(snapshot),
    }
}

/// Execute the status command
pub fn execute(ctx: &SessionContext, format: OutputFormat) -> AppResult<()> {
    let snapshot = ctx.manager.startup();
    print_snapshot(&snapshot, ctx, format);
    Ok(())
}
