//! Session logout.

use insights_core::result::AppResult;

use super::SessionContext;
use crate::output;

/// Execute the logout command
pub fn execute(ctx: &SessionContext) -> AppResult<()> {
    let snapshot = ctx.manager.startup();
    if !snapshot.is_authenticated {
        output::print_warning("No active session; clearing stored credentials anyway");
    }
    ctx.manager.logout();
    Ok(())
}
