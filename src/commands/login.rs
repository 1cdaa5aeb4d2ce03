//! Credential login.

use clap::Args;

use insights_auth::Credentials;
use insights_core::error::AppError;
use insights_core::result::AppResult;

use super::SessionContext;
use crate::output::{self, OutputFormat};

/// Arguments for the login command
#[derive(Debug, Args)]
pub struct LoginArgs {
    /// Personal number (will prompt if not provided)
    #[arg(short, long)]
    pub username: Option<String>,
    /// Password (will prompt if not provided)
    #[arg(short, long)]
    pub password: Option<String>,
}

/// Execute the login command
pub async fn execute(args: &LoginArgs, ctx: &SessionContext, format: OutputFormat) -> AppResult<()> {
    let snapshot = ctx.manager.startup();
    if let Some(user) = snapshot.user.as_ref().filter(|_| snapshot.is_authenticated) {
        output::print_warning(&format!(
            "Already logged in as {} ({})",
            user.display_name, user.personal_number
        ));
        super::status::print_snapshot(&snapshot, ctx, format);
        return Ok(());
    }

    let username = match &args.username {
        Some(u) => u.clone(),
        None => dialoguer::Input::new()
            .with_prompt("Personal number")
            .interact_text()
            .map_err(|e| AppError::internal(format!("Input error: {}", e)))?,
    };

    let password = match &args.password {
        Some(p) => p.clone(),
        None => dialoguer::Password::new()
            .with_prompt("Password")
            .interact()
            .map_err(|e| AppError::internal(format!("Input error: {}", e)))?,
    };

    let snapshot = ctx
        .manager
        .login(Credentials::new(username, password))
        .await?;
    super::status::print_snapshot(&snapshot, ctx, format);
    Ok(())
}
