//! Bearer-authorized API fetch.

use clap::Args;
use serde_json::Value;
use tokio::sync::watch;

use insights_auth::{AuthError, AuthSessionManager, AuthorizedClient, ExpirySource};
use insights_core::error::AppError;
use insights_core::result::AppResult;

use super::SessionContext;
use crate::output;

/// Arguments for the fetch command
#[derive(Debug, Args)]
pub struct FetchArgs {
    /// API path relative to api.base_url, e.g. /api/problems
    pub resource: String,
}

/// Execute the fetch command. A 401 opens the renewal prompt and, once the
/// session is renewed, retries the request once.
pub async fn execute(args: &FetchArgs, ctx: &SessionContext) -> AppResult<()> {
    ctx.manager.startup();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let manager = ctx.manager.clone();
    let runner = tokio::spawn(async move { manager.run(shutdown_rx).await });

    let client = AuthorizedClient::new(
        &ctx.config.api,
        ctx.store.clone(),
        ctx.manager.expiry_notifier(),
    )?;

    let result = match client.get::<Value>(&args.resource).await {
        Err(AuthError::ExpiredToken) if await_renewal(&ctx.manager).await => {
            client.get::<Value>(&args.resource).await
        }
        other => other,
    };

    shutdown_tx.send_replace(true);
    runner
        .await
        .map_err(|e| AppError::internal(format!("Session task failed: {}", e)))??;

    match result? {
        Some(body) => output::print_json(&body),
        None => output::print_success("No content"),
    }
    Ok(())
}

/// Waits for the renewal prompt opened by a 401 to resolve. Returns true
/// when the session was renewed.
async fn await_renewal(manager: &AuthSessionManager) -> bool {
    let opened = manager.handle_expiry(ExpirySource::Remote) || manager.snapshot().renewal.is_open;
    if !opened {
        return false;
    }

    let mut snapshots = manager.subscribe();
    snapshots
        .wait_for(|s| !s.renewal.is_open && s.phase.is_settled() && !s.is_loading)
        .await
        .map(|s| s.is_authenticated)
        .unwrap_or(false)
}
