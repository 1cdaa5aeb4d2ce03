//! Long-running session host.

use clap::Args;
use tokio::sync::broadcast::error::RecvError;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use insights_auth::RouteGuard;
use insights_core::error::AppError;
use insights_core::events::{DomainEvent, EventPayload};
use insights_core::result::AppResult;

use super::SessionContext;
use crate::output::{self, OutputFormat};

/// Arguments for the watch command
#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Print session domain events as they happen
    #[arg(long)]
    pub events: bool,
}

/// Execute the watch command. Runs until Ctrl-C.
pub async fn execute(args: &WatchArgs, ctx: &SessionContext, format: OutputFormat) -> AppResult<()> {
    let snapshot = ctx.manager.startup();
    super::status::print_snapshot(&snapshot, ctx, format);

    let guard = RouteGuard::new(ctx.manager.clone());
    guard.enforce();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let manager = ctx.manager.clone();
    let runner = tokio::spawn(async move { manager.run(shutdown_rx).await });

    let mut events = ctx.manager.events().subscribe();
    let mut snapshots = ctx.manager.subscribe();
    snapshots.mark_unchanged();
    info!("Watching session; press Ctrl-C to stop");

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("Interrupted");
                break;
            }
            event = events.recv() => match event {
                Ok(event) if args.events => print_event(&event, format),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => warn!(skipped, "Event stream lagged"),
                Err(RecvError::Closed) => break,
            },
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let settled = {
                    let snapshot = snapshots.borrow_and_update();
                    debug!(phase = %snapshot.phase, "Session changed");
                    snapshot.phase.is_settled() && !snapshot.is_loading
                };
                if settled {
                    guard.enforce();
                }
            }
        }
    }

    shutdown_tx.send_replace(true);
    runner
        .await
        .map_err(|e| AppError::internal(format!("Session task failed: {}", e)))?
}

fn print_event(event: &DomainEvent, format: OutputFormat) {
    match format {
        OutputFormat::Json => output::print_json(event),
        OutputFormat::Table => {
            let EventPayload::Session(session) = &event.payload;
            output::print_kv(
                &event.timestamp.format("%H:%M:%S").to_string(),
                &format!("{:?}", session),
            );
        }
    }
}
