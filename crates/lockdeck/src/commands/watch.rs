//! `watch`: run the pollers and print fleet changes until interrupted.

use std::time::Duration;

use serde::Serialize;

use lockdeck_core::{FleetSummary, SyncEngine, SyncState};

use crate::cli::{GlobalOpts, OutputFormat, WatchArgs};
use crate::error::CliError;
use crate::output;

use super::summary;

#[derive(Serialize)]
struct WatchEvent<'a> {
    at: String,
    summary: &'a FleetSummary,
    unread: u64,
}

pub async fn handle(
    engine: &SyncEngine,
    args: WatchArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let mut views = engine.subscribe_views();
    let mut unread = engine.store().subscribe_unread_count();
    let mut state = engine.subscribe_sync_state();

    engine.start_sync().await?;
    tracing::info!("watching lock fleet, Ctrl-C to stop");

    let deadline = async {
        match args.duration {
            Some(secs) => tokio::time::sleep(Duration::from_secs(secs)).await,
            None => std::future::pending().await,
        }
    };
    tokio::pin!(deadline);

    let result = loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break Ok(()),
            () = &mut deadline => break Ok(()),
            changed = views.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let summary = views.borrow_and_update().summary;
                emit(&summary, *unread.borrow(), global);
            }
            changed = unread.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                let count = *unread.borrow_and_update();
                emit(&engine.summary(), count, global);
            }
            changed = state.changed() => {
                if changed.is_err() {
                    break Ok(());
                }
                if *state.borrow_and_update() == SyncState::SessionExpired {
                    break Err(CliError::SessionExpired);
                }
            }
        }
    };

    engine.stop_sync().await;
    result
}

fn emit(summary: &FleetSummary, unread: u64, global: &GlobalOpts) {
    let at = chrono::Local::now();
    let line = match global.output {
        OutputFormat::Json | OutputFormat::JsonCompact => {
            let event = WatchEvent {
                at: at.to_rfc3339(),
                summary,
                unread,
            };
            serde_json::to_string(&event).unwrap_or_default()
        }
        _ => format!("[{}] {}", at.format("%H:%M:%S"), summary::line(summary, unread)),
    };
    output::print_output(&line, global.quiet);
}
