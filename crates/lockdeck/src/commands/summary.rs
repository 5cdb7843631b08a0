//! Fleet summary handler.

use lockdeck_core::{FleetSummary, SyncEngine};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

pub async fn handle(engine: &SyncEngine, global: &GlobalOpts) -> Result<(), CliError> {
    engine.refresh_now().await?;
    let summary = engine.summary();
    let out = output::render_single(&global.output, &summary, detail, |s| s.total.to_string());
    output::print_output(&out, global.quiet);
    Ok(())
}

fn detail(s: &FleetSummary) -> String {
    [
        format!("Locks:        {}", s.total),
        format!("Online:       {}", s.online),
        format!("Offline:      {}", s.offline),
        format!("Locked:       {}", s.locked),
        format!("Unlocked:     {}", s.unlocked),
        format!("Low battery:  {}", s.low_battery),
        format!("Pending:      {}", s.pending),
    ]
    .join("\n")
}

/// One-line form used by `watch`.
pub fn line(s: &FleetSummary, unread: u64) -> String {
    format!(
        "{} locks, {} online, {} locked, {} low battery, {} pending, {unread} unread",
        s.total, s.online, s.locked, s.low_battery, s.pending
    )
}
