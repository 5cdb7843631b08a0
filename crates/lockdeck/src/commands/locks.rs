//! Lock command handlers.

use std::sync::Arc;
use std::time::Duration;

use tabled::Tabled;

use lockdeck_core::{ControlAction, DeviceFilter, DeviceId, LockDevice, SyncEngine};

use crate::cli::{ControlArgs, GlobalOpts, LockFilterArg, LocksArgs, LocksCommand};
use crate::error::CliError;
use crate::output;

/// Grace period past the last follow-up probe before giving up on waiting.
const SETTLE_GRACE: Duration = Duration::from_secs(1);

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct LockRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Location")]
    location: String,
    #[tabled(rename = "Online")]
    online: String,
    #[tabled(rename = "State")]
    state: String,
    #[tabled(rename = "Battery")]
    battery: String,
    #[tabled(rename = "Pending")]
    pending: String,
}

impl LockRow {
    fn new(d: &LockDevice, pending: bool, low_battery: u8, color: bool) -> Self {
        let battery = format!("{}%", d.status.battery_level);
        Self {
            id: d.id.to_string(),
            name: d.name.clone(),
            location: d.location.clone().unwrap_or_default(),
            online: output::status_text(
                if d.is_online { "online" } else { "offline" },
                d.is_online,
                color,
            ),
            state: lock_state(d).into(),
            battery: if d.is_low_battery(low_battery) {
                output::warn_text(&battery, color)
            } else {
                battery
            },
            pending: if pending { "yes".into() } else { String::new() },
        }
    }
}

fn lock_state(d: &LockDevice) -> &'static str {
    if d.is_locked() { "locked" } else { "unlocked" }
}

fn detail(d: &Arc<LockDevice>) -> String {
    [
        format!("ID:            {}", d.id),
        format!("Name:          {}", d.name),
        format!("Location:      {}", d.location.as_deref().unwrap_or("-")),
        format!("Hardware ID:   {}", d.hardware_id.as_deref().unwrap_or("-")),
        format!("Online:        {}", d.is_online),
        format!("State:         {}", lock_state(d)),
        format!("Battery:       {}%", d.status.battery_level),
        format!(
            "Last activity: {}",
            d.status
                .last_activity
                .map_or_else(|| "-".into(), |t| t.to_rfc3339())
        ),
    ]
    .join("\n")
}

impl From<LockFilterArg> for DeviceFilter {
    fn from(arg: LockFilterArg) -> Self {
        match arg {
            LockFilterArg::All => DeviceFilter::All,
            LockFilterArg::Online => DeviceFilter::Online,
            LockFilterArg::Offline => DeviceFilter::Offline,
            LockFilterArg::Locked => DeviceFilter::Locked,
            LockFilterArg::Unlocked => DeviceFilter::Unlocked,
            LockFilterArg::LowBattery => DeviceFilter::LowBattery,
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    engine: &SyncEngine,
    args: LocksArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    engine.refresh_now().await?;
    let color = output::should_color(&global.color);

    match args.command {
        LocksCommand::List { filter } => {
            let filter = DeviceFilter::from(filter);
            let threshold = engine.store().low_battery_threshold();
            let locks = engine.devices().matching(filter, threshold);
            let out = output::render_list(
                &global.output,
                &locks,
                |d| LockRow::new(d, engine.is_pending(d.id), threshold, color),
                |d| d.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LocksCommand::Get { id } => {
            let device = find(engine, id)?;
            let out = output::render_single(&global.output, &device, detail, |d| {
                d.id.to_string()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        LocksCommand::Lock(args) => control(engine, args, Some(ControlAction::Lock), global).await,
        LocksCommand::Unlock(args) => {
            control(engine, args, Some(ControlAction::Unlock), global).await
        }
        LocksCommand::Toggle(args) => control(engine, args, None, global).await,
    }
}

fn find(engine: &SyncEngine, id: u64) -> Result<Arc<LockDevice>, CliError> {
    engine.device(DeviceId(id)).ok_or_else(|| CliError::LockNotFound {
        id: id.to_string(),
    })
}

/// Send a command, then (unless `--no-wait`) wait for the lock to report
/// the new state or for the follow-up probes to run out.
async fn control(
    engine: &SyncEngine,
    args: ControlArgs,
    action: Option<ControlAction>,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let id = DeviceId(args.id);
    let device = find(engine, args.id)?;
    let ack = match action {
        Some(action) => engine.issue_command(id, action).await?,
        None => engine.toggle_lock(id).await?,
    };
    let action = action.unwrap_or(if device.is_locked() {
        ControlAction::Unlock
    } else {
        ControlAction::Lock
    });
    tracing::debug!(%id, message = ?ack.message, "command accepted");

    if args.no_wait {
        output::print_output(&format!("{action} sent to {}", device.name), global.quiet);
        return Ok(());
    }

    let window = engine
        .config()
        .probe_offsets
        .iter()
        .max()
        .copied()
        .unwrap_or_default()
        + SETTLE_GRACE;
    let _ = tokio::time::timeout(window, engine.wait_settled(id)).await;

    let now = engine.device(id).unwrap_or(device);
    let line = confirmation_line(&now, action);
    output::print_output(&line, global.quiet);
    Ok(())
}

fn confirmation_line(device: &LockDevice, action: ControlAction) -> String {
    if device.is_locked() == action.target_locked() {
        format!("{} is now {}", device.name, lock_state(device))
    } else {
        format!(
            "{action} sent to {} but not confirmed yet (still {})",
            device.name,
            lock_state(device)
        )
    }
}
