//! Notification command handlers.

use std::sync::Arc;

use tabled::Tabled;

use lockdeck_core::{Notification, SyncEngine, TickOutcome};

use crate::cli::{GlobalOpts, NotificationsArgs, NotificationsCommand};
use crate::error::CliError;
use crate::output;

#[derive(Tabled)]
struct NotificationRow {
    #[tabled(rename = "ID")]
    id: u64,
    #[tabled(rename = "Kind")]
    kind: String,
    #[tabled(rename = "Message")]
    message: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Read")]
    read: String,
}

impl NotificationRow {
    fn new(n: &Arc<Notification>) -> Self {
        Self {
            id: n.id,
            kind: n.kind.clone(),
            message: n.message.clone(),
            created: n
                .created_at
                .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
                .unwrap_or_default(),
            read: if n.is_read { "yes".into() } else { String::new() },
        }
    }
}

pub async fn handle(
    engine: &SyncEngine,
    args: NotificationsArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let feed = engine.notification_feed();

    match args.command {
        NotificationsCommand::List { all } => {
            if all {
                if !feed.fetch_all().await {
                    return Err(CliError::ApiError {
                        code: "notifications".into(),
                        message: "could not fetch the full notification list".into(),
                    });
                }
            } else if let TickOutcome::Failed(e) = feed.tick().await {
                return Err(e.into());
            }

            let items = engine.notifications_snapshot();
            let out = output::render_list(
                &global.output,
                items.as_slice(),
                NotificationRow::new,
                |n| n.id.to_string(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        NotificationsCommand::Read { id } => {
            feed.mark_read(id).await?;
            output::print_output(&format!("Notification {id} marked read"), global.quiet);
            Ok(())
        }

        NotificationsCommand::ReadAll => {
            feed.mark_all_read().await?;
            output::print_output("All notifications marked read", global.quiet);
            Ok(())
        }

        NotificationsCommand::Delete { id } => {
            feed.delete(id).await?;
            output::print_output(&format!("Notification {id} deleted"), global.quiet);
            Ok(())
        }
    }
}
