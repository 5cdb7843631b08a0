//! Command dispatch: bridges CLI args -> SyncEngine calls -> output formatting.

pub mod config_cmd;
pub mod locks;
pub mod notifications;
pub mod summary;
pub mod users;
pub mod watch;

use lockdeck_core::{SyncEngine, UserProfile};

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;
use crate::output;

/// Dispatch a backend-bound command to the appropriate handler.
pub async fn dispatch(
    cmd: Command,
    engine: &SyncEngine,
    user: &UserProfile,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match cmd {
        Command::Locks(args) => locks::handle(engine, args, global).await,
        Command::Summary => summary::handle(engine, global).await,
        Command::Notifications(args) => notifications::handle(engine, args, global).await,
        Command::Users(args) => users::handle(engine, args, global).await,
        Command::Watch(args) => watch::handle(engine, args, global).await,
        Command::Login => {
            let role = user.role.as_deref().unwrap_or("user");
            output::print_output(&format!("Logged in as {} ({role})", user.username), global.quiet);
            Ok(())
        }
        // Config and Completions are handled before login
        Command::Config(_) | Command::Completions(_) => Ok(()),
    }
}
