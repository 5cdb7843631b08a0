// ── Background synchronisation ──
//
// Schedulers that keep the `DataStore` current, and the command
// dispatcher whose follow-up probes converge pending markers.

mod command;
mod directory;
mod notifications;
mod scheduler;

pub use command::CommandDispatcher;
pub use directory::{DirectoryJob, StatusJob};
pub use notifications::{NotificationFeed, NotificationJob};
pub use scheduler::{PollJob, PollLoop, PollOptions, Scheduler, SchedulerState, TickOutcome};
