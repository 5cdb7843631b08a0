// ── Reactive data store ──
//
// Copy-on-write device storage, pending-command markers, and the
// notification feed, with push-based change notification.

mod collection;
mod data_store;
mod notifications;
mod pending;
mod refresh;

pub use data_store::DataStore;
pub use pending::{PendingCommand, PendingTicket};
