//! Reactive sync engine between `lockdeck-api` and front ends (CLI, dashboards).
//!
//! This crate owns the domain model, the in-memory mirror of the lock
//! fleet, and the background work that keeps it current:
//!
//! - **[`SyncEngine`]** -- Facade over the whole lifecycle:
//!   [`login()`](SyncEngine::login) authenticates,
//!   [`start_sync()`](SyncEngine::start_sync) starts the schedulers, and
//!   [`issue_command()`](SyncEngine::issue_command) sends lock/unlock
//!   commands with follow-up probes.
//!
//! - **[`DataStore`]** -- Copy-on-write reactive storage. Locks only ever
//!   change from server-confirmed payloads; derived views (online,
//!   offline, low battery, counts) are republished after every change.
//!
//! - **[`PollLoop`]** -- Interval scheduler behind the [`Scheduler`] trait,
//!   with at most one fetch in flight and stale results discarded.
//!
//! - **[`NotificationFeed`]** -- Notification polling that stops itself
//!   after repeated failures.

pub mod config;
pub mod convert;
pub mod engine;
pub mod error;
pub mod model;
pub mod store;
pub mod stream;
pub mod sync;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{SyncConfig, TlsVerification};
pub use engine::{SyncEngine, SyncState};
pub use error::CoreError;
pub use store::{DataStore, PendingCommand, PendingTicket};
pub use stream::{DeviceFilter, EntityStream, SnapshotStream};
pub use sync::{
    CommandDispatcher, NotificationFeed, PollJob, PollLoop, PollOptions, Scheduler,
    SchedulerState, TickOutcome,
};

pub use lockdeck_api::{ControlAck, NewUser, Role, UserProfile, UserUpdate};

pub use model::{
    ControlAction, DeviceId, FleetSummary, FleetViews, LockDevice, LockStatus, Notification,
    StatusUpdate,
};
