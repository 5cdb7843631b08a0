// ── Domain model ──
//
// Canonical representation of locks and notifications as consumers
// (CLI, UI layers) see them. Wire types from `lockdeck-api` are
// converted in `crate::convert`.

pub mod device;
pub mod notification;
pub mod summary;

pub use device::{DeviceId, LockDevice, LockStatus, StatusUpdate};
pub use notification::Notification;
pub use summary::{FleetSummary, FleetViews};

pub use lockdeck_api::ControlAction;
