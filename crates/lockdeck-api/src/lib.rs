// lockdeck-api: Async Rust client for the lockdeck device, auth, and notification services

pub mod auth;
pub mod class;
pub mod client;
pub mod error;
pub mod locks;
pub mod models;
pub mod notifications;
pub mod retry;
pub mod session;
pub mod token;
pub mod transport;
pub mod users;

pub use class::{ClassTimeouts, Priority, RequestClass};
pub use client::{LockClient, Request};
pub use error::{Error, ErrorKind};
pub use models::{
    ApiEnvelope, ControlAck, ControlAction, LockRecord, LockStatusEntry, LockStatusPayload,
    NewUser, NotificationPage, NotificationQuery, NotificationRecord, Role, UserProfile,
    UserUpdate,
};
pub use retry::{Backoff, RetryDecision, RetryPolicy};
pub use session::{SessionContext, SessionState};
pub use transport::{TlsMode, TransportConfig};
