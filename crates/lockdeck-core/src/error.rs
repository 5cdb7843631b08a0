// ── Core error types ──
//
// User-facing errors from lockdeck-core. Consumers never see raw JSON
// failures; the `From<lockdeck_api::Error>` impl translates transport
// errors into domain variants without losing their kind.

use lockdeck_api::ControlAction;
use thiserror::Error;

use crate::model::DeviceId;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Session errors ───────────────────────────────────────────────
    #[error("Not logged in")]
    NotAuthenticated,

    #[error("Session expired -- login required")]
    SessionExpired,

    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    #[error("Permission denied: {message}")]
    Forbidden { message: String },

    #[error("Request still unauthorized after token refresh")]
    Unauthorized,

    // ── Connectivity errors ──────────────────────────────────────────
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    #[error("Network unreachable: {reason}")]
    NetworkUnreachable { reason: String },

    // ── Device errors ────────────────────────────────────────────────
    #[error("Lock {id} is offline")]
    DeviceOffline { id: DeviceId },

    #[error("Lock not found: {id}")]
    DeviceNotFound { id: DeviceId },

    /// Follow-up probes ran out before the lock reported the new state.
    /// Not a hard failure; the next directory refresh corrects the view.
    #[error("{action} on lock {id} was not confirmed by the device")]
    CommandUnconfirmed { id: DeviceId, action: ControlAction },

    // ── Server errors ────────────────────────────────────────────────
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    #[error("Request rejected: {message}")]
    Rejected { message: String },

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    /// Timeout or connection failure; the caller may try again later.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout { .. } | Self::NetworkUnreachable { .. })
    }

    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<lockdeck_api::Error> for CoreError {
    fn from(err: lockdeck_api::Error) -> Self {
        use lockdeck_api::Error as Api;

        match err {
            Api::Timeout { timeout_ms } => CoreError::Timeout { timeout_ms },
            Api::NetworkUnreachable { reason } => CoreError::NetworkUnreachable { reason },
            Api::SessionExpired => CoreError::SessionExpired,
            Api::Unauthorized => CoreError::Unauthorized,
            Api::Forbidden { message } => CoreError::Forbidden { message },
            Api::Authentication { message } => CoreError::AuthenticationFailed { message },
            Api::Server { status, message } => CoreError::Server { status, message },
            Api::Rejected { message } => CoreError::Rejected { message },
            Api::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            Api::Tls(msg) => CoreError::Config {
                message: format!("TLS error: {msg}"),
            },
            Api::Http(e) => CoreError::Internal(format!("HTTP error: {e}")),
            Api::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Deserialization error: {message}"))
            }
        }
    }
}
