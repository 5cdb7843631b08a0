use thiserror::Error;

/// Top-level error type for the `lockdeck-api` crate.
///
/// Covers every failure mode of the three remote services: transport,
/// session lifecycle, HTTP status handling, and envelope decoding.
/// `lockdeck-core` maps these into user-facing errors without losing the kind.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// Request did not complete within its class timeout.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// Connection refused, reset, DNS failure, etc.
    #[error("Network unreachable: {reason}")]
    NetworkUnreachable { reason: String },

    /// Any other reqwest failure (request building, body decoding).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS setup or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Session ─────────────────────────────────────────────────────
    /// The session is gone: token expired locally, or the refresh failed.
    /// Credentials have already been evicted when this is returned.
    #[error("Session expired -- login required")]
    SessionExpired,

    /// 401 received again after a successful refresh and replay.
    #[error("Unauthorized after token refresh")]
    Unauthorized,

    /// 403 on a non-auth request.
    #[error("Forbidden: {message}")]
    Forbidden { message: String },

    /// Login or refresh rejected by the auth service.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── Server ──────────────────────────────────────────────────────
    /// Non-success HTTP status not covered above.
    #[error("Server error (HTTP {status}): {message}")]
    Server { status: u16, message: String },

    /// The envelope said `status: "error"`.
    #[error("Request rejected: {message}")]
    Rejected { message: String },

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

/// Coarse classification used by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Timeout or connection-level failure.
    Transient,
    /// 401/403 and session loss -- owned by the refresh-and-replay path.
    Authorization,
    /// The server answered, but not with success.
    Server,
    /// Everything else (decode failures, bad URLs, TLS setup).
    Permanent,
}

impl Error {
    /// Classify a reqwest error into the transport taxonomy.
    pub(crate) fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout { timeout_ms }
        } else if err.is_connect() || err.is_request() {
            Self::NetworkUnreachable {
                reason: err.to_string(),
            }
        } else {
            Self::Http(err)
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Timeout { .. } | Self::NetworkUnreachable { .. } => ErrorKind::Transient,
            Self::SessionExpired
            | Self::Unauthorized
            | Self::Forbidden { .. }
            | Self::Authentication { .. } => ErrorKind::Authorization,
            Self::Server { .. } | Self::Rejected { .. } => ErrorKind::Server,
            Self::Http(_) | Self::InvalidUrl(_) | Self::Tls(_) | Self::Deserialization { .. } => {
                ErrorKind::Permanent
            }
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorKind::Transient
    }

    /// Returns `true` if the session was torn down because of this error.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired)
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            Self::Unauthorized => Some(401),
            Self::Forbidden { .. } => Some(403),
            Self::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
