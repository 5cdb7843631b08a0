//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors
//! with actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use lockdeck_config::ConfigError;
use lockdeck_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const PERMISSION: i32 = 5;
    pub const UNAVAILABLE: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the lock backend: {reason}")]
    #[diagnostic(
        code(lockdeck::connection_failed),
        help(
            "Check that the backend is running and the API URL is right.\n\
             Try: lockdeck config show"
        )
    )]
    ConnectionFailed { reason: String },

    #[error("Request timed out after {timeout_ms}ms")]
    #[diagnostic(
        code(lockdeck::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { timeout_ms: u64 },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(lockdeck::auth_failed),
        help("Verify the username and password for this profile.")
    )]
    AuthFailed { message: String },

    #[error("Session expired")]
    #[diagnostic(code(lockdeck::session_expired), help("Run the command again to log in."))]
    SessionExpired,

    #[error("Permission denied: {message}")]
    #[diagnostic(code(lockdeck::forbidden))]
    Forbidden { message: String },

    #[error("No credentials configured for profile '{profile}'")]
    #[diagnostic(
        code(lockdeck::no_credentials),
        help(
            "Set username/password_env in the profile,\n\
             or export LOCKDECK_USERNAME and LOCKDECK_PASSWORD."
        )
    )]
    NoCredentials { profile: String },

    // ── Locks ────────────────────────────────────────────────────────
    #[error("Lock '{id}' not found")]
    #[diagnostic(code(lockdeck::not_found), help("Run: lockdeck locks list"))]
    LockNotFound { id: String },

    #[error("Lock '{id}' is offline")]
    #[diagnostic(
        code(lockdeck::offline),
        help("Commands are only sent to online locks. Check the lock's hub and battery.")
    )]
    LockOffline { id: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("API error ({code}): {message}")]
    #[diagnostic(code(lockdeck::api_error))]
    ApiError { code: String, message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(lockdeck::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(lockdeck::profile_not_found),
        help("Available profiles: {available}")
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No backend configured")]
    #[diagnostic(
        code(lockdeck::no_config),
        help(
            "Pass --api-url, set LOCKDECK_API_URL, or add a profile.\n\
             Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(lockdeck::config))]
    Config(Box<ConfigError>),

    // ── IO ───────────────────────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::AuthFailed { .. } | Self::SessionExpired | Self::NoCredentials { .. } => {
                exit_code::AUTH
            }
            Self::Forbidden { .. } => exit_code::PERMISSION,
            Self::LockNotFound { .. } => exit_code::NOT_FOUND,
            Self::LockOffline { .. } => exit_code::UNAVAILABLE,
            Self::Validation { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NetworkUnreachable { reason } => CliError::ConnectionFailed { reason },

            CoreError::Timeout { timeout_ms } => CliError::Timeout { timeout_ms },

            CoreError::AuthenticationFailed { message } => CliError::AuthFailed { message },

            CoreError::NotAuthenticated | CoreError::SessionExpired | CoreError::Unauthorized => {
                CliError::SessionExpired
            }

            CoreError::Forbidden { message } => CliError::Forbidden { message },

            CoreError::DeviceNotFound { id } => CliError::LockNotFound { id: id.to_string() },

            CoreError::DeviceOffline { id } => CliError::LockOffline { id: id.to_string() },

            CoreError::Server { status, message } => CliError::ApiError {
                code: status.to_string(),
                message,
            },

            CoreError::Rejected { message } => CliError::ApiError {
                code: "rejected".into(),
                message,
            },

            err @ CoreError::CommandUnconfirmed { .. } => CliError::ApiError {
                code: "unconfirmed".into(),
                message: err.to_string(),
            },

            CoreError::Config { message } => CliError::Validation {
                field: "config".into(),
                reason: message,
            },

            CoreError::Internal(message) => CliError::ApiError {
                code: "internal".into(),
                message,
            },
        }
    }
}

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::ProfileNotFound { name, available } => {
                CliError::ProfileNotFound { name, available }
            }
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            other => CliError::Config(Box::new(other)),
        }
    }
}
