// ── Runtime sync configuration ──
//
// Describes *how* to reach the lock backend and how often to poll it.
// Never touches disk: the CLI (or any other front end) builds a
// `SyncConfig` and hands it to `SyncEngine::new`.

use std::path::PathBuf;
use std::time::Duration;

use lockdeck_api::{ClassTimeouts, RetryPolicy, TlsMode, TransportConfig};
use url::Url;

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(PathBuf),
    /// Skip verification (development backends with self-signed certs).
    DangerAcceptInvalid,
}

/// Configuration for one sync engine.
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// API root, e.g. `http://localhost:8080/api`.
    pub base_url: Url,
    pub tls: TlsVerification,
    pub timeouts: ClassTimeouts,
    pub retry: RetryPolicy,
    /// Full directory refresh cadence.
    pub directory_interval: Duration,
    /// Status-only refresh cadence. `None` disables the status poll.
    pub status_interval: Option<Duration>,
    pub notification_interval: Duration,
    /// Offsets from command issue time at which the lock is re-queried.
    pub probe_offsets: Vec<Duration>,
    /// Consecutive tick failures after which the notification feed stops itself.
    pub notification_failure_threshold: u32,
    /// Pause between stop and start in `NotificationFeed::restart`.
    pub notification_restart_delay: Duration,
    /// Battery percentage below which a lock counts as low-battery.
    pub low_battery_threshold: u8,
}

impl SyncConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            tls: TlsVerification::default(),
            timeouts: ClassTimeouts::default(),
            retry: RetryPolicy::default(),
            directory_interval: Duration::from_secs(30),
            status_interval: None,
            notification_interval: Duration::from_secs(10),
            probe_offsets: vec![
                Duration::from_secs(2),
                Duration::from_secs(4),
                Duration::from_secs(6),
            ],
            notification_failure_threshold: 3,
            notification_restart_delay: Duration::from_secs(1),
            low_battery_threshold: 30,
        }
    }

    /// Build the [`TransportConfig`] for the underlying client.
    pub fn transport(&self) -> TransportConfig {
        TransportConfig {
            tls: match &self.tls {
                TlsVerification::SystemDefaults => TlsMode::System,
                TlsVerification::CustomCa(path) => TlsMode::CustomCa(path.clone()),
                TlsVerification::DangerAcceptInvalid => TlsMode::DangerAcceptInvalid,
            },
            timeouts: self.timeouts,
            retry: self.retry.clone(),
        }
    }
}
