//! Shared configuration for lockdeck front ends.
//!
//! TOML profiles, credential resolution (env + plaintext), and translation
//! to `lockdeck_core::SyncConfig`. The CLI layers its flag overrides on top.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use lockdeck_api::{Backoff, ClassTimeouts};
use lockdeck_core::{SyncConfig, TlsVerification};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Environment variable consulted for the username when a profile has none.
pub const USERNAME_ENV: &str = "LOCKDECK_USERNAME";
/// Environment variable consulted for the password before the profile.
pub const PASSWORD_ENV: &str = "LOCKDECK_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no credentials configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found (available: {available})")]
    ProfileNotFound { name: String, available: String },

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    /// Default profile name.
    pub default_profile: Option<String>,

    /// Global defaults.
    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: BTreeMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: BTreeMap::new(),
        }
    }
}

impl Config {
    /// Comma-separated profile names, for error messages.
    pub fn profile_names(&self) -> String {
        if self.profiles.is_empty() {
            return "(none)".into();
        }
        self.profiles.keys().cloned().collect::<Vec<_>>().join(", ")
    }
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Baseline request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}

/// A named backend profile.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct Profile {
    /// API root (e.g., "http://localhost:8080/api").
    pub api_url: String,

    pub username: Option<String>,

    /// Password (plaintext; prefer `password_env`).
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Baseline request timeout, seconds.
    pub timeout: Option<u64>,

    /// Notification request timeout, seconds. Clamped below the baseline.
    pub notification_timeout: Option<u64>,

    /// Full directory refresh interval, seconds.
    pub directory_interval: Option<u64>,

    /// Status-only poll interval, seconds. Unset disables the status poll.
    pub status_interval: Option<u64>,

    /// Notification poll interval, seconds.
    pub notification_interval: Option<u64>,

    /// Retries after the first attempt for device traffic.
    pub retry_attempts: Option<u32>,

    /// Fixed delay between retries, milliseconds.
    pub retry_delay_ms: Option<u64>,

    /// Battery percentage below which a lock counts as low.
    pub low_battery_threshold: Option<u8>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("dev", "lockdeck", "lockdeck").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("lockdeck");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load from an explicit file, then layer `LOCKDECK_*` env vars on top.
///
/// Nested keys use a double underscore:
/// `LOCKDECK_PROFILES__HOME__API_URL`.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("LOCKDECK_").split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load config, returning a default if the file is missing or invalid.
pub fn load_config_or_default() -> Config {
    load_config().unwrap_or_default()
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<(), ConfigError> {
    save_config_to(cfg, &config_path())
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve username + password for a profile.
///
/// Password order: the profile's `password_env`, then `LOCKDECK_PASSWORD`,
/// then plaintext in the profile.
pub fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
) -> Result<(String, SecretString), ConfigError> {
    let no_credentials = || ConfigError::NoCredentials {
        profile: profile_name.into(),
    };

    let username = profile
        .username
        .clone()
        .or_else(|| std::env::var(USERNAME_ENV).ok())
        .ok_or_else(no_credentials)?;

    if let Some(pw) = profile
        .password_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok())
    {
        return Ok((username, SecretString::from(pw)));
    }

    if let Ok(pw) = std::env::var(PASSWORD_ENV) {
        return Ok((username, SecretString::from(pw)));
    }

    profile
        .password
        .clone()
        .map(|pw| (username, SecretString::from(pw)))
        .ok_or_else(no_credentials)
}

// ── SyncConfig translation ──────────────────────────────────────────

/// Build a `SyncConfig` from a profile, falling back to `defaults`.
pub fn profile_to_sync_config(
    profile: &Profile,
    defaults: &Defaults,
) -> Result<SyncConfig, ConfigError> {
    let base_url: url::Url = profile.api_url.parse().map_err(|_| ConfigError::Validation {
        field: "api_url".into(),
        reason: format!("invalid URL: {}", profile.api_url),
    })?;

    let mut config = SyncConfig::new(base_url);

    config.tls = if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    };

    let baseline = positive_secs("timeout", profile.timeout.unwrap_or(defaults.timeout))?;
    config.timeouts = ClassTimeouts {
        baseline,
        notification: match profile.notification_timeout {
            Some(secs) => positive_secs("notification_timeout", secs)?,
            None => baseline.mul_f64(0.8),
        },
    };

    if let Some(attempts) = profile.retry_attempts {
        config.retry.max_retries = attempts;
    }
    if let Some(ms) = profile.retry_delay_ms {
        config.retry.backoff = Backoff::Fixed(Duration::from_millis(ms));
    }

    if let Some(secs) = profile.directory_interval {
        config.directory_interval = positive_secs("directory_interval", secs)?;
    }
    if let Some(secs) = profile.status_interval {
        config.status_interval = Some(positive_secs("status_interval", secs)?);
    }
    if let Some(secs) = profile.notification_interval {
        config.notification_interval = positive_secs("notification_interval", secs)?;
    }
    if let Some(threshold) = profile.low_battery_threshold {
        if threshold > 100 {
            return Err(ConfigError::Validation {
                field: "low_battery_threshold".into(),
                reason: format!("expected a percentage, got {threshold}"),
            });
        }
        config.low_battery_threshold = threshold;
    }

    Ok(config)
}

fn positive_secs(field: &str, secs: u64) -> Result<Duration, ConfigError> {
    if secs == 0 {
        return Err(ConfigError::Validation {
            field: field.into(),
            reason: "must be greater than zero".into(),
        });
    }
    Ok(Duration::from_secs(secs))
}

/// Look up a profile by name, or the config's default profile.
pub fn select_profile<'a>(
    cfg: &'a Config,
    name: Option<&str>,
) -> Result<(String, &'a Profile), ConfigError> {
    let name = name
        .map(str::to_owned)
        .or_else(|| cfg.default_profile.clone())
        .unwrap_or_else(|| "default".into());

    cfg.profiles
        .get(&name)
        .map(|profile| (name.clone(), profile))
        .ok_or_else(|| ConfigError::ProfileNotFound {
            available: cfg.profile_names(),
            name,
        })
}
