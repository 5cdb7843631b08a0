//! CLI configuration: thin wrapper around `lockdeck_config`.
//!
//! Adds resolution that respects `GlobalOpts` flag overrides
//! (--api-url, --username, --password, --insecure, --timeout).

use std::io::IsTerminal;

use secrecy::SecretString;

use lockdeck_config::ConfigError;
use lockdeck_core::SyncConfig;

use crate::cli::GlobalOpts;
use crate::error::CliError;

pub use lockdeck_config::{Config, Profile, config_path, load_config_or_default, save_config};

/// Username and password for one invocation.
pub struct Credentials {
    pub username: String,
    pub password: SecretString,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build the `SyncConfig` and credentials for this invocation.
///
/// Flag overrides take priority over profile values. Without a matching
/// profile, `--api-url` alone is enough.
pub fn resolve(global: &GlobalOpts) -> Result<(SyncConfig, Credentials), CliError> {
    let cfg = load_config_or_default();
    let profile_name = active_profile_name(global, &cfg);

    let mut profile = match cfg.profiles.get(&profile_name) {
        Some(profile) => profile.clone(),
        None if global.api_url.is_some() => Profile::default(),
        None if global.profile.is_some() => {
            return Err(CliError::ProfileNotFound {
                name: profile_name,
                available: cfg.profile_names(),
            });
        }
        None => {
            return Err(CliError::NoConfig {
                path: config_path().display().to_string(),
            });
        }
    };

    if let Some(ref url) = global.api_url {
        profile.api_url.clone_from(url);
    }
    if let Some(ref username) = global.username {
        profile.username = Some(username.clone());
    }
    if global.insecure {
        profile.insecure = Some(true);
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }

    let sync = lockdeck_config::profile_to_sync_config(&profile, &cfg.defaults)?;
    let credentials = resolve_credentials(&profile, &profile_name, global)?;
    Ok((sync, credentials))
}

/// `--password` wins, then the profile's chain, then an interactive prompt.
fn resolve_credentials(
    profile: &Profile,
    profile_name: &str,
    global: &GlobalOpts,
) -> Result<Credentials, CliError> {
    if let (Some(username), Some(password)) = (&profile.username, &global.password) {
        return Ok(Credentials {
            username: username.clone(),
            password: SecretString::from(password.clone()),
        });
    }

    match lockdeck_config::resolve_credentials(profile, profile_name) {
        Ok((username, password)) => Ok(Credentials { username, password }),
        Err(ConfigError::NoCredentials { .. })
            if profile.username.is_some() && std::io::stdin().is_terminal() =>
        {
            let username = profile.username.clone().unwrap_or_default();
            let password = rpassword::prompt_password(format!("Password for {username}: "))?;
            Ok(Credentials {
                username,
                password: SecretString::from(password),
            })
        }
        Err(e) => Err(e.into()),
    }
}
