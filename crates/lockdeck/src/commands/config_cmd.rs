//! Config subcommand handlers. None of these touch the backend.

use lockdeck_config::{Defaults, select_profile};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config::{self, Config, Profile};
use crate::error::CliError;
use crate::output;

const MASK: &str = "********";

/// Copy of the config with plaintext passwords masked.
fn redacted(cfg: &Config) -> Config {
    Config {
        default_profile: cfg.default_profile.clone(),
        defaults: Defaults {
            output: cfg.defaults.output.clone(),
            color: cfg.defaults.color.clone(),
            insecure: cfg.defaults.insecure,
            timeout: cfg.defaults.timeout,
        },
        profiles: cfg
            .profiles
            .iter()
            .map(|(name, p)| {
                let profile = Profile {
                    password: p.password.as_ref().map(|_| MASK.into()),
                    ..p.clone()
                };
                (name.clone(), profile)
            })
            .collect(),
    }
}

fn format_config(cfg: &Config) -> String {
    let mut lines = vec![
        format!(
            "default_profile = {}",
            cfg.default_profile.as_deref().unwrap_or("-")
        ),
        format!("timeout         = {}s", cfg.defaults.timeout),
        format!("insecure        = {}", cfg.defaults.insecure),
    ];
    for (name, p) in &cfg.profiles {
        lines.push(String::new());
        lines.push(format!("[{name}]"));
        lines.push(format!("  api_url   = {}", p.api_url));
        lines.push(format!(
            "  username  = {}",
            p.username.as_deref().unwrap_or("-")
        ));
        if let Some(ref password) = p.password {
            lines.push(format!("  password  = {password}"));
        }
        if let Some(ref env) = p.password_env {
            lines.push(format!("  password_env = {env}"));
        }
    }
    lines.join("\n")
}

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Show => {
            let cfg = redacted(&config::load_config_or_default());
            let out = output::render_single(&global.output, &cfg, format_config, |_| {
                "config".into()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            output::print_output(&config::config_path().display().to_string(), global.quiet);
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = config::load_config_or_default();
            let default = cfg.default_profile.as_deref().unwrap_or("default");
            if cfg.profiles.is_empty() {
                eprintln!(
                    "No profiles configured. Expected config at: {}",
                    config::config_path().display()
                );
            } else {
                let names: Vec<String> = cfg
                    .profiles
                    .keys()
                    .map(|name| {
                        let marker = if name == default { " *" } else { "" };
                        format!("{name}{marker}")
                    })
                    .collect();
                output::print_output(&names.join("\n"), global.quiet);
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = config::load_config_or_default();
            select_profile(&cfg, Some(&name))?;
            cfg.default_profile = Some(name.clone());
            config::save_config(&cfg)?;
            eprintln!("Default profile set to '{name}'");
            Ok(())
        }
    }
}
