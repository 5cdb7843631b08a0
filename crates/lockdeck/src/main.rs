mod cli;
mod commands;
mod config;
mod error;
mod output;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use lockdeck_core::SyncEngine;

use crate::cli::{Cli, Command};
use crate::error::CliError;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    init_tracing(cli.global.verbose);

    if let Err(err) = run(cli).await {
        let code = err.exit_code();
        eprintln!("{:?}", miette::Report::new(err));
        std::process::exit(code);
    }
}

/// `-v` raises our crates' level; dependencies stay at `warn`.
/// `RUST_LOG` replaces the whole filter when set.
fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let directives =
        format!("warn,lockdeck={level},lockdeck_core={level},lockdeck_api={level}");

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directives));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(verbosity >= 2)
        .with_writer(std::io::stderr)
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        // Config commands never talk to the backend
        Command::Config(args) => commands::config_cmd::handle(args, &cli.global),

        Command::Completions(args) => {
            use clap::CommandFactory;
            use clap_complete::generate;

            let mut cmd = Cli::command();
            generate(args.shell, &mut cmd, "lockdeck", &mut std::io::stdout());
            Ok(())
        }

        cmd => {
            let (sync_config, credentials) = config::resolve(&cli.global)?;
            let engine = SyncEngine::new(sync_config)?;
            let user = engine
                .login(&credentials.username, &credentials.password)
                .await?;

            tracing::debug!(command = ?cmd, "dispatching command");
            let result = commands::dispatch(cmd, &engine, &user, &cli.global).await;
            engine.logout().await;
            result
        }
    }
}
