//! Clap derive structures for the `lockdeck` CLI.
//!
//! Defines the command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// lockdeck -- command-line client for a door-lock fleet
#[derive(Debug, Parser)]
#[command(
    name = "lockdeck",
    version,
    about = "Monitor and control smart door locks from the command line",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "LOCKDECK_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API root URL (overrides profile)
    #[arg(long, env = "LOCKDECK_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Username (overrides profile)
    #[arg(long, short = 'u', env = "LOCKDECK_USERNAME", global = true)]
    pub username: Option<String>,

    /// Password (prompted for when absent)
    #[arg(long, env = "LOCKDECK_PASSWORD", global = true, hide_env_values = true)]
    pub password: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "LOCKDECK_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "LOCKDECK_INSECURE", global = true)]
    pub insecure: bool,

    /// Baseline request timeout in seconds
    #[arg(long, env = "LOCKDECK_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and control locks
    #[command(alias = "l")]
    Locks(LocksArgs),

    /// Fleet counts: online, locked, low battery, pending
    Summary,

    /// Read and manage notifications
    #[command(alias = "n")]
    Notifications(NotificationsArgs),

    /// Manage operator accounts (admin only)
    Users(UsersArgs),

    /// Run the sync engine and print changes as they land
    Watch(WatchArgs),

    /// Check credentials against the backend
    Login,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  LOCKS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct LocksArgs {
    #[command(subcommand)]
    pub command: LocksCommand,
}

#[derive(Debug, Subcommand)]
pub enum LocksCommand {
    /// List locks
    #[command(alias = "ls")]
    List {
        /// Only show matching locks
        #[arg(long, short = 'f', default_value = "all")]
        filter: LockFilterArg,
    },

    /// Show one lock
    Get {
        /// Lock ID
        id: u64,
    },

    /// Lock a door
    Lock(ControlArgs),

    /// Unlock a door
    Unlock(ControlArgs),

    /// Flip a lock to the opposite state
    Toggle(ControlArgs),
}

#[derive(Debug, Args)]
pub struct ControlArgs {
    /// Lock ID
    pub id: u64,

    /// Return as soon as the backend accepts the command
    #[arg(long)]
    pub no_wait: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LockFilterArg {
    All,
    Online,
    Offline,
    Locked,
    Unlocked,
    LowBattery,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  NOTIFICATIONS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct NotificationsArgs {
    #[command(subcommand)]
    pub command: NotificationsCommand,
}

#[derive(Debug, Subcommand)]
pub enum NotificationsCommand {
    /// List notifications (unread only unless --all)
    #[command(alias = "ls")]
    List {
        /// Include read notifications
        #[arg(long, short = 'a')]
        all: bool,
    },

    /// Mark one notification read
    Read {
        /// Notification ID
        id: u64,
    },

    /// Mark every notification read
    ReadAll,

    /// Delete a notification
    #[command(alias = "rm")]
    Delete {
        /// Notification ID
        id: u64,
    },
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  USERS
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct UsersArgs {
    #[command(subcommand)]
    pub command: UsersCommand,
}

#[derive(Debug, Subcommand)]
pub enum UsersCommand {
    /// List operator accounts
    #[command(alias = "ls")]
    List,

    /// Create an operator account
    Create(UserCreateArgs),

    /// Change an operator account
    Update(UserUpdateArgs),

    /// Delete an operator account
    #[command(alias = "rm")]
    Delete {
        /// User ID
        id: u64,
    },
}

#[derive(Debug, Args)]
pub struct UserCreateArgs {
    /// Login name of the new account
    #[arg(value_name = "USERNAME")]
    pub login: String,

    #[arg(long, default_value = "user")]
    pub role: RoleArg,

    #[arg(long)]
    pub email: Option<String>,

    /// Display name
    #[arg(long)]
    pub name: Option<String>,

    /// Password for the new account (prompted for when absent)
    #[arg(long, env = "LOCKDECK_NEW_USER_PASSWORD", hide_env_values = true)]
    pub new_password: Option<String>,
}

#[derive(Debug, Args)]
pub struct UserUpdateArgs {
    /// User ID
    pub id: u64,

    /// New login name
    #[arg(long)]
    pub rename: Option<String>,

    #[arg(long)]
    pub role: Option<RoleArg>,

    #[arg(long)]
    pub email: Option<String>,

    /// Display name
    #[arg(long)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum RoleArg {
    Admin,
    Manager,
    User,
    Guest,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  WATCH
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Stop after this many seconds (default: until Ctrl-C)
    #[arg(long)]
    pub duration: Option<u64>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
//  CONFIG
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Display current configuration (secrets masked)
    Show,

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
