//! Clap derive structures for the `mysmartbike` CLI.
//!
//! Only depends on clap + clap_complete so `build.rs` can include it
//! for man page generation.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// mysmartbike -- query your MySmartBike e-bikes from the command line
#[derive(Debug, Parser)]
#[command(
    name = "mysmartbike",
    version,
    about = "Query MySmartBike e-bikes from the command line",
    long_about = "Logs in to the MySmartBike cloud and lists the bikes on your account:\n\
        odometer, last known position, battery state of charge and capacity.",
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
    /// Account profile to use
    #[arg(long, short = 'p', env = "MYSMARTBIKE_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Account e-mail (overrides profile)
    #[arg(long, short = 'u', env = "MYSMARTBIKE_USERNAME", global = true)]
    pub username: Option<String>,

    /// API root URL (overrides profile)
    #[arg(long, env = "MYSMARTBIKE_BASE_URI", global = true)]
    pub base_uri: Option<String>,

    /// Proxy URL for all requests (overrides profile)
    #[arg(long, env = "MYSMARTBIKE_PROXY", global = true)]
    pub proxy: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "MYSMARTBIKE_OUTPUT",
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

    /// Skip TLS certificate verification
    #[arg(long, short = 'k', env = "MYSMARTBIKE_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "MYSMARTBIKE_TIMEOUT", global = true)]
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
    /// Plain text, one serial per line (scripting)
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
    /// Check that the configured credentials are accepted
    Login,

    /// List and inspect bikes on the account
    #[command(alias = "b")]
    Bikes(BikesArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Bikes ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct BikesArgs {
    #[command(subcommand)]
    pub command: BikesCommand,
}

#[derive(Debug, Subcommand)]
pub enum BikesCommand {
    /// List all bikes
    #[command(alias = "ls")]
    List,

    /// Show one bike by serial
    Get {
        /// Bike serial number
        serial: String,
    },
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display current configuration (secrets masked)
    Show,

    /// Print the config file location
    Path,

    /// Store a password in the system keyring
    SetPassword {
        /// Profile name
        #[arg(long)]
        profile: Option<String>,
    },
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
