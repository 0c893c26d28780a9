//! Clap derive structures for the `stationflow` CLI.
//!
//! Defines the command tree, global flags, and shared value enums. This
//! file is also compiled by `build.rs` for man page generation, so it may
//! only depend on clap and clap_complete.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// stationflow -- live transit station occupancy from the command line
#[derive(Debug, Parser)]
#[command(
    name = "stationflow",
    version,
    about = "Browse, report, and moderate transit station occupancy",
    long_about = "A command-line client for a StationFlow backend.\n\n\
        Lists stations with their current occupancy, files crowd-sourced\n\
        updates, plans routes, and watches the live push channel.",
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
    #[arg(long, short = 'p', env = "STATIONFLOW_PROFILE", global = true)]
    pub profile: Option<String>,

    /// API base URL (overrides profile)
    #[arg(long, env = "STATIONFLOW_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "STATIONFLOW_OUTPUT",
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

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "STATIONFLOW_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "STATIONFLOW_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
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

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

/// Transport types accepted by `--type`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum TransportArg {
    Bus,
    Metro,
    Bike,
    Scooter,
    Minibus,
    Taxi,
    Dolmus,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List, inspect, add, and report stations
    #[command(alias = "st", alias = "s")]
    Stations(StationsArgs),

    /// Review occupancy update requests
    #[command(alias = "req")]
    Requests(RequestsArgs),

    /// Sign in, sign up, and manage the stored session
    Auth(AuthArgs),

    /// Send or review feedback
    #[command(alias = "fb")]
    Feedback(FeedbackArgs),

    /// Plan a driving route to a station
    Route(RouteArgs),

    /// Follow the live map headlessly until interrupted
    Watch(WatchArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Stations ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct StationsArgs {
    #[command(subcommand)]
    pub command: StationsCommand,
}

#[derive(Debug, Subcommand)]
pub enum StationsCommand {
    /// List stations in backend order
    #[command(alias = "ls")]
    List {
        /// Only stations of this transport type
        #[arg(long = "type", short = 't')]
        transport: Option<TransportArg>,

        /// Case-insensitive name filter
        #[arg(long, short = 's')]
        search: Option<String>,

        /// Sort by distance from LAT,LNG
        #[arg(long, value_name = "LAT,LNG")]
        near: Option<String>,

        /// Only stations within this many meters of --near
        #[arg(long, value_name = "METERS", requires = "near")]
        radius: Option<f64>,
    },

    /// Show one station
    Show {
        /// Station ID
        id: String,
    },

    /// Add a custom station (requires sign-in)
    Add {
        /// Display name
        #[arg(long)]
        name: String,

        /// Transport type
        #[arg(long = "type", short = 't')]
        transport: TransportArg,

        /// Location as LAT,LNG
        #[arg(long, value_name = "LAT,LNG")]
        at: String,

        /// Total capacity
        #[arg(long)]
        capacity: u32,

        /// Currently available (defaults to half the capacity)
        #[arg(long)]
        available: Option<u32>,
    },

    /// Delete a station (admin only)
    #[command(alias = "rm")]
    Delete {
        /// Station ID
        id: String,
    },

    /// Report the current availability at a station (requires sign-in)
    Report {
        /// Station ID
        id: String,

        /// Observed available count
        #[arg(allow_negative_numbers = true)]
        available: i64,
    },
}

// ── Requests ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RequestsArgs {
    #[command(subcommand)]
    pub command: RequestsCommand,
}

#[derive(Debug, Subcommand)]
pub enum RequestsCommand {
    /// List every update request (admin only)
    #[command(alias = "ls")]
    List {
        /// Only pending requests
        #[arg(long)]
        pending: bool,
    },

    /// List your own update requests
    Mine,

    /// Approve a request (admin only)
    Approve {
        /// Request ID
        id: String,
    },

    /// Reject a request (admin only)
    Reject {
        /// Request ID
        id: String,
    },
}

// ── Auth ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AuthArgs {
    #[command(subcommand)]
    pub command: AuthCommand,
}

#[derive(Debug, Subcommand)]
pub enum AuthCommand {
    /// Sign in and store the session
    Login {
        /// Username (defaults to the profile's)
        #[arg(long, short = 'u')]
        username: Option<String>,
    },

    /// Create an account
    Signup {
        #[arg(long, short = 'u')]
        username: String,

        #[arg(long, short = 'e')]
        email: String,

        /// Captcha response token, when the backend requires one
        #[arg(long, default_value = "")]
        captcha_token: String,
    },

    /// Change the signed-in user's password
    Passwd,

    /// Forget the stored session
    Logout,

    /// Show the signed-in user
    Whoami,
}

// ── Feedback ─────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct FeedbackArgs {
    #[command(subcommand)]
    pub command: FeedbackCommand,
}

#[derive(Debug, Subcommand)]
pub enum FeedbackCommand {
    /// Send feedback to the operators
    Send {
        /// Message text
        message: String,

        /// Contact address for a reply
        #[arg(long, short = 'e')]
        email: Option<String>,
    },

    /// List received feedback (admin only)
    #[command(alias = "ls")]
    List,

    /// Delete a feedback entry (admin only)
    #[command(alias = "rm")]
    Delete {
        /// Feedback ID
        id: String,
    },
}

// ── Route ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RouteArgs {
    /// Destination station ID
    pub station: String,

    /// Starting point as LAT,LNG
    #[arg(long, value_name = "LAT,LNG")]
    pub from: String,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    /// Pretend to be at LAT,LNG (enables location tracking)
    #[arg(long, value_name = "LAT,LNG")]
    pub at: Option<String>,

    /// Only show stations of this transport type
    #[arg(long = "type", short = 't')]
    pub transport: Option<TransportArg>,

    /// Select this station once it is loaded
    #[arg(long, value_name = "ID")]
    pub select: Option<String>,

    /// Route to the selected station (needs --at and --select)
    #[arg(long, requires_all = ["at", "select"])]
    pub route: bool,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,

    /// Show the effective configuration (secrets masked)
    Show,

    /// Print the config file path
    Path,

    /// Set a profile value
    Set {
        /// Key (api_url, routing_url, tile_url, username, timeout, ca_cert, insecure)
        key: String,

        /// Value
        value: String,
    },

    /// List profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name
        name: String,
    },

    /// Store the active profile's password in the system keyring
    SetPassword,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
