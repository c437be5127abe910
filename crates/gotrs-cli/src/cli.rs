//! Command-line interface argument parsing and definitions
//!
//! This module defines the CLI structure using clap's derive API,
//! providing a type-safe and well-documented command interface.

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::io::IsTerminal;
use std::path::PathBuf;

/// GOTRS CLI - Talk to a GOTRS ticketing server from the terminal
///
/// Sends authenticated, retrying requests to the GOTRS REST API and prints
/// the unwrapped response data.
#[derive(Parser, Debug)]
#[command(
    name = "gotrs",
    version,
    author,
    about,
    long_about = None,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Enable verbose output (can be used multiple times for increased verbosity)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-essential output
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Path to configuration file
    #[arg(short, long, global = true, env = "GOTRS_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the GOTRS server
    #[arg(long, global = true, env = "GOTRS_BASE_URL")]
    pub base_url: Option<String>,

    /// API key sent as X-API-Key
    #[arg(long, global = true, env = "GOTRS_API_KEY", hide_env_values = true, conflicts_with = "token")]
    pub api_key: Option<String>,

    /// Bearer token sent in the Authorization header
    #[arg(long, global = true, env = "GOTRS_TOKEN", hide_env_values = true)]
    pub token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<f64>,

    /// Retries after the first attempt for transient failures
    #[arg(long, global = true)]
    pub retries: Option<u32>,

    /// Output format for results
    #[arg(short, long, value_enum, global = true, default_value = "json-pretty")]
    pub output: OutputFormat,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Check that the server is reachable and healthy
    Ping,

    /// GET a resource
    Get(QueryArgs),

    /// DELETE a resource
    Delete(QueryArgs),

    /// POST a JSON body
    Post(BodyArgs),

    /// PUT a JSON body
    Put(BodyArgs),

    /// PATCH a JSON body
    Patch(BodyArgs),

    /// Upload a file as multipart form data
    Upload(UploadArgs),

    /// Download a resource as raw bytes
    Download(DownloadArgs),

    /// Generate shell completions for the specified shell
    Completions(CompletionsArgs),
}

/// Options shared by every request command
#[derive(Args, Debug, Clone, Default)]
pub struct RequestArgs {
    /// Query parameter as KEY=VALUE; repeat a key to send a comma-joined list
    #[arg(long = "query", value_name = "KEY=VALUE")]
    pub query: Vec<String>,

    /// Extra request header as NAME:VALUE
    #[arg(short = 'H', long = "header", value_name = "NAME:VALUE")]
    pub headers: Vec<String>,
}

/// Arguments for commands without a body
#[derive(Args, Debug)]
pub struct QueryArgs {
    /// API path, e.g. /api/v1/tickets
    #[arg(value_name = "PATH")]
    pub path: String,

    #[command(flatten)]
    pub request: RequestArgs,
}

/// Arguments for commands sending a JSON body
#[derive(Args, Debug)]
pub struct BodyArgs {
    /// API path, e.g. /api/v1/tickets
    #[arg(value_name = "PATH")]
    pub path: String,

    /// Inline JSON body
    #[arg(short, long, conflicts_with = "data_file")]
    pub data: Option<String>,

    /// Read the body from a JSON or YAML file
    #[arg(long, value_name = "FILE")]
    pub data_file: Option<PathBuf>,

    #[command(flatten)]
    pub request: RequestArgs,
}

/// Arguments for the upload command
#[derive(Args, Debug)]
pub struct UploadArgs {
    /// API path, e.g. /api/v1/tickets/7/attachments
    #[arg(value_name = "PATH")]
    pub path: String,

    /// File to upload
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Content type of the file part
    #[arg(long)]
    pub content_type: Option<String>,

    /// Extra form field as KEY=VALUE
    #[arg(long = "field", value_name = "KEY=VALUE")]
    pub fields: Vec<String>,

    #[command(flatten)]
    pub request: RequestArgs,
}

/// Arguments for the download command
#[derive(Args, Debug)]
pub struct DownloadArgs {
    /// API path, e.g. /api/v1/attachments/3/download
    #[arg(value_name = "PATH")]
    pub path: String,

    /// Write to this file instead of stdout
    #[arg(long = "save-to", short = 's', value_name = "FILE")]
    pub output_file: Option<PathBuf>,

    #[command(flatten)]
    pub request: RequestArgs,
}

/// Arguments for generating shell completions
#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format options
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Compact JSON output
    Json,
    /// Pretty-printed JSON output
    JsonPretty,
    /// YAML output
    Yaml,
}

/// Supported shells for completion generation
#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum Shell {
    /// Bash shell
    Bash,
    /// Zsh shell
    Zsh,
    /// Fish shell
    Fish,
    /// PowerShell
    PowerShell,
    /// Elvish shell
    Elvish,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Get the effective verbosity level (considering quiet flag)
    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Check if colored output should be used
    pub fn use_color(&self) -> bool {
        !self.no_color && std::io::stderr().is_terminal()
    }
}

impl Shell {
    /// Convert to clap_complete shell type
    pub fn to_clap_shell(self) -> clap_complete::Shell {
        match self {
            Shell::Bash => clap_complete::Shell::Bash,
            Shell::Zsh => clap_complete::Shell::Zsh,
            Shell::Fish => clap_complete::Shell::Fish,
            Shell::PowerShell => clap_complete::Shell::PowerShell,
            Shell::Elvish => clap_complete::Shell::Elvish,
        }
    }
}
