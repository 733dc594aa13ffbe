//! CLI argument definitions using clap.

use std::path::PathBuf;

use airhub_types::ReadingType;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Output format for commands
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
    Csv,
}

/// File format for export and import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

#[derive(Parser)]
#[command(name = "airhub")]
#[command(author, version, about = "Local history store for airhub air quality sensors", long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Configuration file (defaults to the platform config directory)
    #[arg(long, global = true, env = "AIRHUB_CONFIG")]
    pub config: Option<PathBuf>,

    /// Database file, overriding the configured path
    #[arg(long, global = true, env = "AIRHUB_DATABASE")]
    pub database: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Device, room and time window filters
#[derive(Debug, Clone, Default, Args)]
pub struct ScopeArgs {
    /// Only readings from this device
    #[arg(short, long)]
    pub device: Option<String>,

    /// Only readings from this room
    #[arg(short, long)]
    pub room: Option<String>,

    /// Start time (RFC3339 or YYYY-MM-DD), inclusive
    #[arg(long)]
    pub since: Option<String>,

    /// End time (RFC3339 or YYYY-MM-DD), inclusive
    #[arg(long)]
    pub until: Option<String>,
}

/// Reusable reading filter arguments
#[derive(Debug, Clone, Default, Args)]
pub struct FilterArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Only these reading types (repeatable or comma-separated)
    #[arg(short = 't', long = "type", value_delimiter = ',')]
    pub types: Vec<ReadingType>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Store device snapshots read as JSON from a file or stdin
    Ingest {
        /// Input file (reads stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Store a single reading
    Put {
        /// Device identifier
        #[arg(short, long)]
        device: String,

        /// Device display name (defaults to the identifier)
        #[arg(short, long)]
        name: Option<String>,

        /// Room the device is in
        #[arg(short, long)]
        room: Option<String>,

        /// Reading type
        #[arg(short = 't', long = "type")]
        reading_type: ReadingType,

        /// Measured value
        #[arg(long, allow_negative_numbers = true)]
        value: f64,

        /// Measurement time (RFC3339 or YYYY-MM-DD, defaults to now)
        #[arg(long)]
        at: Option<String>,
    },

    /// Query stored readings, newest first
    Query {
        #[command(flatten)]
        filter: FilterArgs,

        /// Maximum number of readings
        #[arg(short = 'n', long)]
        limit: Option<u32>,

        /// Readings to skip before the first one returned
        #[arg(long)]
        offset: Option<u32>,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show the most recent reading of one type from a device
    Latest {
        /// Device identifier
        #[arg(short, long)]
        device: String,

        /// Reading type
        #[arg(short = 't', long = "type")]
        reading_type: ReadingType,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Aggregate statistics for one reading type
    Stats {
        /// Reading type to aggregate
        #[arg(short = 't', long = "type")]
        reading_type: ReadingType,

        #[command(flatten)]
        scope: ScopeArgs,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// List devices with stored readings
    Devices {
        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,
    },

    /// Show database location and totals
    Info,

    /// Delete readings older than the retention window
    Sweep {
        /// Skip the sweep if the last one ran within the configured interval
        #[arg(long)]
        if_due: bool,
    },

    /// Delete a single reading by id
    Delete {
        /// Record id
        id: i64,
    },

    /// Delete every stored reading
    Clear {
        /// Confirm deletion
        #[arg(long)]
        yes: bool,
    },

    /// Export readings to CSV or JSON
    Export {
        #[command(flatten)]
        filter: FilterArgs,

        /// Export format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: ExportFormat,

        /// Output file (writes stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write a configuration file with default settings
    InitConfig {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Import readings from CSV or JSON
    Import {
        /// Import format
        #[arg(short, long, value_enum, default_value = "csv")]
        format: ExportFormat,

        /// Input file (reads stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },
}
