use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line interface definition.
///
/// Verbosity levels:
/// 0 - errors only
/// 1 - warnings + progress (default)
/// 2 - per-record detail
/// 5 - trace/debug
#[derive(Parser, Debug, Clone)]
#[command(
    author,
    version,
    about = "Classify a bulk hosted-site listing by where each site's DNS lands: own subnets, known CDNs, or elsewhere"
)]
pub struct Cli {
    /// Path to the bulk-export listing file.
    pub input: PathBuf,

    /// Path to the JSON configuration file (subnets and CDN organizations).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Verbosity level (0,1,2,5)
    #[arg(long, default_value_t = 1)]
    pub verbose: u8,

    /// Maximum concurrent classification checks
    #[arg(long, value_name = "N")]
    pub concurrency: Option<usize>,

    /// Records per processing batch
    #[arg(long = "batch-size", value_name = "N")]
    pub batch_size: Option<usize>,

    /// Per-record time budget in seconds
    #[arg(long = "item-timeout", value_name = "SECS")]
    pub item_timeout: Option<u64>,

    /// Per-batch time budget in seconds
    #[arg(long = "batch-timeout", value_name = "SECS")]
    pub batch_timeout: Option<u64>,

    /// Skip CDN organization lookups entirely
    #[arg(long = "no-cdn", default_value_t = false)]
    pub no_cdn: bool,

    /// Also look up the nameservers of classified STARTED records
    #[arg(long, default_value_t = false)]
    pub nameservers: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    pub format: Format,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Text,
    Json,
}

impl Cli {
    /// Parse CLI arguments from process args.
    pub fn from_args() -> Self {
        Self::parse()
    }

    /// Map the numeric verbosity onto a tracing level filter.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::ERROR,
            1 => tracing::Level::WARN,
            2..=4 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        }
    }
}
