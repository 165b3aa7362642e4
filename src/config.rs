//! Configuration management for sitecheck.
//!
//! Settings come from three layers, lowest precedence first: a JSON
//! configuration file (the operator's subnet and CDN lists live here),
//! `SITECHECK_*` environment variables, and command-line arguments.
//!
//! The pipeline only ever reads an immutable [`ConfigSnapshot`] taken at the
//! start of a run; nothing in the core mutates configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Read-only snapshot of the operator-configured subnet and CDN lists.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigSnapshot {
    /// CIDR strings (`"A.B.C.D/N"`), in configured order. Syntax is not
    /// validated here; malformed entries are skipped at match time.
    #[serde(default)]
    pub subnets: Vec<String>,

    /// CDN organization name fragments, in configured order.
    #[serde(default)]
    pub cdn_organizations: Vec<String>,
}

/// Timeouts for the two outbound network operations.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Timeout for one DNS lookup.
    pub dns_timeout: Duration,

    /// Timeout for one IP-metadata HTTP lookup.
    pub lookup_timeout: Duration,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            dns_timeout: Duration::from_secs(5),
            lookup_timeout: Duration::from_secs(8),
        }
    }
}

/// Tuning for the batch orchestrator.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Global cap on concurrently running classification tasks.
    pub concurrency: usize,

    /// Records per batch.
    pub batch_size: usize,

    /// Budget for one record's whole check; expiry yields `Timeout`.
    pub item_timeout: Duration,

    /// Budget for one batch; unfinished records are dropped on expiry.
    pub batch_timeout: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: 20,
            batch_size: 50,
            item_timeout: Duration::from_secs(30),
            batch_timeout: Duration::from_secs(5 * 60),
        }
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub snapshot: ConfigSnapshot,
    pub network: NetworkConfig,
    pub pipeline: PipelineConfig,
}

/// On-disk shape of the configuration file. Durations are plain seconds so
/// the file stays hand-editable.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    subnets: Vec<String>,
    #[serde(default)]
    cdn_organizations: Vec<String>,
    dns_timeout_secs: Option<u64>,
    lookup_timeout_secs: Option<u64>,
    concurrency: Option<usize>,
    batch_size: Option<usize>,
    item_timeout_secs: Option<u64>,
    batch_timeout_secs: Option<u64>,
}

impl Config {
    /// Create a new configuration with default values and empty lists.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(&path).map_err(|e| ConfigError::FileRead {
            path: path.as_ref().to_string_lossy().to_string(),
            source: e,
        })?;
        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(content).map_err(|e| ConfigError::Parse {
            reason: e.to_string(),
        })?;

        let mut config = Self::default();
        config.snapshot.subnets = file.subnets;
        config.snapshot.cdn_organizations = file.cdn_organizations;
        if let Some(secs) = file.dns_timeout_secs {
            config.network.dns_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.lookup_timeout_secs {
            config.network.lookup_timeout = Duration::from_secs(secs);
        }
        if let Some(c) = file.concurrency {
            config.pipeline.concurrency = c;
        }
        if let Some(b) = file.batch_size {
            config.pipeline.batch_size = b;
        }
        if let Some(secs) = file.item_timeout_secs {
            config.pipeline.item_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = file.batch_timeout_secs {
            config.pipeline.batch_timeout = Duration::from_secs(secs);
        }
        Ok(config)
    }

    /// Apply environment variable overrides on top of the current values.
    pub fn apply_env(&mut self) {
        if let Ok(secs) = std::env::var("SITECHECK_DNS_TIMEOUT_SECS")
            && let Ok(secs) = secs.parse::<u64>()
        {
            self.network.dns_timeout = Duration::from_secs(secs);
        }
        if let Ok(secs) = std::env::var("SITECHECK_LOOKUP_TIMEOUT_SECS")
            && let Ok(secs) = secs.parse::<u64>()
        {
            self.network.lookup_timeout = Duration::from_secs(secs);
        }
        if let Ok(c) = std::env::var("SITECHECK_CONCURRENCY")
            && let Ok(c) = c.parse::<usize>()
        {
            self.pipeline.concurrency = c;
        }
        if let Ok(b) = std::env::var("SITECHECK_BATCH_SIZE")
            && let Ok(b) = b.parse::<usize>()
        {
            self.pipeline.batch_size = b;
        }
    }

    /// Merge with CLI arguments, giving CLI precedence.
    pub fn merge_with_cli(&mut self, cli: &crate::cli::Cli) {
        if let Some(c) = cli.concurrency {
            self.pipeline.concurrency = c;
        }
        if let Some(b) = cli.batch_size {
            self.pipeline.batch_size = b;
        }
        if let Some(secs) = cli.item_timeout {
            self.pipeline.item_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = cli.batch_timeout {
            self.pipeline.batch_timeout = Duration::from_secs(secs);
        }
        if cli.no_cdn {
            self.snapshot.cdn_organizations.clear();
        }
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.pipeline.concurrency == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.concurrency".to_string(),
                value: "0".to_string(),
                reason: "Concurrency limit must be at least 1".to_string(),
            });
        }
        if self.pipeline.batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.batch_size".to_string(),
                value: "0".to_string(),
                reason: "Batch size must be at least 1".to_string(),
            });
        }
        if self.network.dns_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "network.dns_timeout".to_string(),
                value: "0".to_string(),
                reason: "Timeout must be greater than 0".to_string(),
            });
        }
        if self.pipeline.item_timeout.is_zero() || self.pipeline.batch_timeout.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "pipeline timeouts".to_string(),
                value: "0".to_string(),
                reason: "Timeouts must be greater than 0".to_string(),
            });
        }
        Ok(())
    }
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {reason}")]
    Parse { reason: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}
