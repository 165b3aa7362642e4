//! Unified error handling for sitecheck.
//!
//! A `thiserror`-based model with:
//!   * Typed variants for the failure domains the pipeline actually has
//!   * A categorization layer (`ErrorCategory`) for reporting
//!   * Helper constructors
//!   * `From` conversions for common lower-level errors
//!
//! Almost everything that can go wrong during a run is degraded into a
//! classification outcome instead of an error (see the classifier and the
//! orchestrator). The variants here cover the remaining hard failures:
//! unreadable input, bad configuration, and resolver transport faults that
//! the classifier turns into `DNS Error`.

use std::io;

use thiserror::Error;

/// High-level classification for reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Input,
    Network,
    Internal,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ErrorCategory::Input => "input",
            ErrorCategory::Network => "network",
            ErrorCategory::Internal => "internal",
        };
        f.write_str(s)
    }
}

/// Primary application error type.
#[derive(Error, Debug)]
pub enum SiteCheckError {
    // ------------------------ Input / Validation ----------------------------
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // ----------------------------- Network ----------------------------------
    #[error("DNS resolution failed for {host}: {reason}")]
    DnsResolution { host: String, reason: String },

    #[error("IP metadata lookup failed for {ip}: {reason}")]
    MetadataLookup { ip: String, reason: String },

    // ----------------------------- I/O / FS ---------------------------------
    #[error("I/O error during {operation} on {path}: {source}")]
    Io {
        path: String,
        operation: String,
        #[source]
        source: io::Error,
    },

    // ---------------------------- Internal ----------------------------------
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl SiteCheckError {
    /// Categorize the error for reporting.
    pub fn category(&self) -> ErrorCategory {
        use SiteCheckError::*;
        match self {
            Configuration { .. } => ErrorCategory::Input,
            DnsResolution { .. } | MetadataLookup { .. } => ErrorCategory::Network,
            Io { .. } | Internal { .. } => ErrorCategory::Internal,
        }
    }

    // ---------------------------- Constructors -----------------------------

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn dns_resolution(host: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::DnsResolution {
            host: host.into(),
            reason: reason.into(),
        }
    }

    pub fn metadata_lookup(ip: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MetadataLookup {
            ip: ip.into(),
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<String>, operation: impl Into<String>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn internal_with(
        message: impl Into<String>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }
}

/// Public result alias.
pub type Result<T> = std::result::Result<T, SiteCheckError>;

/// Map standard IO errors into `Io` variant (generic context).
impl From<io::Error> for SiteCheckError {
    fn from(e: io::Error) -> Self {
        SiteCheckError::Io {
            path: "<unknown>".into(),
            operation: "unspecified".into(),
            source: e,
        }
    }
}

/// Extension trait for enriching IO results with path + operation context.
pub trait IoResultExt<T> {
    fn with_path(self, path: impl Into<String>, operation: impl Into<String>) -> Result<T>;
}

impl<T> IoResultExt<T> for std::result::Result<T, io::Error> {
    fn with_path(self, path: impl Into<String>, operation: impl Into<String>) -> Result<T> {
        self.map_err(|e| SiteCheckError::io(path.into(), operation.into(), e))
    }
}
