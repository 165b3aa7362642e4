//! Sitecheck Library
//!
//! Classifies a bulk export of hosted-site records by probing DNS and light
//! network metadata: for each `STARTED` site with a real hostname it decides
//! whether traffic lands on operator-controlled subnets, on a known CDN, or
//! elsewhere. This library provides:
//!
//! - A whitespace-token parser for the bulk listing format
//! - IPv4 CIDR subnet membership tests
//! - A timeout-bounded DNS resolution boundary
//! - CDN detection via IP network-organization metadata
//! - A concurrency-bounded batch orchestrator with per-item and per-batch
//!   deadlines, and deterministic result ordering
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use sitecheck::classifier::StatusClassifier;
//! use sitecheck::cdn::IpApiClient;
//! use sitecheck::config::Config;
//! use sitecheck::pipeline::Pipeline;
//! use sitecheck::resolver::SystemResolver;
//!
//! # #[tokio::main]
//! # async fn main() -> sitecheck::Result<()> {
//! let config = Config::from_file("sitecheck.json")
//!     .map_err(|e| sitecheck::SiteCheckError::configuration(e.to_string()))?;
//! let classifier = StatusClassifier::new(
//!     Arc::new(SystemResolver::new()),
//!     Arc::new(IpApiClient::new()),
//!     config.snapshot.clone(),
//!     &config.network,
//! );
//! let pipeline = Pipeline::new(classifier, config.pipeline.clone());
//!
//! let file = tokio::fs::File::open("listing.txt").await?;
//! let report = pipeline.run(tokio::io::BufReader::new(file)).await?;
//! println!("{} classified, {} skipped", report.records.len(), report.skipped);
//! # Ok(())
//! # }
//! ```

pub mod cdn;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod errors;
pub mod output;
pub mod pipeline;
pub mod record;
pub mod resolver;
pub mod subnet;

// Re-export commonly used types for convenience
pub use classifier::StatusClassifier;
pub use config::{Config, ConfigSnapshot};
pub use errors::{Result, SiteCheckError};
pub use pipeline::{Pipeline, PipelineReport, sort_records};
pub use record::{DomainStatus, LifecycleStatus, Record};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
