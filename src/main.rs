//! sitecheck - classify a bulk hosted-site listing by DNS reachability.

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::BufReader;
use tracing_subscriber::FmtSubscriber;

use sitecheck::cdn::IpApiClient;
use sitecheck::classifier::StatusClassifier;
use sitecheck::cli::{Cli, Format};
use sitecheck::config::Config;
use sitecheck::output;
use sitecheck::pipeline::Pipeline;
use sitecheck::resolver::{DnsCapability, SystemResolver};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::from_args();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(cli.log_level())
        .with_target(false)
        .without_time()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    // Configuration layers: file, then environment, then CLI.
    let mut config = match cli.config {
        Some(ref path) => Config::from_file(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => Config::new(),
    };
    config.apply_env();
    config.merge_with_cli(&cli);
    config.validate().context("invalid configuration")?;

    if config.snapshot.subnets.is_empty() {
        tracing::warn!("no subnets configured; no record can classify as Alive");
    }

    let resolver = Arc::new(SystemResolver::new());
    let classifier = StatusClassifier::new(
        resolver.clone(),
        Arc::new(IpApiClient::new()),
        config.snapshot.clone(),
        &config.network,
    );
    let pipeline = Pipeline::new(classifier, config.pipeline.clone());

    let file = tokio::fs::File::open(&cli.input)
        .await
        .with_context(|| format!("opening listing file {}", cli.input.display()))?;
    let mut report = pipeline.run(BufReader::new(file)).await?;

    if cli.nameservers {
        enrich_nameservers(resolver.as_ref(), &mut report.records).await;
    }

    match cli.format {
        Format::Text => print!("{}", output::format_text(&report)),
        Format::Json => println!("{}", output::format_json(&report)?),
    }

    if report.skipped > 0 {
        tracing::warn!(
            skipped = report.skipped,
            "some records were dropped by a batch deadline; results are partial"
        );
    }

    Ok(())
}

/// Optional enrichment pass, outside the classification path: look up the
/// nameservers of every STARTED record that has a real hostname.
async fn enrich_nameservers(resolver: &dyn DnsCapability, records: &mut [sitecheck::Record]) {
    for record in records {
        if !record.is_checkable() {
            continue;
        }
        if let Some(host) = record.host.clone() {
            record.nameservers = resolver.resolve_nameservers(&host).await;
        }
    }
}
