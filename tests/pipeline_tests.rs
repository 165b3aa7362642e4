//! Integration tests for the classification pipeline.
//!
//! These tests drive the full orchestrator through stub DNS and IP-metadata
//! capabilities, so they are deterministic and never touch the network. They
//! cover the classification priority rules, the admission limit, both timeout
//! levels, result ordering, and idempotence.

use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use sitecheck::cdn::{OrgLookup, OrgLookupOutcome};
use sitecheck::classifier::StatusClassifier;
use sitecheck::config::{ConfigSnapshot, NetworkConfig, PipelineConfig};
use sitecheck::errors::Result;
use sitecheck::pipeline::Pipeline;
use sitecheck::record::DomainStatus;
use sitecheck::resolver::DnsCapability;

/// Deterministic DNS stub: a host map, an optional artificial delay, and a
/// gauge tracking the highest number of concurrently in-flight lookups.
struct StubDns {
    hosts: HashMap<String, Vec<Ipv4Addr>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl StubDns {
    fn new(hosts: &[(&str, &[&str])]) -> Self {
        let hosts = hosts
            .iter()
            .map(|(host, ips)| {
                (
                    host.to_string(),
                    ips.iter().map(|ip| ip.parse().unwrap()).collect(),
                )
            })
            .collect();
        Self {
            hosts,
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn max_observed(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DnsCapability for StubDns {
    async fn resolve_ipv4(&self, host: &str, _timeout: Duration) -> Result<Vec<Ipv4Addr>> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = self.hosts.get(host).cloned().unwrap_or_default();
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(result)
    }

    async fn resolve_nameservers(&self, _host: &str) -> Vec<String> {
        vec!["ns1.example.net".to_string()]
    }
}

/// Metadata stub mapping addresses to organization strings.
struct StubOrg {
    orgs: HashMap<Ipv4Addr, String>,
}

impl StubOrg {
    fn new(orgs: &[(&str, &str)]) -> Self {
        Self {
            orgs: orgs
                .iter()
                .map(|(ip, org)| (ip.parse().unwrap(), org.to_string()))
                .collect(),
        }
    }

    fn empty() -> Self {
        Self::new(&[])
    }
}

#[async_trait]
impl OrgLookup for StubOrg {
    async fn lookup_organization(&self, ip: Ipv4Addr, _timeout: Duration) -> OrgLookupOutcome {
        match self.orgs.get(&ip) {
            Some(org) => OrgLookupOutcome {
                success: true,
                organization: Some(org.clone()),
            },
            None => OrgLookupOutcome::default(),
        }
    }
}

fn snapshot() -> ConfigSnapshot {
    ConfigSnapshot {
        subnets: vec!["192.168.40.0/24".to_string()],
        cdn_organizations: vec!["Cloudflare".to_string(), "Akamai".to_string()],
    }
}

fn pipeline_with(dns: StubDns, org: StubOrg, settings: PipelineConfig) -> Pipeline {
    let classifier = StatusClassifier::new(
        Arc::new(dns),
        Arc::new(org),
        snapshot(),
        &NetworkConfig::default(),
    );
    Pipeline::new(classifier, settings)
}

fn status_of<'a>(report: &'a sitecheck::PipelineReport, name: &str) -> &'a DomainStatus {
    report
        .records
        .iter()
        .find(|r| r.name == name)
        .unwrap_or_else(|| panic!("record {name} missing from report"))
        .domain_status
        .as_ref()
        .unwrap()
}

#[tokio::test]
async fn classifies_whole_listing_with_priority_rules() {
    let listing = b"Site Name        Status    IP          Port   Host\n\
                    ====================================================\n\
                    Own Portal STARTED 192.168.40.10 443 portal.example.com\n\
                    Cdn Shop STARTED 10.9.9.9 443 shop.example.com\n\
                    External Blog STARTED 10.9.9.8 80 blog.example.com\n\
                    Gone Site STARTED 10.9.9.7 80 gone.example.com\n\
                    Paused Site STOPPED 10.0.0.5\n\
                    Hostless STARTED 10.0.0.6 80 N/A\n" as &[u8];

    let dns = StubDns::new(&[
        ("portal.example.com", ["192.168.40.10"].as_slice()),
        ("shop.example.com", ["104.16.1.1"].as_slice()),
        ("blog.example.com", ["8.8.8.8"].as_slice()),
        // gone.example.com absent -> empty resolution
    ]);
    let org = StubOrg::new(&[
        ("104.16.1.1", "Cloudflare, Inc."),
        ("8.8.8.8", "Google LLC"),
    ]);
    let pipeline = pipeline_with(dns, org, PipelineConfig::default());

    let report = pipeline.run(listing).await.unwrap();
    assert_eq!(report.parsed, 6);
    assert_eq!(report.skipped, 0);
    assert_eq!(report.records.len(), 6);

    assert_eq!(status_of(&report, "Own Portal"), &DomainStatus::Alive);
    assert_eq!(
        status_of(&report, "Cdn Shop"),
        &DomainStatus::CdnProtected("Cloudflare".to_string())
    );
    assert_eq!(
        status_of(&report, "External Blog"),
        &DomainStatus::ResolvesElsewhere
    );
    assert_eq!(status_of(&report, "Gone Site"), &DomainStatus::NotFound);
    assert_eq!(status_of(&report, "Paused Site"), &DomainStatus::NotApplicable);
    assert_eq!(status_of(&report, "Hostless"), &DomainStatus::NotApplicable);

    // STARTED block first, names ordinal within each block.
    let names: Vec<&str> = report.records.iter().map(|r| r.name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Cdn Shop",
            "External Blog",
            "Gone Site",
            "Hostless",
            "Own Portal",
            "Paused Site",
        ]
    );
}

#[tokio::test]
async fn subnet_match_wins_even_when_cdn_would_match() {
    let listing = b"Both STARTED 10.0.0.1 443 both.example.com\n" as &[u8];
    let dns = StubDns::new(&[("both.example.com", ["192.168.40.77"].as_slice())]);
    // The same address is also labeled as a CDN org; subnet check runs first.
    let org = StubOrg::new(&[("192.168.40.77", "Cloudflare, Inc.")]);
    let pipeline = pipeline_with(dns, org, PipelineConfig::default());

    let report = pipeline.run(listing).await.unwrap();
    assert_eq!(status_of(&report, "Both"), &DomainStatus::Alive);
}

#[tokio::test]
async fn concurrency_never_exceeds_the_admission_limit() {
    let mut listing = String::new();
    let mut hosts: Vec<(String, Vec<&str>)> = Vec::new();
    for i in 0..60 {
        listing.push_str(&format!("Site{i:02} STARTED 10.0.0.{i} 80 host{i}.example.com\n"));
        hosts.push((format!("host{i}.example.com"), vec!["8.8.8.8"]));
    }
    let host_refs: Vec<(&str, &[&str])> = hosts
        .iter()
        .map(|(h, ips)| (h.as_str(), ips.as_slice()))
        .collect();

    let dns = Arc::new(StubDns::new(&host_refs).with_delay(Duration::from_millis(20)));
    let classifier = StatusClassifier::new(
        dns.clone(),
        Arc::new(StubOrg::empty()),
        snapshot(),
        &NetworkConfig::default(),
    );
    let settings = PipelineConfig {
        concurrency: 5,
        batch_size: 15,
        ..PipelineConfig::default()
    };
    let pipeline = Pipeline::new(classifier, settings);

    let report = pipeline.run(listing.as_bytes()).await.unwrap();
    assert_eq!(report.records.len(), 60);
    assert!(
        dns.max_observed() <= 5,
        "observed {} concurrent lookups, limit was 5",
        dns.max_observed()
    );
}

#[tokio::test]
async fn item_timeout_becomes_timeout_status() {
    let listing = b"Slow STARTED 10.0.0.1 80 slow.example.com\n\
                    Fast STOPPED 10.0.0.2\n" as &[u8];
    let dns = StubDns::new(&[("slow.example.com", ["8.8.8.8"].as_slice())])
        .with_delay(Duration::from_millis(200));
    let settings = PipelineConfig {
        item_timeout: Duration::from_millis(20),
        ..PipelineConfig::default()
    };
    let pipeline = pipeline_with(dns, StubOrg::empty(), settings);

    let report = pipeline.run(listing).await.unwrap();
    assert_eq!(status_of(&report, "Slow"), &DomainStatus::Timeout);
    assert_eq!(status_of(&report, "Fast"), &DomainStatus::NotApplicable);
    assert_eq!(report.skipped, 0);
}

#[tokio::test]
async fn batch_deadline_drops_unfinished_records_and_moves_on() {
    // Batch 1 holds the two slow records, batch 2 a fast one. The batch
    // deadline abandons batch 1; batch 2 must still be processed.
    let listing = b"Slow One STARTED 10.0.0.1 80 slow.example.com\n\
                    Slow Two STARTED 10.0.0.2 80 slow.example.com\n\
                    Quick STOPPED 10.0.0.3\n" as &[u8];
    let dns = StubDns::new(&[("slow.example.com", ["8.8.8.8"].as_slice())])
        .with_delay(Duration::from_secs(5));
    let settings = PipelineConfig {
        batch_size: 2,
        item_timeout: Duration::from_secs(30),
        batch_timeout: Duration::from_millis(50),
        ..PipelineConfig::default()
    };
    let pipeline = pipeline_with(dns, StubOrg::empty(), settings);

    let report = pipeline.run(listing).await.unwrap();
    assert_eq!(report.parsed, 3);
    assert_eq!(report.skipped, 2);
    assert_eq!(report.records.len(), 1);
    assert_eq!(status_of(&report, "Quick"), &DomainStatus::NotApplicable);
}

#[tokio::test]
async fn rerunning_the_same_input_is_idempotent() {
    let listing: &[u8] = b"B Site STARTED 10.0.0.1 80 b.example.com\n\
                           A Site STARTED 10.0.0.2 80 a.example.com\n\
                           C Site STOPPED 10.0.0.3\n";
    let make_pipeline = || {
        pipeline_with(
            StubDns::new(&[
                ("a.example.com", ["192.168.40.1"].as_slice()),
                ("b.example.com", ["8.8.8.8"].as_slice()),
            ]),
            StubOrg::empty(),
            PipelineConfig {
                concurrency: 2,
                batch_size: 2,
                ..PipelineConfig::default()
            },
        )
    };

    let first = make_pipeline().run(listing).await.unwrap();
    let second = make_pipeline().run(listing).await.unwrap();
    assert_eq!(first.records, second.records);
    assert_eq!(first.skipped, second.skipped);
}

#[tokio::test]
async fn unreadable_stream_is_a_hard_failure() {
    struct BrokenReader;
    impl tokio::io::AsyncRead for BrokenReader {
        fn poll_read(
            self: std::pin::Pin<&mut Self>,
            _cx: &mut std::task::Context<'_>,
            _buf: &mut tokio::io::ReadBuf<'_>,
        ) -> std::task::Poll<std::io::Result<()>> {
            std::task::Poll::Ready(Err(std::io::Error::other("stream gone")))
        }
    }

    let pipeline = pipeline_with(
        StubDns::new(&[]),
        StubOrg::empty(),
        PipelineConfig::default(),
    );
    let result = pipeline.run(tokio::io::BufReader::new(BrokenReader)).await;
    assert!(result.is_err());
}
