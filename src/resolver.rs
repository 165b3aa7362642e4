//! DNS resolution boundary.
//!
//! The classifier only needs two things from DNS: "which IPv4 addresses does
//! this host have" and, for optional enrichment, "which nameservers serve
//! it". Both sit behind the [`DnsCapability`] trait so the pipeline can be
//! driven with deterministic stubs in tests.
//!
//! Transient conditions (NXDOMAIN, empty answer, DNS-level timeout) are
//! absorbed into an empty address list at this boundary. Only transport-level
//! resolver faults surface as errors, which the classifier turns into the
//! `DNS Error` outcome.

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::timeout;
use tracing::{debug, warn};
use trust_dns_resolver::{
    TokioAsyncResolver,
    config::{ResolverConfig, ResolverOpts},
    error::ResolveErrorKind,
};

use crate::errors::{Result, SiteCheckError};

/// DNS capability consumed by the classifier and the enrichment pass.
#[async_trait]
pub trait DnsCapability: Send + Sync {
    /// Resolve the IPv4 addresses of `host`, bounded by `timeout`.
    ///
    /// Returns an empty list when the name does not exist, has no A records,
    /// or the lookup timed out. Errors are reserved for unexpected resolver
    /// failures.
    async fn resolve_ipv4(&self, host: &str, timeout: Duration) -> Result<Vec<Ipv4Addr>>;

    /// Resolve the NS records of `host`. Soft-fails to an empty list; this is
    /// enrichment data, never worth failing a run over.
    async fn resolve_nameservers(&self, host: &str) -> Vec<String>;
}

/// System resolver backed by trust-dns with the platform defaults.
pub struct SystemResolver {
    resolver: TokioAsyncResolver,
}

impl SystemResolver {
    pub fn new() -> Self {
        Self {
            resolver: TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()),
        }
    }
}

impl Default for SystemResolver {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DnsCapability for SystemResolver {
    async fn resolve_ipv4(&self, host: &str, budget: Duration) -> Result<Vec<Ipv4Addr>> {
        match timeout(budget, self.resolver.ipv4_lookup(host)).await {
            Ok(Ok(lookup)) => {
                let addrs: Vec<Ipv4Addr> = lookup.iter().map(|a| a.0).collect();
                debug!(host, count = addrs.len(), "resolved IPv4 addresses");
                Ok(addrs)
            }
            Ok(Err(e)) => match e.kind() {
                ResolveErrorKind::NoRecordsFound { .. } | ResolveErrorKind::Timeout => {
                    debug!(host, "no IPv4 addresses found");
                    Ok(Vec::new())
                }
                _ => Err(SiteCheckError::dns_resolution(host, e.to_string())),
            },
            Err(_) => {
                warn!(host, "DNS lookup timed out");
                Ok(Vec::new())
            }
        }
    }

    async fn resolve_nameservers(&self, host: &str) -> Vec<String> {
        match self.resolver.ns_lookup(host).await {
            Ok(lookup) => {
                let mut seen = Vec::new();
                for ns in lookup.iter() {
                    let name = ns.0.to_utf8();
                    let name = name.trim_end_matches('.').to_string();
                    if !seen.contains(&name) {
                        seen.push(name);
                    }
                }
                seen
            }
            Err(e) => {
                debug!(host, error = %e, "NS lookup failed");
                Vec::new()
            }
        }
    }
}
