//! Status classification state machine.
//!
//! One record in, one terminal [`DomainStatus`] out, evaluated in strict
//! priority order:
//!
//! 1. `Not Found` — resolution produced no IPv4 addresses (incl. DNS timeout)
//! 2. `Alive` — any resolved address sits in a configured subnet
//! 3. `CDN Protected (<name>)` — a resolved address belongs to a known CDN
//! 4. `Resolves Elsewhere` — resolution succeeded, nothing matched
//! 5. `DNS Error` — unexpected resolver failure
//!
//! The subnet pass over all addresses runs before any metadata lookup, so a
//! site on operator infrastructure is `Alive` no matter what the CDN list
//! says. `Timeout` (per-record budget) is imposed by the orchestrator, not
//! here.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info};

use crate::cdn::{self, OrgLookup};
use crate::config::{ConfigSnapshot, NetworkConfig};
use crate::record::{DomainStatus, Record};
use crate::resolver::DnsCapability;
use crate::subnet;

/// Composes the resolver, subnet matcher, and CDN classifier into one
/// decision per record. Cheap to clone; shared by all classification tasks
/// of a run.
#[derive(Clone)]
pub struct StatusClassifier {
    resolver: Arc<dyn DnsCapability>,
    org_lookup: Arc<dyn OrgLookup>,
    snapshot: Arc<ConfigSnapshot>,
    dns_timeout: Duration,
    lookup_timeout: Duration,
}

impl StatusClassifier {
    pub fn new(
        resolver: Arc<dyn DnsCapability>,
        org_lookup: Arc<dyn OrgLookup>,
        snapshot: ConfigSnapshot,
        network: &NetworkConfig,
    ) -> Self {
        Self {
            resolver,
            org_lookup,
            snapshot: Arc::new(snapshot),
            dns_timeout: network.dns_timeout,
            lookup_timeout: network.lookup_timeout,
        }
    }

    /// Classify one record. Non-STARTED or host-less records come back as
    /// `N/A` without touching the network.
    pub async fn classify(&self, record: &Record) -> DomainStatus {
        match record.host.as_deref() {
            Some(host) if record.is_checkable() => self.classify_host(host).await,
            _ => DomainStatus::NotApplicable,
        }
    }

    /// Run the state machine for a hostname.
    pub async fn classify_host(&self, host: &str) -> DomainStatus {
        let addresses = match self.resolver.resolve_ipv4(host, self.dns_timeout).await {
            Ok(addresses) => addresses,
            Err(e) => {
                info!(host, error = %e, "unexpected resolver failure");
                return DomainStatus::DnsError;
            }
        };

        if addresses.is_empty() {
            return DomainStatus::NotFound;
        }
        debug!(host, ?addresses, "resolved");

        for ip in &addresses {
            if let Some(matched) = subnet::matching_subnet(*ip, &self.snapshot.subnets) {
                debug!(host, %ip, subnet = matched, "address in configured subnet");
                return DomainStatus::Alive;
            }
        }

        for ip in &addresses {
            if let Some(name) = cdn::classify_ip(
                self.org_lookup.as_ref(),
                *ip,
                &self.snapshot.cdn_organizations,
                self.lookup_timeout,
            )
            .await
            {
                debug!(host, %ip, cdn = %name, "CDN detected");
                return DomainStatus::CdnProtected(name);
            }
        }

        DomainStatus::ResolvesElsewhere
    }
}
