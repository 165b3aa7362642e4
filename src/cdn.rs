//! CDN classification via IP network-organization metadata.
//!
//! An address that resolves outside the operator's own subnets may still sit
//! in front of the real origin: ip-api.com reports the organization that owns
//! the address's network, and a case-insensitive substring match against the
//! configured CDN names decides whether the site is CDN-fronted.
//!
//! Every lookup failure (network error, non-success status, malformed body)
//! degrades to "no match". CDN detection is an enrichment, never a reason to
//! fail a record.

use std::net::Ipv4Addr;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Outcome of one IP-metadata query.
#[derive(Debug, Clone, Default)]
pub struct OrgLookupOutcome {
    pub success: bool,
    pub organization: Option<String>,
}

/// IP metadata capability consumed by the classifier.
#[async_trait]
pub trait OrgLookup: Send + Sync {
    /// Query the network-organization string for `ip`, bounded by `timeout`.
    /// Never errors; failures come back as `success == false`.
    async fn lookup_organization(&self, ip: Ipv4Addr, timeout: Duration) -> OrgLookupOutcome;
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    org: Option<String>,
}

/// ip-api.com client. Free tier, HTTP only, `org`+`status` fields.
pub struct IpApiClient {
    client: Client,
    base_url: String,
}

impl IpApiClient {
    pub fn new() -> Self {
        Self::with_base_url("http://ip-api.com")
    }

    /// Point the client at a different endpoint; used by tests.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let client = Client::builder()
            .user_agent(concat!("sitecheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
        }
    }
}

impl Default for IpApiClient {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OrgLookup for IpApiClient {
    async fn lookup_organization(&self, ip: Ipv4Addr, timeout: Duration) -> OrgLookupOutcome {
        let url = format!("{}/json/{}?fields=org,status", self.base_url, ip);
        let response = self.client.get(&url).timeout(timeout).send().await;
        let body = match response {
            Ok(r) => r.json::<IpApiResponse>().await,
            Err(e) => {
                debug!(%ip, error = %e, "IP metadata request failed");
                return OrgLookupOutcome::default();
            }
        };
        match body {
            Ok(parsed) if parsed.status == "success" => OrgLookupOutcome {
                success: true,
                organization: parsed.org.filter(|o| !o.is_empty()),
            },
            Ok(parsed) => {
                debug!(%ip, status = %parsed.status, "IP metadata lookup unsuccessful");
                OrgLookupOutcome::default()
            }
            Err(e) => {
                debug!(%ip, error = %e, "IP metadata response malformed");
                OrgLookupOutcome::default()
            }
        }
    }
}

/// Match an organization string against the configured CDN names, in list
/// order, case-insensitively on substrings. Returns the configured name of
/// the first match.
pub fn match_cdn_organization<'a>(organization: &str, cdn_names: &'a [String]) -> Option<&'a str> {
    let org_lower = organization.to_lowercase();
    cdn_names
        .iter()
        .map(String::as_str)
        .find(|cdn| !cdn.is_empty() && org_lower.contains(&cdn.to_lowercase()))
}

/// Full CDN classification of a single address: metadata lookup plus name
/// matching. Returns the configured CDN name on a hit.
pub async fn classify_ip(
    lookup: &dyn OrgLookup,
    ip: Ipv4Addr,
    cdn_names: &[String],
    timeout: Duration,
) -> Option<String> {
    let outcome = lookup.lookup_organization(ip, timeout).await;
    if !outcome.success {
        return None;
    }
    let org = outcome.organization?;
    match_cdn_organization(&org, cdn_names).map(|name| name.to_string())
}
