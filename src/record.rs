//! Site record model and bulk-listing line parser.
//!
//! One line of the bulk export describes one hosted site:
//!
//! ```text
//! Example Site STARTED 10.0.0.5 8080 example.com
//! ```
//!
//! The display name may span several whitespace-separated tokens; the first
//! token that case-insensitively equals `STARTED` or `STOPPED` terminates it.
//! Everything after the lifecycle token is positional: raw IP, optional
//! numeric port, hostname. Trailing tokens are ignored.

use serde::Serialize;

/// Sentinel hostname meaning "no real host behind this record".
pub const HOST_SENTINEL: &str = "N/A";

/// Operational state of a site entry, independent of network reachability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LifecycleStatus {
    Started,
    Stopped,
}

impl LifecycleStatus {
    /// Parse a single token, case-insensitively.
    pub fn from_token(token: &str) -> Option<Self> {
        if token.eq_ignore_ascii_case("STARTED") {
            Some(Self::Started)
        } else if token.eq_ignore_ascii_case("STOPPED") {
            Some(Self::Stopped)
        } else {
            None
        }
    }
}

impl std::fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleStatus::Started => f.write_str("STARTED"),
            LifecycleStatus::Stopped => f.write_str("STOPPED"),
        }
    }
}

/// Computed classification of where a site's DNS resolves to, relative to
/// the configured subnets and known CDN organizations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomainStatus {
    /// Record was not eligible for a check (not STARTED, or no real host).
    NotApplicable,
    /// At least one resolved address is inside a configured subnet.
    Alive,
    /// A resolved address belongs to the named CDN organization.
    CdnProtected(String),
    /// Resolution succeeded but no subnet or CDN matched.
    ResolvesElsewhere,
    /// Resolution produced no IPv4 addresses (including DNS-level timeout).
    NotFound,
    /// Resolution failed in an unexpected way.
    DnsError,
    /// The whole per-record check exceeded its time budget.
    Timeout,
}

impl std::fmt::Display for DomainStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DomainStatus::NotApplicable => f.write_str("N/A"),
            DomainStatus::Alive => f.write_str("Alive"),
            DomainStatus::CdnProtected(name) => write!(f, "CDN Protected ({name})"),
            DomainStatus::ResolvesElsewhere => f.write_str("Resolves Elsewhere"),
            DomainStatus::NotFound => f.write_str("Not Found"),
            DomainStatus::DnsError => f.write_str("DNS Error"),
            DomainStatus::Timeout => f.write_str("Timeout"),
        }
    }
}

impl Serialize for DomainStatus {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One parsed site entry with lifecycle and network fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub name: String,
    pub lifecycle: LifecycleStatus,
    pub ip: Option<String>,
    pub port: Option<u16>,
    pub host: Option<String>,
    /// Unset until the classifier has run.
    pub domain_status: Option<DomainStatus>,
    /// Populated only by explicit nameserver enrichment.
    pub nameservers: Vec<String>,
}

impl Record {
    /// Whether this record qualifies for a DNS reachability check: a STARTED
    /// site with a real hostname. Everything else is fixed to `N/A`.
    pub fn is_checkable(&self) -> bool {
        self.lifecycle == LifecycleStatus::Started
            && self
                .host
                .as_deref()
                .is_some_and(|h| !h.is_empty() && !h.eq_ignore_ascii_case(HOST_SENTINEL))
    }
}

/// Whether a raw line is a candidate record at all. Header lines (starting
/// with `Site Name`), separator rows (starting with `=`), and blank lines are
/// filtered here, before the parser ever sees them.
pub fn is_candidate_line(line: &str) -> bool {
    let trimmed = line.trim_start();
    !trimmed.is_empty()
        && !trimmed.starts_with('=')
        && !starts_with_ignore_case(trimmed, "Site Name")
}

fn starts_with_ignore_case(s: &str, prefix: &str) -> bool {
    s.get(..prefix.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(prefix))
}

/// Parse one candidate line into a [`Record`].
///
/// Returns `None` for unparseable lines: fewer than three tokens, no
/// lifecycle token, or an empty display name. The caller logs and drops
/// those; a bad line never fails the run.
pub fn parse_line(line: &str) -> Option<Record> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < 3 {
        return None;
    }

    let status_idx = tokens.iter().position(|t| LifecycleStatus::from_token(t).is_some())?;
    let name = tokens[..status_idx].join(" ").trim().to_string();
    if name.is_empty() {
        return None;
    }
    let lifecycle = LifecycleStatus::from_token(tokens[status_idx])?;

    let mut rest = tokens[status_idx + 1..].iter();
    let ip = rest.next().map(|t| t.to_string());

    // A numeric token here is the port; anything else is left unconsumed and
    // read as the host instead.
    let mut rest = rest.peekable();
    let port = match rest.peek().and_then(|t| t.parse::<u16>().ok()) {
        Some(p) => {
            rest.next();
            Some(p)
        }
        None => None,
    };
    let host = rest.next().map(|t| t.to_string());

    Some(Record {
        name,
        lifecycle,
        ip,
        port,
        host,
        domain_status: None,
        nameservers: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_record() {
        let rec = parse_line("Example Site STARTED 10.0.0.5 8080 example.com").unwrap();
        assert_eq!(rec.name, "Example Site");
        assert_eq!(rec.lifecycle, LifecycleStatus::Started);
        assert_eq!(rec.ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(rec.port, Some(8080));
        assert_eq!(rec.host.as_deref(), Some("example.com"));
        assert_eq!(rec.domain_status, None);
    }

    #[test]
    fn parses_stopped_record_without_port_or_host() {
        let rec = parse_line("Example Site STOPPED 10.0.0.5").unwrap();
        assert_eq!(rec.name, "Example Site");
        assert_eq!(rec.lifecycle, LifecycleStatus::Stopped);
        assert_eq!(rec.ip.as_deref(), Some("10.0.0.5"));
        assert_eq!(rec.port, None);
        assert_eq!(rec.host, None);
        assert!(!rec.is_checkable());
    }

    #[test]
    fn non_numeric_port_token_becomes_host() {
        let rec = parse_line("Site STARTED 10.0.0.5 example.com").unwrap();
        assert_eq!(rec.port, None);
        assert_eq!(rec.host.as_deref(), Some("example.com"));
    }

    #[test]
    fn lifecycle_token_is_case_insensitive() {
        let rec = parse_line("My Site started 10.0.0.5 443 my.example.net").unwrap();
        assert_eq!(rec.lifecycle, LifecycleStatus::Started);
        assert_eq!(rec.port, Some(443));
    }

    #[test]
    fn multi_token_names_are_joined() {
        let rec = parse_line("Alpha Beta Gamma STARTED 10.1.2.3 80 abg.example.com").unwrap();
        assert_eq!(rec.name, "Alpha Beta Gamma");
    }

    #[test]
    fn trailing_tokens_are_ignored() {
        let rec = parse_line("Site STARTED 10.0.0.5 80 a.example.com extra junk").unwrap();
        assert_eq!(rec.host.as_deref(), Some("a.example.com"));
    }

    #[test]
    fn rejects_short_and_statusless_lines() {
        assert!(parse_line("Site STARTED").is_none());
        assert!(parse_line("Just Some Words Here").is_none());
        assert!(parse_line("STARTED 10.0.0.5 80").is_none()); // empty name
    }

    #[test]
    fn sentinel_host_is_not_checkable() {
        let rec = parse_line("Site STARTED 10.0.0.5 80 N/A").unwrap();
        assert!(!rec.is_checkable());
        let rec = parse_line("Site STARTED 10.0.0.5 80 n/a").unwrap();
        assert!(!rec.is_checkable());
    }

    #[test]
    fn line_filter_skips_headers_separators_and_blanks() {
        assert!(!is_candidate_line(""));
        assert!(!is_candidate_line("   \t "));
        assert!(!is_candidate_line("=========================="));
        assert!(!is_candidate_line("Site Name    Status    IP"));
        assert!(!is_candidate_line("SITE NAME    Status    IP"));
        assert!(is_candidate_line("Example Site STARTED 10.0.0.5"));
    }

    #[test]
    fn status_display_strings() {
        assert_eq!(DomainStatus::NotApplicable.to_string(), "N/A");
        assert_eq!(
            DomainStatus::CdnProtected("Cloudflare".into()).to_string(),
            "CDN Protected (Cloudflare)"
        );
        assert_eq!(DomainStatus::ResolvesElsewhere.to_string(), "Resolves Elsewhere");
    }

    #[test]
    fn oversized_port_token_falls_through_to_host() {
        let rec = parse_line("Site STARTED 10.0.0.5 70000 real.example.com").unwrap();
        assert_eq!(rec.port, None);
        // The non-port token itself is consumed as host.
        assert_eq!(rec.host.as_deref(), Some("70000"));
    }
}
