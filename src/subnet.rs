//! IPv4 CIDR subnet membership tests.
//!
//! Pure byte math, no allocation on the match path. Subnet entries come from
//! operator configuration; malformed entries are skipped individually at
//! match time rather than failing the whole check.

use std::net::Ipv4Addr;

/// True if `ip` falls inside `network/prefix_len`.
///
/// Whole bytes of the prefix are compared exactly; a partial trailing byte is
/// compared under a `0xFF << (8 - remaining_bits)` mask. `prefix_len` above
/// 32 never matches.
pub fn ip_in_range(ip: Ipv4Addr, network: Ipv4Addr, prefix_len: u8) -> bool {
    if prefix_len > 32 {
        return false;
    }
    let ip = ip.octets();
    let net = network.octets();

    let whole_bytes = (prefix_len / 8) as usize;
    let remaining_bits = prefix_len % 8;

    if ip[..whole_bytes] != net[..whole_bytes] {
        return false;
    }
    if remaining_bits > 0 && whole_bytes < ip.len() {
        let mask = 0xFFu8 << (8 - remaining_bits);
        return ip[whole_bytes] & mask == net[whole_bytes] & mask;
    }
    true
}

/// True if `ip` matches any subnet in `subnets` (`"A.B.C.D/N"` strings).
///
/// First match wins. Entries that do not split into two parts, carry an
/// unparseable network address, or a non-integer prefix are skipped.
pub fn ip_in_subnets(ip: Ipv4Addr, subnets: &[String]) -> bool {
    matching_subnet(ip, subnets).is_some()
}

/// Like [`ip_in_subnets`] but reports which subnet matched, for diagnostics.
pub fn matching_subnet<'a>(ip: Ipv4Addr, subnets: &'a [String]) -> Option<&'a str> {
    subnets.iter().map(String::as_str).find(|subnet| {
        let Some((network, prefix)) = subnet.split_once('/') else {
            return false;
        };
        let (Ok(network), Ok(prefix)) = (network.parse::<Ipv4Addr>(), prefix.parse::<u8>())
        else {
            return false;
        };
        ip_in_range(ip, network, prefix)
    })
}
