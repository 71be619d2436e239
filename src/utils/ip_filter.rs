//! Submission origin filtering
//!
//! A homework may restrict where submissions come from. Each stored
//! filter is one of:
//!
//! - an exact address: `140.112.30.5`, `2001:db8::1`
//! - a CIDR block: `10.0.0.0/8`, `2001:db8::/32`
//! - an IPv4 octet pattern with wildcards and ranges: `140.112.*.*`,
//!   `192.168.1.10-20`

use std::net::IpAddr;
use std::sync::LazyLock;

use regex::Regex;

use crate::models::Homework;

static OCTET_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\*|\d{1,3}(-\d{1,3})?)(\.(\*|\d{1,3}(-\d{1,3})?)){3}$")
        .expect("octet pattern regex is valid")
});

/// Filter parse errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IpFilterError {
    #[error("Invalid IP filter {0:?}")]
    Malformed(String),

    #[error("Invalid prefix length in IP filter {0:?}")]
    BadPrefix(String),

    #[error("Invalid octet range in IP filter {0:?}")]
    BadRange(String),
}

/// Inclusive range for one IPv4 octet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OctetRange {
    pub lo: u8,
    pub hi: u8,
}

impl OctetRange {
    const ANY: Self = Self { lo: 0, hi: u8::MAX };

    fn contains(&self, octet: u8) -> bool {
        self.lo <= octet && octet <= self.hi
    }
}

/// A parsed filter entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IpFilter {
    Exact(IpAddr),
    Cidr { network: IpAddr, prefix: u8 },
    Octets([OctetRange; 4]),
}

impl IpFilter {
    pub fn parse(raw: &str) -> Result<Self, IpFilterError> {
        let pattern = raw.trim();

        if let Some((addr, prefix)) = pattern.split_once('/') {
            let network: IpAddr = addr
                .parse()
                .map_err(|_| IpFilterError::Malformed(raw.to_string()))?;
            let prefix: u8 = prefix
                .parse()
                .map_err(|_| IpFilterError::BadPrefix(raw.to_string()))?;
            let max = if network.is_ipv4() { 32 } else { 128 };
            if prefix > max {
                return Err(IpFilterError::BadPrefix(raw.to_string()));
            }
            // a block inside ::ffff:0:0/96 is stored as its IPv4 form
            return Ok(match network.to_canonical() {
                IpAddr::V4(v4) if network.is_ipv6() && prefix >= 96 => Self::Cidr {
                    network: IpAddr::V4(v4),
                    prefix: prefix - 96,
                },
                _ => Self::Cidr { network, prefix },
            });
        }

        if let Ok(addr) = pattern.parse::<IpAddr>() {
            return Ok(Self::Exact(addr.to_canonical()));
        }

        if OCTET_PATTERN.is_match(pattern) {
            let mut octets = [OctetRange::ANY; 4];
            for (slot, part) in octets.iter_mut().zip(pattern.split('.')) {
                *slot = parse_octet(part).ok_or_else(|| IpFilterError::BadRange(raw.to_string()))?;
            }
            return Ok(Self::Octets(octets));
        }

        Err(IpFilterError::Malformed(raw.to_string()))
    }

    pub fn matches(&self, addr: IpAddr) -> bool {
        let addr = addr.to_canonical();
        match self {
            Self::Exact(expected) => *expected == addr,
            Self::Cidr { network, prefix } => match (network, addr) {
                (IpAddr::V4(net), IpAddr::V4(ip)) => {
                    let mask = u32::MAX.checked_shl(32 - u32::from(*prefix)).unwrap_or(0);
                    u32::from(*net) & mask == u32::from(ip) & mask
                }
                (IpAddr::V6(net), ip) => {
                    let ip = match ip {
                        IpAddr::V4(v4) => v4.to_ipv6_mapped(),
                        IpAddr::V6(v6) => v6,
                    };
                    let mask = u128::MAX.checked_shl(128 - u32::from(*prefix)).unwrap_or(0);
                    u128::from(*net) & mask == u128::from(ip) & mask
                }
                (IpAddr::V4(_), IpAddr::V6(_)) => false,
            },
            Self::Octets(ranges) => match addr {
                IpAddr::V4(ip) => ranges
                    .iter()
                    .zip(ip.octets())
                    .all(|(range, octet)| range.contains(octet)),
                IpAddr::V6(_) => false,
            },
        }
    }
}

fn parse_octet(part: &str) -> Option<OctetRange> {
    if part == "*" {
        return Some(OctetRange::ANY);
    }
    let (lo, hi) = match part.split_once('-') {
        Some((lo, hi)) => (lo.parse().ok()?, hi.parse().ok()?),
        None => {
            let v = part.parse().ok()?;
            (v, v)
        }
    };
    (lo <= hi).then_some(OctetRange { lo, hi })
}

/// Whether a submission from `address` is allowed for `homework`.
///
/// No filters means unrestricted. An address that does not parse is
/// never eligible. Stored filters that no longer parse are skipped.
pub fn is_eligible(homework: &Homework, address: &str) -> bool {
    if homework.ip_filters.is_empty() {
        return true;
    }

    let Ok(addr) = address.trim().parse::<IpAddr>() else {
        tracing::debug!(homework_id = %homework.id, address, "Unparsable submission address");
        return false;
    };

    homework.ip_filters.iter().any(|raw| match IpFilter::parse(raw) {
        Ok(filter) => filter.matches(addr),
        Err(e) => {
            tracing::warn!(homework_id = %homework.id, filter = %raw, error = %e, "Skipping stored IP filter");
            false
        }
    })
}
