//! Target address validation.
//!
//! Only IPv4 literals and DNS hostnames are accepted. The normalized form
//! returned here is the natural key used to deduplicate stored targets.

use std::net::Ipv4Addr;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const MAX_HOSTNAME_LEN: usize = 255;

/// Warning attached to every valid target outside the private ranges.
pub const PUBLIC_TARGET_WARNING: &str =
    "Scanning external/public IPs may be illegal without authorization";

static HOSTNAME_LABEL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?$")
        .expect("hostname label pattern is valid")
});

static DOTTED_NUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[0-9.]+$").expect("numeric pattern is valid"));

/// Result of [`validate_target`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetValidation {
    pub valid: bool,
    pub normalized: String,
    pub is_private: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl TargetValidation {
    fn accepted(normalized: String, is_private: bool) -> Self {
        Self {
            valid: true,
            normalized,
            is_private,
            reason: None,
        }
    }

    fn rejected(normalized: String, reason: impl Into<String>) -> Self {
        Self {
            valid: false,
            normalized,
            is_private: false,
            reason: Some(reason.into()),
        }
    }

    /// Legal-use warning for public targets; `None` for private or invalid ones.
    pub fn warning(&self) -> Option<&'static str> {
        (self.valid && !self.is_private).then_some(PUBLIC_TARGET_WARNING)
    }
}

/// Validates and normalizes a scan target.
///
/// Surrounding whitespace is ignored. IPv4 literals are classified as private
/// when they fall in RFC1918, loopback, link-local, documentation, or other
/// reserved non-routable space. Hostnames are lowercased, lose a single
/// trailing dot, and are always treated as public.
pub fn validate_target(address: &str) -> TargetValidation {
    let trimmed = address.trim();
    if trimmed.is_empty() {
        return TargetValidation::rejected(String::new(), "target is empty");
    }

    if let Ok(ip) = trimmed.parse::<Ipv4Addr>() {
        return TargetValidation::accepted(ip.to_string(), is_private_ipv4(ip));
    }

    if DOTTED_NUMERIC.is_match(trimmed) {
        return TargetValidation::rejected(
            trimmed.to_string(),
            "not a valid IPv4 address",
        );
    }

    let host = trimmed.strip_suffix('.').unwrap_or(trimmed).to_ascii_lowercase();
    if host.len() > MAX_HOSTNAME_LEN {
        return TargetValidation::rejected(host, "hostname is too long");
    }
    if host.is_empty() || !host.split('.').all(|label| HOSTNAME_LABEL.is_match(label)) {
        return TargetValidation::rejected(host, "not a valid IPv4 address or hostname");
    }

    TargetValidation::accepted(host, false)
}

/// RFC1918, loopback, link-local, "this network", IETF protocol assignments,
/// documentation, benchmarking, and reserved space. Shared address space
/// (100.64.0.0/10) is not included.
fn is_private_ipv4(ip: Ipv4Addr) -> bool {
    let [a, b, c, d] = ip.octets();
    ip.is_private()
        || ip.is_loopback()
        || ip.is_link_local()
        || ip.is_documentation()
        || ip.is_broadcast()
        || a == 0
        || a >= 240
        || (a == 198 && (b & 0xfe) == 18)
        || (a == 192 && b == 0 && c == 0 && (d < 8 || d == 170 || d == 171))
}
