//! Destination host extraction from request header pairs.
//!
//! Rules:
//! - The authority is read from the `:authority` pseudo-header (exact,
//!   case-sensitive name match; first occurrence wins).
//! - The port suffix is dropped by splitting on the first `:`.
//! - Bracketed IPv6 literals keep their brackets: `[::1]:8080` -> `[::1]`.
//! - The result is ASCII-lowercased. A missing authority yields `""`, which
//!   never matches an allowlist entry.

use std::borrow::Cow;

/// Pseudo-header carrying the request authority.
pub const AUTHORITY_HEADER: &str = ":authority";

/// Request header pairs as delivered by the host (pseudo-headers included).
pub type HeaderPairs = Vec<(String, String)>;

/// Return the raw authority value, if the request carries one.
pub fn find_authority(headers: &[(String, String)]) -> Option<&str> {
    headers
        .iter()
        .find(|(name, _)| name == AUTHORITY_HEADER)
        .map(|(_, value)| value.as_str())
}

/// Strip the port from an authority and normalize case.
pub fn host_from_authority(authority: &str) -> String {
    normalize_host(authority).into_owned()
}

/// Extract the normalized destination host, or `""` when absent.
pub fn extract_host(headers: &[(String, String)]) -> String {
    find_authority(headers)
        .map(host_from_authority)
        .unwrap_or_default()
}

/// Normalize a host or authority for membership checks.
///
/// Borrows when the input is already normalized, which is the common case on
/// the request path (the extractor already did the work).
pub fn normalize_host(authority: &str) -> Cow<'_, str> {
    let host = if authority.starts_with('[') {
        match authority.find(']') {
            Some(end) => &authority[..=end],
            None => authority,
        }
    } else {
        authority.split_once(':').map_or(authority, |(host, _port)| host)
    };
    let host = host.trim();

    if host.bytes().any(|b| b.is_ascii_uppercase()) {
        Cow::Owned(host.to_ascii_lowercase())
    } else {
        Cow::Borrowed(host)
    }
}
