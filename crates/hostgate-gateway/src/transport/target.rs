//! Request target resolution shared by interception and forwarding.
//!
//! The authority is parsed once. Userinfo and non-numeric ports are refused,
//! so the host the filter authorizes is the host the forwarder connects to.

use std::fmt;

use axum::http::{header::HOST, uri::Authority, HeaderMap, Uri};

/// Validated `host[:port]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    host: String,
    port: Option<u16>,
}

impl Target {
    /// Parse a raw authority. `None` for userinfo, a bad port, or garbage.
    pub fn parse(raw: &str) -> Option<Self> {
        if raw.contains('@') {
            return None;
        }
        let authority: Authority = raw.parse().ok()?;
        let host = authority.host();
        if host.is_empty() {
            return None;
        }
        let port = match authority.as_str().get(host.len()..)? {
            "" => None,
            rest => Some(rest.strip_prefix(':')?.parse::<u16>().ok()?),
        };
        Some(Self {
            host: host.to_string(),
            port,
        })
    }

    /// Authority from the request target (absolute or authority form), else `Host`.
    ///
    /// Returns `None` when no authority is present or it fails [`Target::parse`].
    pub fn from_request(uri: &Uri, headers: &HeaderMap) -> Option<Self> {
        match uri.authority() {
            Some(a) => Self::parse(a.as_str()),
            None => headers
                .get(HOST)
                .and_then(|v| v.to_str().ok())
                .and_then(Self::parse),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.port {
            Some(port) => write!(f, "{}:{}", self.host, port),
            None => f.write_str(&self.host),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_host_and_port() {
        let t = Target::parse("svc.example.com:8443").unwrap();
        assert_eq!(t.host(), "svc.example.com");
        assert_eq!(t.port(), Some(8443));
        assert_eq!(t.to_string(), "svc.example.com:8443");

        let t = Target::parse("svc.example.com").unwrap();
        assert_eq!(t.port(), None);
        assert_eq!(t.to_string(), "svc.example.com");
    }

    #[test]
    fn bracketed_ipv6() {
        let t = Target::parse("[::1]:8080").unwrap();
        assert_eq!(t.host(), "[::1]");
        assert_eq!(t.to_string(), "[::1]:8080");
    }

    #[test]
    fn refuses_userinfo_and_bad_ports() {
        for raw in [
            "svc.example.com:x@10.0.0.5:80",
            "user@svc.example.com",
            "svc.example.com:x",
            "svc.example.com:",
            "svc.example.com:99999",
            "",
        ] {
            assert!(Target::parse(raw).is_none(), "{raw:?} must be refused");
        }
    }

    #[test]
    fn request_target_wins_over_host_header() {
        let uri: Uri = "http://a.example.com:81/x".parse().unwrap();
        let mut headers = HeaderMap::new();
        headers.insert(HOST, "b.example.com".parse().unwrap());
        let t = Target::from_request(&uri, &headers).unwrap();
        assert_eq!(t.to_string(), "a.example.com:81");

        let origin: Uri = "/x".parse().unwrap();
        let t = Target::from_request(&origin, &headers).unwrap();
        assert_eq!(t.to_string(), "b.example.com");
    }
}
