use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

const SCHEME_PREFIX: &str = "spiffe://";
const SERVER_PATH: &str = "spire/server";

/// A parsed `spiffe://<trust-domain>/<path>` identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SpiffeId {
    trust_domain: String,
    // Always starts with '/' and has at least one segment
    path: String,
}

impl SpiffeId {
    /// Builds an ID from a trust domain and a loosely formatted path.
    ///
    /// The path is normalised the way a URL path would be: empty and `.`
    /// segments are dropped and `..` removes the previous segment. The
    /// resulting path must not be empty.
    pub fn new(trust_domain: &str, path: &str) -> Result<Self> {
        validate_trust_domain(trust_domain)?;

        let mut segments: Vec<&str> = Vec::new();
        for segment in path.split('/') {
            match segment {
                "" | "." => {}
                ".." => {
                    segments.pop();
                }
                s => segments.push(s),
            }
        }
        if segments.is_empty() {
            return Err(invalid(format!("{SCHEME_PREFIX}{trust_domain}/{path}"), "empty path"));
        }
        let path = format!("/{}", segments.join("/"));
        validate_path(&path).map_err(|reason| {
            invalid(format!("{SCHEME_PREFIX}{trust_domain}{path}"), reason)
        })?;

        Ok(Self {
            trust_domain: trust_domain.to_owned(),
            path,
        })
    }

    /// The SPIRE server identity, root parent of every node registration.
    pub fn server(trust_domain: &str) -> Result<Self> {
        Self::new(trust_domain, SERVER_PATH)
    }

    pub fn trust_domain(&self) -> &str {
        &self.trust_domain
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

impl fmt::Display for SpiffeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{SCHEME_PREFIX}{}{}", self.trust_domain, self.path)
    }
}

impl FromStr for SpiffeId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let Some(rest) = s.strip_prefix(SCHEME_PREFIX) else {
            return Err(invalid(s, "scheme must be spiffe://"));
        };
        let (trust_domain, path) = match rest.find('/') {
            Some(idx) => rest.split_at(idx),
            None => (rest, ""),
        };
        validate_trust_domain(trust_domain).map_err(|_| invalid(s, "invalid trust domain"))?;
        if path.is_empty() {
            return Err(invalid(s, "empty path"));
        }
        validate_path(path).map_err(|reason| invalid(s, reason))?;
        Ok(Self {
            trust_domain: trust_domain.to_owned(),
            path: path.to_owned(),
        })
    }
}

fn validate_trust_domain(trust_domain: &str) -> Result<()> {
    if trust_domain.is_empty() {
        return Err(Error::InvalidTrustDomain(trust_domain.to_owned()));
    }
    let valid = trust_domain
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || matches!(c, '.' | '-' | '_'));
    if !valid {
        return Err(Error::InvalidTrustDomain(trust_domain.to_owned()));
    }
    Ok(())
}

fn validate_path(path: &str) -> std::result::Result<(), &'static str> {
    for segment in path.split('/').skip(1) {
        match segment {
            "" => return Err("path contains an empty segment"),
            "." | ".." => return Err("path contains a dot segment"),
            s if !s
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_')) =>
            {
                return Err("path contains characters outside [a-zA-Z0-9._-]");
            }
            _ => {}
        }
    }
    Ok(())
}

fn invalid(id: impl Into<String>, reason: &'static str) -> Error {
    Error::InvalidSpiffeId {
        id: id.into(),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_cleans_path() {
        let id = SpiffeId::new("example.org", "ns/default/sa/default").expect("id");
        assert_eq!(id.to_string(), "spiffe://example.org/ns/default/sa/default");

        let id = SpiffeId::new("example.org", "//svc/./a/../b/").expect("id");
        assert_eq!(id.to_string(), "spiffe://example.org/svc/b");
    }

    #[test]
    fn test_new_rejects_empty_path() {
        assert!(SpiffeId::new("example.org", "").is_err());
        assert!(SpiffeId::new("example.org", "a/..").is_err());
    }

    #[test]
    fn test_new_rejects_bad_characters() {
        assert!(SpiffeId::new("example.org", "svc a").is_err());
        assert!(SpiffeId::new("Example.org", "svc").is_err());
    }

    #[test]
    fn test_server_id() {
        let id = SpiffeId::server("example.org").expect("server id");
        assert_eq!(id.to_string(), "spiffe://example.org/spire/server");
    }

    #[test]
    fn test_parse() {
        let id: SpiffeId = "spiffe://example.org/svc-a".parse().expect("parse");
        assert_eq!(id.trust_domain(), "example.org");
        assert_eq!(id.path(), "/svc-a");
        assert_eq!(id.to_string(), "spiffe://example.org/svc-a");
    }

    #[test]
    fn test_parse_rejects_trust_domain_only() {
        let err = "spiffe://example.org".parse::<SpiffeId>().unwrap_err();
        assert!(matches!(err, Error::InvalidSpiffeId { reason: "empty path", .. }));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in [
            "http://example.org/svc",
            "spiffe://example.org",
            "spiffe:///svc",
            "spiffe://example.org/",
            "spiffe://example.org//svc",
            "spiffe://example.org/svc?x=1",
            "spiffe://example.org:8080/svc",
            "spiffe://example.org/a/../b",
            "example.org/svc",
        ] {
            assert!(bad.parse::<SpiffeId>().is_err(), "{bad} should be rejected");
        }
    }
}
