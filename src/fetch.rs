//! Digest-authenticated snapshot download
//!
//! ONVIF cameras commonly protect the snapshot endpoint with HTTP Digest
//! authentication (RFC 2617); credentials embedded in the URI are not
//! honored. The fetch is two round trips: an unauthenticated GET to obtain
//! the server challenge, then a retry carrying the computed response.
//! Network failure, a non-2xx status, and rejected credentials all surface
//! as the same fetch error; callers log and continue.

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::StatusCode;

use crate::error::{Error, Result};

static CHALLENGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)(realm|nonce|qop|opaque)=["']?([^,"'\s]+)["']?"#)
        .expect("invalid challenge regex")
});

/// Parsed `WWW-Authenticate` digest challenge
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DigestChallenge {
    pub realm: String,
    pub nonce: String,
    pub qop: Option<String>,
    pub opaque: Option<String>,
}

impl DigestChallenge {
    /// Parse a `WWW-Authenticate` header value; None unless the scheme is
    /// Digest. Parameter order does not matter.
    pub fn parse(header: &str) -> Option<Self> {
        if !header.to_lowercase().contains("digest") {
            return None;
        }

        let mut challenge = Self::default();
        for cap in CHALLENGE_RE.captures_iter(header) {
            let value = cap[2].to_string();
            match cap[1].to_lowercase().as_str() {
                "realm" => challenge.realm = value,
                "nonce" => challenge.nonce = value,
                "qop" => challenge.qop = Some(value),
                "opaque" => challenge.opaque = Some(value),
                _ => {}
            }
        }
        Some(challenge)
    }

    /// `Authorization` header value for one request against this challenge.
    pub fn authorization(&self, method: &str, uri: &str, username: &str, password: &str) -> String {
        let ha1 = md5_hex(&format!("{}:{}:{}", username, self.realm, password));
        let ha2 = md5_hex(&format!("{}:{}", method, uri));

        let mut header = match &self.qop {
            Some(qop) => {
                let cnonce = format!("{:016x}", rand::random::<u64>());
                let nc = "00000001";
                let response = md5_hex(&format!(
                    "{}:{}:{}:{}:{}:{}",
                    ha1, self.nonce, nc, cnonce, qop, ha2
                ));
                format!(
                    r#"Digest username="{}", realm="{}", nonce="{}", uri="{}", response="{}", qop={}, nc={}, cnonce="{}""#,
                    username, self.realm, self.nonce, uri, response, qop, nc, cnonce
                )
            }
            None => {
                let response = md5_hex(&format!("{}:{}:{}", ha1, self.nonce, ha2));
                format!(
                    r#"Digest username="{}", realm="{}", nonce="{}", uri="{}", response="{}""#,
                    username, self.realm, self.nonce, uri, response
                )
            }
        };

        if let Some(opaque) = &self.opaque {
            header.push_str(&format!(r#", opaque="{}""#, opaque));
        }
        header
    }
}

fn md5_hex(input: &str) -> String {
    format!("{:x}", md5::compute(input))
}

/// GET `uri`, negotiating digest authentication when challenged. Returns
/// the raw response body.
pub async fn fetch(
    client: &reqwest::Client,
    uri: &str,
    username: &str,
    password: &str,
) -> Result<Vec<u8>> {
    let first = client
        .get(uri)
        .send()
        .await
        .map_err(|e| Error::Fetch(e.to_string()))?;

    if first.status().is_success() {
        let bytes = first.bytes().await.map_err(|e| Error::Fetch(e.to_string()))?;
        return Ok(bytes.to_vec());
    }
    if first.status() != StatusCode::UNAUTHORIZED {
        return Err(Error::Fetch(format!("{} returned {}", uri, first.status())));
    }

    let challenge = first
        .headers()
        .get("WWW-Authenticate")
        .and_then(|h| h.to_str().ok())
        .and_then(DigestChallenge::parse)
        .ok_or_else(|| Error::Fetch(format!("{} sent 401 without a digest challenge", uri)))?;

    let authorization = challenge.authorization("GET", &request_uri(uri)?, username, password);

    let second = client
        .get(uri)
        .header("Authorization", authorization)
        .send()
        .await
        .map_err(|e| Error::Fetch(e.to_string()))?;

    if !second.status().is_success() {
        return Err(Error::Fetch(format!(
            "{} rejected digest credentials: {}",
            uri,
            second.status()
        )));
    }

    let bytes = second.bytes().await.map_err(|e| Error::Fetch(e.to_string()))?;
    Ok(bytes.to_vec())
}

/// Path-and-query form of the URI, as used in the digest hash.
fn request_uri(uri: &str) -> Result<String> {
    let parsed = reqwest::Url::parse(uri)
        .map_err(|e| Error::Fetch(format!("bad snapshot URI {}: {}", uri, e)))?;
    Ok(match parsed.query() {
        Some(query) => format!("{}?{}", parsed.path(), query),
        None => parsed.path().to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_challenge() {
        let challenge = DigestChallenge::parse(
            r#"Digest realm="IPCamera", nonce="4e4d4f32", qop="auth", stale=FALSE"#,
        )
        .unwrap();
        assert_eq!(challenge.realm, "IPCamera");
        assert_eq!(challenge.nonce, "4e4d4f32");
        assert_eq!(challenge.qop.as_deref(), Some("auth"));
        assert_eq!(challenge.opaque, None);
    }

    #[test]
    fn test_parse_challenge_any_order() {
        let challenge = DigestChallenge::parse(
            r#"Digest qop="auth", opaque="abc123", nonce="n1", realm="cam""#,
        )
        .unwrap();
        assert_eq!(challenge.realm, "cam");
        assert_eq!(challenge.nonce, "n1");
        assert_eq!(challenge.opaque.as_deref(), Some("abc123"));
    }

    #[test]
    fn test_parse_rejects_non_digest() {
        assert_eq!(DigestChallenge::parse(r#"Basic realm="cam""#), None);
    }

    #[test]
    fn test_authorization_without_qop() {
        let challenge = DigestChallenge {
            realm: "cam".to_string(),
            nonce: "n1".to_string(),
            qop: None,
            opaque: None,
        };
        let header = challenge.authorization("GET", "/snapshot.jpg", "admin", "pw");
        assert!(header.starts_with("Digest username=\"admin\""));
        assert!(header.contains(r#"realm="cam""#));
        assert!(header.contains(r#"nonce="n1""#));
        assert!(header.contains(r#"uri="/snapshot.jpg""#));
        assert!(!header.contains("qop"));

        // response is deterministic without a cnonce
        let again = challenge.authorization("GET", "/snapshot.jpg", "admin", "pw");
        assert_eq!(header, again);
    }

    #[test]
    fn test_authorization_with_qop() {
        let challenge = DigestChallenge {
            realm: "cam".to_string(),
            nonce: "n1".to_string(),
            qop: Some("auth".to_string()),
            opaque: Some("op".to_string()),
        };
        let header = challenge.authorization("GET", "/snapshot.jpg", "admin", "pw");
        assert!(header.contains("qop=auth"));
        assert!(header.contains("nc=00000001"));
        assert!(header.contains("cnonce="));
        assert!(header.contains(r#"opaque="op""#));
        // 32 hex chars in the response field
        let response = header
            .split(r#"response=""#)
            .nth(1)
            .and_then(|s| s.split('"').next())
            .unwrap();
        assert_eq!(response.len(), 32);
        assert!(response.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_request_uri_keeps_query() {
        assert_eq!(
            request_uri("http://10.0.0.5:8080/cgi-bin/snapshot.cgi?channel=1").unwrap(),
            "/cgi-bin/snapshot.cgi?channel=1"
        );
        assert_eq!(request_uri("http://10.0.0.5/snap.jpg").unwrap(), "/snap.jpg");
    }
}
