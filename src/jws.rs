//! Compact JWS with a detached payload.
//!
//! A detached signature travels in a header as
//! `base64url(header) . "" . base64url(signature)`. The payload segment is
//! left empty and the verifier supplies the raw request body instead, so the
//! signature always covers the exact bytes received on the wire.

use crate::webhook::WebhookError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Signature algorithms accepted for webhook signatures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Algorithm {
    /// ECDSA on P-256 with SHA-256, 64-byte `R || S` signatures.
    #[serde(rename = "ES256")]
    Es256,
    /// RSASSA-PKCS1-v1_5 with SHA-256.
    #[serde(rename = "RS256")]
    Rs256,
}

impl Algorithm {
    pub fn as_str(&self) -> &'static str {
        match self {
            Algorithm::Es256 => "ES256",
            Algorithm::Rs256 => "RS256",
        }
    }
}

impl FromStr for Algorithm {
    type Err = WebhookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ES256" => Ok(Algorithm::Es256),
            "RS256" => Ok(Algorithm::Rs256),
            other => Err(WebhookError::UnsupportedAlgorithm(other.to_string())),
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The protected header of a detached JWS.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JwsHeader {
    #[serde(default)]
    pub alg: String,
    #[serde(default)]
    pub kid: String,
}

/// A parsed detached JWS. The signature segment is kept encoded until needed.
#[derive(Debug, Clone)]
pub struct DetachedJws<'a> {
    pub header: JwsHeader,
    encoded_header: &'a str,
    encoded_signature: &'a str,
}

impl<'a> DetachedJws<'a> {
    /// Parse a header value of the form `header..signature`.
    ///
    /// # Errors
    /// - `WebhookError::MissingSignature` for an empty value
    /// - `WebhookError::InvalidFormat` unless there are exactly three
    ///   segments and the first decodes to a JSON `{alg, kid}` object
    pub fn parse(value: &'a str) -> Result<Self, WebhookError> {
        if value.is_empty() {
            return Err(WebhookError::MissingSignature);
        }

        let parts: Vec<&str> = value.split('.').collect();
        if parts.len() != 3 {
            return Err(WebhookError::InvalidFormat(format!(
                "expected 3 segments, got {}",
                parts.len()
            )));
        }

        let header_bytes = URL_SAFE_NO_PAD
            .decode(parts[0])
            .map_err(|e| WebhookError::InvalidFormat(format!("failed to decode JWS header: {}", e)))?;
        let header: JwsHeader = serde_json::from_slice(&header_bytes)
            .map_err(|e| WebhookError::InvalidFormat(format!("failed to parse JWS header: {}", e)))?;

        Ok(DetachedJws {
            header,
            encoded_header: parts[0],
            encoded_signature: parts[2],
        })
    }

    /// The header segment exactly as it was received.
    pub fn encoded_header(&self) -> &str {
        self.encoded_header
    }

    /// Decode the signature segment.
    pub fn signature(&self) -> Result<Vec<u8>, WebhookError> {
        URL_SAFE_NO_PAD
            .decode(self.encoded_signature)
            .map_err(|e| WebhookError::InvalidFormat(format!("failed to decode signature: {}", e)))
    }

    /// The bytes the signer signed: the received header segment, a dot, and
    /// the base64url encoding of `body`.
    pub fn signing_input(&self, body: &[u8]) -> String {
        signing_input(self.encoded_header, body)
    }
}

/// Build `encoded_header + "." + base64url(body)`.
pub fn signing_input(encoded_header: &str, body: &[u8]) -> String {
    let payload = URL_SAFE_NO_PAD.encode(body);
    let mut input = String::with_capacity(encoded_header.len() + 1 + payload.len());
    input.push_str(encoded_header);
    input.push('.');
    input.push_str(&payload);
    input
}

/// Encode a header for use as the first segment.
pub fn encode_header(header: &JwsHeader) -> Result<String, serde_json::Error> {
    Ok(URL_SAFE_NO_PAD.encode(serde_json::to_vec(header)?))
}

/// Assemble the compact detached form from an encoded header and raw signature bytes.
pub fn compact_detached(encoded_header: &str, signature: &[u8]) -> String {
    format!("{}..{}", encoded_header, URL_SAFE_NO_PAD.encode(signature))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header_segment(json: &str) -> String {
        URL_SAFE_NO_PAD.encode(json.as_bytes())
    }

    #[test]
    fn test_parse_detached() {
        let h = header_segment(r#"{"alg":"ES256","kid":"key-1"}"#);
        let value = format!("{}..{}", h, URL_SAFE_NO_PAD.encode([1u8, 2, 3]));
        let jws = DetachedJws::parse(&value).unwrap();
        assert_eq!(jws.header.alg, "ES256");
        assert_eq!(jws.header.kid, "key-1");
        assert_eq!(jws.encoded_header(), h);
        assert_eq!(jws.signature().unwrap(), vec![1, 2, 3]);
    }

    #[test]
    fn test_payload_segment_is_ignored() {
        let h = header_segment(r#"{"alg":"RS256","kid":"k"}"#);
        let value = format!("{}.c29tZXRoaW5n.AAAA", h);
        let jws = DetachedJws::parse(&value).unwrap();
        assert_eq!(jws.signing_input(b"body"), format!("{}.{}", h, URL_SAFE_NO_PAD.encode(b"body")));
    }

    #[test]
    fn test_empty_value_is_missing() {
        assert!(matches!(DetachedJws::parse(""), Err(WebhookError::MissingSignature)));
    }

    #[test]
    fn test_wrong_segment_counts() {
        for value in ["abc", "abc.def", "a.b.c.d", "a.b.c.d.e"] {
            assert!(
                matches!(DetachedJws::parse(value), Err(WebhookError::InvalidFormat(_))),
                "{value} should be rejected"
            );
        }
    }

    #[test]
    fn test_header_not_json() {
        let value = format!("{}..AAAA", header_segment("not json"));
        assert!(matches!(DetachedJws::parse(&value), Err(WebhookError::InvalidFormat(_))));
    }

    #[test]
    fn test_header_not_base64() {
        assert!(matches!(DetachedJws::parse("***..AAAA"), Err(WebhookError::InvalidFormat(_))));
    }

    #[test]
    fn test_signature_decode_is_deferred() {
        let value = format!("{}..***", header_segment(r#"{"alg":"ES256","kid":"k"}"#));
        let jws = DetachedJws::parse(&value).unwrap();
        assert!(matches!(jws.signature(), Err(WebhookError::InvalidFormat(_))));
    }

    #[test]
    fn test_algorithm_from_str() {
        assert_eq!("ES256".parse::<Algorithm>().unwrap(), Algorithm::Es256);
        assert_eq!("RS256".parse::<Algorithm>().unwrap(), Algorithm::Rs256);
        assert!(matches!(
            "HS256".parse::<Algorithm>(),
            Err(WebhookError::UnsupportedAlgorithm(a)) if a == "HS256"
        ));
        assert!("es256".parse::<Algorithm>().is_err());
    }

    #[test]
    fn test_compact_detached_shape() {
        let header = JwsHeader {
            alg: "ES256".to_string(),
            kid: "k".to_string(),
        };
        let encoded = encode_header(&header).unwrap();
        let compact = compact_detached(&encoded, &[0xff; 4]);
        let parts: Vec<&str> = compact.split('.').collect();
        assert_eq!(parts.len(), 3);
        assert!(parts[1].is_empty());
        assert_eq!(DetachedJws::parse(&compact).unwrap().header, header);
    }
}
