//! JSON Web Keys (RFC 7517) and their decoding into verification keys.
//!
//! Businesses publish their webhook signing keys as JWKs in the
//! `signing_keys` array of their discovery profile. Only public key
//! material is handled here: EC keys on P-256, P-384 or P-521 and RSA keys.

use crate::webhook::WebhookError;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use rsa::traits::PublicKeyParts;
use rsa::{BigUint, RsaPublicKey};
use serde::{Deserialize, Serialize};

/// Largest RSA modulus accepted in a JWK, in bits.
pub const MAX_RSA_MODULUS_BITS: usize = 16384;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A JSON Web Key as published in a discovery profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key ID, referenced by the `kid` of a signature header.
    #[serde(default)]
    pub kid: String,
    /// Key type, `EC` or `RSA`.
    #[serde(default)]
    pub kty: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub crv: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub x: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub y: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub n: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub e: String,
    /// Intended key usage, `sig` for signing keys.
    #[serde(default, rename = "use", skip_serializing_if = "String::is_empty")]
    pub key_use: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub alg: String,
}

/// Named elliptic curves accepted in EC keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EcCurve {
    P256,
    P384,
    P521,
}

impl EcCurve {
    /// Map a JWK `crv` value to a curve.
    pub fn from_name(name: &str) -> Result<Self, WebhookError> {
        match name {
            "P-256" => Ok(EcCurve::P256),
            "P-384" => Ok(EcCurve::P384),
            "P-521" => Ok(EcCurve::P521),
            other => Err(WebhookError::UnsupportedCurve(other.to_string())),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            EcCurve::P256 => "P-256",
            EcCurve::P384 => "P-384",
            EcCurve::P521 => "P-521",
        }
    }

    /// Size in bytes of one affine coordinate.
    pub fn field_size(&self) -> usize {
        match self {
            EcCurve::P256 => 32,
            EcCurve::P384 => 48,
            EcCurve::P521 => 66,
        }
    }
}

/// A validated EC public key. Every point is checked to be on its curve.
#[derive(Debug, Clone)]
pub enum EcPublicKey {
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::PublicKey),
    P521(p521::PublicKey),
}

impl EcPublicKey {
    pub fn curve(&self) -> EcCurve {
        match self {
            EcPublicKey::P256(_) => EcCurve::P256,
            EcPublicKey::P384(_) => EcCurve::P384,
            EcPublicKey::P521(_) => EcCurve::P521,
        }
    }
}

/// Public key material decoded from a JWK.
#[derive(Debug, Clone)]
pub enum PublicKey {
    Ec(EcPublicKey),
    Rsa(RsaPublicKey),
}

impl PublicKey {
    /// The JWK `kty` this key was decoded from.
    pub fn kty(&self) -> &'static str {
        match self {
            PublicKey::Ec(_) => "EC",
            PublicKey::Rsa(_) => "RSA",
        }
    }
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

impl Jwk {
    /// Decode the key material according to `kty`.
    ///
    /// # Errors
    /// - `WebhookError::UnsupportedKeyType` when `kty` is neither `EC` nor `RSA`
    /// - `WebhookError::UnsupportedCurve` for an unknown EC `crv`
    /// - `WebhookError::MalformedKey` for missing or undecodable parameters,
    ///   or parameters that do not form a usable public key
    pub fn to_public_key(&self) -> Result<PublicKey, WebhookError> {
        match self.kty.as_str() {
            "EC" => self.to_ec_key().map(PublicKey::Ec),
            "RSA" => self.to_rsa_key().map(PublicKey::Rsa),
            other => Err(WebhookError::UnsupportedKeyType(other.to_string())),
        }
    }

    fn to_ec_key(&self) -> Result<EcPublicKey, WebhookError> {
        if self.x.is_empty() || self.y.is_empty() {
            return Err(WebhookError::MalformedKey("missing EC key coordinates".to_string()));
        }
        let x = decode_param(&self.x, "x")?;
        let y = decode_param(&self.y, "y")?;
        let curve = EcCurve::from_name(&self.crv)?;

        let size = curve.field_size();
        let mut sec1 = Vec::with_capacity(1 + 2 * size);
        sec1.push(0x04);
        sec1.extend(left_pad(&x, size, "x")?);
        sec1.extend(left_pad(&y, size, "y")?);

        match curve {
            EcCurve::P256 => p256::ecdsa::VerifyingKey::from_sec1_bytes(&sec1)
                .map(EcPublicKey::P256)
                .map_err(|_| off_curve(curve)),
            EcCurve::P384 => p384::PublicKey::from_sec1_bytes(&sec1)
                .map(EcPublicKey::P384)
                .map_err(|_| off_curve(curve)),
            EcCurve::P521 => p521::PublicKey::from_sec1_bytes(&sec1)
                .map(EcPublicKey::P521)
                .map_err(|_| off_curve(curve)),
        }
    }

    fn to_rsa_key(&self) -> Result<RsaPublicKey, WebhookError> {
        if self.n.is_empty() || self.e.is_empty() {
            return Err(WebhookError::MalformedKey("missing RSA key components".to_string()));
        }
        let n = decode_param(&self.n, "n")?;
        let e_bytes = decode_param(&self.e, "e")?;

        let mut e: u64 = 0;
        for b in e_bytes {
            if e > u64::MAX >> 8 {
                return Err(WebhookError::MalformedKey("RSA exponent too large".to_string()));
            }
            e = (e << 8) | u64::from(b);
        }

        RsaPublicKey::new_with_max_size(BigUint::from_bytes_be(&n), BigUint::from(e), MAX_RSA_MODULUS_BITS)
            .map_err(|err| WebhookError::MalformedKey(format!("invalid RSA key: {}", err)))
    }

    // -----------------------------------------------------------------------
    // Export
    // -----------------------------------------------------------------------

    /// Export a P-256 verifying key as a signing JWK for ES256.
    pub fn from_p256(kid: impl Into<String>, key: &p256::ecdsa::VerifyingKey) -> Self {
        let point = key.to_encoded_point(false);
        Jwk {
            kid: kid.into(),
            kty: "EC".to_string(),
            crv: EcCurve::P256.name().to_string(),
            x: point.x().map(|x| URL_SAFE_NO_PAD.encode(x)).unwrap_or_default(),
            y: point.y().map(|y| URL_SAFE_NO_PAD.encode(y)).unwrap_or_default(),
            key_use: "sig".to_string(),
            alg: "ES256".to_string(),
            ..Default::default()
        }
    }

    /// Export an RSA public key as a signing JWK for RS256.
    pub fn from_rsa(kid: impl Into<String>, key: &RsaPublicKey) -> Self {
        Jwk {
            kid: kid.into(),
            kty: "RSA".to_string(),
            n: URL_SAFE_NO_PAD.encode(key.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(key.e().to_bytes_be()),
            key_use: "sig".to_string(),
            alg: "RS256".to_string(),
            ..Default::default()
        }
    }
}

fn off_curve(curve: EcCurve) -> WebhookError {
    WebhookError::MalformedKey(format!("point is not on curve {}", curve.name()))
}

fn decode_param(value: &str, label: &str) -> Result<Vec<u8>, WebhookError> {
    URL_SAFE_NO_PAD
        .decode(value)
        .map_err(|e| WebhookError::MalformedKey(format!("failed to decode {}: {}", label, e)))
}

/// Treat `bytes` as a big-endian unsigned integer and widen it to `size` bytes.
fn left_pad(bytes: &[u8], size: usize, label: &str) -> Result<Vec<u8>, WebhookError> {
    let first = bytes.iter().position(|&b| b != 0).unwrap_or(bytes.len());
    let significant = &bytes[first..];
    if significant.len() > size {
        return Err(WebhookError::MalformedKey(format!(
            "coordinate {} exceeds {} bytes",
            label, size
        )));
    }
    let mut out = vec![0u8; size - significant.len()];
    out.extend_from_slice(significant);
    Ok(out)
}
