//! Webhook signature verification.
//!
//! A business signs each webhook body with a detached JWS carried in the
//! `X-Detached-JWT` header. The verifier is built once from the trusted JWK
//! set and is read-only afterwards, so it can be shared across request
//! handlers without locking.
//!
//! Every verification failure is final for that message. Callers should map
//! an error to a 400 or 401 response (see [`WebhookError::status_code`]) and
//! never accept the message unverified.

use crate::jwk::{EcPublicKey, Jwk, PublicKey};
use crate::jws::{Algorithm, DetachedJws};
use crate::profile::UcpProfile;
use p256::ecdsa::signature::hazmat::PrehashVerifier;
use rsa::Pkcs1v15Sign;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use tracing::{debug, warn};

/// Header carrying the detached signature.
pub const SIGNATURE_HEADER: &str = "X-Detached-JWT";

/// Length of an ES256 signature: 32-byte R followed by 32-byte S.
pub const ES256_SIGNATURE_LEN: usize = 64;

/// Errors raised while loading keys or verifying a signature.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WebhookError {
    #[error("Malformed key: {0}")]
    MalformedKey(String),

    #[error("Unsupported key type: {0}")]
    UnsupportedKeyType(String),

    #[error("Unsupported curve: {0}")]
    UnsupportedCurve(String),

    #[error("Missing X-Detached-JWT header")]
    MissingSignature,

    #[error("Invalid JWS format: {0}")]
    InvalidFormat(String),

    #[error("Unknown key ID: {0}")]
    UnknownKey(String),

    #[error("Key {kid} ({key}) cannot verify {alg} signatures")]
    KeyAlgorithmMismatch { alg: String, kid: String, key: String },

    #[error("Invalid ES256 signature length: expected 64 bytes, got {0}")]
    InvalidSignatureLength(usize),

    #[error("Unsupported algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Signature verification failed")]
    SignatureInvalid,
}

impl WebhookError {
    /// Whether the request itself is malformed, as opposed to failing authentication.
    pub fn is_malformed(&self) -> bool {
        matches!(
            self,
            WebhookError::InvalidFormat(_)
                | WebhookError::InvalidSignatureLength(_)
                | WebhookError::UnsupportedAlgorithm(_)
        )
    }

    /// HTTP status a server should answer with: 400 for malformed input, 401 otherwise.
    pub fn status_code(&self) -> u16 {
        if self.is_malformed() {
            400
        } else {
            401
        }
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Options for a `WebhookVerifier`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct VerifierConfig {
    /// Header name looked up by [`WebhookVerifier::verify_headers`].
    pub signature_header: String,
    /// Algorithms accepted in signature headers. Anything else is
    /// rejected as unsupported.
    pub allowed_algorithms: Vec<Algorithm>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        VerifierConfig {
            signature_header: SIGNATURE_HEADER.to_string(),
            allowed_algorithms: vec![Algorithm::Es256, Algorithm::Rs256],
        }
    }
}

// ---------------------------------------------------------------------------
// Verifier
// ---------------------------------------------------------------------------

/// Verifies detached-JWS webhook signatures against a fixed set of keys.
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    keys: HashMap<String, PublicKey>,
    config: VerifierConfig,
}

impl WebhookVerifier {
    /// Build a verifier from a JWK set with the default configuration.
    ///
    /// Keys are indexed by `kid`; a later key with the same `kid` replaces
    /// an earlier one.
    ///
    /// # Errors
    /// Returns the decoding error of the first key that cannot be loaded.
    pub fn new(keys: &[Jwk]) -> Result<Self, WebhookError> {
        Self::with_config(keys, VerifierConfig::default())
    }

    /// Build a verifier from a JWK set with explicit options.
    pub fn with_config(keys: &[Jwk], config: VerifierConfig) -> Result<Self, WebhookError> {
        let mut decoded = HashMap::with_capacity(keys.len());
        for jwk in keys {
            let key = jwk.to_public_key().map_err(|e| {
                warn!(kid = %jwk.kid, kty = %jwk.kty, error = %e, "failed to load signing key");
                e
            })?;
            decoded.insert(jwk.kid.clone(), key);
        }
        debug!(keys = decoded.len(), "webhook verifier ready");
        Ok(WebhookVerifier {
            keys: decoded,
            config,
        })
    }

    /// Build a verifier from the `signing_keys` a business publishes in its profile.
    pub fn from_profile(profile: &UcpProfile) -> Result<Self, WebhookError> {
        Self::new(&profile.signing_keys)
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    /// Whether a key with this ID is loaded.
    pub fn has_key(&self, kid: &str) -> bool {
        self.keys.contains_key(kid)
    }

    /// IDs of all loaded keys, sorted.
    pub fn key_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Verify `body` against a detached signature header value.
    ///
    /// `header_value` is `None` when the request carried no signature header.
    /// The signing input is rebuilt from `body` byte for byte; never pass a
    /// re-serialized body.
    ///
    /// # Errors
    /// One of the verification kinds of [`WebhookError`]. Every error means
    /// the message must be rejected.
    pub fn verify_message(&self, header_value: Option<&str>, body: &[u8]) -> Result<(), WebhookError> {
        self.verify_detached(header_value.unwrap_or_default(), body)
            .map_err(|e| {
                warn!(error = %e, "webhook signature rejected");
                e
            })
    }

    /// Look up the configured signature header (case-insensitively) among
    /// `headers` and verify `body` against it.
    pub fn verify_headers<'h, I>(&self, headers: I, body: &[u8]) -> Result<(), WebhookError>
    where
        I: IntoIterator<Item = (&'h str, &'h str)>,
    {
        let value = headers
            .into_iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(&self.config.signature_header))
            .map(|(_, value)| value);
        self.verify_message(value, body)
    }

    fn verify_detached(&self, value: &str, body: &[u8]) -> Result<(), WebhookError> {
        let jws = DetachedJws::parse(value)?;
        let kid = jws.header.kid.as_str();
        let key = self
            .keys
            .get(kid)
            .ok_or_else(|| WebhookError::UnknownKey(kid.to_string()))?;

        let signing_input = jws.signing_input(body);
        let signature = jws.signature()?;

        let alg: Algorithm = jws.header.alg.parse()?;
        if !self.config.allowed_algorithms.contains(&alg) {
            return Err(WebhookError::UnsupportedAlgorithm(alg.to_string()));
        }

        match alg {
            Algorithm::Es256 => verify_es256(kid, key, signing_input.as_bytes(), &signature)?,
            Algorithm::Rs256 => verify_rs256(kid, key, signing_input.as_bytes(), &signature)?,
        }
        debug!(kid = %kid, alg = %alg, "webhook signature verified");
        Ok(())
    }
}

fn mismatch(alg: Algorithm, kid: &str, key: &PublicKey) -> WebhookError {
    let key = match key {
        PublicKey::Ec(ec) => format!("EC {}", ec.curve().name()),
        PublicKey::Rsa(_) => "RSA".to_string(),
    };
    WebhookError::KeyAlgorithmMismatch {
        alg: alg.to_string(),
        kid: kid.to_string(),
        key,
    }
}

/// ES256 is defined over P-256 only (RFC 7518 section 3.4). An EC key on
/// another curve is a `KeyAlgorithmMismatch`, reported before the signature
/// length is checked.
fn verify_es256(kid: &str, key: &PublicKey, signing_input: &[u8], signature: &[u8]) -> Result<(), WebhookError> {
    let verifying_key = match key {
        PublicKey::Ec(EcPublicKey::P256(vk)) => vk,
        other => return Err(mismatch(Algorithm::Es256, kid, other)),
    };
    if signature.len() != ES256_SIGNATURE_LEN {
        return Err(WebhookError::InvalidSignatureLength(signature.len()));
    }

    let digest = Sha256::digest(signing_input);
    let sig = p256::ecdsa::Signature::from_slice(signature).map_err(|_| WebhookError::SignatureInvalid)?;
    verifying_key
        .verify_prehash(&digest, &sig)
        .map_err(|_| WebhookError::SignatureInvalid)
}

fn verify_rs256(kid: &str, key: &PublicKey, signing_input: &[u8], signature: &[u8]) -> Result<(), WebhookError> {
    let rsa_key = match key {
        PublicKey::Rsa(k) => k,
        other => return Err(mismatch(Algorithm::Rs256, kid, other)),
    };

    let digest = Sha256::digest(signing_input);
    rsa_key
        .verify(Pkcs1v15Sign::new::<Sha256>(), &digest, signature)
        .map_err(|_| WebhookError::SignatureInvalid)
}
