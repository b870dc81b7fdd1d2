//! Detached-JWS signing for outgoing webhooks.
//!
//! The business side of [`crate::webhook`]: sign the exact body bytes that
//! will be sent and publish the matching public key in the discovery
//! profile's `signing_keys`.

use crate::jwk::Jwk;
use crate::jws::{self, Algorithm, JwsHeader};
use crate::webhook::SIGNATURE_HEADER;
use crate::UcpError;
use p256::ecdsa::signature::hazmat::PrehashSigner;
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use sha2::{Digest, Sha256};

enum SigningKey {
    Es256(p256::ecdsa::SigningKey),
    Rs256(RsaPrivateKey),
}

/// Signs webhook bodies with a single private key.
pub struct DetachedSigner {
    kid: String,
    key: SigningKey,
}

impl DetachedSigner {
    /// Sign with ECDSA P-256 / SHA-256.
    pub fn es256(kid: impl Into<String>, key: p256::ecdsa::SigningKey) -> Self {
        DetachedSigner {
            kid: kid.into(),
            key: SigningKey::Es256(key),
        }
    }

    /// Sign with RSASSA-PKCS1-v1_5 / SHA-256.
    pub fn rs256(kid: impl Into<String>, key: RsaPrivateKey) -> Self {
        DetachedSigner {
            kid: kid.into(),
            key: SigningKey::Rs256(key),
        }
    }

    pub fn kid(&self) -> &str {
        &self.kid
    }

    pub fn algorithm(&self) -> Algorithm {
        match self.key {
            SigningKey::Es256(_) => Algorithm::Es256,
            SigningKey::Rs256(_) => Algorithm::Rs256,
        }
    }

    /// The public half as a JWK, ready for a profile's `signing_keys`.
    pub fn public_jwk(&self) -> Jwk {
        match &self.key {
            SigningKey::Es256(key) => Jwk::from_p256(&self.kid, key.verifying_key()),
            SigningKey::Rs256(key) => Jwk::from_rsa(&self.kid, &key.to_public_key()),
        }
    }

    /// Produce the detached signature header value for `body`.
    ///
    /// # Errors
    /// Returns `UcpError::SerializationError` if the header cannot be encoded
    /// and `UcpError::SigningError` if the key refuses to sign.
    pub fn sign(&self, body: &[u8]) -> Result<String, UcpError> {
        let header = JwsHeader {
            alg: self.algorithm().to_string(),
            kid: self.kid.clone(),
        };
        let encoded_header = jws::encode_header(&header)
            .map_err(|e| UcpError::SerializationError(format!("Failed to encode JWS header: {}", e)))?;
        let digest = Sha256::digest(jws::signing_input(&encoded_header, body).as_bytes());

        let signature = match &self.key {
            SigningKey::Es256(key) => {
                let sig: p256::ecdsa::Signature = key
                    .sign_prehash(&digest)
                    .map_err(|e| UcpError::SigningError(format!("ES256 signing failed: {}", e)))?;
                sig.to_bytes().to_vec()
            }
            SigningKey::Rs256(key) => key
                .sign(Pkcs1v15Sign::new::<Sha256>(), &digest)
                .map_err(|e| UcpError::SigningError(format!("RS256 signing failed: {}", e)))?,
        };

        Ok(jws::compact_detached(&encoded_header, &signature))
    }

    /// The header name and value to attach to an outgoing request.
    pub fn signature_header(&self, body: &[u8]) -> Result<(&'static str, String), UcpError> {
        Ok((SIGNATURE_HEADER, self.sign(body)?))
    }
}
