//! Integration tests for the UCP SDK Rust implementation.
//!
//! These tests exercise the protocol end to end: a business signs webhooks
//! and publishes its discovery profile, and a platform discovers that
//! profile, negotiates capabilities and verifies the webhooks it receives.

use std::sync::OnceLock;

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use proptest::prelude::*;
use rand::rngs::OsRng;

use ucp_sdk::capability::{CapabilityDescriptor, CapabilityName, CHECKOUT, DISCOUNT, FULFILLMENT, ORDER};
use ucp_sdk::discovery::DiscoveryClient;
use ucp_sdk::jwk::Jwk;
use ucp_sdk::negotiation::CapabilityNegotiator;
use ucp_sdk::profile::{DiscoveryProfile, UcpProfile};
use ucp_sdk::signer::DetachedSigner;
use ucp_sdk::store::{MemoryStore, ProfileStore};
use ucp_sdk::version::Version;
use ucp_sdk::webhook::{WebhookError, WebhookVerifier, SIGNATURE_HEADER};
use ucp_sdk::UcpError;

const BUSINESS: &str = "https://shop.example.com";
const BODY: &[u8] = br#"{"event":"order.updated","order":{"id":"order_123","status":"shipped"}}"#;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn ec_signer() -> &'static DetachedSigner {
    static SIGNER: OnceLock<DetachedSigner> = OnceLock::new();
    SIGNER.get_or_init(|| DetachedSigner::es256("business-ec-1", p256::ecdsa::SigningKey::random(&mut OsRng)))
}

fn rsa_signer() -> &'static DetachedSigner {
    static SIGNER: OnceLock<DetachedSigner> = OnceLock::new();
    SIGNER.get_or_init(|| {
        let key = rsa::RsaPrivateKey::new(&mut OsRng, 1024).unwrap();
        DetachedSigner::rs256("business-rsa-1", key)
    })
}

fn descriptor(name: &str, version: &str) -> CapabilityDescriptor {
    CapabilityDescriptor::new(name, version)
}

fn business_profile() -> UcpProfile {
    UcpProfile {
        ucp: DiscoveryProfile {
            version: Version::from("2026-01-11"),
            capabilities: vec![
                descriptor(CHECKOUT, "2026-01-11"),
                descriptor(ORDER, "2026-01-11"),
                descriptor(FULFILLMENT, "2026-01-11").extending(CHECKOUT),
            ],
            ..Default::default()
        },
        signing_keys: vec![ec_signer().public_jwk(), rsa_signer().public_jwk()],
        ..Default::default()
    }
}

fn published_profile() -> Vec<u8> {
    serde_json::to_vec(&business_profile()).unwrap()
}

fn verifier() -> WebhookVerifier {
    WebhookVerifier::from_profile(&business_profile()).unwrap()
}

fn flip_bit(bytes: &mut [u8], bit: usize) {
    let bit = bit % (bytes.len() * 8);
    bytes[bit / 8] ^= 1 << (bit % 8);
}

// ===========================================================================
// End-to-end flow
// ===========================================================================

#[test]
fn test_discover_negotiate_and_verify() {
    let document = published_profile();
    let fetcher = move |url: &str| -> Result<Vec<u8>, UcpError> {
        assert_eq!(url, "https://shop.example.com/.well-known/ucp");
        Ok(document.clone())
    };
    let mut client = DiscoveryClient::new(fetcher, MemoryStore::new());

    let negotiator = CapabilityNegotiator::new(vec![
        descriptor(CHECKOUT, "2026-06-30"),
        descriptor(FULFILLMENT, "2026-03-01"),
        descriptor(DISCOUNT, "2026-01-11"),
    ]);
    let result = client
        .negotiate(BUSINESS, &negotiator, &[CapabilityName::from(CHECKOUT)])
        .unwrap();
    assert!(result.success);
    assert_eq!(result.common.len(), 2);
    assert_eq!(result.capability(&CHECKOUT.into()).unwrap().version.as_str(), "2026-01-11");
    assert!(!result.has_capability(&DISCOUNT.into()));
    assert_eq!(result.negotiated_version.as_str(), "2026-01-11");
    assert!(result.unresolved_extensions().is_empty());

    let verifier = client.webhook_verifier(BUSINESS).unwrap();
    assert_eq!(verifier.len(), 2);
    for signer in [ec_signer(), rsa_signer()] {
        let (name, value) = signer.signature_header(BODY).unwrap();
        assert_eq!(name, SIGNATURE_HEADER);
        let headers = [("content-type", "application/json"), ("x-detached-jwt", value.as_str())];
        assert!(verifier.verify_headers(headers, BODY).is_ok());
    }
    assert_eq!(client.store().count(), 1);
}

#[test]
fn test_profile_json_carries_signing_keys() {
    let parsed = UcpProfile::from_json(&published_profile()).unwrap();
    assert!(parsed.validate().is_ok());
    assert_eq!(parsed.signing_keys.len(), 2);
    let ec: &Jwk = &parsed.signing_keys[0];
    assert_eq!(ec.kty, "EC");
    assert_eq!(ec.crv, "P-256");
    assert_eq!(ec.kid, "business-ec-1");
    assert_eq!(parsed.signing_keys[1].kty, "RSA");
}

#[test]
fn test_discovery_profile_reused_from_store() {
    let mut store = MemoryStore::new();
    store.put(BUSINESS, business_profile()).unwrap();
    let fetcher = |_: &str| -> Result<Vec<u8>, UcpError> { Err(UcpError::DiscoveryError("offline".to_string())) };
    let mut client = DiscoveryClient::new(fetcher, store);
    assert!(client.discover(BUSINESS).is_ok());
    assert!(matches!(client.refresh(BUSINESS), Err(UcpError::DiscoveryError(_))));
}

// ===========================================================================
// Webhook verification
// ===========================================================================

#[test]
fn test_signature_value_is_detached() {
    let value = ec_signer().sign(BODY).unwrap();
    let parts: Vec<&str> = value.split('.').collect();
    assert_eq!(parts.len(), 3);
    assert!(parts[1].is_empty());
    let header: serde_json::Value = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(parts[0]).unwrap()).unwrap();
    assert_eq!(header["alg"], "ES256");
    assert_eq!(header["kid"], "business-ec-1");
    assert_eq!(URL_SAFE_NO_PAD.decode(parts[2]).unwrap().len(), 64);
}

#[test]
fn test_verification_is_deterministic() {
    let verifier = verifier();
    let value = rsa_signer().sign(BODY).unwrap();
    for _ in 0..3 {
        assert_eq!(verifier.verify_message(Some(&value), BODY), Ok(()));
    }
    let tampered = br#"{"event":"order.updated","order":{"id":"order_123","status":"cancelled"}}"#;
    for _ in 0..3 {
        assert_eq!(
            verifier.verify_message(Some(&value), tampered),
            Err(WebhookError::SignatureInvalid)
        );
    }
}

#[test]
fn test_whitespace_change_breaks_signature() {
    let verifier = verifier();
    let value = ec_signer().sign(BODY).unwrap();
    let reserialized = serde_json::to_vec_pretty(&serde_json::from_slice::<serde_json::Value>(BODY).unwrap()).unwrap();
    assert_eq!(
        verifier.verify_message(Some(&value), &reserialized),
        Err(WebhookError::SignatureInvalid)
    );
}

#[test]
fn test_missing_header() {
    let verifier = verifier();
    assert_eq!(verifier.verify_message(None, BODY), Err(WebhookError::MissingSignature));
    assert_eq!(verifier.verify_message(Some(""), BODY), Err(WebhookError::MissingSignature));
    let headers = [("content-type", "application/json")];
    assert_eq!(verifier.verify_headers(headers, BODY), Err(WebhookError::MissingSignature));
}

#[test]
fn test_key_from_another_business_is_unknown() {
    let verifier = verifier();
    let stranger = DetachedSigner::es256("stranger", p256::ecdsa::SigningKey::random(&mut OsRng));
    let value = stranger.sign(BODY).unwrap();
    assert_eq!(
        verifier.verify_message(Some(&value), BODY),
        Err(WebhookError::UnknownKey("stranger".to_string()))
    );
}

#[test]
fn test_rotated_key_with_same_kid_fails() {
    let verifier = verifier();
    let rotated = DetachedSigner::es256("business-ec-1", p256::ecdsa::SigningKey::random(&mut OsRng));
    let value = rotated.sign(BODY).unwrap();
    let err = verifier.verify_message(Some(&value), BODY).unwrap_err();
    assert_eq!(err, WebhookError::SignatureInvalid);
    assert_eq!(err.status_code(), 401);
}

#[test]
fn test_error_into_sdk_error() {
    let err: UcpError = verifier().verify_message(Some("a.b"), BODY).unwrap_err().into();
    assert!(matches!(err, UcpError::Webhook(WebhookError::InvalidFormat(_))));
}

// ===========================================================================
// Negotiation
// ===========================================================================

#[test]
fn test_required_capability_missing() {
    let negotiator = CapabilityNegotiator::new(vec![descriptor(CHECKOUT, "2026-01-11")]);
    let required = [CapabilityName::from(CHECKOUT), CapabilityName::from(DISCOUNT)];
    let result = negotiator.negotiate(&business_profile(), &required);
    assert!(!result.success);
    assert_eq!(result.missing_required, vec![CapabilityName::from(DISCOUNT)]);
    assert_eq!(result.common.len(), 1);
    assert!(result.failure_summary().unwrap().contains(DISCOUNT));
}

#[test]
fn test_cross_year_versions_are_incompatible() {
    let negotiator = CapabilityNegotiator::new(vec![descriptor(CHECKOUT, "2027-01-11")]);
    let result = negotiator.negotiate(&business_profile(), &[CapabilityName::from(CHECKOUT)]);
    assert!(!result.success);
    assert!(result.common.is_empty());
    assert_eq!(result.version_mismatches.len(), 1);
    assert_eq!(result.version_mismatches[0].platform_version.as_str(), "2027-01-11");
    assert_eq!(result.version_mismatches[0].business_version.as_str(), "2026-01-11");
    assert_eq!(result.missing_required, vec![CapabilityName::from(CHECKOUT)]);
}

#[test]
fn test_negotiation_is_deterministic() {
    let negotiator = CapabilityNegotiator::new(vec![
        descriptor(ORDER, "2026-02-01"),
        descriptor(CHECKOUT, "2026-03-01"),
    ]);
    let profile = business_profile();
    let first = negotiator.negotiate(&profile, &[]);
    let second = negotiator.negotiate(&profile, &[]);
    assert_eq!(first, second);
    let names: Vec<&str> = first.common.iter().map(|c| c.name.as_str()).collect();
    assert_eq!(names, vec![ORDER, CHECKOUT]);
}

// ===========================================================================
// Properties
// ===========================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_signed_body_verifies(body in proptest::collection::vec(any::<u8>(), 0..512)) {
        let verifier = verifier();
        for signer in [ec_signer(), rsa_signer()] {
            let value = signer.sign(&body).unwrap();
            prop_assert_eq!(verifier.verify_message(Some(&value), &body), Ok(()));
        }
    }

    #[test]
    fn prop_body_bit_flip_rejected(
        body in proptest::collection::vec(any::<u8>(), 1..256),
        bit in any::<usize>(),
    ) {
        let verifier = verifier();
        let value = ec_signer().sign(&body).unwrap();
        let mut tampered = body.clone();
        flip_bit(&mut tampered, bit);
        prop_assert_eq!(
            verifier.verify_message(Some(&value), &tampered),
            Err(WebhookError::SignatureInvalid)
        );
    }

    #[test]
    fn prop_signature_bit_flip_rejected(bit in any::<usize>(), rsa in any::<bool>()) {
        let verifier = verifier();
        let signer = if rsa { rsa_signer() } else { ec_signer() };
        let value = signer.sign(BODY).unwrap();
        let (header, signature) = value.split_once("..").unwrap();
        let mut signature = URL_SAFE_NO_PAD.decode(signature).unwrap();
        flip_bit(&mut signature, bit);
        let tampered = format!("{}..{}", header, URL_SAFE_NO_PAD.encode(&signature));
        prop_assert_eq!(
            verifier.verify_message(Some(&tampered), BODY),
            Err(WebhookError::SignatureInvalid)
        );
    }

    #[test]
    fn prop_wrong_segment_count_rejected(
        segments in proptest::collection::vec("[A-Za-z0-9_-]{0,12}", 1..8)
            .prop_filter("three segments", |s| s.len() != 3),
    ) {
        let value = segments.join(".");
        prop_assume!(!value.is_empty());
        let err = verifier().verify_message(Some(&value), BODY).unwrap_err();
        prop_assert!(matches!(err, WebhookError::InvalidFormat(_)));
        prop_assert_eq!(err.status_code(), 400);
    }

    #[test]
    fn prop_version_order_is_total(
        a in (2000u32..2100, 1u32..13, 1u32..29),
        b in (2000u32..2100, 1u32..13, 1u32..29),
    ) {
        let va = Version::new(format!("{:04}-{:02}-{:02}", a.0, a.1, a.2));
        let vb = Version::new(format!("{:04}-{:02}-{:02}", b.0, b.1, b.2));
        prop_assert_eq!(va.compare(&vb), a.cmp(&b));
        prop_assert_eq!(va.compatible_with(&vb), a.0 == b.0);
        let earlier = Version::earlier(&va, &vb);
        prop_assert!(earlier.compare(&va).is_le() && earlier.compare(&vb).is_le());
    }
}
