//! Business discovery profiles.
//!
//! A business publishes its profile at `/.well-known/ucp`: the protocol
//! version it speaks, its services and their transport bindings, the
//! capabilities it supports, its payment handlers, and the public keys it
//! signs webhooks with.

use crate::capability::{validate_capability_name, CapabilityDescriptor, CapabilityName};
use crate::jwk::Jwk;
use crate::version::{validate_version, Version};
use crate::UcpError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Path of the discovery document relative to a business origin.
pub const WELL_KNOWN_PATH: &str = "/.well-known/ucp";

type Extra = serde_json::Map<String, serde_json::Value>;

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// REST transport binding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RestTransport {
    /// URL of the OpenAPI document.
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(flatten)]
    pub additional: Extra,
}

/// MCP transport binding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct McpTransport {
    /// URL of the OpenRPC document.
    #[serde(default)]
    pub schema: String,
    #[serde(default)]
    pub endpoint: String,
    #[serde(flatten)]
    pub additional: Extra,
}

/// A2A transport binding; `endpoint` is the Agent Card URL.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct A2aTransport {
    #[serde(default)]
    pub endpoint: String,
    #[serde(flatten)]
    pub additional: Extra,
}

/// Embedded transport binding (JSON-RPC 2.0 over postMessage).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddedTransport {
    #[serde(default)]
    pub schema: String,
    #[serde(flatten)]
    pub additional: Extra,
}

/// A service definition with its transport bindings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    #[serde(default)]
    pub version: Version,
    #[serde(default)]
    pub spec: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest: Option<RestTransport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mcp: Option<McpTransport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub a2a: Option<A2aTransport>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub embedded: Option<EmbeddedTransport>,
    #[serde(flatten)]
    pub additional: Extra,
}

/// Protocol metadata of a discovery profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscoveryProfile {
    #[serde(default)]
    pub version: Version,
    /// Services keyed by reverse-domain service name.
    #[serde(default)]
    pub services: BTreeMap<String, Service>,
    #[serde(default)]
    pub capabilities: Vec<CapabilityDescriptor>,
    #[serde(flatten)]
    pub additional: Extra,
}

/// A payment handler offered by the business.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentHandler {
    #[serde(default)]
    pub id: String,
    /// Reverse-DNS specification name, e.g. `dev.ucp.delegate_payment`.
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub version: Version,
    #[serde(default)]
    pub spec: String,
    #[serde(default)]
    pub config_schema: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub instrument_schemas: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Extra>,
    #[serde(flatten)]
    pub additional: Extra,
}

/// Payment configuration of a profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PaymentConfig {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub handlers: Vec<PaymentHandler>,
}

/// The full document served at `/.well-known/ucp`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UcpProfile {
    pub ucp: DiscoveryProfile,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment: Option<PaymentConfig>,
    /// Public keys the business signs webhooks with.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub signing_keys: Vec<Jwk>,
    #[serde(flatten)]
    pub additional: Extra,
}

// ---------------------------------------------------------------------------
// Parsing, validation and lookups
// ---------------------------------------------------------------------------

impl UcpProfile {
    /// Parse a profile from raw JSON bytes.
    ///
    /// # Errors
    /// Returns `UcpError::SerializationError` if the document is not a valid profile.
    pub fn from_json(bytes: &[u8]) -> Result<Self, UcpError> {
        serde_json::from_slice(bytes)
            .map_err(|e| UcpError::SerializationError(format!("Failed to parse discovery profile: {}", e)))
    }

    /// Check versions and capability names eagerly.
    ///
    /// Negotiation works on unvalidated profiles too; this is for callers
    /// who want to reject a bad profile up front.
    ///
    /// # Errors
    /// Returns `UcpError::InvalidInput` describing the first problem found.
    pub fn validate(&self) -> Result<(), UcpError> {
        validate_version(&self.ucp.version)?;
        for cap in &self.ucp.capabilities {
            validate_capability_name(&cap.name)?;
            validate_version(&cap.version)
                .map_err(|e| UcpError::InvalidInput(format!("capability {}: {}", cap.name, e)))?;
            if let Some(parent) = &cap.extends {
                validate_capability_name(parent)?;
            }
        }
        for (name, service) in &self.ucp.services {
            validate_version(&service.version)
                .map_err(|e| UcpError::InvalidInput(format!("service {}: {}", name, e)))?;
        }
        Ok(())
    }

    /// Whether the business declares a capability with this name.
    pub fn has_capability(&self, name: &CapabilityName) -> bool {
        self.capability(name).is_some()
    }

    /// The first capability declared with this name.
    pub fn capability(&self, name: &CapabilityName) -> Option<&CapabilityDescriptor> {
        self.ucp.capabilities.iter().find(|cap| &cap.name == name)
    }

    /// REST endpoint of a service, if the service exists and has a REST binding.
    pub fn service_endpoint(&self, service: &str) -> Option<&str> {
        self.ucp
            .services
            .get(service)
            .and_then(|s| s.rest.as_ref())
            .map(|rest| rest.endpoint.as_str())
    }

    pub fn payment_handlers(&self) -> &[PaymentHandler] {
        self.payment
            .as_ref()
            .map(|p| p.handlers.as_slice())
            .unwrap_or_default()
    }

    pub fn payment_handler(&self, id: &str) -> Option<&PaymentHandler> {
        self.payment_handlers().iter().find(|h| h.id == id)
    }
}

/// Join a business base URL with the well-known discovery path.
pub fn discovery_url(base_url: &str) -> String {
    join_path(base_url, WELL_KNOWN_PATH)
}

pub(crate) fn join_path(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path.trim_start_matches('/'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::{CHECKOUT, FULFILLMENT, SHOPPING_SERVICE};

    const PROFILE: &str = r#"{
        "ucp": {
            "version": "2026-01-11",
            "services": {
                "dev.ucp.shopping": {
                    "version": "2026-01-11",
                    "spec": "https://ucp.dev/specs/shopping",
                    "rest": {
                        "schema": "https://ucp.dev/services/shopping/openapi.json",
                        "endpoint": "https://shop.example.com/ucp"
                    }
                }
            },
            "capabilities": [
                {"name": "dev.ucp.shopping.checkout", "version": "2026-01-11"},
                {"name": "dev.ucp.shopping.fulfillment", "version": "2026-01-11",
                 "extends": "dev.ucp.shopping.checkout"}
            ]
        },
        "payment": {
            "handlers": [
                {"id": "gpay", "name": "com.google.pay", "version": "2026-01-11",
                 "spec": "https://example.com/spec", "config_schema": "https://example.com/schema",
                 "config": {"merchant_id": "m-1"}}
            ]
        },
        "signing_keys": [
            {"kid": "k1", "kty": "EC", "crv": "P-256", "x": "AA", "y": "AA"}
        ],
        "x-operator": "acme"
    }"#;

    #[test]
    fn test_parse_profile() {
        let profile = UcpProfile::from_json(PROFILE.as_bytes()).unwrap();
        assert_eq!(profile.ucp.version.as_str(), "2026-01-11");
        assert_eq!(profile.ucp.capabilities.len(), 2);
        assert_eq!(profile.signing_keys[0].kid, "k1");
        assert_eq!(profile.additional.get("x-operator"), Some(&serde_json::json!("acme")));
        assert!(profile.validate().is_ok());
    }

    #[test]
    fn test_lookups() {
        let profile = UcpProfile::from_json(PROFILE.as_bytes()).unwrap();
        assert!(profile.has_capability(&CHECKOUT.into()));
        assert!(!profile.has_capability(&"dev.ucp.shopping.order".into()));
        let fulfillment = profile.capability(&FULFILLMENT.into()).unwrap();
        assert_eq!(fulfillment.extends, Some(CHECKOUT.into()));
        assert_eq!(profile.service_endpoint(SHOPPING_SERVICE), Some("https://shop.example.com/ucp"));
        assert_eq!(profile.service_endpoint("dev.ucp.other"), None);
        assert_eq!(profile.payment_handlers().len(), 1);
        assert_eq!(profile.payment_handler("gpay").unwrap().name, "com.google.pay");
        assert!(profile.payment_handler("paypal").is_none());
    }

    #[test]
    fn test_no_payment_section() {
        let profile = UcpProfile::default();
        assert!(profile.payment_handlers().is_empty());
        assert!(profile.payment_handler("gpay").is_none());
    }

    #[test]
    fn test_parse_failure() {
        let err = UcpProfile::from_json(b"{\"services\": 1}").unwrap_err();
        assert!(matches!(err, UcpError::SerializationError(_)));
    }

    #[test]
    fn test_validate_rejects_bad_capability() {
        let mut profile = UcpProfile::from_json(PROFILE.as_bytes()).unwrap();
        profile.ucp.capabilities[1].version = Version::from("2026-1-11");
        let err = profile.validate().unwrap_err();
        assert!(err.to_string().contains(FULFILLMENT));

        let mut profile = UcpProfile::from_json(PROFILE.as_bytes()).unwrap();
        profile.ucp.capabilities[0].name = CapabilityName::from("Checkout");
        assert!(profile.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_bad_protocol_version() {
        let mut profile = UcpProfile::from_json(PROFILE.as_bytes()).unwrap();
        profile.ucp.version = Version::from("v1");
        assert!(matches!(profile.validate(), Err(UcpError::InvalidInput(_))));
    }

    #[test]
    fn test_discovery_url() {
        assert_eq!(discovery_url("https://shop.example.com"), "https://shop.example.com/.well-known/ucp");
        assert_eq!(discovery_url("https://shop.example.com/"), "https://shop.example.com/.well-known/ucp");
    }
}
