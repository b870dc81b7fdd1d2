//! Capability names and descriptors.
//!
//! A capability is a named, versioned feature unit that a platform or a
//! business declares support for. Names use reverse-domain notation, e.g.
//! `dev.ucp.shopping.checkout`. A capability may `extend` another one; the
//! relationship is recorded but not walked.

use crate::version::Version;
use crate::UcpError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static CAPABILITY_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-z][a-z0-9]*(?:\.[a-z][a-z0-9_]*)+$")
        .unwrap_or_else(|e| panic!("invalid capability name pattern: {e}"))
});

/// Keys owned by `CapabilityDescriptor` fields. Extra properties never shadow these.
const DESCRIPTOR_KEYS: [&str; 6] = ["name", "version", "spec", "schema", "extends", "config"];

// ---------------------------------------------------------------------------
// Well-known names
// ---------------------------------------------------------------------------

pub const CHECKOUT: &str = "dev.ucp.shopping.checkout";
pub const ORDER: &str = "dev.ucp.shopping.order";
pub const IDENTITY_LINKING: &str = "dev.ucp.identity_linking";
pub const FULFILLMENT: &str = "dev.ucp.shopping.fulfillment";
pub const DISCOUNT: &str = "dev.ucp.shopping.discount";
pub const BUYER_CONSENT: &str = "dev.ucp.shopping.buyer_consent";
pub const PAYMENT: &str = "dev.ucp.shopping.payment";

/// Service name for the shopping service.
pub const SHOPPING_SERVICE: &str = "dev.ucp.shopping";

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A stable capability identifier in reverse-domain notation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityName(pub String);

impl CapabilityName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Lowercase dot-separated segments, at least two of them.
    pub fn is_valid(&self) -> bool {
        CAPABILITY_NAME_PATTERN.is_match(&self.0)
    }
}

impl From<&str> for CapabilityName {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for CapabilityName {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for CapabilityName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CapabilityName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A capability declaration as it appears in discovery profiles and responses.
///
/// Fields outside the published schema are kept in `additional` and written
/// back next to the known fields on serialization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapabilityDescriptor {
    #[serde(default, skip_serializing_if = "is_empty_name")]
    pub name: CapabilityName,
    #[serde(default, skip_serializing_if = "is_empty_version")]
    pub version: Version,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extends: Option<CapabilityName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<serde_json::Map<String, serde_json::Value>>,
    #[serde(flatten)]
    pub additional: serde_json::Map<String, serde_json::Value>,
}

fn is_empty_name(name: &CapabilityName) -> bool {
    name.0.is_empty()
}

fn is_empty_version(version: &Version) -> bool {
    version.0.is_empty()
}

impl CapabilityDescriptor {
    /// Create a descriptor with just a name and a version.
    pub fn new(name: impl Into<CapabilityName>, version: impl Into<Version>) -> Self {
        CapabilityDescriptor {
            name: name.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    /// Set the parent capability this one extends.
    pub fn extending(mut self, parent: impl Into<CapabilityName>) -> Self {
        self.extends = Some(parent.into());
        self
    }

    /// Attach an extra property. Keys that collide with a known field are ignored.
    pub fn with_additional(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        let key = key.into();
        if !DESCRIPTOR_KEYS.contains(&key.as_str()) {
            self.additional.insert(key, value);
        }
        self
    }

    /// Whether this capability is an extension of another one.
    pub fn is_extension(&self) -> bool {
        self.extends.is_some()
    }
}

/// Check that a capability name uses reverse-domain notation.
///
/// # Errors
/// Returns `UcpError::InvalidInput` naming the offending capability.
pub fn validate_capability_name(name: &CapabilityName) -> Result<(), UcpError> {
    if !name.is_valid() {
        return Err(UcpError::InvalidInput(format!(
            "invalid capability name: {} (must be reverse-domain notation)",
            name
        )));
    }
    Ok(())
}
