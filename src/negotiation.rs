//! Capability negotiation between a platform and a business.
//!
//! Given the capabilities a platform declares and a business's discovery
//! profile, compute the capabilities both sides can use, the required ones
//! that are missing, the ones whose versions cannot be reconciled, and the
//! protocol version to speak.
//!
//! Negotiation is a pure function of its inputs. A failed negotiation is an
//! ordinary result, not an error: callers inspect `success` and report
//! `missing_required` and `version_mismatches` before going further.

use crate::capability::{CapabilityDescriptor, CapabilityName};
use crate::profile::UcpProfile;
use crate::version::Version;
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// A capability both sides declare with versions from different years.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionMismatch {
    pub capability: CapabilityName,
    pub platform_version: Version,
    pub business_version: Version,
}

/// Outcome of a negotiation.
///
/// `success` is true iff `missing_required` and `version_mismatches` are
/// both empty.
#[derive(Debug, Clone, PartialEq)]
pub struct NegotiationResult {
    pub success: bool,
    /// Capabilities both sides support, in platform order, each at the
    /// earlier of the two declared versions.
    pub common: Vec<CapabilityDescriptor>,
    /// Required capability names absent from `common`, in request order.
    pub missing_required: Vec<CapabilityName>,
    pub version_mismatches: Vec<VersionMismatch>,
    pub negotiated_version: Version,
}

impl NegotiationResult {
    /// Whether `common` includes a capability with this name.
    pub fn has_capability(&self, name: &CapabilityName) -> bool {
        self.capability(name).is_some()
    }

    pub fn capability(&self, name: &CapabilityName) -> Option<&CapabilityDescriptor> {
        self.common.iter().find(|cap| &cap.name == name)
    }

    /// Common capabilities whose `extends` parent did not make it into `common`.
    ///
    /// Extension chains are not enforced during negotiation; this only
    /// reports them so callers can decide.
    pub fn unresolved_extensions(&self) -> Vec<&CapabilityDescriptor> {
        let names: HashSet<&CapabilityName> = self.common.iter().map(|cap| &cap.name).collect();
        self.common
            .iter()
            .filter(|cap| matches!(&cap.extends, Some(parent) if !names.contains(parent)))
            .collect()
    }

    /// A human-readable explanation of why negotiation failed, `None` on success.
    pub fn failure_summary(&self) -> Option<String> {
        if self.success {
            return None;
        }
        let mut parts = Vec::new();
        if !self.missing_required.is_empty() {
            let names: Vec<&str> = self.missing_required.iter().map(CapabilityName::as_str).collect();
            parts.push(format!("missing required capabilities: {}", names.join(", ")));
        }
        if !self.version_mismatches.is_empty() {
            let details: Vec<String> = self
                .version_mismatches
                .iter()
                .map(|m| format!("{} (platform {}, business {})", m.capability, m.platform_version, m.business_version))
                .collect();
            parts.push(format!("incompatible versions: {}", details.join(", ")));
        }
        Some(parts.join("; "))
    }
}

// ---------------------------------------------------------------------------
// Negotiator
// ---------------------------------------------------------------------------

/// Negotiates a fixed platform capability set against business profiles.
#[derive(Debug, Clone, Default)]
pub struct CapabilityNegotiator {
    platform_capabilities: Vec<CapabilityDescriptor>,
}

impl CapabilityNegotiator {
    pub fn new(platform_capabilities: Vec<CapabilityDescriptor>) -> Self {
        CapabilityNegotiator {
            platform_capabilities,
        }
    }

    pub fn platform_capabilities(&self) -> &[CapabilityDescriptor] {
        &self.platform_capabilities
    }

    /// Negotiate against `profile`, requiring every name in `required`.
    ///
    /// 1. Business capabilities are indexed by name; a later duplicate wins.
    /// 2. Each platform capability the business also declares is compared:
    ///    same year → added to `common` at the earlier version; different
    ///    year or malformed version → recorded as a mismatch.
    /// 3. Required names not in `common` are reported as missing.
    /// 4. The protocol version is the earlier of the business's protocol
    ///    version and the oldest platform capability version.
    pub fn negotiate(&self, profile: &UcpProfile, required: &[CapabilityName]) -> NegotiationResult {
        let business: HashMap<&CapabilityName, &CapabilityDescriptor> =
            profile.ucp.capabilities.iter().map(|cap| (&cap.name, cap)).collect();

        let mut common = Vec::new();
        let mut version_mismatches = Vec::new();

        for platform_cap in &self.platform_capabilities {
            let Some(business_cap) = business.get(&platform_cap.name) else {
                continue;
            };

            if !platform_cap.version.compatible_with(&business_cap.version) {
                version_mismatches.push(VersionMismatch {
                    capability: platform_cap.name.clone(),
                    platform_version: platform_cap.version.clone(),
                    business_version: business_cap.version.clone(),
                });
                continue;
            }

            let mut negotiated = platform_cap.clone();
            negotiated.version = Version::earlier(&business_cap.version, &platform_cap.version).clone();
            common.push(negotiated);
        }

        let missing_required: Vec<CapabilityName> = required
            .iter()
            .filter(|name| !common.iter().any(|cap: &CapabilityDescriptor| &cap.name == *name))
            .cloned()
            .collect();

        let success = missing_required.is_empty() && version_mismatches.is_empty();
        let negotiated_version = self.negotiated_version(&profile.ucp.version);

        let result = NegotiationResult {
            success,
            common,
            missing_required,
            version_mismatches,
            negotiated_version,
        };

        if result.success {
            debug!(
                common = result.common.len(),
                version = %result.negotiated_version,
                "capability negotiation succeeded"
            );
        } else {
            warn!(
                missing = result.missing_required.len(),
                mismatches = result.version_mismatches.len(),
                "capability negotiation failed"
            );
        }
        for ext in result.unresolved_extensions() {
            debug!(capability = %ext.name, "negotiated extension without its parent capability");
        }

        result
    }

    /// The oldest version among the platform's own declared capabilities.
    pub fn min_platform_version(&self) -> Option<&Version> {
        self.platform_capabilities
            .iter()
            .map(|cap| &cap.version)
            .reduce(|min, v| Version::earlier(v, min))
    }

    /// With no platform capabilities there is nothing to bound the business
    /// version, so it is used as is.
    fn negotiated_version(&self, business_version: &Version) -> Version {
        match self.min_platform_version() {
            Some(platform_min) => Version::earlier(business_version, platform_min).clone(),
            None => business_version.clone(),
        }
    }
}
