//! Platform-side discovery of business profiles.
//!
//! The SDK does not ship an HTTP client. Callers plug one in through
//! [`ProfileFetcher`], and discovered profiles are kept in any
//! [`ProfileStore`]. On top of that, `DiscoveryClient` wires discovery into
//! negotiation and webhook verification.

use crate::capability::CapabilityName;
use crate::negotiation::{CapabilityNegotiator, NegotiationResult};
use crate::profile::{join_path, UcpProfile, WELL_KNOWN_PATH};
use crate::store::ProfileStore;
use crate::webhook::WebhookVerifier;
use crate::UcpError;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Fetches a document by URL.
///
/// Implementations should return `UcpError::DiscoveryError` for transport
/// failures and non-success responses.
pub trait ProfileFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, UcpError>;
}

impl<F> ProfileFetcher for F
where
    F: Fn(&str) -> Result<Vec<u8>, UcpError>,
{
    fn fetch(&self, url: &str) -> Result<Vec<u8>, UcpError> {
        self(url)
    }
}

/// Options for a `DiscoveryClient`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Path of the discovery document, joined onto each business base URL.
    pub well_known_path: String,
    /// Reject profiles with malformed versions or capability names.
    pub strict: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        DiscoveryConfig {
            well_known_path: WELL_KNOWN_PATH.to_string(),
            strict: false,
        }
    }
}

/// Discovers, caches and uses business profiles.
pub struct DiscoveryClient<F, S> {
    fetcher: F,
    store: S,
    config: DiscoveryConfig,
}

impl<F: ProfileFetcher, S: ProfileStore> DiscoveryClient<F, S> {
    pub fn new(fetcher: F, store: S) -> Self {
        Self::with_config(fetcher, store, DiscoveryConfig::default())
    }

    pub fn with_config(fetcher: F, store: S, config: DiscoveryConfig) -> Self {
        DiscoveryClient {
            fetcher,
            store,
            config,
        }
    }

    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Return the profile for `base_url`, fetching it on first use.
    ///
    /// # Errors
    /// Fetch errors from the `ProfileFetcher`, `SerializationError` for an
    /// unparseable document, `InvalidInput` in strict mode for a malformed
    /// profile, and storage errors.
    pub fn discover(&mut self, base_url: &str) -> Result<UcpProfile, UcpError> {
        if let Some(profile) = self.store.get(base_url)? {
            debug!(business = base_url, "using stored discovery profile");
            return Ok(profile.clone());
        }

        let url = join_path(base_url, &self.config.well_known_path);
        let bytes = self.fetcher.fetch(&url).map_err(|e| {
            warn!(url = %url, error = %e, "failed to fetch discovery profile");
            e
        })?;
        let profile = UcpProfile::from_json(&bytes)?;
        if self.config.strict {
            profile.validate()?;
        }

        debug!(
            business = base_url,
            version = %profile.ucp.version,
            capabilities = profile.ucp.capabilities.len(),
            "discovered business profile"
        );
        self.store.put(base_url, profile.clone())?;
        Ok(profile)
    }

    /// Drop any stored profile for `base_url` and discover it again.
    pub fn refresh(&mut self, base_url: &str) -> Result<UcpProfile, UcpError> {
        self.store.delete(base_url)?;
        self.discover(base_url)
    }

    /// Discover `base_url` and negotiate against it.
    pub fn negotiate(
        &mut self,
        base_url: &str,
        negotiator: &CapabilityNegotiator,
        required: &[CapabilityName],
    ) -> Result<NegotiationResult, UcpError> {
        let profile = self.discover(base_url)?;
        Ok(negotiator.negotiate(&profile, required))
    }

    /// Build a verifier for webhooks signed by the business at `base_url`.
    pub fn webhook_verifier(&mut self, base_url: &str) -> Result<WebhookVerifier, UcpError> {
        let profile = self.discover(base_url)?;
        Ok(WebhookVerifier::from_profile(&profile)?)
    }
}
