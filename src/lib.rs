//! UCP SDK: Universal Commerce Protocol primitives - Rust implementation.
//!
//! This crate provides the pieces of the protocol that need more than plain
//! data transfer. It includes:
//!
//! - **webhook**: Detached-JWS webhook verification over JWK-derived keys (ES256, RS256)
//! - **signer**: Detached-JWS signing for businesses that send webhooks
//! - **jwk** / **jws**: JSON Web Key decoding and compact detached JWS parsing
//! - **negotiation**: Capability negotiation between a platform and a business profile
//! - **version** / **capability** / **profile**: Discovery document types and validation
//! - **credential**: Tagged payment credential types
//! - **discovery** / **store**: Platform-side profile discovery with injected fetch and storage

pub mod capability;
pub mod credential;
pub mod discovery;
pub mod jwk;
pub mod jws;
pub mod negotiation;
pub mod profile;
pub mod signer;
pub mod store;
pub mod version;
pub mod webhook;

pub use capability::{CapabilityDescriptor, CapabilityName};
pub use negotiation::{CapabilityNegotiator, NegotiationResult, VersionMismatch};
pub use profile::{DiscoveryProfile, UcpProfile};
pub use version::Version;
pub use webhook::{WebhookError, WebhookVerifier};

/// Errors that can occur throughout the UCP SDK.
#[derive(Debug, thiserror::Error)]
pub enum UcpError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Signing error: {0}")]
    SigningError(String),

    #[error("Discovery error: {0}")]
    DiscoveryError(String),

    #[error("Webhook signature error: {0}")]
    Webhook(#[from] WebhookError),
}
