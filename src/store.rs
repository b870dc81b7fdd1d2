//! Discovery profile storage.
//!
//! Provides a trait-based storage abstraction and an in-memory implementation.
//! The `ProfileStore` trait is the minimal interface a platform needs to keep
//! the business profiles it has discovered; `MemoryStore` is a simple
//! HashMap-backed implementation suitable for testing and single-process use.

use crate::profile::UcpProfile;
use crate::UcpError;
use std::collections::HashMap;

/// Trait for discovery profile storage.
///
/// Profiles are keyed by the business base URL they were discovered from.
pub trait ProfileStore {
    /// Store a profile. An existing profile under the same key is overwritten.
    fn put(&mut self, business_url: &str, profile: UcpProfile) -> Result<(), UcpError>;

    /// Retrieve a profile. Returns `Ok(None)` if nothing is stored under the key.
    fn get(&self, business_url: &str) -> Result<Option<&UcpProfile>, UcpError>;

    /// Delete a profile. Returns `Ok(true)` if it existed.
    fn delete(&mut self, business_url: &str) -> Result<bool, UcpError>;

    /// List all stored business URLs, sorted.
    fn list(&self) -> Vec<&str>;

    fn has(&self, business_url: &str) -> bool;

    fn count(&self) -> usize;
}

/// In-memory profile store backed by a `HashMap`.
///
/// Not persistent across restarts and not thread-safe (wrap in a `Mutex` if needed).
#[derive(Debug, Default)]
pub struct MemoryStore {
    profiles: HashMap<String, UcpProfile>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ProfileStore for MemoryStore {
    fn put(&mut self, business_url: &str, profile: UcpProfile) -> Result<(), UcpError> {
        if business_url.is_empty() {
            return Err(UcpError::StorageError("Business URL cannot be empty".to_string()));
        }
        self.profiles.insert(business_url.to_string(), profile);
        Ok(())
    }

    fn get(&self, business_url: &str) -> Result<Option<&UcpProfile>, UcpError> {
        Ok(self.profiles.get(business_url))
    }

    fn delete(&mut self, business_url: &str) -> Result<bool, UcpError> {
        Ok(self.profiles.remove(business_url).is_some())
    }

    fn list(&self) -> Vec<&str> {
        let mut urls: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        urls.sort_unstable();
        urls
    }

    fn has(&self, business_url: &str) -> bool {
        self.profiles.contains_key(business_url)
    }

    fn count(&self) -> usize {
        self.profiles.len()
    }
}
