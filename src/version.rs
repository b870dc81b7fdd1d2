//! Protocol and capability version strings.
//!
//! UCP versions are dates in `YYYY-MM-DD` form. The pattern is purely
//! syntactic: `9999-99-99` is a valid version. Two versions are compatible
//! when they share the same year, and versions order by their three integer
//! components from left to right.

use crate::UcpError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::LazyLock;

static VERSION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap_or_else(|e| panic!("invalid version pattern: {e}"))
});

/// A UCP version in `YYYY-MM-DD` format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(pub String);

impl Version {
    /// Create a new version from any string. No validation is performed.
    pub fn new(version: impl Into<String>) -> Self {
        Self(version.into())
    }

    /// Get the version as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether the version matches `YYYY-MM-DD` exactly.
    pub fn is_valid(&self) -> bool {
        VERSION_PATTERN.is_match(&self.0)
    }

    /// The year component: everything before the first `-`.
    pub fn year(&self) -> &str {
        self.0.split('-').next().unwrap_or_default()
    }

    /// Two versions are compatible iff both are valid and their years are equal.
    ///
    /// `2026-01-11` and `2026-06-30` are compatible; `2025-12-31` and
    /// `2026-01-01` are not.
    pub fn compatible_with(&self, other: &Version) -> bool {
        self.is_valid() && other.is_valid() && self.year() == other.year()
    }

    /// Compare two versions by (year, month, day) as integers.
    ///
    /// A component that is missing or not an integer counts as `0`, so
    /// malformed input still yields a total order instead of an error.
    pub fn compare(&self, other: &Version) -> Ordering {
        self.components().cmp(&other.components())
    }

    /// Return whichever of `a` and `b` is earlier. Ties return `b`.
    pub fn earlier<'a>(a: &'a Version, b: &'a Version) -> &'a Version {
        if a.compare(b) == Ordering::Less {
            a
        } else {
            b
        }
    }

    fn components(&self) -> [i64; 3] {
        let mut out = [0i64; 3];
        for (slot, part) in out.iter_mut().zip(self.0.split('-')) {
            *slot = part.parse().unwrap_or(0);
        }
        out
    }
}

impl From<&str> for Version {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Version {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl AsRef<str> for Version {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Check that a version string is in `YYYY-MM-DD` format.
///
/// # Errors
/// Returns `UcpError::InvalidInput` naming the offending version.
pub fn validate_version(version: &Version) -> Result<(), UcpError> {
    if !version.is_valid() {
        return Err(UcpError::InvalidInput(format!(
            "invalid version: {} (must be YYYY-MM-DD format)",
            version
        )));
    }
    Ok(())
}
