//! Common types used throughout OpenCDN.

use serde::{Deserialize, Serialize};
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Check a single user supplied address segment.
///
/// Rejects empty segments, path separators and any parent-directory
/// sequence, even when the surrounding characters are otherwise allowed.
///
/// # Errors
/// - `Error::InvalidAddress` if the segment is unsafe
pub fn check_segment(segment: &str) -> crate::Result<()> {
    if segment.is_empty() {
        return Err(crate::Error::InvalidAddress(
            "Address segment cannot be empty".to_string(),
        ));
    }
    if segment.contains('/') || segment.contains('\\') {
        return Err(crate::Error::InvalidAddress(
            "Address segment cannot contain separators".to_string(),
        ));
    }
    if segment == "." || segment.contains("..") {
        return Err(crate::Error::InvalidAddress(
            "Address segment cannot reference a parent directory".to_string(),
        ));
    }
    Ok(())
}

/// Secret string that is both the read credential and the storage address
/// seed of an object.
///
/// Never persisted in plaintext. Zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct CapabilityKey(String);

impl CapabilityKey {
    /// Wrap a user supplied or generated key.
    ///
    /// # Errors
    /// - `Error::InvalidAddress` if the key contains separators or `..`
    pub fn new(key: impl Into<String>) -> crate::Result<Self> {
        let key = key.into();
        check_segment(&key)?;
        Ok(Self(key))
    }

    /// Get the raw key.
    ///
    /// # Security
    /// The returned value must never be logged.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CapabilityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CapabilityKey([REDACTED])")
    }
}

/// Secret required to delete an object or manage a group.
///
/// Only its digest is ever persisted.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct OwnershipSecret(String);

impl OwnershipSecret {
    /// Wrap an ownership secret.
    ///
    /// # Errors
    /// - `Error::BadRequest` if the secret is empty
    pub fn new(secret: impl Into<String>) -> crate::Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(crate::Error::BadRequest(
                "Ownership secret cannot be empty".to_string(),
            ));
        }
        Ok(Self(secret))
    }

    /// Get the raw secret.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for OwnershipSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OwnershipSecret([REDACTED])")
    }
}

/// Hex encoded one-way digest of a capability key.
///
/// Used as the public storage address of an object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct HashedKey(String);

impl HashedKey {
    /// Create from a hex digest.
    ///
    /// # Errors
    /// - Returns error if the value is empty or not lowercase hex
    pub fn from_hex(hex: impl Into<String>) -> crate::Result<Self> {
        let hex = hex.into();
        if hex.is_empty() || !hex.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(crate::Error::InvalidAddress(
                "Hashed key must be lowercase hex".to_string(),
            ));
        }
        Ok(Self(hex))
    }

    /// Hex encode raw digest bytes.
    pub fn from_digest(digest: &[u8]) -> Self {
        Self(hex::encode(digest))
    }

    /// Get the hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for HashedKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A path inside the store, independent of the backing storage.
///
/// Every component passes [`check_segment`], so a `StorePath` can never
/// escape the storage root.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StorePath {
    components: Vec<String>,
}

impl StorePath {
    /// Create a root path.
    pub fn root() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Create a path from string components.
    ///
    /// # Errors
    /// - Returns error if any component is invalid
    pub fn from_components(components: Vec<String>) -> crate::Result<Self> {
        for comp in &components {
            check_segment(comp)?;
        }
        Ok(Self { components })
    }

    /// Parse a path string into StorePath.
    ///
    /// Uses '/' as separator.
    pub fn parse(path: &str) -> crate::Result<Self> {
        let path = path.trim_start_matches('/').trim_end_matches('/');
        if path.is_empty() {
            return Ok(Self::root());
        }

        let components: Vec<String> = path.split('/').map(String::from).collect();
        Self::from_components(components)
    }

    /// Check if this is the root path.
    pub fn is_root(&self) -> bool {
        self.components.is_empty()
    }

    /// Get the parent path, if any.
    pub fn parent(&self) -> Option<Self> {
        if self.is_root() {
            None
        } else {
            let mut components = self.components.clone();
            components.pop();
            Some(Self { components })
        }
    }

    /// Get the file/directory name (last component).
    pub fn name(&self) -> Option<&str> {
        self.components.last().map(|s| s.as_str())
    }

    /// Join this path with a child component.
    pub fn join(&self, child: &str) -> crate::Result<Self> {
        check_segment(child)?;
        let mut components = self.components.clone();
        components.push(child.to_string());
        Ok(Self { components })
    }

    /// Get the path components.
    pub fn components(&self) -> &[String] {
        &self.components
    }

    /// Convert to a string representation.
    pub fn to_string_path(&self) -> String {
        if self.is_root() {
            "/".to_string()
        } else {
            format!("/{}", self.components.join("/"))
        }
    }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_string_path())
    }
}
