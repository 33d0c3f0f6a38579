//! Key types with secure memory handling.
//!
//! All key types automatically zeroize their memory on drop to prevent
//! sensitive data from persisting in memory.

use rand::distributions::Alphanumeric;
use rand::Rng;
use std::fmt;
use zeroize::{Zeroize, ZeroizeOnDrop};

use opencdn_common::{CapabilityKey, Error, OwnershipSecret, Result};

/// Length of the cipher key in bytes (256-bit).
pub const KEY_LENGTH: usize = 32;

/// Length of the cipher IV in bytes.
pub const IV_LENGTH: usize = 16;

/// Bytes read from the KDF: key followed by IV.
pub const MATERIAL_LENGTH: usize = KEY_LENGTH + IV_LENGTH;

/// Generate a random printable key of `length` characters drawn from
/// `[A-Za-z0-9]`.
pub fn generate_key(length: usize) -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// Generate a fresh capability key.
///
/// # Errors
/// - Returns error if `length` is zero
pub fn generate_capability_key(length: usize) -> Result<CapabilityKey> {
    CapabilityKey::new(generate_key(length))
}

/// Generate a fresh ownership secret.
///
/// # Errors
/// - Returns error if `length` is zero
pub fn generate_ownership_secret(length: usize) -> Result<OwnershipSecret> {
    OwnershipSecret::new(generate_key(length))
}

/// Server-wide secret mixed into every object's cipher material.
///
/// Changing it makes every stored object undecryptable.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ServerSecret(Vec<u8>);

impl ServerSecret {
    /// Create a server secret.
    ///
    /// # Errors
    /// - Returns error if the secret is empty
    pub fn new(secret: impl Into<String>) -> Result<Self> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(Error::Config("Server key cannot be empty".to_string()));
        }
        Ok(Self(secret.into_bytes()))
    }

    /// Get the secret bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for ServerSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ServerSecret([REDACTED])")
    }
}

/// Cipher key and IV derived for a single capability key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct CipherMaterial {
    key: [u8; KEY_LENGTH],
    iv: [u8; IV_LENGTH],
}

impl CipherMaterial {
    /// Split raw KDF output into key and IV.
    pub fn from_derived(mut derived: [u8; MATERIAL_LENGTH]) -> Self {
        let mut key = [0u8; KEY_LENGTH];
        let mut iv = [0u8; IV_LENGTH];
        key.copy_from_slice(&derived[..KEY_LENGTH]);
        iv.copy_from_slice(&derived[KEY_LENGTH..]);
        derived.zeroize();
        Self { key, iv }
    }

    /// Get the key bytes.
    ///
    /// # Security
    /// The returned slice should be used immediately and not stored.
    pub fn key(&self) -> &[u8; KEY_LENGTH] {
        &self.key
    }

    /// Get the IV bytes.
    pub fn iv(&self) -> &[u8; IV_LENGTH] {
        &self.iv
    }
}

impl fmt::Debug for CipherMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CipherMaterial([REDACTED])")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_key_alphabet_and_length() {
        let key = generate_key(15);
        assert_eq!(key.len(), 15);
        assert!(key.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_generated_keys_differ() {
        // Random keys should be different
        assert_ne!(generate_key(20), generate_key(20));
    }

    #[test]
    fn test_zero_length_capability_key_fails() {
        assert!(generate_capability_key(0).is_err());
        assert!(generate_ownership_secret(0).is_err());
        assert_eq!(generate_capability_key(15).unwrap().as_str().len(), 15);
    }

    #[test]
    fn test_material_split() {
        let mut derived = [0u8; MATERIAL_LENGTH];
        for (i, b) in derived.iter_mut().enumerate() {
            *b = i as u8;
        }
        let material = CipherMaterial::from_derived(derived);
        assert_eq!(material.key()[0], 0);
        assert_eq!(material.key()[31], 31);
        assert_eq!(material.iv()[0], 32);
        assert_eq!(material.iv()[15], 47);
    }

    #[test]
    fn test_server_secret_empty_fails() {
        assert!(ServerSecret::new("").is_err());
        assert_eq!(format!("{:?}", ServerSecret::new("x").unwrap()), "ServerSecret([REDACTED])");
    }
}
