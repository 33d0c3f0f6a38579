//! Cryptographic primitives for OpenCDN.
//!
//! This module provides:
//! - One-way hashing of capability keys into storage addresses
//! - Cipher material derivation using PBKDF2-HMAC-SHA1
//! - Object encryption using AES-256-CFB8 with block padding
//! - RSA-OAEP sealing of authentication tokens
//!
//! # Security Guarantees
//! - All key material is automatically zeroized on drop
//! - No plaintext, capability key or secret is ever logged
//! - Ownership digests are compared in constant time

pub mod cipher;
pub mod hash;
pub mod kdf;
pub mod keys;
pub mod seal;

pub use cipher::{ObjectCipher, BLOCK_SIZE};
pub use hash::HashAlgorithm;
pub use kdf::{derive_cipher_material, KdfParams};
pub use keys::{
    generate_capability_key, generate_key, generate_ownership_secret, CipherMaterial,
    ServerSecret,
};
pub use seal::SealingKey;

use subtle::ConstantTimeEq;

/// Compare two digests without leaking where they first differ.
pub fn digests_equal(a: &str, b: &str) -> bool {
    a.len() == b.len() && bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digests_equal() {
        assert!(digests_equal("abc", "abc"));
        assert!(!digests_equal("abc", "abd"));
        assert!(!digests_equal("abc", "abcd"));
    }
}
