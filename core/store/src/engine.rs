//! Key and cipher engine shared by the object and group stores.

use std::sync::Arc;

use opencdn_common::{CapabilityKey, Error, HashedKey, OwnershipSecret, Result};
use opencdn_crypto::{
    generate_capability_key, generate_ownership_secret, HashAlgorithm, ObjectCipher,
};

/// Default length of generated capability keys and ownership secrets.
pub const DEFAULT_KEY_LENGTH: usize = 15;

/// Hashing, key generation and object encryption behind one handle.
///
/// Cipher work is CPU bound, so it runs on the blocking thread pool.
#[derive(Debug, Clone)]
pub struct CryptoEngine {
    hash: HashAlgorithm,
    cipher: Arc<ObjectCipher>,
    key_length: usize,
    secret_length: usize,
}

impl CryptoEngine {
    /// Create an engine.
    ///
    /// # Errors
    /// - `Error::Config` if a key length is zero
    pub fn new(
        hash: HashAlgorithm,
        cipher: ObjectCipher,
        key_length: usize,
        secret_length: usize,
    ) -> Result<Self> {
        if key_length == 0 || secret_length == 0 {
            return Err(Error::Config(
                "Generated key lengths must be positive".to_string(),
            ));
        }
        Ok(Self {
            hash,
            cipher: Arc::new(cipher),
            key_length,
            secret_length,
        })
    }

    /// Hash algorithm used for addresses and digests.
    pub fn hash_algorithm(&self) -> HashAlgorithm {
        self.hash
    }

    /// Storage address of a capability key.
    pub fn hash_key(&self, key: &CapabilityKey) -> HashedKey {
        self.hash.hash_key(key)
    }

    /// Generate a fresh capability key.
    pub fn generate_capability_key(&self) -> Result<CapabilityKey> {
        generate_capability_key(self.key_length)
    }

    /// Generate a fresh ownership secret.
    pub fn generate_ownership_secret(&self) -> Result<OwnershipSecret> {
        generate_ownership_secret(self.secret_length)
    }

    /// Encrypt object content under `key`.
    pub async fn encrypt(&self, content: Vec<u8>, key: &CapabilityKey) -> Result<Vec<u8>> {
        let cipher = Arc::clone(&self.cipher);
        let key = key.clone();
        tokio::task::spawn_blocking(move || cipher.encrypt(&content, &key))
            .await
            .map_err(|e| Error::Crypto(format!("Cipher task failed: {}", e)))?
    }

    /// Decrypt stored content with `key`.
    pub async fn decrypt(&self, ciphertext: Vec<u8>, key: &CapabilityKey) -> Result<Vec<u8>> {
        let cipher = Arc::clone(&self.cipher);
        let key = key.clone();
        tokio::task::spawn_blocking(move || cipher.decrypt(&ciphertext, &key))
            .await
            .map_err(|e| Error::Crypto(format!("Cipher task failed: {}", e)))?
    }
}
