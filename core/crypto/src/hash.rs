//! One-way hashing of capability keys, ownership secrets and tokens.
//!
//! The digest of a capability key is its storage address, so the algorithm
//! must stay fixed for the lifetime of a data directory.

use serde::{Deserialize, Serialize};
use sha3::Digest;
use std::fmt;
use std::str::FromStr;

use opencdn_common::{CapabilityKey, Error, HashedKey, Result};

/// Supported digest algorithms, named as in the configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HashAlgorithm {
    #[default]
    #[serde(rename = "sha3_256")]
    Sha3_256,
    #[serde(rename = "sha3_512")]
    Sha3_512,
    #[serde(rename = "sha256")]
    Sha256,
    #[serde(rename = "sha512")]
    Sha512,
    #[serde(rename = "blake2b")]
    Blake2b,
    #[serde(rename = "blake2s")]
    Blake2s,
}

impl HashAlgorithm {
    /// Configuration name of the algorithm.
    pub fn name(&self) -> &'static str {
        match self {
            HashAlgorithm::Sha3_256 => "sha3_256",
            HashAlgorithm::Sha3_512 => "sha3_512",
            HashAlgorithm::Sha256 => "sha256",
            HashAlgorithm::Sha512 => "sha512",
            HashAlgorithm::Blake2b => "blake2b",
            HashAlgorithm::Blake2s => "blake2s",
        }
    }

    /// Compute the raw digest of `data`.
    pub fn digest(&self, data: &[u8]) -> Vec<u8> {
        match self {
            HashAlgorithm::Sha3_256 => sha3::Sha3_256::digest(data).to_vec(),
            HashAlgorithm::Sha3_512 => sha3::Sha3_512::digest(data).to_vec(),
            HashAlgorithm::Sha256 => sha2::Sha256::digest(data).to_vec(),
            HashAlgorithm::Sha512 => sha2::Sha512::digest(data).to_vec(),
            HashAlgorithm::Blake2b => blake2::Blake2b512::digest(data).to_vec(),
            HashAlgorithm::Blake2s => blake2::Blake2s256::digest(data).to_vec(),
        }
    }

    /// Lowercase hex digest of a UTF-8 string.
    pub fn hash_hex(&self, value: &str) -> String {
        hex::encode(self.digest(value.as_bytes()))
    }

    /// Derive the storage address of a capability key.
    ///
    /// # Postconditions
    /// - Deterministic: the same key always yields the same address
    pub fn hash_key(&self, key: &CapabilityKey) -> HashedKey {
        HashedKey::from_digest(&self.digest(key.as_str().as_bytes()))
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for HashAlgorithm {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "sha3_256" => Ok(HashAlgorithm::Sha3_256),
            "sha3_512" => Ok(HashAlgorithm::Sha3_512),
            "sha256" => Ok(HashAlgorithm::Sha256),
            "sha512" => Ok(HashAlgorithm::Sha512),
            "blake2b" => Ok(HashAlgorithm::Blake2b),
            "blake2s" => Ok(HashAlgorithm::Blake2s),
            other => Err(Error::Config(format!("Unknown hash algorithm: {}", other))),
        }
    }
}
