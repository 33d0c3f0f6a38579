//! Ownership digests and their verification.

use tracing::debug;

use opencdn_common::{Error, OwnershipSecret, Result, StorePath};
use opencdn_crypto::{digests_equal, HashAlgorithm};
use opencdn_storage::StorageProvider;

/// Name of the digest file inside an object or group namespace.
pub const OWNERSHIP_FILE: &str = "private.key";

/// Hex digest of an ownership secret, as persisted next to the data it
/// protects.
#[derive(Clone, PartialEq, Eq)]
pub struct OwnershipDigest(String);

impl OwnershipDigest {
    /// Digest a secret.
    pub fn of(hash: HashAlgorithm, secret: &OwnershipSecret) -> Self {
        Self(hash.hash_hex(secret.as_str()))
    }

    /// Parse a persisted digest. Surrounding whitespace is ignored.
    ///
    /// # Errors
    /// - `Error::Serialization` if the file is not UTF-8
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let text = std::str::from_utf8(bytes)
            .map_err(|e| Error::Serialization(format!("Ownership digest is not UTF-8: {}", e)))?;
        Ok(Self(text.trim().to_string()))
    }

    /// Check a secret against this digest in constant time.
    pub fn verify(&self, hash: HashAlgorithm, secret: &OwnershipSecret) -> bool {
        digests_equal(&self.0, &hash.hash_hex(secret.as_str()))
    }

    /// Bytes to persist.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }
}

impl std::fmt::Debug for OwnershipDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OwnershipDigest({})", self.0)
    }
}

/// Path of the digest file in a namespace.
pub fn digest_path(namespace: &StorePath) -> Result<StorePath> {
    namespace.join(OWNERSHIP_FILE)
}

/// Persist the digest of `secret` into `namespace`.
pub async fn write_digest(
    provider: &dyn StorageProvider,
    namespace: &StorePath,
    hash: HashAlgorithm,
    secret: &OwnershipSecret,
) -> Result<()> {
    let digest = OwnershipDigest::of(hash, secret);
    provider
        .upload(&digest_path(namespace)?, digest.to_bytes())
        .await?;
    Ok(())
}

/// Prove ownership of a namespace.
///
/// # Preconditions
/// - The namespace itself exists
///
/// # Errors
/// - `Error::Forbidden` if the digest file is missing or does not match
pub async fn verify_namespace(
    provider: &dyn StorageProvider,
    namespace: &StorePath,
    hash: HashAlgorithm,
    secret: &OwnershipSecret,
) -> Result<()> {
    let stored = match provider.download(&digest_path(namespace)?).await {
        Ok(bytes) => OwnershipDigest::parse(&bytes)?,
        Err(Error::NotFound(_)) => {
            debug!(namespace = %namespace, "Ownership digest missing");
            return Err(Error::Forbidden("No ownership digest".to_string()));
        }
        Err(e) => return Err(e),
    };

    if !stored.verify(hash, secret) {
        debug!(namespace = %namespace, "Ownership secret mismatch");
        return Err(Error::Forbidden("Ownership secret mismatch".to_string()));
    }

    Ok(())
}

/// Map a missing entry to success, for deletes that may be retried.
pub(crate) fn ignore_missing(result: Result<()>) -> Result<()> {
    match result {
        Err(Error::NotFound(_)) => Ok(()),
        other => other,
    }
}
