//! Single-object namespaces addressed by hashed capability keys.
//!
//! Layout: `/{hashed_key}/{filename}` holds the ciphertext and
//! `/{hashed_key}/private.key` the ownership digest.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::engine::CryptoEngine;
use crate::ownership::{digest_path, ignore_missing, verify_namespace, write_digest};
use crate::policy::UploadPolicy;
use opencdn_common::{CapabilityKey, Error, HashedKey, OwnershipSecret, Result, StorePath};
use opencdn_storage::StorageProvider;

/// Address of a stored object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    /// Namespace the object lives in.
    pub hashed_key: HashedKey,
    /// Name of the content file.
    pub filename: String,
}

/// Store for objects that each own a namespace.
pub struct ObjectStore {
    provider: Arc<dyn StorageProvider>,
    engine: CryptoEngine,
    policy: Arc<UploadPolicy>,
}

impl ObjectStore {
    /// Create an object store.
    pub fn new(
        provider: Arc<dyn StorageProvider>,
        engine: CryptoEngine,
        policy: Arc<UploadPolicy>,
    ) -> Self {
        Self {
            provider,
            engine,
            policy,
        }
    }

    fn namespace(hashed_key: &HashedKey) -> Result<StorePath> {
        StorePath::root().join(hashed_key.as_str())
    }

    /// Encrypt and store an object.
    ///
    /// # Preconditions
    /// - `filename` passes the upload policy
    ///
    /// # Postconditions
    /// - The namespace `hash(key)` holds the ciphertext and the secret's digest
    ///
    /// # Errors
    /// - `InvalidAddress` / `InvalidSuffix` if the filename is rejected
    /// - `TooLarge` if the content exceeds the limit
    /// - `AddressCollision` if the namespace already exists
    pub async fn put(
        &self,
        content: Vec<u8>,
        key: &CapabilityKey,
        secret: &OwnershipSecret,
        filename: &str,
    ) -> Result<StoredObject> {
        self.policy.check_upload(filename, content.len())?;

        let hashed_key = self.engine.hash_key(key);
        let namespace = Self::namespace(&hashed_key)?;
        let size = content.len();

        // The atomic create is the collision check
        self.provider
            .create_dir(&namespace)
            .await
            .map_err(|e| match e {
                Error::AlreadyExists(_) => {
                    Error::AddressCollision(format!("Namespace {} is taken", hashed_key))
                }
                other => other,
            })?;

        if let Err(e) = self.write_object(&namespace, content, key, secret, filename).await {
            warn!(hashed_key = %hashed_key, error = %e, "Upload failed, removing namespace");
            if let Err(cleanup) = self.provider.delete_dir_all(&namespace).await {
                warn!(hashed_key = %hashed_key, error = %cleanup, "Namespace cleanup failed");
            }
            return Err(e);
        }

        info!(hashed_key = %hashed_key, filename = %filename, size, "Object stored");

        Ok(StoredObject {
            hashed_key,
            filename: filename.to_string(),
        })
    }

    async fn write_object(
        &self,
        namespace: &StorePath,
        content: Vec<u8>,
        key: &CapabilityKey,
        secret: &OwnershipSecret,
        filename: &str,
    ) -> Result<()> {
        let ciphertext = self.engine.encrypt(content, key).await?;
        self.provider
            .upload(&namespace.join(filename)?, ciphertext)
            .await?;
        write_digest(
            self.provider.as_ref(),
            namespace,
            self.engine.hash_algorithm(),
            secret,
        )
        .await
    }

    /// Read and decrypt an object. The capability key is the only credential.
    ///
    /// # Errors
    /// - `InvalidAddress` if the filename is unsafe
    /// - `NotFound` if the namespace or file is absent
    /// - `Decode` if the key does not decrypt the content
    pub async fn get(&self, key: &CapabilityKey, filename: &str) -> Result<Vec<u8>> {
        self.policy.check_stored_filename(filename)?;

        let hashed_key = self.engine.hash_key(key);
        let path = Self::namespace(&hashed_key)?.join(filename)?;
        debug!(hashed_key = %hashed_key, filename = %filename, "Reading object");

        let ciphertext = self.provider.download(&path).await?;
        self.engine.decrypt(ciphertext, key).await
    }

    /// Delete an object after proving ownership.
    ///
    /// # Postconditions
    /// - Content, digest and namespace are removed in that order
    ///
    /// # Errors
    /// - `NotFound` if the namespace or file is absent
    /// - `Forbidden` if the digest is missing or does not match
    pub async fn delete(
        &self,
        key: &CapabilityKey,
        filename: &str,
        secret: &OwnershipSecret,
    ) -> Result<()> {
        self.policy.check_stored_filename(filename)?;

        let hashed_key = self.engine.hash_key(key);
        let namespace = Self::namespace(&hashed_key)?;
        let path = namespace.join(filename)?;

        if !self.provider.exists(&path).await? {
            return Err(Error::NotFound(format!(
                "File not found: {}/{}",
                hashed_key, filename
            )));
        }

        verify_namespace(
            self.provider.as_ref(),
            &namespace,
            self.engine.hash_algorithm(),
            secret,
        )
        .await?;

        // Content first so the digest keeps guarding the namespace until last
        self.provider.delete(&path).await?;
        ignore_missing(self.provider.delete(&digest_path(&namespace)?).await)?;
        ignore_missing(self.provider.delete_dir(&namespace).await)?;

        info!(hashed_key = %hashed_key, filename = %filename, "Object deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{engine, key, secret};
    use opencdn_storage::{LocalProvider, MemoryProvider};

    fn store() -> (Arc<MemoryProvider>, ObjectStore) {
        let provider = Arc::new(MemoryProvider::new());
        let store = ObjectStore::new(
            provider.clone(),
            engine(),
            Arc::new(UploadPolicy::default()),
        );
        (provider, store)
    }

    #[tokio::test]
    async fn test_put_get_hello() {
        let (provider, store) = store();
        let k = key("abc123456789012");

        let stored = store
            .put(b"hello".to_vec(), &k, &secret("owner"), "hello.txt")
            .await
            .unwrap();
        assert_eq!(
            stored.hashed_key.as_str(),
            "32eb906c50f681a35de7791110e77eaa90ef1d1aa96c28aa4feefc144e037c74"
        );

        let raw = provider
            .download(&StorePath::parse(&format!("/{}/hello.txt", stored.hashed_key)).unwrap())
            .await
            .unwrap();
        assert_eq!(hex::encode(&raw), "e08b8cf5704f0c54f7b3a58ab8c6596c");

        assert_eq!(store.get(&k, "hello.txt").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_get_with_other_key() {
        let (_provider, store) = store();
        store
            .put(b"hello".to_vec(), &key("abc123456789012"), &secret("o"), "hello.txt")
            .await
            .unwrap();

        // A different key hashes to a different, empty address
        assert!(matches!(
            store.get(&key("zzz123456789012"), "hello.txt").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_put_collision() {
        let (_provider, store) = store();
        let k = key("samekey");
        store.put(b"a".to_vec(), &k, &secret("o"), "a.txt").await.unwrap();

        assert!(matches!(
            store.put(b"b".to_vec(), &k, &secret("o"), "b.txt").await,
            Err(Error::AddressCollision(_))
        ));
        assert_eq!(store.get(&k, "a.txt").await.unwrap(), b"a");
    }

    #[tokio::test]
    async fn test_put_validation() {
        let (provider, store) = store();
        let k = key("k");

        assert!(matches!(
            store.put(vec![1], &k, &secret("o"), "../x.txt").await,
            Err(Error::InvalidAddress(_))
        ));
        assert!(matches!(
            store.put(vec![1], &k, &secret("o"), "x.exe").await,
            Err(Error::InvalidSuffix(_))
        ));
        assert!(matches!(
            store.put(vec![1], &k, &secret("o"), "private.key").await,
            Err(Error::InvalidAddress(_))
        ));

        // Nothing was created
        assert!(provider.list(&StorePath::root()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_put_too_large() {
        let provider = Arc::new(MemoryProvider::new());
        let policy = UploadPolicy {
            max_object_bytes: 3,
            ..UploadPolicy::default()
        };
        let store = ObjectStore::new(provider, engine(), Arc::new(policy));

        assert!(matches!(
            store.put(vec![0; 4], &key("k"), &secret("o"), "a.bin").await,
            Err(Error::TooLarge(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_wrong_secret_keeps_object() {
        let (_provider, store) = store();
        let k = key("abc123456789012");
        store.put(b"hello".to_vec(), &k, &secret("owner"), "hello.txt").await.unwrap();

        assert!(matches!(
            store.delete(&k, "hello.txt", &secret("intruder")).await,
            Err(Error::Forbidden(_))
        ));
        assert_eq!(store.get(&k, "hello.txt").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn test_delete_removes_everything() {
        let (provider, store) = store();
        let k = key("abc123456789012");
        let stored = store.put(b"hello".to_vec(), &k, &secret("owner"), "hello.txt").await.unwrap();

        store.delete(&k, "hello.txt", &secret("owner")).await.unwrap();

        let ns = StorePath::root().join(stored.hashed_key.as_str()).unwrap();
        assert!(!provider.exists(&ns).await.unwrap());
        assert!(matches!(
            store.get(&k, "hello.txt").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.delete(&k, "hello.txt", &secret("owner")).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_delete_without_digest_is_forbidden() {
        let (provider, store) = store();
        let k = key("abc123456789012");
        let stored = store.put(b"hello".to_vec(), &k, &secret("owner"), "hello.txt").await.unwrap();

        let ns = StorePath::root().join(stored.hashed_key.as_str()).unwrap();
        provider.delete(&digest_path(&ns).unwrap()).await.unwrap();

        assert!(matches!(
            store.delete(&k, "hello.txt", &secret("owner")).await,
            Err(Error::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn test_digest_file_is_not_readable() {
        let (_provider, store) = store();
        let k = key("abc123456789012");
        store.put(b"hello".to_vec(), &k, &secret("owner"), "hello.txt").await.unwrap();

        assert!(matches!(
            store.get(&k, "private.key").await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_empty_and_aligned_objects() {
        let (_provider, store) = store();

        let k1 = key("emptyobject");
        store.put(Vec::new(), &k1, &secret("o"), "empty.txt").await.unwrap();
        assert!(store.get(&k1, "empty.txt").await.unwrap().is_empty());

        let k2 = key("alignedobject");
        store.put(vec![7u8; 32], &k2, &secret("o"), "aligned.bin").await.unwrap();
        assert_eq!(store.get(&k2, "aligned.bin").await.unwrap(), vec![7u8; 32]);
    }

    fn local_store(root: &std::path::Path) -> ObjectStore {
        let provider = Arc::new(LocalProvider::new(root).unwrap());
        ObjectStore::new(provider, engine(), Arc::new(UploadPolicy::default()))
    }

    #[tokio::test]
    async fn test_disallowed_filename_is_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = local_store(dir.path());
        let k = key("abc123456789012");
        let owner = secret("owner");
        store.put(b"hello".to_vec(), &k, &owner, "hello.txt").await.unwrap();

        // Never reaches the filesystem, where a NUL byte is an I/O error
        assert!(matches!(
            store.get(&k, "hel\0lo.txt").await,
            Err(Error::NotFound(_))
        ));
        assert!(matches!(
            store.delete(&k, "a\tb.txt", &owner).await,
            Err(Error::NotFound(_))
        ));
        assert_eq!(store.get(&k, "hello.txt").await.unwrap(), b"hello");
    }

    async fn race_puts(store: Arc<ObjectStore>) {
        let mut handles = Vec::new();
        for i in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let content = format!("v{}", i).into_bytes();
                store
                    .put(content, &key("abc123456789012"), &secret("owner"), "race.txt")
                    .await
            }));
        }

        let mut stored = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => stored += 1,
                Err(Error::AddressCollision(_)) => {}
                Err(e) => panic!("unexpected error: {}", e),
            }
        }
        assert_eq!(stored, 1);

        let content = store.get(&key("abc123456789012"), "race.txt").await.unwrap();
        assert!(content.starts_with(b"v"));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_put_memory() {
        let (_provider, store) = store();
        race_puts(Arc::new(store)).await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_put_local() {
        let dir = tempfile::tempdir().unwrap();
        race_puts(Arc::new(local_store(dir.path()))).await;
    }
}
