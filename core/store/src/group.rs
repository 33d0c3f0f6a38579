//! Groups: named namespaces whose objects share one capability key.
//!
//! Layout: `/groups/{name}/private.key` holds the group's ownership digest
//! and `/groups/{name}/{hashed_key}/{filename}` its objects. Anyone holding
//! the group key and a filename can derive the shared address and read every
//! other file in the group; only mutations need the ownership secret.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::engine::CryptoEngine;
use crate::object::StoredObject;
use crate::ownership::{verify_namespace, write_digest};
use crate::policy::UploadPolicy;
use opencdn_common::{
    check_segment, CapabilityKey, Error, HashedKey, OwnershipSecret, Result, StorePath,
};
use opencdn_storage::StorageProvider;

/// Directory below the data root that holds all groups.
pub const GROUPS_DIR: &str = "groups";

/// Result of creating a group. Holds the only copies of its secrets.
#[derive(Debug)]
pub struct CreatedGroup {
    pub name: String,
    pub key: CapabilityKey,
    pub hashed_key: HashedKey,
    pub private_key: OwnershipSecret,
}

/// Contents of a group's key namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupListing {
    pub hashed_key: HashedKey,
    pub files: Vec<String>,
}

/// Store for groups.
pub struct GroupStore {
    provider: Arc<dyn StorageProvider>,
    engine: CryptoEngine,
    policy: Arc<UploadPolicy>,
}

impl GroupStore {
    /// Create a group store.
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

    fn groups_root() -> Result<StorePath> {
        StorePath::root().join(GROUPS_DIR)
    }

    fn group_path(name: &str) -> Result<StorePath> {
        check_segment(name)?;
        Self::groups_root()?.join(name)
    }

    fn key_namespace(&self, name: &str, key: &CapabilityKey) -> Result<(HashedKey, StorePath)> {
        self.policy.check_stored_group_name(name)?;
        let hashed_key = self.engine.hash_key(key);
        let path = Self::group_path(name)?.join(hashed_key.as_str())?;
        Ok((hashed_key, path))
    }

    /// Create a group with a fresh capability key.
    ///
    /// # Postconditions
    /// - The group namespace holds the secret's digest and one empty key
    ///   namespace
    ///
    /// # Errors
    /// - `InvalidAddress` if the name is rejected
    /// - `AlreadyExists` if the group exists
    pub async fn create_group(
        &self,
        name: &str,
        secret: Option<OwnershipSecret>,
    ) -> Result<CreatedGroup> {
        self.policy.check_group_name(name)?;

        self.provider.create_dir_all(&Self::groups_root()?).await?;
        let group = Self::group_path(name)?;
        self.provider.create_dir(&group).await.map_err(|e| match e {
            Error::AlreadyExists(_) => Error::AlreadyExists(format!("Group '{}' exists", name)),
            other => other,
        })?;

        let private_key = match secret {
            Some(secret) => secret,
            None => self.engine.generate_ownership_secret()?,
        };
        let key = self.engine.generate_capability_key()?;
        let hashed_key = self.engine.hash_key(&key);

        if let Err(e) = self
            .init_group(&group, &hashed_key, &private_key)
            .await
        {
            warn!(group = %name, error = %e, "Group creation failed, removing namespace");
            if let Err(cleanup) = self.provider.delete_dir_all(&group).await {
                warn!(group = %name, error = %cleanup, "Group cleanup failed");
            }
            return Err(e);
        }

        info!(group = %name, hashed_key = %hashed_key, "Group created");

        Ok(CreatedGroup {
            name: name.to_string(),
            key,
            hashed_key,
            private_key,
        })
    }

    async fn init_group(
        &self,
        group: &StorePath,
        hashed_key: &HashedKey,
        secret: &OwnershipSecret,
    ) -> Result<()> {
        write_digest(
            self.provider.as_ref(),
            group,
            self.engine.hash_algorithm(),
            secret,
        )
        .await?;
        self.provider
            .create_dir(&group.join(hashed_key.as_str())?)
            .await?;
        Ok(())
    }

    /// Prove ownership of a group.
    ///
    /// # Errors
    /// - `NotFound` if the group is absent
    /// - `Forbidden` if the digest is missing or does not match
    pub async fn authorize(&self, name: &str, secret: &OwnershipSecret) -> Result<()> {
        self.policy.check_stored_group_name(name)?;
        let group = Self::group_path(name)?;
        if !self.provider.exists(&group).await? {
            return Err(Error::NotFound(format!("Group '{}' not found", name)));
        }

        verify_namespace(
            self.provider.as_ref(),
            &group,
            self.engine.hash_algorithm(),
            secret,
        )
        .await
    }

    /// Encrypt and add a file to a group's key namespace.
    ///
    /// # Errors
    /// - `InvalidAddress` / `InvalidSuffix` / `TooLarge` from the upload policy
    /// - `NotFound` if the group or its key namespace is absent
    /// - `Forbidden` on ownership failure
    /// - `AlreadyExists` if the filename is taken
    pub async fn add_file(
        &self,
        name: &str,
        key: &CapabilityKey,
        content: Vec<u8>,
        filename: &str,
        secret: &OwnershipSecret,
    ) -> Result<StoredObject> {
        self.policy.check_upload(filename, content.len())?;
        self.authorize(name, secret).await?;

        let (hashed_key, namespace) = self.key_namespace(name, key)?;
        if !self.provider.exists(&namespace).await? {
            return Err(Error::NotFound(format!(
                "Key namespace not found in group '{}'",
                name
            )));
        }

        let size = content.len();
        let ciphertext = self.engine.encrypt(content, key).await?;
        self.provider
            .upload_new(&namespace.join(filename)?, ciphertext)
            .await
            .map_err(|e| match e {
                Error::AlreadyExists(_) => {
                    Error::AlreadyExists(format!("File '{}' exists in group", filename))
                }
                other => other,
            })?;

        info!(group = %name, hashed_key = %hashed_key, filename = %filename, size, "Group file stored");

        Ok(StoredObject {
            hashed_key,
            filename: filename.to_string(),
        })
    }

    /// List the files stored under a group key.
    ///
    /// # Errors
    /// - `NotFound` if the group or its key namespace is absent
    /// - `Forbidden` on ownership failure
    pub async fn list_files(
        &self,
        name: &str,
        key: &CapabilityKey,
        secret: &OwnershipSecret,
    ) -> Result<GroupListing> {
        self.authorize(name, secret).await?;

        let (hashed_key, namespace) = self.key_namespace(name, key)?;
        let mut files: Vec<String> = self
            .provider
            .list(&namespace)
            .await?
            .into_iter()
            .filter(|entry| !entry.is_directory)
            .map(|entry| entry.name)
            .collect();
        files.sort();

        Ok(GroupListing { hashed_key, files })
    }

    /// Delete a group and everything in it.
    ///
    /// # Errors
    /// - `NotFound` if the group is absent
    /// - `Forbidden` on ownership failure
    pub async fn delete_group(&self, name: &str, secret: &OwnershipSecret) -> Result<()> {
        self.authorize(name, secret).await?;
        self.provider
            .delete_dir_all(&Self::group_path(name)?)
            .await?;

        info!(group = %name, "Group deleted");
        Ok(())
    }

    /// Delete one file from a group.
    ///
    /// # Errors
    /// - `NotFound` if the group or file is absent
    /// - `Forbidden` on ownership failure
    pub async fn delete_file(
        &self,
        name: &str,
        key: &CapabilityKey,
        filename: &str,
        secret: &OwnershipSecret,
    ) -> Result<()> {
        self.policy.check_stored_filename(filename)?;
        self.authorize(name, secret).await?;

        let (hashed_key, namespace) = self.key_namespace(name, key)?;
        let path = namespace.join(filename)?;
        if !self.provider.exists(&path).await? {
            return Err(Error::NotFound(format!(
                "File '{}' not found in group",
                filename
            )));
        }

        self.provider.delete(&path).await?;

        info!(group = %name, hashed_key = %hashed_key, filename = %filename, "Group file deleted");
        Ok(())
    }

    /// Read and decrypt a group file. The group key is the only credential.
    ///
    /// # Errors
    /// - `InvalidAddress` if the group name or filename is unsafe
    /// - `NotFound` if the file is absent
    pub async fn get_file(&self, name: &str, key: &CapabilityKey, filename: &str) -> Result<Vec<u8>> {
        self.policy.check_stored_filename(filename)?;

        let (_, namespace) = self.key_namespace(name, key)?;
        let ciphertext = self.provider.download(&namespace.join(filename)?).await?;
        self.engine.decrypt(ciphertext, key).await
    }
}
