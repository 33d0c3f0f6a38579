//! Storage provider trait definition.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use opencdn_common::{Result, StorePath};

/// Metadata for a stored entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Name of the entry (last path component).
    pub name: String,
    /// Size in bytes (None for directories).
    pub size: Option<u64>,
    /// Whether this is a directory.
    pub is_directory: bool,
    /// Last modification time.
    pub modified: DateTime<Utc>,
}

/// Byte-blob persistence used by the object and group stores.
///
/// Paths are hierarchical: a file lives in a directory, and namespaces are
/// directories. The two `*_new`/`create_dir` operations are the only places
/// where existence is decided, and they must be atomic so that two
/// concurrent writers cannot both claim the same name.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Get the provider name (e.g., "local", "memory").
    fn name(&self) -> &str;

    /// Write a file, replacing any previous content.
    ///
    /// # Preconditions
    /// - Parent directory must exist
    ///
    /// # Postconditions
    /// - File holds exactly `data`
    ///
    /// # Errors
    /// - `NotFound` if the parent directory is missing
    async fn upload(&self, path: &StorePath, data: Vec<u8>) -> Result<Metadata>;

    /// Write a file only if nothing exists at `path`.
    ///
    /// # Postconditions
    /// - On success the file was created by this call
    ///
    /// # Errors
    /// - `AlreadyExists` if the path is occupied
    /// - `NotFound` if the parent directory is missing
    async fn upload_new(&self, path: &StorePath, data: Vec<u8>) -> Result<Metadata>;

    /// Read a whole file.
    ///
    /// # Errors
    /// - `NotFound` if no file exists at `path`
    async fn download(&self, path: &StorePath) -> Result<Vec<u8>>;

    /// Check if a path exists.
    async fn exists(&self, path: &StorePath) -> Result<bool>;

    /// Delete a file.
    ///
    /// # Errors
    /// - `NotFound` if no file exists at `path`
    async fn delete(&self, path: &StorePath) -> Result<()>;

    /// List the direct children of a directory, sorted by name.
    ///
    /// # Errors
    /// - `NotFound` if the directory is missing
    async fn list(&self, path: &StorePath) -> Result<Vec<Metadata>>;

    /// Create a single directory.
    ///
    /// # Postconditions
    /// - On success the directory was created by this call
    ///
    /// # Errors
    /// - `AlreadyExists` if the path is occupied
    /// - `NotFound` if the parent directory is missing
    async fn create_dir(&self, path: &StorePath) -> Result<Metadata>;

    /// Create a directory and any missing parents. Existing directories are
    /// left untouched.
    async fn create_dir_all(&self, path: &StorePath) -> Result<()>;

    /// Delete an empty directory.
    ///
    /// # Errors
    /// - `NotFound` if the directory is missing
    /// - `Storage` if it still has entries
    async fn delete_dir(&self, path: &StorePath) -> Result<()>;

    /// Delete a directory and everything below it.
    ///
    /// A directory that is already gone counts as deleted.
    async fn delete_dir_all(&self, path: &StorePath) -> Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_namespace_metadata_has_no_size() {
        let namespace = Metadata {
            name: "32eb906c50f681a35de7791110e77eaa90ef1d1aa96c28aa4feefc144e037c74".to_string(),
            size: None,
            is_directory: true,
            modified: Utc::now(),
        };

        let json = serde_json::to_value(&namespace).unwrap();
        assert_eq!(json["size"], serde_json::Value::Null);
        assert_eq!(json["is_directory"], true);

        let decoded: Metadata = serde_json::from_value(json).unwrap();
        assert_eq!(decoded, namespace);
    }
}
