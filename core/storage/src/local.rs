//! Local filesystem storage provider.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::provider::{Metadata, StorageProvider};
use opencdn_common::{Error, Result, StorePath};

/// Local filesystem storage provider.
///
/// Maps every [`StorePath`] onto a directory tree below `root`.
pub struct LocalProvider {
    root: PathBuf,
}

impl LocalProvider {
    /// Create a new local provider with the given root directory.
    ///
    /// # Postconditions
    /// - Root directory is created if it doesn't exist
    ///
    /// # Errors
    /// - Permission denied
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref().to_path_buf();

        // Create root if it doesn't exist (sync for constructor)
        std::fs::create_dir_all(&root)?;

        Ok(Self { root })
    }

    /// Convert a StorePath to a filesystem path.
    fn to_fs_path(&self, path: &StorePath) -> PathBuf {
        let mut fs_path = self.root.clone();
        for component in path.components() {
            fs_path.push(component);
        }
        fs_path
    }

    /// Create metadata from filesystem metadata.
    fn create_metadata(name: &str, fs_meta: &std::fs::Metadata) -> Metadata {
        let modified: DateTime<Utc> = fs_meta
            .modified()
            .map(|t| t.into())
            .unwrap_or_else(|_| Utc::now());

        Metadata {
            name: name.to_string(),
            size: fs_meta.is_file().then(|| fs_meta.len()),
            is_directory: fs_meta.is_dir(),
            modified,
        }
    }

    async fn stat(&self, path: &StorePath) -> Result<Metadata> {
        let fs_meta = fs::metadata(self.to_fs_path(path))
            .await
            .map_err(|e| map_io(e, path))?;
        Ok(Self::create_metadata(path.name().unwrap_or("/"), &fs_meta))
    }
}

/// Translate "not found" and "already exists" into their domain errors so
/// callers can branch on them.
fn map_io(err: std::io::Error, path: &StorePath) -> Error {
    match err.kind() {
        ErrorKind::NotFound => Error::NotFound(format!("Path not found: {}", path)),
        ErrorKind::AlreadyExists => Error::AlreadyExists(format!("Path already exists: {}", path)),
        _ => Error::Io(err),
    }
}

#[async_trait]
impl StorageProvider for LocalProvider {
    fn name(&self) -> &str {
        "local"
    }

    async fn upload(&self, path: &StorePath, data: Vec<u8>) -> Result<Metadata> {
        fs::write(self.to_fs_path(path), &data)
            .await
            .map_err(|e| map_io(e, path))?;
        self.stat(path).await
    }

    async fn upload_new(&self, path: &StorePath, data: Vec<u8>) -> Result<Metadata> {
        let mut file = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(self.to_fs_path(path))
            .await
            .map_err(|e| map_io(e, path))?;
        file.write_all(&data).await?;
        file.flush().await?;
        self.stat(path).await
    }

    async fn download(&self, path: &StorePath) -> Result<Vec<u8>> {
        let fs_path = self.to_fs_path(path);
        let fs_meta = fs::metadata(&fs_path).await.map_err(|e| map_io(e, path))?;

        if fs_meta.is_dir() {
            return Err(Error::NotFound(format!("Not a file: {}", path)));
        }

        fs::read(&fs_path).await.map_err(|e| map_io(e, path))
    }

    async fn exists(&self, path: &StorePath) -> Result<bool> {
        Ok(fs::try_exists(self.to_fs_path(path)).await?)
    }

    async fn delete(&self, path: &StorePath) -> Result<()> {
        let fs_path = self.to_fs_path(path);
        let fs_meta = fs::metadata(&fs_path).await.map_err(|e| map_io(e, path))?;

        if fs_meta.is_dir() {
            return Err(Error::Storage(format!(
                "Use delete_dir for directories: {}",
                path
            )));
        }

        fs::remove_file(&fs_path).await.map_err(|e| map_io(e, path))
    }

    async fn list(&self, path: &StorePath) -> Result<Vec<Metadata>> {
        let fs_path = self.to_fs_path(path);
        let mut entries = fs::read_dir(&fs_path).await.map_err(|e| map_io(e, path))?;

        let mut results = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let Some(name) = entry.file_name().to_str().map(String::from) else {
                continue;
            };
            let fs_meta = entry.metadata().await?;
            results.push(Self::create_metadata(&name, &fs_meta));
        }

        results.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(results)
    }

    async fn create_dir(&self, path: &StorePath) -> Result<Metadata> {
        // create_dir itself fails on an existing path, so no separate check
        fs::create_dir(self.to_fs_path(path))
            .await
            .map_err(|e| map_io(e, path))?;
        self.stat(path).await
    }

    async fn create_dir_all(&self, path: &StorePath) -> Result<()> {
        fs::create_dir_all(self.to_fs_path(path)).await?;
        Ok(())
    }

    async fn delete_dir(&self, path: &StorePath) -> Result<()> {
        let fs_path = self.to_fs_path(path);

        let mut entries = fs::read_dir(&fs_path).await.map_err(|e| map_io(e, path))?;
        if entries.next_entry().await?.is_some() {
            return Err(Error::Storage(format!("Directory not empty: {}", path)));
        }

        fs::remove_dir(&fs_path).await.map_err(|e| map_io(e, path))
    }

    async fn delete_dir_all(&self, path: &StorePath) -> Result<()> {
        match fs::remove_dir_all(self.to_fs_path(path)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(Error::Io(e)),
        }
    }
}
