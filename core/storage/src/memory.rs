//! In-memory storage provider for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::provider::{Metadata, StorageProvider};
use opencdn_common::{Error, Result, StorePath};

/// In-memory storage entry.
#[derive(Debug, Clone)]
enum Entry {
    File {
        data: Vec<u8>,
        modified: DateTime<Utc>,
    },
    Directory {
        modified: DateTime<Utc>,
    },
}

impl Entry {
    fn metadata(&self, name: &str) -> Metadata {
        match self {
            Entry::File { data, modified } => Metadata {
                name: name.to_string(),
                size: Some(data.len() as u64),
                is_directory: false,
                modified: *modified,
            },
            Entry::Directory { modified } => Metadata {
                name: name.to_string(),
                size: None,
                is_directory: true,
                modified: *modified,
            },
        }
    }
}

type Tree = BTreeMap<String, Entry>;

/// In-memory storage provider.
///
/// Useful for testing and development. All data is stored in memory
/// and lost on drop. Each mutation holds the write lock for its whole
/// check-then-insert sequence, which keeps `create_dir` and `upload_new`
/// atomic.
#[derive(Clone)]
pub struct MemoryProvider {
    storage: Arc<RwLock<Tree>>,
}

impl MemoryProvider {
    /// Create a new empty memory provider.
    pub fn new() -> Self {
        let mut tree = Tree::new();
        tree.insert(
            "/".to_string(),
            Entry::Directory {
                modified: Utc::now(),
            },
        );

        Self {
            storage: Arc::new(RwLock::new(tree)),
        }
    }

    fn path_to_key(path: &StorePath) -> String {
        path.to_string_path()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Tree>> {
        self.storage
            .read()
            .map_err(|_| Error::Storage("Memory storage lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, Tree>> {
        self.storage
            .write()
            .map_err(|_| Error::Storage("Memory storage lock poisoned".to_string()))
    }

    fn check_parent(tree: &Tree, path: &StorePath) -> Result<()> {
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        match tree.get(&Self::path_to_key(&parent)) {
            Some(Entry::Directory { .. }) => Ok(()),
            Some(Entry::File { .. }) => Err(Error::Storage("Parent is a file".to_string())),
            None => Err(Error::NotFound(format!(
                "Parent directory not found: {}",
                parent
            ))),
        }
    }

    /// Keys of every entry strictly below `key`.
    fn descendants(tree: &Tree, key: &str) -> Vec<String> {
        let prefix = if key == "/" {
            "/".to_string()
        } else {
            format!("{}/", key)
        };
        tree.range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .filter(|(k, _)| k.as_str() != key)
            .map(|(k, _)| k.clone())
            .collect()
    }

    fn insert_file(tree: &mut Tree, path: &StorePath, data: Vec<u8>) -> Metadata {
        let entry = Entry::File {
            data,
            modified: Utc::now(),
        };
        let metadata = entry.metadata(path.name().unwrap_or("/"));
        tree.insert(Self::path_to_key(path), entry);
        metadata
    }
}

impl Default for MemoryProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl StorageProvider for MemoryProvider {
    fn name(&self) -> &str {
        "memory"
    }

    async fn upload(&self, path: &StorePath, data: Vec<u8>) -> Result<Metadata> {
        let mut tree = self.write()?;
        Self::check_parent(&tree, path)?;

        if let Some(Entry::Directory { .. }) = tree.get(&Self::path_to_key(path)) {
            return Err(Error::Storage(format!("Path is a directory: {}", path)));
        }

        Ok(Self::insert_file(&mut tree, path, data))
    }

    async fn upload_new(&self, path: &StorePath, data: Vec<u8>) -> Result<Metadata> {
        let mut tree = self.write()?;
        Self::check_parent(&tree, path)?;

        if tree.contains_key(&Self::path_to_key(path)) {
            return Err(Error::AlreadyExists(format!(
                "Path already exists: {}",
                path
            )));
        }

        Ok(Self::insert_file(&mut tree, path, data))
    }

    async fn download(&self, path: &StorePath) -> Result<Vec<u8>> {
        let tree = self.read()?;

        match tree.get(&Self::path_to_key(path)) {
            Some(Entry::File { data, .. }) => Ok(data.clone()),
            _ => Err(Error::NotFound(format!("File not found: {}", path))),
        }
    }

    async fn exists(&self, path: &StorePath) -> Result<bool> {
        Ok(self.read()?.contains_key(&Self::path_to_key(path)))
    }

    async fn delete(&self, path: &StorePath) -> Result<()> {
        let key = Self::path_to_key(path);
        let mut tree = self.write()?;

        match tree.get(&key) {
            Some(Entry::File { .. }) => {
                tree.remove(&key);
                Ok(())
            }
            Some(Entry::Directory { .. }) => Err(Error::Storage(format!(
                "Use delete_dir for directories: {}",
                path
            ))),
            None => Err(Error::NotFound(format!("File not found: {}", path))),
        }
    }

    async fn list(&self, path: &StorePath) -> Result<Vec<Metadata>> {
        let key = Self::path_to_key(path);
        let tree = self.read()?;

        match tree.get(&key) {
            Some(Entry::Directory { .. }) => {}
            Some(Entry::File { .. }) => {
                return Err(Error::Storage(format!("Not a directory: {}", path)));
            }
            None => {
                return Err(Error::NotFound(format!("Directory not found: {}", path)));
            }
        }

        let prefix_len = if path.is_root() { 1 } else { key.len() + 1 };

        // BTreeMap iteration is ordered, so the result is sorted by name
        let results = Self::descendants(&tree, &key)
            .into_iter()
            .filter_map(|child| {
                let relative = &child[prefix_len..];
                if relative.contains('/') {
                    return None;
                }
                tree.get(&child).map(|entry| entry.metadata(relative))
            })
            .collect();

        Ok(results)
    }

    async fn create_dir(&self, path: &StorePath) -> Result<Metadata> {
        let key = Self::path_to_key(path);
        let mut tree = self.write()?;
        Self::check_parent(&tree, path)?;

        if tree.contains_key(&key) {
            return Err(Error::AlreadyExists(format!(
                "Path already exists: {}",
                path
            )));
        }

        let entry = Entry::Directory {
            modified: Utc::now(),
        };
        let metadata = entry.metadata(path.name().unwrap_or("/"));
        tree.insert(key, entry);

        Ok(metadata)
    }

    async fn create_dir_all(&self, path: &StorePath) -> Result<()> {
        let mut tree = self.write()?;
        let mut current = StorePath::root();

        for component in path.components() {
            current = current.join(component)?;
            let key = Self::path_to_key(&current);
            match tree.get(&key) {
                Some(Entry::Directory { .. }) => {}
                Some(Entry::File { .. }) => {
                    return Err(Error::Storage(format!("Path is a file: {}", current)));
                }
                None => {
                    tree.insert(
                        key,
                        Entry::Directory {
                            modified: Utc::now(),
                        },
                    );
                }
            }
        }

        Ok(())
    }

    async fn delete_dir(&self, path: &StorePath) -> Result<()> {
        let key = Self::path_to_key(path);
        let mut tree = self.write()?;

        match tree.get(&key) {
            Some(Entry::Directory { .. }) => {}
            Some(Entry::File { .. }) => {
                return Err(Error::Storage(format!("Not a directory: {}", path)));
            }
            None => {
                return Err(Error::NotFound(format!("Directory not found: {}", path)));
            }
        }

        if !Self::descendants(&tree, &key).is_empty() {
            return Err(Error::Storage(format!("Directory not empty: {}", path)));
        }

        tree.remove(&key);
        Ok(())
    }

    async fn delete_dir_all(&self, path: &StorePath) -> Result<()> {
        let key = Self::path_to_key(path);
        let mut tree = self.write()?;

        if let Some(Entry::File { .. }) = tree.get(&key) {
            return Err(Error::Storage(format!("Not a directory: {}", path)));
        }

        for child in Self::descendants(&tree, &key) {
            tree.remove(&child);
        }
        if !path.is_root() {
            tree.remove(&key);
        }

        Ok(())
    }
}
