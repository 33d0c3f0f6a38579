//! Provider registry for resolving a storage backend by name.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

use crate::provider::StorageProvider;
use opencdn_common::{Error, Result};

/// Options handed to a provider factory.
#[derive(Debug, Clone, Default)]
pub struct ProviderOptions {
    /// Data directory for providers that persist to disk.
    pub root: Option<PathBuf>,
}

/// Factory function type for creating providers.
pub type ProviderFactory =
    Box<dyn Fn(&ProviderOptions) -> Result<Arc<dyn StorageProvider>> + Send + Sync>;

/// Registry for storage provider factories.
pub struct ProviderRegistry {
    factories: BTreeMap<String, ProviderFactory>,
}

impl ProviderRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register a provider factory.
    ///
    /// # Errors
    /// - Returns error if name is already registered
    pub fn register(&mut self, name: impl Into<String>, factory: ProviderFactory) -> Result<()> {
        let name = name.into();
        if self.factories.contains_key(&name) {
            return Err(Error::Config(format!(
                "Storage backend '{}' is already registered",
                name
            )));
        }
        self.factories.insert(name, factory);
        Ok(())
    }

    /// Resolve a provider by name.
    ///
    /// # Errors
    /// - `Error::Config` if the backend is unknown or its options are invalid
    pub fn resolve(&self, name: &str, options: &ProviderOptions) -> Result<Arc<dyn StorageProvider>> {
        let factory = self.factories.get(name).ok_or_else(|| {
            Error::Config(format!(
                "Unknown storage backend '{}' (available: {})",
                name,
                self.providers().join(", ")
            ))
        })?;
        factory(options)
    }

    /// Get list of registered provider names, sorted.
    pub fn providers(&self) -> Vec<String> {
        self.factories.keys().cloned().collect()
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a registry with the built-in `local` and `memory` backends.
pub fn create_default_registry() -> Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    registry.register(
        "memory",
        Box::new(|_options| Ok(Arc::new(crate::memory::MemoryProvider::new()))),
    )?;

    registry.register(
        "local",
        Box::new(|options| {
            let root = options.root.as_ref().ok_or_else(|| {
                Error::Config("Local storage requires a data directory".to_string())
            })?;
            Ok(Arc::new(crate::local::LocalProvider::new(root)?))
        }),
    )?;

    Ok(registry)
}
