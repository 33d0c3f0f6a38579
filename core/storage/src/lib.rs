//! Storage provider abstraction for OpenCDN.
//!
//! The stores never touch the filesystem directly. They talk to a
//! [`StorageProvider`], which keeps the on-disk layout swappable and lets
//! tests run against [`MemoryProvider`].
//!
//! # Design Principles
//! - Provider isolation: no backend-specific logic in the store or crypto crates
//! - Async operations: all I/O operations are async
//! - Atomic claims: `create_dir` and `upload_new` fail if the name is taken
//! - Unified error semantics: missing paths are `NotFound` on every backend

pub mod local;
pub mod memory;
pub mod provider;
pub mod registry;

pub use local::LocalProvider;
pub use memory::MemoryProvider;
pub use provider::{Metadata, StorageProvider};
pub use registry::{create_default_registry, ProviderFactory, ProviderOptions, ProviderRegistry};
