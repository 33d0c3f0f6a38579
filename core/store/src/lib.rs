//! Capability-addressed object store for OpenCDN.
//!
//! This module provides:
//! - Single-object namespaces addressed by the hash of a capability key
//! - Groups of objects sharing one capability key
//! - Ownership verification against persisted secret digests
//! - Authentication tokens sealed to configured public keys
//!
//! # Architecture
//! The stores sit between the HTTP layer and a storage provider. They do all
//! encryption and decryption, so nothing below them ever sees plaintext or a
//! raw capability key.

pub mod engine;
pub mod group;
pub mod object;
pub mod ownership;
pub mod policy;
pub mod tokens;

pub use engine::{CryptoEngine, DEFAULT_KEY_LENGTH};
pub use group::{CreatedGroup, GroupListing, GroupStore, GROUPS_DIR};
pub use object::{ObjectStore, StoredObject};
pub use ownership::{OwnershipDigest, OWNERSHIP_FILE};
pub use policy::{
    CharacterSet, SuffixFilter, SuffixMode, UploadPolicy,
    DEFAULT_FILENAME_CHARACTERS, DEFAULT_GROUPNAME_CHARACTERS, DEFAULT_MAX_OBJECT_BYTES,
};
pub use tokens::{TokenAuthority, TokenSettings, TokenStore, DEFAULT_TOKEN_LENGTH};
