//! Common utilities and types shared across OpenCDN crates.
//!
//! This module provides the error taxonomy every layer reports with and the
//! newtypes that keep capability keys, ownership secrets and storage paths
//! apart from plain strings.

pub mod error;
pub mod types;

pub use error::{Error, ErrorKind, Result};
pub use types::{check_segment, CapabilityKey, HashedKey, OwnershipSecret, StorePath};
