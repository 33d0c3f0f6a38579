//! Cipher material derivation using PBKDF2-HMAC-SHA1.
//!
//! The server secret is the password and the capability key is the salt, so
//! decrypting an object needs both the capability key and the server that
//! stored it.

use pbkdf2::pbkdf2_hmac;
use serde::{Deserialize, Serialize};
use sha1::Sha1;

use crate::keys::{CipherMaterial, ServerSecret, MATERIAL_LENGTH};
use opencdn_common::{CapabilityKey, Error, Result};

/// Iteration count that keeps existing data directories readable.
pub const DEFAULT_ITERATIONS: u32 = 1000;

/// Parameters for PBKDF2 derivation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KdfParams {
    /// Number of HMAC iterations.
    pub iterations: u32,
}

impl KdfParams {
    /// Create parameters with a custom iteration count.
    pub fn with_iterations(iterations: u32) -> Self {
        Self { iterations }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self {
            iterations: DEFAULT_ITERATIONS,
        }
    }
}

/// Derive the cipher key and IV for a capability key.
///
/// # Preconditions
/// - `params.iterations` must be positive
///
/// # Postconditions
/// - Returns 32 key bytes and 16 IV bytes read from one 48-byte PBKDF2 output
/// - Deterministic given the same key, secret and parameters
///
/// # Errors
/// - Returns error if the iteration count is zero
pub fn derive_cipher_material(
    key: &CapabilityKey,
    secret: &ServerSecret,
    params: &KdfParams,
) -> Result<CipherMaterial> {
    if params.iterations == 0 {
        return Err(Error::Crypto(
            "KDF iteration count must be positive".to_string(),
        ));
    }

    let mut derived = [0u8; MATERIAL_LENGTH];
    pbkdf2_hmac::<Sha1>(
        secret.as_bytes(),
        key.as_str().as_bytes(),
        params.iterations,
        &mut derived,
    );

    Ok(CipherMaterial::from_derived(derived))
}
