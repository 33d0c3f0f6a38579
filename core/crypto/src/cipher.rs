//! Object encryption using AES-256 in 8-bit cipher feedback mode.
//!
//! Plaintext is padded to a whole number of 16-byte blocks before it is
//! encrypted. Each pad byte holds the pad length, and a plaintext that is
//! already block aligned gets a full extra block. The ciphertext carries no
//! authentication tag: a wrong key yields garbage, which is rejected only if
//! the padding no longer parses.

use aes::Aes256;
use cfb8::cipher::{AsyncStreamCipher, KeyIvInit};

use crate::kdf::{derive_cipher_material, KdfParams};
use crate::keys::{CipherMaterial, ServerSecret};
use opencdn_common::{CapabilityKey, Error, Result};

/// Padding block size in bytes.
pub const BLOCK_SIZE: usize = 16;

type Aes256Cfb8Enc = cfb8::Encryptor<Aes256>;
type Aes256Cfb8Dec = cfb8::Decryptor<Aes256>;

/// Pad data to a multiple of [`BLOCK_SIZE`].
///
/// # Postconditions
/// - Appends between 1 and 16 bytes, each equal to the count appended
pub fn pad(data: &[u8]) -> Vec<u8> {
    let n = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut padded = Vec::with_capacity(data.len() + n);
    padded.extend_from_slice(data);
    padded.resize(data.len() + n, n as u8);
    padded
}

/// Strip padding added by [`pad`].
///
/// # Errors
/// - `Error::Decode` if the length is not a non-zero multiple of the block
///   size, the pad count is out of range, or the pad bytes disagree
pub fn unpad(mut data: Vec<u8>) -> Result<Vec<u8>> {
    if data.is_empty() || data.len() % BLOCK_SIZE != 0 {
        return Err(Error::Decode(format!(
            "Padded length {} is not a positive multiple of {}",
            data.len(),
            BLOCK_SIZE
        )));
    }

    let n = data[data.len() - 1] as usize;
    if n == 0 || n > BLOCK_SIZE {
        return Err(Error::Decode(format!("Invalid pad count {}", n)));
    }

    let body_len = data.len() - n;
    if data[body_len..].iter().any(|&b| b as usize != n) {
        return Err(Error::Decode("Inconsistent padding".to_string()));
    }

    data.truncate(body_len);
    Ok(data)
}

/// Pad and encrypt plaintext with already derived material.
///
/// # Postconditions
/// - Output length is the padded plaintext length
/// - Deterministic for the same material and plaintext
///
/// # Errors
/// - Returns error if the cipher rejects the material
pub fn encrypt(material: &CipherMaterial, plaintext: &[u8]) -> Result<Vec<u8>> {
    let mut buffer = pad(plaintext);
    let cipher = Aes256Cfb8Enc::new_from_slices(material.key(), material.iv())
        .map_err(|e| Error::Crypto(format!("Cipher init failed: {}", e)))?;
    cipher.encrypt(&mut buffer);
    Ok(buffer)
}

/// Decrypt ciphertext and strip its padding.
///
/// # Errors
/// - Returns error if the cipher rejects the material
/// - `Error::Decode` if the recovered padding is malformed
pub fn decrypt(material: &CipherMaterial, ciphertext: &[u8]) -> Result<Vec<u8>> {
    let mut buffer = ciphertext.to_vec();
    let cipher = Aes256Cfb8Dec::new_from_slices(material.key(), material.iv())
        .map_err(|e| Error::Crypto(format!("Cipher init failed: {}", e)))?;
    cipher.decrypt(&mut buffer);
    unpad(buffer)
}

/// Encrypts and decrypts object contents under a capability key.
///
/// Holds the server secret and KDF parameters so callers only ever hand over
/// the capability key.
#[derive(Clone)]
pub struct ObjectCipher {
    secret: ServerSecret,
    params: KdfParams,
}

impl ObjectCipher {
    /// Create a cipher bound to a server secret.
    pub fn new(secret: ServerSecret, params: KdfParams) -> Self {
        Self { secret, params }
    }

    /// Encrypt plaintext for storage under `key`.
    ///
    /// # Errors
    /// - Returns error if key derivation fails
    pub fn encrypt(&self, plaintext: &[u8], key: &CapabilityKey) -> Result<Vec<u8>> {
        let material = derive_cipher_material(key, &self.secret, &self.params)?;
        encrypt(&material, plaintext)
    }

    /// Decrypt stored ciphertext using `key`.
    ///
    /// # Errors
    /// - Returns error if key derivation fails
    /// - `Error::Decode` if the key does not match the ciphertext
    pub fn decrypt(&self, ciphertext: &[u8], key: &CapabilityKey) -> Result<Vec<u8>> {
        let material = derive_cipher_material(key, &self.secret, &self.params)?;
        decrypt(&material, ciphertext)
    }
}

impl std::fmt::Debug for ObjectCipher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectCipher")
            .field("secret", &"[REDACTED]")
            .field("params", &self.params)
            .finish()
    }
}
