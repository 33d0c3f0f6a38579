//! Ephemeral authentication tokens.
//!
//! A token is handed out only sealed to a configured RSA public key, and the
//! server keeps nothing but its hash. Tokens live until revoked or until the
//! process exits.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info};

use opencdn_common::{Error, Result};
use opencdn_crypto::{generate_key, HashAlgorithm, SealingKey};

/// Default length of generated tokens.
pub const DEFAULT_TOKEN_LENGTH: usize = 20;

/// Attempts at drawing an unused token before giving up.
const MAX_ISSUE_ATTEMPTS: usize = 8;

/// Process-wide set of active token hashes.
#[derive(Debug, Default)]
pub struct TokenStore {
    hashes: Mutex<HashSet<String>>,
}

impl TokenStore {
    /// Create an empty token store.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashSet<String>>> {
        self.hashes
            .lock()
            .map_err(|_| Error::Storage("Token store lock poisoned".to_string()))
    }

    /// Add a hash. Returns false if it was already present.
    pub fn insert(&self, hash: String) -> Result<bool> {
        Ok(self.lock()?.insert(hash))
    }

    /// Check whether a hash is active.
    pub fn contains(&self, hash: &str) -> Result<bool> {
        Ok(self.lock()?.contains(hash))
    }

    /// Remove a hash. Returns false if it was not present.
    pub fn remove(&self, hash: &str) -> Result<bool> {
        Ok(self.lock()?.remove(hash))
    }

    /// Number of active tokens.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Whether no token is active.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Token settings.
#[derive(Debug, Clone)]
pub struct TokenSettings {
    /// Length of generated tokens.
    pub token_length: usize,
    /// Whether uploads and group creation need a token.
    pub required_for_upload: bool,
}

impl Default for TokenSettings {
    fn default() -> Self {
        Self {
            token_length: DEFAULT_TOKEN_LENGTH,
            required_for_upload: false,
        }
    }
}

/// Issues, validates and revokes authentication tokens.
pub struct TokenAuthority {
    store: Arc<TokenStore>,
    keys: BTreeMap<String, SealingKey>,
    hash: HashAlgorithm,
    settings: TokenSettings,
}

impl TokenAuthority {
    /// Create an authority over an injected token store.
    ///
    /// # Errors
    /// - `Error::Config` if the token length is zero
    pub fn new(
        store: Arc<TokenStore>,
        keys: BTreeMap<String, SealingKey>,
        hash: HashAlgorithm,
        settings: TokenSettings,
    ) -> Result<Self> {
        if settings.token_length == 0 {
            return Err(Error::Config("Token length must be positive".to_string()));
        }
        Ok(Self {
            store,
            keys,
            hash,
            settings,
        })
    }

    /// Whether uploads need a token.
    pub fn required_for_upload(&self) -> bool {
        self.settings.required_for_upload
    }

    /// Issue a token sealed to the named public key.
    ///
    /// # Postconditions
    /// - The token's hash is active and distinct from every other active hash
    /// - Returns base64 of the RSA-OAEP ciphertext
    ///
    /// # Errors
    /// - `KeyNotFound` if the identifier is not configured
    pub fn issue_token(&self, key_identifier: &str) -> Result<String> {
        let key = self
            .keys
            .get(key_identifier)
            .ok_or_else(|| Error::KeyNotFound(key_identifier.to_string()))?;

        for _ in 0..MAX_ISSUE_ATTEMPTS {
            let token = generate_key(self.settings.token_length);
            let hash = self.hash.hash_hex(&token);
            if !self.store.insert(hash.clone())? {
                debug!("Token collision, drawing again");
                continue;
            }

            return match key.seal_base64(token.as_bytes()) {
                Ok(sealed) => {
                    info!(key_identifier = %key_identifier, "Authentication token issued");
                    Ok(sealed)
                }
                Err(e) => {
                    self.store.remove(&hash)?;
                    Err(e)
                }
            };
        }

        Err(Error::Crypto(
            "Could not draw an unused authentication token".to_string(),
        ))
    }

    /// Validate a plaintext token.
    ///
    /// # Errors
    /// - `TokenRequired` if no token was supplied
    /// - `InvalidToken` if the token is not active
    pub fn validate(&self, token: Option<&str>) -> Result<()> {
        let token = token.ok_or(Error::TokenRequired)?;
        if self.store.contains(&self.hash.hash_hex(token))? {
            Ok(())
        } else {
            Err(Error::InvalidToken)
        }
    }

    /// Revoke a plaintext token.
    ///
    /// # Errors
    /// - `NotFound` if the token is not active
    pub fn revoke(&self, token: &str) -> Result<()> {
        if self.store.remove(&self.hash.hash_hex(token))? {
            info!("Authentication token revoked");
            Ok(())
        } else {
            Err(Error::NotFound("Authentication token not found".to_string()))
        }
    }

    /// Gate an upload-class operation.
    ///
    /// Validates the token only when tokens are required for uploads.
    pub fn require_for_upload(&self, token: Option<&str>) -> Result<()> {
        if self.settings.required_for_upload {
            self.validate(token)
        } else {
            Ok(())
        }
    }
}
