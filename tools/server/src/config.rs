//! Server configuration file.
//!
//! Every field has a default, so a partial file is valid. A missing file is
//! created with defaults and a freshly generated server key.

use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::info;

use opencdn_common::{Error, Result};
use opencdn_crypto::{generate_key, HashAlgorithm, KdfParams, SealingKey};
use opencdn_store::{
    CharacterSet, SuffixFilter, SuffixMode, TokenSettings, UploadPolicy,
    DEFAULT_FILENAME_CHARACTERS, DEFAULT_GROUPNAME_CHARACTERS, DEFAULT_KEY_LENGTH,
    DEFAULT_MAX_OBJECT_BYTES, DEFAULT_TOKEN_LENGTH,
};

/// Length of a generated server key.
pub const SERVER_KEY_LENGTH: usize = 32;

/// Default configuration file name.
pub const DEFAULT_CONFIG_FILE: &str = "opencdn.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Root of the `local` storage backend.
    pub data_directory: PathBuf,
    /// Registered storage backend name.
    pub storage_backend: String,
    /// Trust `CF-Connecting-IP` / `X-Forwarded-For` for request logs.
    pub proxy_redirecting: bool,
    pub logging: LoggingConfig,
    pub store: StoreConfig,
    pub authentication: AuthenticationConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            data_directory: PathBuf::from("data"),
            storage_backend: "local".to_string(),
            proxy_redirecting: false,
            logging: LoggingConfig::default(),
            store: StoreConfig::default(),
            authentication: AuthenticationConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub directory: PathBuf,
    pub file_prefix: String,
    /// Write the log file as JSON lines.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_prefix: "opencdn.log".to_string(),
            json: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub hash_algorithm: HashAlgorithm,
    /// Server secret for cipher derivation. Never change it on a live data
    /// directory.
    pub server_key: String,
    pub random_key_length: usize,
    pub random_private_key_length: usize,
    pub max_file_bytes: u64,
    pub kdf_iterations: u32,
    pub allowed_filename_characters: String,
    pub allowed_groupname_characters: String,
    pub file_suffix_type: SuffixMode,
    pub blacklist_file_suffix: Vec<String>,
    pub whitelist_file_suffix: Vec<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            hash_algorithm: HashAlgorithm::default(),
            server_key: String::new(),
            random_key_length: DEFAULT_KEY_LENGTH,
            random_private_key_length: DEFAULT_KEY_LENGTH,
            max_file_bytes: DEFAULT_MAX_OBJECT_BYTES,
            kdf_iterations: KdfParams::default().iterations,
            allowed_filename_characters: DEFAULT_FILENAME_CHARACTERS.to_string(),
            allowed_groupname_characters: DEFAULT_GROUPNAME_CHARACTERS.to_string(),
            file_suffix_type: SuffixMode::Blacklist,
            blacklist_file_suffix: vec!["exe".to_string()],
            whitelist_file_suffix: ["png", "jpg", "jpeg", "zip", "gz", "tar"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthenticationConfig {
    pub required_for_uploading: bool,
    pub token_length: usize,
    pub test_delay_ms: u64,
    /// Key identifier to base64 of a PEM or DER RSA public key.
    pub keys: BTreeMap<String, String>,
}

impl Default for AuthenticationConfig {
    fn default() -> Self {
        Self {
            required_for_uploading: false,
            token_length: DEFAULT_TOKEN_LENGTH,
            test_delay_ms: 500,
            keys: BTreeMap::new(),
        }
    }
}

impl ServerConfig {
    /// Defaults with a fresh server key.
    pub fn generate() -> Self {
        let mut config = Self::default();
        config.store.server_key = generate_key(SERVER_KEY_LENGTH);
        config
    }

    /// Load and validate a configuration file.
    ///
    /// # Errors
    /// - `Error::Io` if the file cannot be read
    /// - `Error::Config` if it does not parse or fails validation
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        let config: Self = toml::from_str(&text)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file, writing defaults first if it does not exist.
    pub fn load_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "Writing default configuration");
            Self::generate().save(path)?;
        }
        Self::load(path)
    }

    /// Rewrite the file with defaults.
    ///
    /// # Postconditions
    /// - Configured public keys and the server key survive the reset, so
    ///   stored objects stay readable
    pub fn reset(path: &Path) -> Result<Self> {
        let mut config = Self::generate();
        if path.exists() {
            let text = fs::read_to_string(path)?;
            let previous: Self = toml::from_str(&text)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
            if !previous.store.server_key.is_empty() {
                config.store.server_key = previous.store.server_key;
            }
            config.authentication.keys = previous.authentication.keys;
        }

        info!(path = %path.display(), "Configuration reset to defaults");
        config.save(path)?;
        Self::load(path)
    }

    /// Write the configuration as TOML.
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = toml::to_string_pretty(self)
            .map_err(|e| Error::Serialization(format!("Cannot encode configuration: {}", e)))?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, text)?;
        Ok(())
    }

    /// Check values that the types alone do not constrain.
    ///
    /// # Errors
    /// - `Error::Config` naming the first offending setting
    pub fn validate(&self) -> Result<()> {
        if self.store.server_key.is_empty() {
            return Err(Error::Config("store.server_key must be set".to_string()));
        }
        if self.store.random_key_length == 0 || self.store.random_private_key_length == 0 {
            return Err(Error::Config(
                "store.random_key_length and store.random_private_key_length must be positive"
                    .to_string(),
            ));
        }
        if self.store.kdf_iterations == 0 {
            return Err(Error::Config(
                "store.kdf_iterations must be positive".to_string(),
            ));
        }
        if self.authentication.token_length == 0 {
            return Err(Error::Config(
                "authentication.token_length must be positive".to_string(),
            ));
        }
        self.upload_policy()?;
        self.sealing_keys()?;
        self.socket_addr()?;
        Ok(())
    }

    pub fn socket_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.host, self.port)
            .parse()
            .map_err(|e| Error::Config(format!("Invalid listen address: {}", e)))
    }

    /// Upload policy from the allow-lists and suffix settings.
    pub fn upload_policy(&self) -> Result<UploadPolicy> {
        let suffixes = match self.store.file_suffix_type {
            SuffixMode::Blacklist => &self.store.blacklist_file_suffix,
            SuffixMode::Whitelist => &self.store.whitelist_file_suffix,
        };
        Ok(UploadPolicy {
            filename_characters: CharacterSet::new(&self.store.allowed_filename_characters)?,
            group_name_characters: CharacterSet::new(&self.store.allowed_groupname_characters)?,
            suffix_filter: SuffixFilter::new(self.store.file_suffix_type, suffixes),
            max_object_bytes: self.store.max_file_bytes,
        })
    }

    /// Parsed token sealing keys.
    pub fn sealing_keys(&self) -> Result<BTreeMap<String, SealingKey>> {
        self.authentication
            .keys
            .iter()
            .map(|(id, value)| {
                SealingKey::from_config_value(value)
                    .map(|key| (id.clone(), key))
                    .map_err(|e| Error::Config(format!("authentication.keys.{}: {}", id, e)))
            })
            .collect()
    }

    pub fn token_settings(&self) -> TokenSettings {
        TokenSettings {
            token_length: self.authentication.token_length,
            required_for_upload: self.authentication.required_for_uploading,
        }
    }
}
