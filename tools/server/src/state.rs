//! Wiring of configuration into handler state.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;

use opencdn_common::Result;
use opencdn_crypto::{KdfParams, ObjectCipher, ServerSecret};
use opencdn_http::{AppState, HttpSettings};
use opencdn_storage::{create_default_registry, ProviderOptions};
use opencdn_store::{CryptoEngine, GroupStore, ObjectStore, TokenAuthority, TokenStore};

use crate::config::ServerConfig;

/// Build the application state for a validated configuration.
///
/// # Errors
/// - `Error::Config` if the storage backend is unknown or a setting is invalid
pub fn build_state(config: &ServerConfig) -> Result<AppState> {
    let registry = create_default_registry()?;
    let provider = registry.resolve(
        &config.storage_backend,
        &ProviderOptions {
            root: Some(config.data_directory.clone()),
        },
    )?;
    info!(
        backend = %config.storage_backend,
        provider = provider.name(),
        "Storage backend ready"
    );

    let cipher = ObjectCipher::new(
        ServerSecret::new(config.store.server_key.as_str())?,
        KdfParams::with_iterations(config.store.kdf_iterations),
    );
    let engine = CryptoEngine::new(
        config.store.hash_algorithm,
        cipher,
        config.store.random_key_length,
        config.store.random_private_key_length,
    )?;
    let policy = Arc::new(config.upload_policy()?);

    let keys = config.sealing_keys()?;
    info!(count = keys.len(), "Token sealing keys loaded");
    let tokens = TokenAuthority::new(
        Arc::new(TokenStore::new()),
        keys,
        config.store.hash_algorithm,
        config.token_settings(),
    )?;

    let settings = HttpSettings {
        proxy_redirecting: config.proxy_redirecting,
        test_delay: Duration::from_millis(config.authentication.test_delay_ms),
        max_object_bytes: config.store.max_file_bytes,
    };

    Ok(AppState::new(
        ObjectStore::new(Arc::clone(&provider), engine.clone(), Arc::clone(&policy)),
        GroupStore::new(provider, engine.clone(), policy),
        tokens,
        engine,
        settings,
    ))
}
