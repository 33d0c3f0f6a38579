//! Shared handler state.

use std::sync::Arc;
use std::time::Duration;

use opencdn_store::{CryptoEngine, GroupStore, ObjectStore, TokenAuthority};

/// Multipart framing allowance on top of the object size limit.
const BODY_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Server behavior not owned by the stores.
#[derive(Debug, Clone)]
pub struct HttpSettings {
    /// Take the client address from proxy headers.
    pub proxy_redirecting: bool,
    /// Pause before answering `/authentication/test`.
    pub test_delay: Duration,
    /// Largest accepted object.
    pub max_object_bytes: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self {
            proxy_redirecting: false,
            test_delay: Duration::from_millis(500),
            max_object_bytes: opencdn_store::DEFAULT_MAX_OBJECT_BYTES,
        }
    }
}

impl HttpSettings {
    /// Request body limit.
    pub fn body_limit(&self) -> usize {
        usize::try_from(self.max_object_bytes)
            .unwrap_or(usize::MAX)
            .saturating_add(BODY_OVERHEAD_BYTES)
    }
}

/// State handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub objects: Arc<ObjectStore>,
    pub groups: Arc<GroupStore>,
    pub tokens: Arc<TokenAuthority>,
    /// Generates keys for uploads and censors request logs.
    pub engine: CryptoEngine,
    pub settings: Arc<HttpSettings>,
}

impl AppState {
    pub fn new(
        objects: ObjectStore,
        groups: GroupStore,
        tokens: TokenAuthority,
        engine: CryptoEngine,
        settings: HttpSettings,
    ) -> Self {
        Self {
            objects: Arc::new(objects),
            groups: Arc::new(groups),
            tokens: Arc::new(tokens),
            engine,
            settings: Arc::new(settings),
        }
    }
}
