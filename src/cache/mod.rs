pub mod store;

pub use store::{KvStore, MemoryStore};

use crate::error::Result;
use sha2::{Digest, Sha256};
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, warn};

/// Cache key for a recipe search, derived from the canonical filter
/// serialization and the result-count bound. Two semantically identical
/// filters hash to the same key regardless of how the caller assembled them.
pub fn search_key(canonical_query: &str, limit: u32) -> String {
    let digest = Sha256::digest(canonical_query.as_bytes());
    format!("recipes:{:x}:{limit}", digest)
}

/// Cache key for a single recipe detail lookup.
pub fn detail_key(recipe_id: i64) -> String {
    format!("recipe:{recipe_id}")
}

/// Read-through cache over an upstream fetch. Store failures on either
/// side are logged and degrade to a miss (read) or a no-op (write); they
/// never fail the wrapped operation.
///
/// There is no single-flight guard: concurrent requests for the same cold
/// key may each invoke the upstream fetch. Known limitation, accepted at
/// this scale.
#[derive(Clone)]
pub struct CacheStore {
    store: Arc<dyn KvStore>,
    ttl_seconds: u64,
}

impl CacheStore {
    pub fn new(store: Arc<dyn KvStore>, ttl_seconds: u64) -> Self {
        Self { store, ttl_seconds }
    }

    /// Return the cached payload for `key`, or invoke `compute`, store the
    /// result with the configured expiry and return it. A cached payload is
    /// returned unchanged, never re-validated.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, compute: F) -> Result<String>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String>>,
    {
        match self.store.get(key).await {
            Ok(Some(payload)) => {
                debug!("Cache hit for key: {}", key);
                return Ok(payload);
            }
            Ok(None) => {
                debug!("Cache miss for key: {}", key);
            }
            Err(e) => {
                warn!("Cache read failed for key {}: {}", key, e.log_safe());
            }
        }

        let payload = compute().await?;

        if let Err(e) = self.store.set_ex(key, &payload, self.ttl_seconds).await {
            warn!("Cache write failed for key {}: {}", key, e.log_safe());
        }

        Ok(payload)
    }
}
