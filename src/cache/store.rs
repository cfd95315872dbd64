use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// Minimal string key/value protocol with per-key expiry and atomic
/// increment. GET / SET EX / INCR / EXPIRE / TTL is everything the cache
/// and the rate limiter need from a backing store.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Get the value at `key`, or None if absent or expired.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Set `key` to `value` with an expiry of `ttl_seconds`.
    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()>;

    /// Atomically increment the integer at `key`, creating it at 1 if
    /// absent or expired. Errors if the existing value is not an integer.
    async fn incr(&self, key: &str) -> Result<i64>;

    /// Set the expiry of an existing key. No-op if the key is absent.
    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<()>;

    /// Seconds until `key` expires: -2 if absent, -1 if it has no expiry.
    async fn ttl(&self, key: &str) -> Result<i64>;
}

#[derive(Debug, Clone)]
struct Entry {
    value: String,
    expires_at: Option<DateTime<Utc>>,
}

impl Entry {
    fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }
}

/// In-process KvStore backed by a sharded concurrent map. Expired entries
/// are dropped lazily on access, so an expired counter restarts at zero
/// exactly when a new window begins.
#[derive(Default)]
pub struct MemoryStore {
    map: DashMap<String, Entry>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Utc::now();
        // The read guard must be released before remove_if takes a write
        // lock on the same shard
        if let Some(entry) = self.map.get(key) {
            if !entry.is_expired(now) {
                return Ok(Some(entry.value.clone()));
            }
        }
        self.map.remove_if(key, |_, entry| entry.is_expired(now));
        Ok(None)
    }

    async fn set_ex(&self, key: &str, value: &str, ttl_seconds: u64) -> Result<()> {
        self.map.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: Some(Utc::now() + Duration::seconds(ttl_seconds as i64)),
            },
        );
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<i64> {
        let now = Utc::now();
        // The entry API holds the shard lock, making the read-modify-write
        // atomic across concurrent callers
        let mut entry = self.map.entry(key.to_string()).or_insert(Entry {
            value: "0".to_string(),
            expires_at: None,
        });

        if entry.is_expired(now) {
            entry.value = "0".to_string();
            entry.expires_at = None;
        }

        let count: i64 = entry
            .value
            .parse()
            .map_err(|_| Error::Cache(format!("value at '{key}' is not an integer")))?;
        let count = count + 1;
        entry.value = count.to_string();
        Ok(count)
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) -> Result<()> {
        let now = Utc::now();
        if let Some(mut entry) = self.map.get_mut(key) {
            if !entry.is_expired(now) {
                entry.expires_at = Some(now + Duration::seconds(ttl_seconds as i64));
            }
        }
        Ok(())
    }

    async fn ttl(&self, key: &str) -> Result<i64> {
        let now = Utc::now();
        match self.map.get(key) {
            Some(entry) if entry.is_expired(now) => Ok(-2),
            Some(entry) => match entry.expires_at {
                Some(at) => Ok((at - now).num_seconds().max(0)),
                None => Ok(-1),
            },
            None => Ok(-2),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration as StdDuration;

    #[tokio::test]
    async fn test_get_set_roundtrip() {
        let store = MemoryStore::new();
        assert_eq!(store.get("missing").await.unwrap(), None);

        store.set_ex("k", "v", 60).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v".to_string()));
    }

    #[tokio::test]
    async fn test_expired_entry_is_absent() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", 0).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), None);
        assert_eq!(store.ttl("k").await.unwrap(), -2);
    }

    #[tokio::test]
    async fn test_get_of_expired_key_returns_promptly() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", 0).await.unwrap();

        // Dropping an expired entry takes a write lock; the lookup must
        // not still hold a read guard on the same shard when it does
        let result = tokio::time::timeout(StdDuration::from_secs(3), store.get("k"))
            .await
            .expect("lookup of an expired key must not block");
        assert_eq!(result.unwrap(), None);

        store.set_ex("k", "v2", 60).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some("v2".to_string()));
    }

    #[tokio::test]
    async fn test_incr_starts_at_one_and_counts_up() {
        let store = MemoryStore::new();
        assert_eq!(store.incr("counter").await.unwrap(), 1);
        assert_eq!(store.incr("counter").await.unwrap(), 2);
        assert_eq!(store.incr("counter").await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_incr_resets_after_expiry() {
        let store = MemoryStore::new();
        store.incr("counter").await.unwrap();
        store.incr("counter").await.unwrap();
        store.expire("counter", 1).await.unwrap();

        tokio::time::sleep(StdDuration::from_millis(1100)).await;
        assert_eq!(store.incr("counter").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_incr_rejects_non_integer_value() {
        let store = MemoryStore::new();
        store.set_ex("k", "not-a-number", 60).await.unwrap();
        assert!(store.incr("k").await.is_err());
    }

    #[tokio::test]
    async fn test_ttl_reports_remaining_seconds() {
        let store = MemoryStore::new();
        store.set_ex("k", "v", 60).await.unwrap();
        let ttl = store.ttl("k").await.unwrap();
        assert!(ttl > 0 && ttl <= 60);
    }

    #[tokio::test]
    async fn test_concurrent_incr_loses_no_updates() {
        use std::sync::Arc;

        let store = Arc::new(MemoryStore::new());
        let mut handles = Vec::new();
        for _ in 0..8 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                for _ in 0..50 {
                    store.incr("shared").await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.get("shared").await.unwrap(), Some("400".to_string()));
    }
}
