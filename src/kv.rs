//! # KV Store Adapter
//!
//! Thin contract over a remote key-value store. Every method here is
//! **infallible at its public signature** — it never returns an `Err` to
//! its caller. On any transient failure an implementation logs via
//! `tracing::warn!` and returns the documented neutral value (`None`,
//! an empty map, `0` for INCR, `false` for EXISTS, an empty `Vec` for
//! KEYS). This mirrors the Python prototype's Redis wrapper, where every
//! method wraps its body in a try/except and never lets an exception
//! escape to the rate limiter.
//!
//! Two implementations exist: [`RedisKvStore`] for production, backed by
//! an async multiplexed connection, and [`InMemoryKvStore`] for tests and
//! for running without a configured Redis URL.

use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::Mutex;

/// Narrow async contract the admission engine depends on.
///
/// No method returns a `Result`. Callers may rely on this: a KV failure
/// can never propagate as an error through the bucket engine, the
/// statistics recorder, or the admission facade.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<String>;
    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>);
    async fn incr(&self, key: &str) -> i64;
    async fn expire(&self, key: &str, ttl_seconds: u64);
    async fn delete(&self, key: &str);
    async fn hget(&self, name: &str, field: &str) -> Option<String>;
    async fn hset(&self, name: &str, field: &str, value: &str);
    async fn hgetall(&self, name: &str) -> HashMap<String, String>;
    async fn exists(&self, key: &str) -> bool;
    async fn keys(&self, pattern: &str) -> Vec<String>;
}

/// Redis-backed implementation using `ConnectionManager`: a cloneable,
/// auto-reconnecting connection handle. Unlike wrapping a single
/// `MultiplexedConnection` behind a `Mutex`, cloning `ConnectionManager`
/// lets concurrent admissions issue commands without serializing on a
/// lock — the multiplexing happens inside the connection itself, which
/// is the point of using it from an async handler in the first place.
pub struct RedisKvStore {
    conn: redis::aio::ConnectionManager,
}

impl RedisKvStore {
    pub async fn connect(redis_url: &str) -> Result<Self, redis::RedisError> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self { conn })
    }
}

#[async_trait]
impl KvStore for RedisKvStore {
    async fn get(&self, key: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match redis::cmd("GET").arg(key).query_async(&mut conn).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "redis GET failed");
                None
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl_seconds: Option<u64>) {
        let mut conn = self.conn.clone();
        let mut cmd = redis::cmd("SET");
        cmd.arg(key).arg(value);
        if let Some(ttl) = ttl_seconds {
            cmd.arg("EX").arg(ttl);
        }
        if let Err(e) = cmd.query_async::<_, ()>(&mut conn).await {
            tracing::warn!(key, error = %e, "redis SET failed");
        }
    }

    async fn incr(&self, key: &str) -> i64 {
        let mut conn = self.conn.clone();
        match redis::cmd("INCR").arg(key).query_async(&mut conn).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(key, error = %e, "redis INCR failed");
                0
            }
        }
    }

    async fn expire(&self, key: &str, ttl_seconds: u64) {
        let mut conn = self.conn.clone();
        if let Err(e) = redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl_seconds)
            .query_async::<_, ()>(&mut conn)
            .await
        {
            tracing::warn!(key, error = %e, "redis EXPIRE failed");
        }
    }

    async fn delete(&self, key: &str) {
        let mut conn = self.conn.clone();
        if let Err(e) = redis::cmd("DEL").arg(key).query_async::<_, ()>(&mut conn).await {
            tracing::warn!(key, error = %e, "redis DEL failed");
        }
    }

    async fn hget(&self, name: &str, field: &str) -> Option<String> {
        let mut conn = self.conn.clone();
        match redis::cmd("HGET")
            .arg(name)
            .arg(field)
            .query_async(&mut conn)
            .await
        {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!(name, field, error = %e, "redis HGET failed");
                None
            }
        }
    }

    async fn hset(&self, name: &str, field: &str, value: &str) {
        let mut conn = self.conn.clone();
        if let Err(e) = redis::cmd("HSET")
            .arg(name)
            .arg(field)
            .arg(value)
            .query_async::<_, ()>(&mut conn)
            .await
        {
            tracing::warn!(name, field, error = %e, "redis HSET failed");
        }
    }

    async fn hgetall(&self, name: &str) -> HashMap<String, String> {
        let mut conn = self.conn.clone();
        match redis::cmd("HGETALL").arg(name).query_async(&mut conn).await {
            Ok(map) => map,
            Err(e) => {
                tracing::warn!(name, error = %e, "redis HGETALL failed");
                HashMap::new()
            }
        }
    }

    async fn exists(&self, key: &str) -> bool {
        let mut conn = self.conn.clone();
        match redis::cmd("EXISTS").arg(key).query_async::<_, i64>(&mut conn).await {
            Ok(count) => count > 0,
            Err(e) => {
                tracing::warn!(key, error = %e, "redis EXISTS failed");
                false
            }
        }
    }

    async fn keys(&self, pattern: &str) -> Vec<String> {
        let mut conn = self.conn.clone();
        match redis::cmd("KEYS").arg(pattern).query_async(&mut conn).await {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(pattern, error = %e, "redis KEYS failed");
                Vec::new()
            }
        }
    }
}

#[derive(Default)]
struct MemoryState {
    strings: HashMap<String, String>,
    hashes: HashMap<String, HashMap<String, String>>,
}

/// In-process `KvStore` used by unit tests and by the fallback in-memory
/// mode. TTLs are accepted but not enforced — none of the tests need
/// expiry-based garbage collection, only the presence/absence contract.
#[derive(Default)]
pub struct InMemoryKvStore {
    state: Mutex<MemoryState>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for InMemoryKvStore {
    async fn get(&self, key: &str) -> Option<String> {
        self.state.lock().await.strings.get(key).cloned()
    }

    async fn set(&self, key: &str, value: &str, _ttl_seconds: Option<u64>) {
        self.state
            .lock()
            .await
            .strings
            .insert(key.to_string(), value.to_string());
    }

    async fn incr(&self, key: &str) -> i64 {
        let mut state = self.state.lock().await;
        let entry = state.strings.entry(key.to_string()).or_insert_with(|| "0".to_string());
        let next = entry.parse::<i64>().unwrap_or(0) + 1;
        *entry = next.to_string();
        next
    }

    async fn expire(&self, _key: &str, _ttl_seconds: u64) {}

    async fn delete(&self, key: &str) {
        let mut state = self.state.lock().await;
        state.strings.remove(key);
        state.hashes.remove(key);
    }

    async fn hget(&self, name: &str, field: &str) -> Option<String> {
        self.state
            .lock()
            .await
            .hashes
            .get(name)
            .and_then(|h| h.get(field).cloned())
    }

    async fn hset(&self, name: &str, field: &str, value: &str) {
        self.state
            .lock()
            .await
            .hashes
            .entry(name.to_string())
            .or_default()
            .insert(field.to_string(), value.to_string());
    }

    async fn hgetall(&self, name: &str) -> HashMap<String, String> {
        self.state
            .lock()
            .await
            .hashes
            .get(name)
            .cloned()
            .unwrap_or_default()
    }

    async fn exists(&self, key: &str) -> bool {
        let state = self.state.lock().await;
        state.strings.contains_key(key) || state.hashes.contains_key(key)
    }

    async fn keys(&self, pattern: &str) -> Vec<String> {
        let prefix = pattern.trim_end_matches('*');
        let state = self.state.lock().await;
        state
            .strings
            .keys()
            .chain(state.hashes.keys())
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }
}

/// Test double that always behaves as if the store were completely
/// unreachable: every read returns the neutral value, mirroring what a
/// [`RedisKvStore`] would do if Redis itself were down. Used to exercise
/// fail-open behavior (property 7 / scenario S5) without needing error
/// injection in the trait itself.
#[derive(Default)]
pub struct FailingKvStore;

#[async_trait]
impl KvStore for FailingKvStore {
    async fn get(&self, _key: &str) -> Option<String> {
        None
    }
    async fn set(&self, _key: &str, _value: &str, _ttl_seconds: Option<u64>) {}
    async fn incr(&self, _key: &str) -> i64 {
        0
    }
    async fn expire(&self, _key: &str, _ttl_seconds: u64) {}
    async fn delete(&self, _key: &str) {}
    async fn hget(&self, _name: &str, _field: &str) -> Option<String> {
        None
    }
    async fn hset(&self, _name: &str, _field: &str, _value: &str) {}
    async fn hgetall(&self, _name: &str) -> HashMap<String, String> {
        HashMap::new()
    }
    async fn exists(&self, _key: &str) -> bool {
        false
    }
    async fn keys(&self, _pattern: &str) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_hash_roundtrip() {
        let store = InMemoryKvStore::new();
        store.hset("bucket:u1:/x:GET", "tokens", "9").await;
        store.hset("bucket:u1:/x:GET", "last_refill", "100.0").await;

        let all = store.hgetall("bucket:u1:/x:GET").await;
        assert_eq!(all.get("tokens").map(String::as_str), Some("9"));
        assert_eq!(all.get("last_refill").map(String::as_str), Some("100.0"));
    }

    #[tokio::test]
    async fn in_memory_keys_pattern() {
        let store = InMemoryKvStore::new();
        store.hset("bucket:u1:/x:GET", "tokens", "1").await;
        store.hset("bucket:u1:/y:POST", "tokens", "1").await;
        store.hset("bucket:u2:/x:GET", "tokens", "1").await;

        let mut matches = store.keys("bucket:u1:*").await;
        matches.sort();
        assert_eq!(matches, vec!["bucket:u1:/x:GET", "bucket:u1:/y:POST"]);
    }

    #[tokio::test]
    async fn in_memory_incr_starts_at_one() {
        let store = InMemoryKvStore::new();
        assert_eq!(store.incr("stats:global:100:total").await, 1);
        assert_eq!(store.incr("stats:global:100:total").await, 2);
    }

    #[tokio::test]
    async fn failing_store_returns_neutral_values() {
        let store = FailingKvStore;
        assert_eq!(store.get("anything").await, None);
        assert_eq!(store.incr("anything").await, 0);
        assert!(!store.exists("anything").await);
        assert!(store.hgetall("anything").await.is_empty());
        assert!(store.keys("anything*").await.is_empty());
    }
}
