//! # Statistics Recorder
//!
//! Per-minute admission counters keyed by scope (global, user, endpoint)
//! and by outcome (total/allowed/blocked). Generalizes the teacher's
//! in-process `MetricsCollector` into a KV-backed recorder, since the
//! spec requires counters to converge across gateway instances rather
//! than stay local to one process.

use crate::kv::KvStore;
use std::collections::HashMap;

const STATS_TTL_SECONDS: u64 = 3600;
const RECENT_MINUTES: i64 = 5;

fn minute_bucket(now: f64) -> i64 {
    (now / 60.0).floor() as i64
}

/// One minute's worth of total/allowed/blocked counts for a scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MinuteCounts {
    pub minute: i64,
    pub total: i64,
    pub allowed: i64,
    pub blocked: i64,
}

async fn bump(store: &dyn KvStore, scope_minute_key: &str, allowed: bool) {
    store.incr(&format!("{}:total", scope_minute_key)).await;
    if allowed {
        store.incr(&format!("{}:allowed", scope_minute_key)).await;
    } else {
        store.incr(&format!("{}:blocked", scope_minute_key)).await;
    }
    store.expire(&format!("{}:total", scope_minute_key), STATS_TTL_SECONDS).await;
    store.expire(&format!("{}:allowed", scope_minute_key), STATS_TTL_SECONDS).await;
    store.expire(&format!("{}:blocked", scope_minute_key), STATS_TTL_SECONDS).await;
}

/// Records one admission decision across the three scopes. Best-effort:
/// any underlying KV failure is already swallowed by `KvStore`, so this
/// never affects the admission outcome it's recording.
pub async fn record(
    store: &dyn KvStore,
    user_id: &str,
    endpoint: &str,
    method: &str,
    allowed: bool,
    now: f64,
) {
    let minute = minute_bucket(now);

    bump(store, &format!("stats:global:{}", minute), allowed).await;
    bump(store, &format!("stats:user:{}:{}", user_id, minute), allowed).await;
    bump(
        store,
        &format!("stats:endpoint:{}:{}:{}", endpoint, method, minute),
        allowed,
    )
    .await;
}

async fn read_minute(store: &dyn KvStore, scope: &str, minute: i64) -> MinuteCounts {
    let prefix = format!("{}:{}", scope, minute);
    let total = store
        .get(&format!("{}:total", prefix))
        .await
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let allowed = store
        .get(&format!("{}:allowed", prefix))
        .await
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let blocked = store
        .get(&format!("{}:blocked", prefix))
        .await
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);

    MinuteCounts {
        minute,
        total,
        allowed,
        blocked,
    }
}

/// Global stats for the five most recent minutes `[m, m-1, m-2, m-3, m-4]`.
pub async fn get_stats(store: &dyn KvStore, now: f64) -> Vec<MinuteCounts> {
    let current_minute = minute_bucket(now);
    let mut rows = Vec::with_capacity(RECENT_MINUTES as usize);
    for i in 0..RECENT_MINUTES {
        rows.push(read_minute(store, "stats:global", current_minute - i).await);
    }
    rows
}

/// A snapshot of one user's current token-bucket state, returned keyed
/// by the `endpoint:method` substring of its bucket key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketSnapshot {
    pub tokens: f64,
    pub last_refill: f64,
}

/// Per-user stats for the five most recent minutes, plus a snapshot of
/// that user's currently active buckets via `keys("bucket:{user_id}:*")`
/// followed by `hgetall` on each.
pub async fn get_user_stats(
    store: &dyn KvStore,
    user_id: &str,
    now: f64,
) -> (Vec<MinuteCounts>, HashMap<String, BucketSnapshot>) {
    let current_minute = minute_bucket(now);
    let mut rows = Vec::with_capacity(RECENT_MINUTES as usize);
    for i in 0..RECENT_MINUTES {
        rows.push(read_minute(store, &format!("stats:user:{}", user_id), current_minute - i).await);
    }

    let bucket_prefix = format!("bucket:{}:", user_id);
    let bucket_keys = store.keys(&format!("{}*", bucket_prefix)).await;

    let mut buckets = HashMap::new();
    for bucket_key in bucket_keys {
        let data = store.hgetall(&bucket_key).await;
        if data.is_empty() {
            continue;
        }
        let endpoint_method = bucket_key.strip_prefix(&bucket_prefix).unwrap_or(&bucket_key);
        let tokens = data.get("tokens").and_then(|v| v.parse().ok()).unwrap_or(0.0);
        let last_refill = data.get("last_refill").and_then(|v| v.parse().ok()).unwrap_or(0.0);
        buckets.insert(endpoint_method.to_string(), BucketSnapshot { tokens, last_refill });
    }

    (rows, buckets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::InMemoryKvStore;

    #[tokio::test]
    async fn total_equals_allowed_plus_blocked() {
        let store = InMemoryKvStore::new();
        record(&store, "u1", "/x", "GET", true, 0.0).await;
        record(&store, "u1", "/x", "GET", true, 0.0).await;
        record(&store, "u1", "/x", "GET", false, 0.0).await;

        let stats = get_stats(&store, 0.0).await;
        let current = stats[0];
        assert_eq!(current.total, current.allowed + current.blocked);
        assert_eq!(current.total, 3);
        assert_eq!(current.allowed, 2);
        assert_eq!(current.blocked, 1);
    }

    #[tokio::test]
    async fn user_and_endpoint_scopes_are_independent() {
        let store = InMemoryKvStore::new();
        record(&store, "u1", "/x", "GET", true, 0.0).await;
        record(&store, "u2", "/x", "GET", false, 0.0).await;

        let (u1_rows, _) = get_user_stats(&store, "u1", 0.0).await;
        let (u2_rows, _) = get_user_stats(&store, "u2", 0.0).await;

        assert_eq!(u1_rows[0].allowed, 1);
        assert_eq!(u1_rows[0].blocked, 0);
        assert_eq!(u2_rows[0].allowed, 0);
        assert_eq!(u2_rows[0].blocked, 1);
    }

    #[tokio::test]
    async fn missing_counters_read_as_zero() {
        let store = InMemoryKvStore::new();
        let stats = get_stats(&store, 600.0).await;
        assert!(stats.iter().all(|m| m.total == 0));
    }

    #[tokio::test]
    async fn user_stats_reports_current_bucket_snapshot() {
        let store = InMemoryKvStore::new();
        crate::bucket::admit(&store, "u1", "/x", "GET", 60, 10, 0.0).await;

        let (_, buckets) = get_user_stats(&store, "u1", 0.0).await;
        assert!(buckets.contains_key("/x:GET"));
        assert_eq!(buckets["/x:GET"].tokens, 9.0);
    }
}
