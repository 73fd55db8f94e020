//! # Admission Facade
//!
//! Wires the Configuration Resolver, Bucket Engine, and Statistics
//! Recorder behind the public operations the gateway chassis calls. This
//! is the gateway's equivalent of `throttler::throttler::Throttler`,
//! generalized from a `HashMap<String, RateLimitRule>` rules map to a
//! single hot-swappable [`ConfigSnapshot`].
//!
//! ## Cancellation
//!
//! Every KV operation below is a plain `.await` point under cooperative
//! scheduling. If the caller drops the future driving `is_allowed` (for
//! example via `tokio::select!` racing a client disconnect), whatever
//! round-trip was in flight simply never completes — no partial state is
//! corrupted, since the next admission on that key recovers from
//! whatever was last persisted. A caller that wants fail-open-on-cancel
//! gets it for free by wrapping the call in `tokio::select!` and treating
//! a lost race as admit.

use crate::bucket::{self, AdmissionOutcome, RemainingTokens};
use crate::kv::KvStore;
use crate::rate_limit_config::{resolve, ConfigSnapshot};
use crate::stats::{self, BucketSnapshot, MinuteCounts};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::RwLock;

pub const CONFIG_KEY: &str = "rate_limit_config";

fn now_seconds() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs_f64()
}

/// Orchestrates admission decisions for the whole process.
///
/// The in-process configuration snapshot is held as an
/// `RwLock<Arc<ConfigSnapshot>>`: readers clone the `Arc` under a brief
/// read lock rather than cloning the document itself, and
/// `update_config` swaps the whole `Arc` under a write lock, giving
/// atomic-pointer-swap semantics.
pub struct Admission {
    store: Arc<dyn KvStore>,
    snapshot: RwLock<Arc<ConfigSnapshot>>,
}

impl Admission {
    pub fn new(store: Arc<dyn KvStore>, snapshot: ConfigSnapshot) -> Self {
        Self {
            store,
            snapshot: RwLock::new(Arc::new(snapshot)),
        }
    }

    /// Hydrates the in-process snapshot from `rate_limit_config` at
    /// startup, falling back to a built-in default if absent or
    /// unreadable. This is the §4.5-prescribed behavior rather than the
    /// original prototype's GET-only-on-admin-request approach.
    pub async fn connect(store: Arc<dyn KvStore>) -> Self {
        let snapshot = match store.get(CONFIG_KEY).await {
            Some(raw) => serde_json::from_str(&raw).unwrap_or_else(|e| {
                tracing::warn!(error = %e, "failed to parse persisted rate_limit_config, using defaults");
                ConfigSnapshot::default()
            }),
            None => ConfigSnapshot::default(),
        };
        Self::new(store, snapshot)
    }

    async fn current_snapshot(&self) -> Arc<ConfigSnapshot> {
        self.snapshot.read().await.clone()
    }

    /// Resolves parameters, runs the bucket engine, records stats, and
    /// returns the admit decision. Never raises: every failure mode
    /// downstream resolves to a value, not an error.
    pub async fn is_allowed(&self, user_id: &str, endpoint: &str, method: &str) -> bool {
        let snapshot = self.current_snapshot().await;
        let resolved = resolve(&snapshot, user_id, endpoint, method);
        let now = now_seconds();

        let AdmissionOutcome { allowed, .. } = bucket::admit(
            self.store.as_ref(),
            user_id,
            endpoint,
            method,
            resolved.requests_per_minute,
            resolved.burst_size,
            now,
        )
        .await;

        stats::record(self.store.as_ref(), user_id, endpoint, method, allowed, now).await;

        allowed
    }

    /// Non-mutating projection of the current bucket state.
    pub async fn get_remaining(&self, user_id: &str, endpoint: &str, method: &str) -> RemainingTokens {
        let snapshot = self.current_snapshot().await;
        let resolved = resolve(&snapshot, user_id, endpoint, method);
        bucket::remaining(
            self.store.as_ref(),
            user_id,
            endpoint,
            method,
            resolved.requests_per_minute,
            resolved.burst_size,
            now_seconds(),
        )
        .await
    }

    /// Deletes every bucket belonging to `user_id`. Best-effort: any
    /// underlying KV failure during the scan or the deletes simply
    /// leaves some buckets in place, which self-heal on next admission.
    pub async fn reset_user(&self, user_id: &str) {
        let pattern = format!("bucket:{}:*", user_id);
        let keys = self.store.keys(&pattern).await;
        for key in keys {
            self.store.delete(&key).await;
        }
    }

    pub async fn get_stats(&self) -> Vec<MinuteCounts> {
        stats::get_stats(self.store.as_ref(), now_seconds()).await
    }

    pub async fn get_user_stats(&self, user_id: &str) -> (Vec<MinuteCounts>, HashMap<String, BucketSnapshot>) {
        stats::get_user_stats(self.store.as_ref(), user_id, now_seconds()).await
    }

    /// Replaces the in-process snapshot. The caller is responsible for
    /// persisting the document to the store under `rate_limit_config`
    /// separately (the admin handler does both in one request).
    pub async fn update_config(&self, snapshot: ConfigSnapshot) {
        let mut guard = self.snapshot.write().await;
        *guard = Arc::new(snapshot);
    }
}
