//! # Token Bucket Engine
//!
//! Implements the admission algorithm against the KV store: load, refill,
//! admit-or-reject, persist. Pure arithmetic (refill, capping) is kept
//! separate from the storage round-trips so the formula itself can be
//! unit tested without a store at all.

use crate::kv::KvStore;

fn bucket_key(user_id: &str, endpoint: &str, method: &str) -> String {
    format!("bucket:{}:{}:{}", user_id, endpoint, method)
}

const BUCKET_TTL_SECONDS: u64 = 3600;

/// Outcome of a single admission step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AdmissionOutcome {
    pub allowed: bool,
    pub tokens_after: u64,
}

/// `new_tokens = min(max_tokens, tokens + elapsed_seconds * refill_rate)`,
/// where `refill_rate` is tokens per second. Shared by the admission step
/// and by `get_remaining`'s read-only projection.
fn refill(tokens: f64, elapsed_seconds: f64, refill_rate: f64, max_tokens: u64) -> f64 {
    let elapsed = elapsed_seconds.max(0.0);
    (tokens + elapsed * refill_rate).min(max_tokens as f64)
}

/// Runs one admission step against the bucket for `(user_id, endpoint,
/// method)`, persisting the result. `now` is seconds since the Unix
/// epoch, passed in so callers control the clock (and tests can control
/// it too).
///
/// Never fails: a missing or malformed bucket hash is treated as absent
/// and reinitialized, exactly as a KV error would be, since `KvStore`
/// itself never surfaces an error to this layer.
pub async fn admit(
    store: &dyn KvStore,
    user_id: &str,
    endpoint: &str,
    method: &str,
    requests_per_minute: u64,
    burst_size: u64,
    now: f64,
) -> AdmissionOutcome {
    let refill_rate = requests_per_minute as f64 / 60.0;
    let max_tokens = burst_size;
    let key = bucket_key(user_id, endpoint, method);

    let existing = store.hgetall(&key).await;

    let (current_tokens, last_refill) = if existing.is_empty() {
        (max_tokens as f64, now)
    } else {
        match (
            existing.get("tokens").and_then(|v| v.parse::<f64>().ok()),
            existing.get("last_refill").and_then(|v| v.parse::<f64>().ok()),
        ) {
            (Some(tokens), Some(last_refill)) => (tokens, last_refill),
            // Malformed hash: treat as if the bucket were absent.
            _ => (max_tokens as f64, now),
        }
    };

    let elapsed = now - last_refill;
    let new_tokens = refill(current_tokens, elapsed, refill_rate, max_tokens);

    let (allowed, tokens_to_persist) = if new_tokens >= 1.0 {
        (true, new_tokens - 1.0)
    } else {
        (false, new_tokens)
    };

    // Truncate toward zero on persistence; refill arithmetic itself stays
    // real-valued so it doesn't quantize drift across requests.
    let persisted_tokens = tokens_to_persist.trunc().max(0.0) as u64;

    store.hset(&key, "tokens", &persisted_tokens.to_string()).await;
    store.hset(&key, "last_refill", &now.to_string()).await;
    store.expire(&key, BUCKET_TTL_SECONDS).await;

    AdmissionOutcome {
        allowed,
        tokens_after: persisted_tokens,
    }
}

/// Result of a non-mutating remaining-tokens query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RemainingTokens {
    pub remaining_tokens: u64,
    pub max_tokens: u64,
    pub refill_rate_per_second: f64,
    pub requests_per_minute: u64,
}

/// Reads the bucket without mutating it, projecting forward the same
/// refill formula `admit` uses. No TTL refresh, no persistence.
pub async fn remaining(
    store: &dyn KvStore,
    user_id: &str,
    endpoint: &str,
    method: &str,
    requests_per_minute: u64,
    burst_size: u64,
    now: f64,
) -> RemainingTokens {
    let refill_rate = requests_per_minute as f64 / 60.0;
    let max_tokens = burst_size;
    let key = bucket_key(user_id, endpoint, method);

    let existing = store.hgetall(&key).await;
    let (current_tokens, last_refill) = if existing.is_empty() {
        (max_tokens as f64, now)
    } else {
        match (
            existing.get("tokens").and_then(|v| v.parse::<f64>().ok()),
            existing.get("last_refill").and_then(|v| v.parse::<f64>().ok()),
        ) {
            (Some(tokens), Some(last_refill)) => (tokens, last_refill),
            _ => (max_tokens as f64, now),
        }
    };

    let elapsed = now - last_refill;
    let projected = refill(current_tokens, elapsed, refill_rate, max_tokens);

    RemainingTokens {
        remaining_tokens: projected.trunc().max(0.0) as u64,
        max_tokens,
        refill_rate_per_second: refill_rate,
        requests_per_minute,
    }
}
