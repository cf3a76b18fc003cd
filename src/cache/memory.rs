use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, trace};

use super::TokenCache;
use crate::metrics;
use crate::models::IdentityRecord;

/// Default number of identities kept before eviction kicks in.
pub const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone)]
struct CacheEntry {
    identity: IdentityRecord,
    expires_at: Instant,
}

/// Deadline used when `now + ttl` is not representable.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline(now: Instant, ttl: Duration) -> Instant {
    now.checked_add(ttl)
        .or_else(|| now.checked_add(FAR_FUTURE))
        .unwrap_or(now)
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// In-process token cache with per-entry TTL and a capacity bound.
///
/// Expired entries are invisible to `get` immediately but only reclaimed by
/// `purge_expired` (run periodically by the application state) or when an
/// insert finds the cache full. A full cache of live entries evicts the one
/// closest to expiry.
///
/// Eviction is a linear scan under the write lock: once the cache is full
/// of live entries, every insert of a new token costs O(capacity) and holds
/// off concurrent readers for that long. Size `max_entries` accordingly.
#[derive(Debug)]
pub struct MemoryTokenCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    max_entries: usize,
}

impl MemoryTokenCache {
    /// Create a cache holding at most `max_entries` identities.
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            max_entries: max_entries.max(1),
        }
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    /// Remove every expired entry, returning how many were dropped.
    pub async fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now));
        let purged = before - entries.len();

        metrics::set_cache_entries(entries.len());
        if purged > 0 {
            debug!(purged, remaining = entries.len(), "Purged expired identities");
        }
        purged
    }
}

impl Default for MemoryTokenCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ENTRIES)
    }
}

/// Make room for one new key in a full map. O(n) in the map size.
fn evict_for_insert(entries: &mut HashMap<String, CacheEntry>, max_entries: usize, now: Instant) {
    entries.retain(|_, entry| !entry.is_expired(now));
    if entries.len() < max_entries {
        return;
    }

    // Still full of live entries: drop the one that would expire first
    let victim = entries
        .iter()
        .min_by_key(|(_, entry)| entry.expires_at)
        .map(|(key, _)| key.clone());
    if let Some(key) = victim {
        entries.remove(&key);
        trace!("Evicted identity closest to expiry");
    }
}

#[async_trait]
impl TokenCache for MemoryTokenCache {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, token: &str) -> Option<IdentityRecord> {
        let entries = self.entries.read().await;
        entries
            .get(token)
            .filter(|entry| !entry.is_expired(Instant::now()))
            .map(|entry| entry.identity.clone())
    }

    async fn set(&self, token: &str, identity: IdentityRecord, ttl: Duration) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;

        if !entries.contains_key(token) && entries.len() >= self.max_entries {
            evict_for_insert(&mut entries, self.max_entries, now);
        }

        entries.insert(
            token.to_string(),
            CacheEntry {
                identity,
                expires_at: deadline(now, ttl),
            },
        );
        metrics::set_cache_entries(entries.len());
    }
}
