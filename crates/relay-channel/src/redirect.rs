//! Redirect cache - tenant → effective ingestion URL
//!
//! Ingestion may answer 307/308 pointing a tenant at a regional endpoint.
//! The channel caches that mapping so subsequent sends skip the extra
//! round trip. Entries expire after a TTL and are evicted LRU when the
//! cache is full; expiry is lazy, checked on lookup.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use relay_protocol::TenantKey;
use url::Url;

/// How long a redirect stays effective
pub const DEFAULT_REDIRECT_TTL: Duration = Duration::from_secs(5 * 60);

/// Maximum number of cached tenants
pub const DEFAULT_REDIRECT_CAPACITY: usize = 1000;

struct Entry {
    url: Url,
    expires_at: Instant,
    last_used: u64,
}

struct Inner {
    map: HashMap<TenantKey, Entry>,
    counter: u64,
}

/// TTL-bounded, capacity-bounded map of tenant → redirected base URL
pub struct RedirectCache {
    capacity: usize,
    inner: Mutex<Inner>,
}

impl RedirectCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            inner: Mutex::new(Inner {
                map: HashMap::new(),
                counter: 0,
            }),
        }
    }

    /// Return the non-expired entry for a tenant, removing it if stale
    pub fn lookup(&self, tenant: &TenantKey) -> Option<Url> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        inner.counter += 1;
        let counter = inner.counter;

        let expired = match inner.map.get_mut(tenant) {
            Some(entry) if entry.expires_at > now => {
                entry.last_used = counter;
                return Some(entry.url.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            inner.map.remove(tenant);
        }
        None
    }

    /// Upsert a redirect; evicts the least recently used entry when full
    pub fn store(&self, tenant: &TenantKey, url: Url, ttl: Duration) {
        let mut inner = self.inner.lock();
        inner.counter += 1;
        let counter = inner.counter;

        if inner.map.len() >= self.capacity && !inner.map.contains_key(tenant) {
            let oldest = inner
                .map
                .iter()
                .min_by_key(|(_, entry)| entry.last_used)
                .map(|(key, _)| key.clone());
            if let Some(key) = oldest {
                inner.map.remove(&key);
            }
        }

        inner.map.insert(
            tenant.clone(),
            Entry {
                url,
                expires_at: Instant::now() + ttl,
                last_used: counter,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for RedirectCache {
    fn default() -> Self {
        Self::new(DEFAULT_REDIRECT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tenant(n: u32) -> TenantKey {
        TenantKey::parse(&format!("{n:08x}-0000-0000-0000-000000000000")).unwrap()
    }

    fn url(host: &str) -> Url {
        Url::parse(&format!("https://{host}/")).unwrap()
    }

    #[test]
    fn test_lookup_miss() {
        let cache = RedirectCache::default();
        assert_eq!(cache.lookup(&tenant(1)), None);
    }

    #[test]
    fn test_store_then_lookup() {
        let cache = RedirectCache::default();
        cache.store(&tenant(1), url("eastus"), DEFAULT_REDIRECT_TTL);
        assert_eq!(cache.lookup(&tenant(1)), Some(url("eastus")));
    }

    #[test]
    fn test_upsert_replaces() {
        let cache = RedirectCache::default();
        cache.store(&tenant(1), url("eastus"), DEFAULT_REDIRECT_TTL);
        cache.store(&tenant(1), url("westus"), DEFAULT_REDIRECT_TTL);
        assert_eq!(cache.lookup(&tenant(1)), Some(url("westus")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_expired_entry_removed_on_lookup() {
        let cache = RedirectCache::default();
        cache.store(&tenant(1), url("eastus"), Duration::ZERO);
        assert_eq!(cache.lookup(&tenant(1)), None);
        assert!(cache.is_empty());
    }

    #[test]
    fn test_lru_eviction_when_full() {
        let cache = RedirectCache::new(2);
        cache.store(&tenant(1), url("a"), DEFAULT_REDIRECT_TTL);
        cache.store(&tenant(2), url("b"), DEFAULT_REDIRECT_TTL);

        // Touch tenant 1 so tenant 2 becomes the LRU entry
        assert!(cache.lookup(&tenant(1)).is_some());

        cache.store(&tenant(3), url("c"), DEFAULT_REDIRECT_TTL);
        assert_eq!(cache.len(), 2);
        assert!(cache.lookup(&tenant(1)).is_some());
        assert_eq!(cache.lookup(&tenant(2)), None);
        assert!(cache.lookup(&tenant(3)).is_some());
    }
}
