use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use lru::LruCache;
use tokio::task::JoinHandle;

const MAX_ENTRIES: usize = 10_000;
const SWEEP_INTERVAL: Duration = Duration::from_secs(3600);

struct CacheEntry<V> {
    value: V,
    expires_at: Option<Instant>,
}

impl<V> CacheEntry<V> {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.is_some_and(|at| now > at)
    }
}

/// Process-lifetime memo with optional per-entry expiry.
///
/// Reads use `peek` so lookups never reorder entries; once full, the oldest
/// insertion is evicted first.
pub struct Cache<V> {
    store: Mutex<LruCache<String, CacheEntry<V>>>,
}

impl<V: Clone> Cache<V> {
    pub fn new() -> Self {
        Self::with_capacity(MAX_ENTRIES)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            store: Mutex::new(LruCache::new(capacity)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, CacheEntry<V>>> {
        self.store.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut store = self.lock();
        let entry = store.peek(key)?;
        if entry.is_expired(Instant::now()) {
            store.pop(key);
            return None;
        }
        Some(entry.value.clone())
    }

    pub fn set(&self, key: &str, value: V, ttl: Option<Duration>) {
        let entry = CacheEntry {
            value,
            expires_at: ttl.map(|ttl| Instant::now() + ttl),
        };
        self.lock().put(key.to_string(), entry);
    }

    pub fn clear_prefix(&self, prefix: &str) {
        let mut store = self.lock();
        let keys: Vec<String> = store
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(key, _)| key.clone())
            .collect();
        for key in keys {
            store.pop(&key);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut store = self.lock();
        let expired: Vec<String> = store
            .iter()
            .filter(|(_, entry)| entry.is_expired(now))
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            store.pop(key);
        }
        expired.len()
    }
}

impl<V: Clone> Default for Cache<V> {
    fn default() -> Self {
        Self::new()
    }
}

/// Periodically drop expired entries so keys nobody reads again do not linger.
pub fn start_sweep<V>(cache: Arc<Cache<V>>) -> JoinHandle<()>
where
    V: Clone + Send + 'static,
{
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            interval.tick().await;
            let removed = cache.sweep();
            if removed > 0 {
                tracing::debug!("Cache sweep removed {} expired entries", removed);
            }
        }
    })
}
