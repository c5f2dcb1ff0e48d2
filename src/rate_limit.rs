use std::fmt::Debug;
use std::sync::{Arc, RwLock};

use ahash::AHashMap;
use chrono::{DateTime, Duration, Utc};
use tokio::task::JoinHandle;
use tracing::{debug, instrument};

/// Storage for per-key hit timestamps.
///
/// The limiter only ever reads and replaces whole lists, so a shared store
/// (redis, a database) can implement this without knowing the policy.
pub trait HitStore: Debug + Send + Sync {
    fn hits(&self, key: &str) -> Vec<DateTime<Utc>>;

    fn set_hits(&self, key: &str, hits: Vec<DateTime<Utc>>);

    /// Drop keys without any hit at or after `cutoff`.
    fn evict_before(&self, cutoff: DateTime<Utc>);
}

#[derive(Debug, Clone, Default)]
pub struct MemoryHitStore {
    map: Arc<RwLock<AHashMap<String, Vec<DateTime<Utc>>>>>,
}

impl MemoryHitStore {
    #[must_use]
    pub fn len(&self) -> usize {
        self.map.read().expect("RWLock should never be poisoned").len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl HitStore for MemoryHitStore {
    fn hits(&self, key: &str) -> Vec<DateTime<Utc>> {
        self.map
            .read()
            .expect("RWLock should never be poisoned")
            .get(key)
            .cloned()
            .unwrap_or_default()
    }

    fn set_hits(&self, key: &str, hits: Vec<DateTime<Utc>>) {
        self.map
            .write()
            .expect("RWLock should never be poisoned")
            .insert(key.to_string(), hits);
    }

    fn evict_before(&self, cutoff: DateTime<Utc>) {
        let mut map = self.map.write().expect("RWLock should never be poisoned");
        map.retain(|_, hits| hits.iter().any(|hit| *hit >= cutoff));
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allowed { remaining: usize },
    Limited,
}

impl Decision {
    #[must_use]
    pub fn is_allowed(self) -> bool {
        matches!(self, Decision::Allowed { .. })
    }
}

/// Sliding window limiter: at most `max_hits` accepted checks per key within `window`.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    store: Arc<dyn HitStore>,
    max_hits: usize,
    window: Duration,
}

impl RateLimiter {
    #[must_use]
    pub fn new(max_hits: usize, window: Duration) -> Self {
        Self::with_store(Arc::new(MemoryHitStore::default()), max_hits, window)
    }

    #[must_use]
    pub fn with_store(store: Arc<dyn HitStore>, max_hits: usize, window: Duration) -> Self {
        Self {
            store,
            max_hits,
            window,
        }
    }

    pub fn check(&self, key: &str) -> Decision {
        self.check_at(key, Utc::now())
    }

    /// Hits older than the window are pruned on every check. A rejected check
    /// records nothing.
    pub fn check_at(&self, key: &str, now: DateTime<Utc>) -> Decision {
        let mut hits = self.store.hits(key);
        hits.retain(|hit| now - *hit < self.window);
        if hits.len() >= self.max_hits {
            debug!(key, hits = hits.len(), "rate limited");
            return Decision::Limited;
        }
        hits.push(now);
        let remaining = self.max_hits - hits.len();
        self.store.set_hits(key, hits);
        Decision::Allowed { remaining }
    }

    #[instrument(skip(self))]
    pub fn evict_idle(&self, now: DateTime<Utc>) {
        self.store.evict_before(now - self.window);
    }
}

/// Periodically drops keys whose hits all fell out of the window.
pub fn start_sweeper(limiter: RateLimiter, period: std::time::Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        loop {
            interval.tick().await;
            limiter.evict_idle(Utc::now());
        }
    })
}
