//! Thread-safe Cache Module
//!
//! Wraps a [`CacheStore`] in a single reader/writer lock per cache instance
//! and owns the optional background sweeper.
//!
//! # Locking
//! Anything that changes the store or its recency order takes the exclusive
//! lock, including `get`. `take`, enumeration and the size queries run under
//! the shared lock and never mutate. `peek` checks under the shared lock and,
//! only when it finds an expired entry, retries under the exclusive lock to
//! remove it if it is still expired.

use std::borrow::Borrow;
use std::hash::Hash;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, error, warn};

use crate::cache::{
    CacheStats, CacheStore, EntryHandle, Inserted, Lookup, StatsRecorder, DEFAULT_CAPACITY,
};
use crate::config::Config;
use crate::tasks::CleanupTask;

pub(crate) struct Shared<K, V> {
    pub(crate) store: RwLock<CacheStore<K, V>>,
    stats: StatsRecorder,
    cleaner: Mutex<Option<CleanupTask>>,
}

impl<K, V> Shared<K, V>
where
    K: Hash + Eq + Clone,
{
    fn purge(&self) -> usize {
        let removed = self.store.write().purge(Instant::now());
        self.stats.record_expirations(removed);
        removed
    }
}

impl<K, V> Drop for Shared<K, V> {
    fn drop(&mut self) {
        if let Some(task) = self.cleaner.get_mut().take() {
            if task.is_running() {
                warn!("Cache dropped while its TTL cleanup task was running; stopping it");
            }
            task.stop();
        }
    }
}

// == Cache ==
/// Thread-safe LRU cache with optional TTL expiration.
///
/// `Cache` is a cheap handle: clones share the same entries.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use ttl_lru::Cache;
///
/// let cache = Cache::new(3);
/// cache.set_default_ttl(Duration::from_secs(60));
/// cache.set("a", 1);
/// cache.set("b", 2).expire(Duration::ZERO); // never expires
///
/// assert_eq!(cache.get("a"), Some(1));
/// assert_eq!(cache.keys(), vec!["a", "b"]);
/// ```
pub struct Cache<K, V> {
    inner: Arc<Shared<K, V>>,
}

impl<K, V> Clone for Cache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<K, V> Default for Cache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone,
    V: Clone,
{
    // == Constructor ==
    /// Creates a cache holding at most `capacity` entries. Zero selects
    /// `DEFAULT_CAPACITY`.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Shared {
                store: RwLock::new(CacheStore::new(capacity)),
                stats: StatsRecorder::new(),
                cleaner: Mutex::new(None),
            }),
        }
    }

    // == Default TTL ==
    /// Sets the TTL applied to entries inserted from now on. Zero disables it.
    pub fn set_default_ttl(&self, ttl: Duration) -> &Self {
        self.inner.store.write().set_default_ttl(Some(ttl));
        self
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.inner.store.read().default_ttl()
    }

    // == Set ==
    /// Inserts or replaces a value and marks it most recently used.
    ///
    /// A replaced entry that already had an expiry gets a fresh one from the
    /// default TTL; an entry that never expired keeps never expiring. The
    /// returned handle can override the expiry of this key.
    pub fn set(&self, key: K, value: V) -> EntryHandle<K, V> {
        let handle = EntryHandle::new(Arc::downgrade(&self.inner), key.clone());
        let inserted = self.inner.store.write().set(key, value, Instant::now());
        self.record_insert(inserted);
        handle
    }

    // == Put ==
    /// Inserts or replaces a value without changing the position or expiry
    /// of an existing live entry.
    pub fn put(&self, key: K, value: V) {
        let inserted = self.inner.store.write().put(key, value, Instant::now());
        self.record_insert(inserted);
    }

    // == Get ==
    /// Returns a live value and marks it most recently used. An expired
    /// entry is removed and reported as absent.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let mut store = self.inner.store.write();
        let lookup = store.get(key, Instant::now()).map(V::clone);
        self.record_lookup(lookup, true)
    }

    // == Peek ==
    /// Returns a live value without touching its position. An expired entry
    /// is removed and reported as absent.
    pub fn peek<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        {
            let store = self.inner.store.read();
            match store.take(key, now) {
                Lookup::Hit(value) => {
                    return self.record_lookup(Lookup::Hit(value.clone()), false);
                }
                Lookup::Miss => return self.record_lookup(Lookup::Miss, false),
                Lookup::Expired => {}
            }
        }

        // The entry may have been replaced or removed between the two locks;
        // the store re-checks before removing anything.
        let mut store = self.inner.store.write();
        let lookup = store.peek(key, now).map(V::clone);
        self.record_lookup(lookup, true)
    }

    // == Take ==
    /// Returns a live value without changing anything in the cache.
    ///
    /// Expired entries are reported as absent but left for lazy expiry or the
    /// sweeper to remove.
    pub fn take<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let store = self.inner.store.read();
        let lookup = store.take(key, Instant::now()).map(V::clone);
        self.record_lookup(lookup, false)
    }

    /// True if `key` is present and live. Does not count as a hit or miss.
    pub fn contains_key<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let store = self.inner.store.read();
        matches!(store.take(key, Instant::now()), Lookup::Hit(_))
    }

    /// Time left before a live entry expires. `None` if the key is absent,
    /// expired, or never expires.
    pub fn expires_in<Q>(&self, key: &Q) -> Option<Duration>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let now = Instant::now();
        let store = self.inner.store.read();
        let entry = store.entry(key)?;
        if entry.is_expired(now) {
            return None;
        }
        entry.ttl_remaining(now)
    }

    // == Delete ==
    /// Removes `key`, returning whether it was present.
    pub fn delete<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner.store.write().remove(key).is_some()
    }

    // == Size ==
    /// Number of stored entries. Expired entries that have not been removed
    /// yet are counted until lazy expiry or a purge drops them.
    pub fn len(&self) -> usize {
        self.inner.store.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.store.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.inner.store.read().capacity()
    }

    // == Set Capacity ==
    /// Changes the capacity (zero selects `DEFAULT_CAPACITY`), evicting the
    /// least recently used entries until the cache fits.
    pub fn set_capacity(&self, capacity: usize) {
        let mut store = self.inner.store.write();
        let evicted = store.set_capacity(capacity);
        if evicted > 0 {
            debug!(
                "Capacity reduced to {}: evicted {} entries",
                store.capacity(),
                evicted
            );
        }
        self.inner.stats.record_evictions(evicted);
    }

    // == Enumeration ==
    /// Live keys, most recently used first.
    pub fn keys(&self) -> Vec<K> {
        self.inner.store.read().keys(Instant::now())
    }

    /// Live `(key, value)` pairs, most recently used first.
    pub fn entries(&self) -> Vec<(K, V)> {
        self.inner
            .store
            .read()
            .live(Instant::now())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect()
    }

    /// Visits live entries from most to least recently used until `visit`
    /// breaks.
    ///
    /// The shared lock is held for the whole walk, so `visit` sees a
    /// consistent view but must not call back into this cache.
    pub fn range<F>(&self, mut visit: F)
    where
        F: FnMut(&K, &V) -> ControlFlow<()>,
    {
        let store = self.inner.store.read();
        for (key, value) in store.live(Instant::now()) {
            if visit(key, value).is_break() {
                break;
            }
        }
    }

    // == Clear ==
    /// Drops every entry. Capacity, default TTL and the sweeper are kept.
    pub fn clear(&self) {
        self.inner.store.write().clear();
    }

    // == Purge ==
    /// Removes every expired entry and returns how many were removed.
    pub fn purge(&self) -> usize {
        self.inner.purge()
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let store = self.inner.store.read();
        self.inner.stats.snapshot(store.len(), store.capacity())
    }

    fn record_insert(&self, inserted: Inserted<K, V>) {
        if inserted.evicted.is_some() {
            self.inner.stats.record_evictions(1);
        }
        if inserted.replaced_expired {
            self.inner.stats.record_expirations(1);
        }
    }

    fn record_lookup(&self, lookup: Lookup<V>, removes_expired: bool) -> Option<V> {
        match lookup {
            Lookup::Hit(value) => {
                self.inner.stats.record_hit();
                Some(value)
            }
            Lookup::Expired => {
                self.inner.stats.record_miss();
                if removes_expired {
                    self.inner.stats.record_expirations(1);
                }
                None
            }
            Lookup::Miss => {
                self.inner.stats.record_miss();
                None
            }
        }
    }
}

impl<K, V> Cache<K, V>
where
    K: Hash + Eq + Clone + Send + Sync + 'static,
    V: Clone + Send + Sync + 'static,
{
    /// Creates a cache from [`Config`], starting the sweeper if an interval
    /// is configured.
    pub fn from_config(config: &Config) -> Self {
        let cache = Self::new(config.capacity);
        if let Some(ttl) = config.default_ttl() {
            cache.set_default_ttl(ttl);
        }
        if let Some(interval) = config.cleanup_interval() {
            cache.start_cleaner(interval);
        }
        cache
    }

    // == Cleaner ==
    /// Starts a background task that purges expired entries every
    /// `interval`, replacing any task started earlier.
    ///
    /// Call [`Cache::stop_cleaner`] when the cache is no longer needed. The
    /// task also stops once every clone of the cache has been dropped, but
    /// only as a fallback.
    pub fn start_cleaner(&self, interval: Duration) -> &Self {
        let mut cleaner = self.inner.cleaner.lock();
        if let Some(previous) = cleaner.take() {
            previous.stop();
        }

        let weak = Arc::downgrade(&self.inner);
        let spawned = CleanupTask::spawn(interval, move || match weak.upgrade() {
            Some(shared) => ControlFlow::Continue(shared.purge()),
            None => ControlFlow::Break(()),
        });
        match spawned {
            Ok(task) => *cleaner = Some(task),
            Err(err) => error!("Failed to start TTL cleanup task: {}", err),
        }
        self
    }

    /// Stops the background task, if any. Safe to call repeatedly.
    pub fn stop_cleaner(&self) {
        if let Some(task) = self.inner.cleaner.lock().take() {
            task.stop();
        }
    }

    pub fn is_cleaner_running(&self) -> bool {
        self.inner
            .cleaner
            .lock()
            .as_ref()
            .is_some_and(CleanupTask::is_running)
    }
}
