//! Cache Store Module
//!
//! Single-threaded cache engine combining a key index with recency ordering
//! and TTL expiration. Every method takes the current instant explicitly; the
//! thread-safe wrapper in `shared.rs` supplies it and holds the lock.

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;
use std::time::{Duration, Instant};

use crate::cache::entry::expiry_from;
use crate::cache::lru::{RecencyList, SlotId};
use crate::cache::{normalize_capacity, CacheEntry};

// == Lookup Result ==
/// Outcome of reading a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup<T> {
    /// The key is present and live
    Hit(T),
    /// The key was present but its expiry has passed
    Expired,
    /// The key is not present
    Miss,
}

impl<T> Lookup<T> {
    pub fn hit(self) -> Option<T> {
        match self {
            Lookup::Hit(value) => Some(value),
            Lookup::Expired | Lookup::Miss => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Lookup<U> {
        match self {
            Lookup::Hit(value) => Lookup::Hit(f(value)),
            Lookup::Expired => Lookup::Expired,
            Lookup::Miss => Lookup::Miss,
        }
    }
}

// == Insert Result ==
/// Side effects of an insert or update.
#[derive(Debug)]
pub struct Inserted<K, V> {
    /// Entry pushed out of the back because capacity was exceeded
    pub evicted: Option<CacheEntry<K, V>>,
    /// An expired entry under the same key was discarded first
    pub replaced_expired: bool,
}

impl<K, V> Default for Inserted<K, V> {
    fn default() -> Self {
        Self {
            evicted: None,
            replaced_expired: false,
        }
    }
}

// == Cache Store ==
/// Capacity-bounded, recency-ordered key/value storage with optional TTL.
///
/// Invariant: a key is in `index` if and only if its entry is in `order`, and
/// `index.len() == order.len() <= capacity` between method calls.
#[derive(Debug)]
pub struct CacheStore<K, V> {
    /// Key to slot mapping
    index: HashMap<K, SlotId>,
    /// Entries, most recently used first
    order: RecencyList<CacheEntry<K, V>>,
    /// Maximum number of entries allowed
    capacity: usize,
    /// TTL applied to new entries, None = never expire
    default_ttl: Option<Duration>,
}

impl<K, V> CacheStore<K, V>
where
    K: Hash + Eq + Clone,
{
    // == Constructor ==
    /// Creates a new store. A zero capacity selects `DEFAULT_CAPACITY`.
    pub fn new(capacity: usize) -> Self {
        Self {
            index: HashMap::new(),
            order: RecencyList::new(),
            capacity: normalize_capacity(capacity),
            default_ttl: None,
        }
    }

    pub fn default_ttl(&self) -> Option<Duration> {
        self.default_ttl
    }

    /// Sets the TTL used for future inserts. `None` or zero disables it.
    pub fn set_default_ttl(&mut self, ttl: Option<Duration>) {
        self.default_ttl = ttl.filter(|ttl| !ttl.is_zero());
    }

    // == Set ==
    /// Stores a key-value pair and marks it most recently used.
    ///
    /// Overwriting a live key keeps its "never expires" status if it had one;
    /// otherwise its expiry is recomputed from the default TTL. If the cache
    /// overflows, the least recently used entry is evicted.
    pub fn set(&mut self, key: K, value: V, now: Instant) -> Inserted<K, V> {
        let expires_at = expiry_from(self.default_ttl, now);
        let mut replaced_expired = false;

        if let Some(&id) = self.index.get(&key) {
            if let Some(entry) = self.order.get_mut(id) {
                if !entry.is_expired(now) {
                    entry.value = value;
                    if entry.has_expiry() {
                        entry.expires_at = expires_at;
                    }
                    self.order.move_to_front(id);
                    return Inserted::default();
                }
            }
            self.remove_slot(id);
            replaced_expired = true;
        }

        Inserted {
            evicted: self.insert_new(key, value, expires_at),
            replaced_expired,
        }
    }

    // == Put ==
    /// Stores a key-value pair without touching the recency of a live key.
    ///
    /// An existing live entry keeps its position and expiry and only has its
    /// value replaced. New keys are inserted at the front with the default TTL.
    pub fn put(&mut self, key: K, value: V, now: Instant) -> Inserted<K, V> {
        let mut replaced_expired = false;

        if let Some(&id) = self.index.get(&key) {
            if let Some(entry) = self.order.get_mut(id) {
                if !entry.is_expired(now) {
                    entry.value = value;
                    return Inserted::default();
                }
            }
            self.remove_slot(id);
            replaced_expired = true;
        }

        let expires_at = expiry_from(self.default_ttl, now);
        Inserted {
            evicted: self.insert_new(key, value, expires_at),
            replaced_expired,
        }
    }

    // == Get ==
    /// Retrieves a value and marks it most recently used.
    ///
    /// Expired entries are removed and reported as [`Lookup::Expired`].
    pub fn get<Q>(&mut self, key: &Q, now: Instant) -> Lookup<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.check(key, now) {
            Lookup::Hit(id) => {
                self.order.move_to_front(id);
                self.value_at(id)
            }
            Lookup::Expired => Lookup::Expired,
            Lookup::Miss => Lookup::Miss,
        }
    }

    // == Peek ==
    /// Retrieves a value without changing its position.
    ///
    /// Expired entries are still removed.
    pub fn peek<Q>(&mut self, key: &Q, now: Instant) -> Lookup<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.check(key, now) {
            Lookup::Hit(id) => self.value_at(id),
            Lookup::Expired => Lookup::Expired,
            Lookup::Miss => Lookup::Miss,
        }
    }

    // == Take ==
    /// Read-only lookup: never reorders and never removes, even when the
    /// entry turns out to be expired.
    pub fn take<Q>(&self, key: &Q, now: Instant) -> Lookup<&V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(entry) = self.entry(key) else {
            return Lookup::Miss;
        };
        if entry.is_expired(now) {
            Lookup::Expired
        } else {
            Lookup::Hit(&entry.value)
        }
    }

    /// Returns the stored entry, expired or not.
    pub fn entry<Q>(&self, key: &Q) -> Option<&CacheEntry<K, V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = *self.index.get(key)?;
        self.order.get(id)
    }

    // == Set Expiry ==
    /// Overrides the expiry of a live entry. `None` or a zero TTL means never.
    ///
    /// Returns false if the key is absent or already expired.
    pub fn set_expiry<Q>(&mut self, key: &Q, ttl: Option<Duration>, now: Instant) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(&id) = self.index.get(key) else {
            return false;
        };
        match self.order.get_mut(id) {
            Some(entry) if !entry.is_expired(now) => {
                entry.expires_at = expiry_from(ttl, now);
                true
            }
            _ => false,
        }
    }

    // == Delete ==
    /// Removes an entry by key, returning its value.
    pub fn remove<Q>(&mut self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let id = self.index.remove(key)?;
        self.order.remove(id).map(|entry| entry.value)
    }

    // == Purge ==
    /// Removes all expired entries, walking from most to least recent.
    ///
    /// Returns the number of entries removed.
    pub fn purge(&mut self, now: Instant) -> usize {
        let mut removed = 0;
        let mut cursor = self.order.front();

        while let Some(id) = cursor {
            cursor = self.order.next_of(id);
            let expired = self
                .order
                .get(id)
                .is_some_and(|entry| entry.is_expired(now));
            if expired {
                self.remove_slot(id);
                removed += 1;
            }
        }

        removed
    }

    // == Capacity ==
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Changes the capacity, evicting from the back until the store fits.
    ///
    /// Returns the number of evicted entries.
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        self.capacity = normalize_capacity(capacity);
        let mut evicted = 0;
        while self.order.len() > self.capacity {
            if self.evict_oldest().is_none() {
                break;
            }
            evicted += 1;
        }
        evicted
    }

    // == Clear ==
    /// Drops every entry. Capacity and default TTL are kept.
    pub fn clear(&mut self) {
        self.index.clear();
        self.order.clear();
    }

    // == Enumeration ==
    /// Iterates every stored entry from most to least recent, including ones
    /// that have expired but not yet been removed.
    pub fn iter(&self) -> impl Iterator<Item = &CacheEntry<K, V>> + '_ {
        self.order.iter()
    }

    /// Iterates live `(key, value)` pairs from most to least recent.
    pub fn live(&self, now: Instant) -> impl Iterator<Item = (&K, &V)> + '_ {
        self.order
            .iter()
            .filter(move |entry| !entry.is_expired(now))
            .map(|entry| (&entry.key, &entry.value))
    }

    /// Live keys, most recently used first.
    pub fn keys(&self, now: Instant) -> Vec<K> {
        self.live(now).map(|(key, _)| key.clone()).collect()
    }

    // == Length ==
    /// Returns the number of stored entries, including expired ones that
    /// have not been removed yet.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[cfg(test)]
    pub(crate) fn index_len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    // == Internals ==
    /// Resolves a key to its slot, removing it if it has expired.
    fn check<Q>(&mut self, key: &Q, now: Instant) -> Lookup<SlotId>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(&id) = self.index.get(key) else {
            return Lookup::Miss;
        };
        let expired = match self.order.get(id) {
            Some(entry) => entry.is_expired(now),
            None => return Lookup::Miss,
        };
        if expired {
            self.remove_slot(id);
            Lookup::Expired
        } else {
            Lookup::Hit(id)
        }
    }

    fn value_at(&self, id: SlotId) -> Lookup<&V> {
        match self.order.get(id) {
            Some(entry) => Lookup::Hit(&entry.value),
            None => Lookup::Miss,
        }
    }

    fn insert_new(
        &mut self,
        key: K,
        value: V,
        expires_at: Option<Instant>,
    ) -> Option<CacheEntry<K, V>> {
        let id = self.order.push_front(CacheEntry {
            key: key.clone(),
            value,
            expires_at,
        });
        self.index.insert(key, id);

        // At most one entry over capacity, so one eviction suffices
        if self.order.len() > self.capacity {
            self.evict_oldest()
        } else {
            None
        }
    }

    fn evict_oldest(&mut self) -> Option<CacheEntry<K, V>> {
        let entry = self.order.pop_back()?;
        self.index.remove(&entry.key);
        Some(entry)
    }

    fn remove_slot(&mut self, id: SlotId) -> Option<CacheEntry<K, V>> {
        let entry = self.order.remove(id)?;
        self.index.remove(&entry.key);
        Some(entry)
    }
}
