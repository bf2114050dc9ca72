//! Entry Handle Module
//!
//! Follow-up access to a single key returned by [`Cache::set`](crate::Cache::set).

use std::hash::Hash;
use std::sync::Weak;
use std::time::{Duration, Instant};

use tracing::trace;

use crate::cache::shared::Shared;

// == Entry Handle ==
/// Capability to change the expiry of one key.
///
/// The handle stores the key and a weak reference to the cache, never a
/// position. Every call looks the key up again, so it quietly does nothing
/// once the entry has been evicted, deleted or expired, or the cache itself
/// has been dropped.
pub struct EntryHandle<K, V> {
    cache: Weak<Shared<K, V>>,
    key: K,
}

impl<K, V> EntryHandle<K, V>
where
    K: Hash + Eq + Clone,
{
    pub(crate) fn new(cache: Weak<Shared<K, V>>, key: K) -> Self {
        Self { cache, key }
    }

    pub fn key(&self) -> &K {
        &self.key
    }

    // == Expire ==
    /// Sets the entry to expire `ttl` from now. `Duration::ZERO` means the
    /// entry never expires. Overrides whatever the insert computed.
    pub fn expire(&self, ttl: Duration) -> &Self {
        if !self.apply(ttl) {
            trace!("Expiry override skipped: entry is gone");
        }
        self
    }

    /// Like [`EntryHandle::expire`], but reports whether the entry was still
    /// there to update.
    pub fn try_expire(&self, ttl: Duration) -> bool {
        self.apply(ttl)
    }

    fn apply(&self, ttl: Duration) -> bool {
        let Some(cache) = self.cache.upgrade() else {
            return false;
        };
        let mut store = cache.store.write();
        store.set_expiry(&self.key, Some(ttl), Instant::now())
    }
}
