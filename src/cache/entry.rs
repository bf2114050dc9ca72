//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::time::{Duration, Instant};

// == Cache Entry ==
/// A single key/value pair together with its optional expiry instant.
#[derive(Debug, Clone)]
pub struct CacheEntry<K, V> {
    pub key: K,
    pub value: V,
    /// Absolute expiration instant, None = no expiration
    pub expires_at: Option<Instant>,
}

impl<K, V> CacheEntry<K, V> {
    // == Constructor ==
    /// Creates a new cache entry that expires `ttl` after `now`, or never.
    pub fn new(key: K, value: V, ttl: Option<Duration>, now: Instant) -> Self {
        Self {
            key,
            value,
            expires_at: expiry_from(ttl, now),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired at `now`.
    ///
    /// Boundary condition: an entry is considered expired when `now` is greater
    /// than or equal to the expiration instant, so an entry stored with TTL `d`
    /// is gone for every read at or after `d`.
    pub fn is_expired(&self, now: Instant) -> bool {
        match self.expires_at {
            Some(expires) => now >= expires,
            None => false,
        }
    }

    /// Whether the entry carries a finite expiry at all.
    pub fn has_expiry(&self) -> bool {
        self.expires_at.is_some()
    }

    // == Time To Live ==
    /// Returns the remaining TTL, or None if no expiration is set.
    ///
    /// # Returns
    /// - `Some(Duration::ZERO)` if the entry has expired
    /// - `Some(remaining)` if the entry has TTL and hasn't expired
    /// - `None` if the entry never expires
    pub fn ttl_remaining(&self, now: Instant) -> Option<Duration> {
        self.expires_at
            .map(|expires| expires.saturating_duration_since(now))
    }
}

// == Utility Functions ==
/// Turns a relative TTL into an absolute expiry. A missing or zero TTL means
/// the entry never expires.
pub fn expiry_from(ttl: Option<Duration>, now: Instant) -> Option<Instant> {
    match ttl {
        Some(ttl) if !ttl.is_zero() => now.checked_add(ttl),
        _ => None,
    }
}
