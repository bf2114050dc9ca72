//! Cache Module
//!
//! Provides in-memory caching with TTL expiration and LRU eviction.

mod entry;
mod handle;
mod lru;
mod shared;
mod stats;
mod store;


// Re-export public types
pub use entry::CacheEntry;
pub use handle::EntryHandle;
pub use lru::{RecencyList, SlotId};
pub use shared::Cache;
pub use stats::CacheStats;
pub use store::{CacheStore, Inserted, Lookup};

pub(crate) use stats::StatsRecorder;

// == Public Constants ==
/// Capacity used when zero is requested
pub const DEFAULT_CAPACITY: usize = 10;

/// Maps a requested capacity of zero to `DEFAULT_CAPACITY`.
pub fn normalize_capacity(capacity: usize) -> usize {
    if capacity == 0 {
        DEFAULT_CAPACITY
    } else {
        capacity
    }
}
