//! ttl_lru - A thread-safe in-process LRU cache
//!
//! Bounded key/value cache with least-recently-used eviction, optional
//! per-entry TTL expiration and an optional background sweeper.

pub mod cache;
pub mod config;
pub mod error;
pub mod tasks;

pub use cache::{Cache, CacheStats, EntryHandle, DEFAULT_CAPACITY};
pub use config::Config;
pub use error::{CacheError, Result};
pub use tasks::CleanupTask;
