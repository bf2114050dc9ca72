//! Background Tasks Module
//!
//! Contains background tasks that run periodically while a cache is alive.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired cache entries at a configured interval

mod cleanup;

pub use cleanup::{CleanupTask, MIN_CLEANUP_INTERVAL};
