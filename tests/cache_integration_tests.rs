//! Integration Tests for the public cache API
//!
//! Exercises the cache the way a dependent crate would: recency ordering,
//! expiration, the background sweeper and concurrent access.

use std::collections::HashSet;
use std::ops::ControlFlow;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use ttl_lru::{Cache, Config, DEFAULT_CAPACITY};

// == Helper Functions ==

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ttl_lru=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

fn abc_cache(capacity: usize) -> Cache<&'static str, i32> {
    let cache = Cache::new(capacity);
    cache.set("a", 1);
    cache.set("b", 2);
    cache.set("c", 3);
    cache
}

// == Recency and Eviction ==

#[test]
fn test_recency_ordering() {
    let cache = abc_cache(3);
    assert_eq!(cache.keys(), vec!["c", "b", "a"]);

    assert_eq!(cache.get("a"), Some(1));
    assert_eq!(cache.keys(), vec!["a", "c", "b"]);
}

#[test]
fn test_eviction_scenario() {
    let cache = abc_cache(3);

    cache.set("d", 4);
    assert_eq!(cache.keys(), vec!["d", "c", "b"]);

    assert_eq!(cache.get("b"), Some(2));
    assert_eq!(cache.keys(), vec!["b", "d", "c"]);

    cache.set("e", 5);
    assert_eq!(cache.keys(), vec!["e", "b", "d"]);
    assert_eq!(cache.len(), 3);
}

#[test]
fn test_non_promoting_operations_keep_order() {
    let cache = abc_cache(5);

    assert_eq!(cache.peek("a"), Some(1));
    assert_eq!(cache.take("b"), Some(2));
    cache.put("a", 10);
    assert_eq!(cache.keys(), vec!["c", "b", "a"]);
    assert_eq!(cache.take("a"), Some(10));

    cache.set("a", 11);
    assert_eq!(cache.keys(), vec!["a", "c", "b"]);
}

#[test]
fn test_put_new_key_can_evict() {
    let cache = abc_cache(3);
    cache.put("d", 4);

    assert_eq!(cache.keys(), vec!["d", "c", "b"]);
    assert_eq!(cache.get("a"), None);
}

#[test]
fn test_delete_and_clear() {
    let cache = abc_cache(3);

    assert!(cache.delete("b"));
    assert!(!cache.delete("b"));
    assert_eq!(cache.keys(), vec!["c", "a"]);

    cache.clear();
    assert!(cache.is_empty());
    assert_eq!(cache.capacity(), 3);
    assert_eq!(cache.get("a"), None);
}

#[test]
fn test_set_capacity() {
    let cache = Cache::new(5);
    for (key, value) in [("a", 1), ("b", 2), ("c", 3), ("d", 4), ("e", 5)] {
        cache.set(key, value);
    }
    cache.get("a");
    cache.get("c");

    cache.set_capacity(3);
    assert_eq!(cache.capacity(), 3);
    assert_eq!(cache.keys(), vec!["c", "a", "e"]);
    assert_eq!(cache.get("b"), None);
    assert_eq!(cache.get("d"), None);

    cache.set_capacity(0);
    assert_eq!(cache.capacity(), DEFAULT_CAPACITY);
    assert_eq!(cache.len(), 3);
}

#[test]
fn test_range_stops_early() {
    let cache = abc_cache(3);
    let mut seen = Vec::new();

    cache.range(|key, value| {
        seen.push((*key, *value));
        if seen.len() == 2 {
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    });

    assert_eq!(seen, vec![("c", 3), ("b", 2)]);
    assert_eq!(cache.entries(), vec![("c", 3), ("b", 2), ("a", 1)]);
}

// == Expiration ==

#[test]
fn test_ttl_scenario() {
    let cache = Cache::new(10);
    cache.set_default_ttl(Duration::from_millis(100));
    cache.set("a", 1);
    cache.set("b", 2).expire(Duration::ZERO);

    thread::sleep(Duration::from_millis(150));

    assert_eq!(cache.get("a"), None);
    assert_eq!(cache.get("b"), Some(2));
}

#[test]
fn test_expired_entries_hidden_from_enumeration() {
    let cache = Cache::new(10);
    cache.set("forever", 0);
    cache.set_default_ttl(Duration::from_millis(30));
    cache.set("short", 1);

    assert_eq!(cache.keys(), vec!["short", "forever"]);
    thread::sleep(Duration::from_millis(60));

    assert_eq!(cache.keys(), vec!["forever"]);
    assert!(!cache.contains_key("short"));
    // Still stored until something removes it
    assert_eq!(cache.len(), 2);
    assert_eq!(cache.purge(), 1);
    assert_eq!(cache.len(), 1);
}

#[test]
fn test_renew_on_touch_asymmetry() {
    let cache = Cache::new(10);
    cache.set("forever", 1);
    cache.set_default_ttl(Duration::from_millis(200));
    cache.set("expiring", 2);

    thread::sleep(Duration::from_millis(120));
    cache.set("forever", 10);
    cache.set("expiring", 20);
    thread::sleep(Duration::from_millis(120));

    // Past the original deadline, but not past the renewed one
    assert_eq!(cache.get("expiring"), Some(20));
    assert_eq!(cache.expires_in("forever"), None);
    assert_eq!(cache.get("forever"), Some(10));
}

#[test]
fn test_purge_counts_expired_entries() {
    let cache = Cache::new(10);
    assert_eq!(cache.purge(), 0);

    cache.set("a", 1).expire(Duration::from_millis(10));
    cache.set("b", 2).expire(Duration::from_millis(10));
    cache.set("c", 3).expire(Duration::from_secs(60));
    cache.set("d", 4);
    thread::sleep(Duration::from_millis(40));

    assert_eq!(cache.purge(), 2);
    assert_eq!(cache.keys(), vec!["d", "c"]);
    assert_eq!(cache.stats().expirations, 2);
}

// == Background Sweeper ==

#[test]
fn test_cleaner_removes_expired_entries() {
    init_tracing();
    let cache = Cache::new(10);
    cache
        .set_default_ttl(Duration::from_millis(20))
        .start_cleaner(Duration::from_millis(10));
    cache.set("a", 1);
    cache.set("b", 2).expire(Duration::ZERO);

    thread::sleep(Duration::from_millis(150));

    // Removed by the sweeper, not by a read
    assert_eq!(cache.len(), 1);
    assert_eq!(cache.keys(), vec!["b"]);
    assert_eq!(cache.stats().misses, 0);

    cache.stop_cleaner();
    assert!(!cache.is_cleaner_running());
}

#[test]
fn test_stop_cleaner_is_idempotent() {
    let cache: Cache<&str, i32> = Cache::new(10);
    cache.stop_cleaner();

    cache.start_cleaner(Duration::from_millis(10));
    assert!(cache.is_cleaner_running());
    cache.stop_cleaner();
    cache.stop_cleaner();
    assert!(!cache.is_cleaner_running());
}

#[test]
fn test_restarting_cleaner_replaces_task() {
    let cache: Cache<&str, i32> = Cache::new(10);
    cache.start_cleaner(Duration::from_secs(3600));
    cache.start_cleaner(Duration::from_millis(10));
    cache.set("a", 1).expire(Duration::from_millis(5));

    thread::sleep(Duration::from_millis(100));
    assert!(cache.is_empty());
    cache.stop_cleaner();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_cleaner_on_tokio_runtime() {
    init_tracing();
    let cache = Cache::new(10);
    cache.start_cleaner(Duration::from_millis(10));
    cache.set("a".to_string(), 1).expire(Duration::from_millis(10));
    cache.set("b".to_string(), 2);

    tokio::time::sleep(Duration::from_millis(100)).await;

    assert_eq!(cache.keys(), vec!["b".to_string()]);
    cache.stop_cleaner();
}

#[test]
fn test_cleaner_survives_runtime_shutdown() {
    init_tracing();
    let cache: Cache<&str, i32> = Cache::new(10);
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(1)
        .enable_all()
        .build()
        .expect("failed to build runtime");
    runtime.block_on(async {
        cache.start_cleaner(Duration::from_millis(5));
    });
    drop(runtime);

    assert!(cache.is_cleaner_running());
    cache.set("a", 1).expire(Duration::from_millis(5));
    thread::sleep(Duration::from_millis(100));

    // Swept in the background, not by a read
    assert!(cache.is_empty());
    assert_eq!(cache.stats().misses, 0);
    cache.stop_cleaner();
}

#[test]
fn test_from_config() {
    let config = Config {
        capacity: 2,
        default_ttl_ms: 20,
        cleanup_interval_ms: 10,
    };
    let cache = Cache::from_config(&config);
    assert_eq!(cache.capacity(), 2);
    assert_eq!(cache.default_ttl(), Some(Duration::from_millis(20)));
    assert!(cache.is_cleaner_running());

    cache.set("a", 1);
    thread::sleep(Duration::from_millis(100));
    assert!(cache.is_empty());
    cache.stop_cleaner();

    let plain: Cache<&str, i32> = Cache::from_config(&Config::default());
    assert_eq!(plain.capacity(), DEFAULT_CAPACITY);
    assert_eq!(plain.default_ttl(), None);
    assert!(!plain.is_cleaner_running());
}

// == Concurrency ==

#[test]
fn test_concurrent_access_keeps_invariants() {
    let capacity = 64;
    let cache = Arc::new(Cache::new(capacity));
    cache.set_default_ttl(Duration::from_millis(5));
    cache.start_cleaner(Duration::from_millis(2));

    let workers: Vec<_> = (0..8)
        .map(|t| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for i in 0..2_000u32 {
                    let key = (i * 7 + t) % 200;
                    match i % 6 {
                        0 => {
                            cache.set(key, i);
                        }
                        1 => {
                            cache.get(&key);
                        }
                        2 => {
                            cache.peek(&key);
                        }
                        3 => {
                            cache.put(key, i);
                        }
                        4 => {
                            cache.delete(&key);
                        }
                        _ => {
                            cache.take(&key);
                        }
                    }
                    assert!(cache.len() <= cache.capacity());
                }
            })
        })
        .collect();

    for worker in workers {
        worker.join().expect("worker thread panicked");
    }
    cache.stop_cleaner();

    let keys = cache.keys();
    let unique: HashSet<_> = keys.iter().collect();
    assert_eq!(unique.len(), keys.len(), "duplicate keys in recency order");
    assert!(cache.len() <= capacity);
    // Entries may expire between the two calls, so only an upper bound holds
    assert!(keys.len() <= cache.len());
}

#[test]
fn test_concurrent_readers_see_consistent_snapshot() {
    let cache = Arc::new(Cache::new(100));
    for i in 0..100u32 {
        cache.set(i, i * 2);
    }

    let writer = {
        let cache = Arc::clone(&cache);
        thread::spawn(move || {
            for round in 0..200u32 {
                cache.set(round % 100, round);
            }
        })
    };
    let readers: Vec<_> = (0..4)
        .map(|_| {
            let cache = Arc::clone(&cache);
            thread::spawn(move || {
                for _ in 0..200 {
                    let mut count = 0;
                    cache.range(|_, _| {
                        count += 1;
                        ControlFlow::Continue(())
                    });
                    assert_eq!(count, 100);
                }
            })
        })
        .collect();

    writer.join().expect("writer panicked");
    for reader in readers {
        reader.join().expect("reader panicked");
    }
    assert_eq!(cache.len(), 100);
}

// == Owned Keys ==

#[derive(Debug, Clone, PartialEq)]
struct Session {
    user: String,
    roles: Vec<&'static str>,
}

#[test]
fn test_owned_keys_and_struct_values() {
    let cache: Cache<String, Session> = Cache::new(2);
    let session = Session {
        user: "ada".to_string(),
        roles: vec!["admin"],
    };
    cache.set("s-1".to_string(), session.clone());

    // Lookups borrow the key as &str
    let found = cache.get("s-1").expect("session should be cached");
    assert_eq!(found.user, "ada");
    assert_eq!(found.roles, vec!["admin"]);
    assert_eq!(found, session);
    assert!(cache.delete("s-1"));
    assert_eq!(cache.peek("s-1"), None);
}
