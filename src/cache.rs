//! The cache handle.
//!
//! A [`Cache`] owns its [`Store`] and the [`Reaper`] that sweeps it. It
//! dereferences to the store, so every store operation is available on it
//! directly. Dropping the cache stops the reaper.

use crate::config::CacheConfig;
use crate::storage::{Reaper, Store};
use std::ops::Deref;
use std::sync::Arc;
use std::time::Duration;

/// An in-process key-value cache with a background reaper.
///
/// # Example
///
/// ```
/// use stashkv::{Cache, CacheError, Ttl, Value};
/// use std::time::Duration;
///
/// let cache: Cache<Value> = Cache::new(Duration::from_secs(1800), Duration::from_secs(5));
///
/// cache.set("key1", Value::from("hello world"), Ttl::After(Duration::from_secs(6)));
/// assert_eq!(cache.get("key1"), Some(Value::from("hello world")));
///
/// let err = cache.add("key1", Value::from(1), Ttl::Default).unwrap_err();
/// assert!(matches!(err, CacheError::AlreadyExists(_)));
///
/// cache.stop_reaper();
/// ```
#[derive(Debug)]
pub struct Cache<V> {
    store: Arc<Store<V>>,
    reaper: Reaper,
}

impl<V> Cache<V>
where
    V: Send + Sync + 'static,
{
    /// Creates a cache and starts its reaper.
    ///
    /// * `default_ttl` - TTL for entries written with [`Ttl::Default`](crate::Ttl::Default); zero means never
    /// * `sweep_interval` - Period between sweeps; zero disables the reaper
    pub fn new(default_ttl: Duration, sweep_interval: Duration) -> Self {
        Self::with_config(
            CacheConfig::new()
                .with_default_ttl(default_ttl)
                .with_sweep_interval(sweep_interval),
        )
    }

    /// Creates a cache from a [`CacheConfig`].
    pub fn with_config(config: CacheConfig) -> Self {
        let store = Arc::new(Store::new(config.default_ttl));
        let reaper = Reaper::start(Arc::clone(&store), config.sweep_interval);
        Self { store, reaper }
    }
}

impl<V> Cache<V> {
    /// A shared handle to the underlying store.
    pub fn store(&self) -> Arc<Store<V>> {
        Arc::clone(&self.store)
    }

    /// Stops the background reaper. Later calls are no-ops.
    ///
    /// # Returns
    ///
    /// Returns `true` if this call stopped it.
    pub fn stop_reaper(&self) -> bool {
        self.reaper.stop()
    }

    /// Whether the background reaper is still running.
    pub fn reaper_running(&self) -> bool {
        self.reaper.is_running()
    }
}

impl<V> Deref for Cache<V> {
    type Target = Store<V>;

    fn deref(&self) -> &Store<V> {
        &self.store
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{Ttl, Value, NO_EXPIRATION};
    use std::io::Cursor;
    use std::thread;

    #[test]
    fn test_never_expiring_default() {
        let cache = Cache::new(Duration::ZERO, Duration::from_millis(10));

        cache.set("k", 42, Ttl::Default);
        assert_eq!(cache.get("k"), Some(42));

        thread::sleep(Duration::from_millis(50));
        assert_eq!(cache.get("k"), Some(42));
        assert_eq!(cache.count(), 1);
    }

    #[test]
    fn test_reaper_sweeps_through_cache() {
        let cache = Cache::new(Duration::from_millis(20), Duration::from_millis(10));

        cache.set("a", "x", Ttl::Default);
        cache.set("b", "y", NO_EXPIRATION);

        thread::sleep(Duration::from_millis(150));

        assert_eq!(cache.count(), 1);
        assert_eq!(cache.get("b"), Some("y"));
        assert!(cache.stats().expired >= 1);
    }

    #[test]
    fn test_stop_reaper_is_safe_to_repeat() {
        let cache: Cache<i32> = Cache::new(Duration::ZERO, Duration::from_secs(1));

        assert!(cache.reaper_running());
        assert!(cache.stop_reaper());
        assert!(!cache.stop_reaper());
        assert!(!cache.reaper_running());
    }

    #[test]
    fn test_disabled_reaper_keeps_expired_entries() {
        let cache = Cache::new(Duration::ZERO, Duration::ZERO);

        cache.set("k", 1, Ttl::After(Duration::from_millis(10)));
        thread::sleep(Duration::from_millis(40));

        assert_eq!(cache.get("k"), None);
        assert_eq!(cache.count(), 1);
        assert_eq!(cache.delete_expired(), 1);
        assert!(!cache.stop_reaper());
    }

    #[test]
    fn test_store_handle_outlives_cache() {
        let cache = Cache::new(Duration::ZERO, Duration::from_millis(10));
        cache.set("k", Value::from("v"), Ttl::Default);

        let store = cache.store();
        drop(cache);

        assert_eq!(store.get("k"), Some(Value::from("v")));
    }

    #[test]
    fn test_save_then_load_through_cache() {
        let cache = Cache::new(Duration::ZERO, Duration::ZERO);
        cache.set("key1", Value::from("hello world"), Ttl::After(Duration::from_secs(6)));

        let mut buf = Vec::new();
        cache.save(&mut buf).unwrap();

        cache.set("key1", Value::from("changed"), Ttl::Default);
        assert_eq!(cache.load(Cursor::new(buf)).unwrap(), 1);
        assert_eq!(cache.get("key1"), Some(Value::from("hello world")));
    }
}
