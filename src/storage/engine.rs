//! Thread-Safe Storage Engine with Expiry Support
//!
//! This module implements the core store for stashkv: a `HashMap` from
//! string keys to [`Entry`] values guarded by a single `RwLock`.
//!
//! ## Design Decisions
//!
//! 1. **One Lock**: Every public operation holds the lock for its whole
//!    critical section, so `add` and `replace` are atomic check-then-act.
//! 2. **Lazy Expiry**: Reads treat expired entries as absent but never remove
//!    them. Physical removal happens in [`Store::delete_expired`] or on overwrite.
//! 3. **Lock-free helpers**: Public operations never call each other while
//!    holding the lock; they compose private helpers that take the map directly.
//!
//! ## Concurrency Model
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │                  Store<V>                    │
//! │   ┌──────────────────────────────────────┐   │
//! │   │  RwLock<HashMap<String, Entry<V>>>   │   │
//! │   └──────────────────────────────────────┘   │
//! │     read:  get, count, save                  │
//! │     write: set, add, replace, delete,        │
//! │            delete_expired, flush, load       │
//! └──────────────────────────────────────────────┘
//! ```

use crate::error::{CacheError, Result};
use crate::storage::entry::{now_nanos, Entry, Ttl};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

pub(crate) type EntryMap<V> = HashMap<String, Entry<V>>;

/// The key-value store behind a [`Cache`](crate::Cache).
///
/// # Thread Safety
///
/// This struct is designed to be wrapped in an `Arc` and shared across
/// threads and the background reaper. All operations are thread-safe.
///
/// # Example
///
/// ```
/// use stashkv::{Store, Ttl};
/// use std::time::Duration;
///
/// let store = Store::new(Duration::ZERO);
///
/// store.set("name", "Ariz".to_string(), Ttl::Default);
/// assert_eq!(store.get("name"), Some("Ariz".to_string()));
///
/// store.set("session", "abc123".to_string(), Ttl::After(Duration::from_secs(60)));
/// assert_eq!(store.count(), 2);
/// ```
pub struct Store<V> {
    /// All entries, including expired ones not yet swept
    entries: RwLock<EntryMap<V>>,

    /// TTL applied for `Ttl::Default` (zero = never expire)
    default_ttl: Duration,

    /// Statistics: total GET operations
    get_count: AtomicU64,

    /// Statistics: GETs that found a live entry
    hit_count: AtomicU64,

    /// Statistics: total successful writes (set/add/replace)
    set_count: AtomicU64,

    /// Statistics: total DELETE operations
    del_count: AtomicU64,

    /// Statistics: entries removed by sweeps
    expired_count: AtomicU64,
}

impl<V> std::fmt::Debug for Store<V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("entries", &self.count())
            .field("default_ttl", &self.default_ttl)
            .field("get_count", &self.get_count.load(Ordering::Relaxed))
            .field("set_count", &self.set_count.load(Ordering::Relaxed))
            .finish()
    }
}

impl<V> Default for Store<V> {
    fn default() -> Self {
        Self::new(Duration::ZERO)
    }
}

impl<V> Store<V> {
    /// Creates an empty store. `default_ttl` of zero means entries written
    /// with [`Ttl::Default`] never expire.
    pub fn new(default_ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            default_ttl,
            get_count: AtomicU64::new(0),
            hit_count: AtomicU64::new(0),
            set_count: AtomicU64::new(0),
            del_count: AtomicU64::new(0),
            expired_count: AtomicU64::new(0),
        }
    }

    /// The TTL applied to entries written with [`Ttl::Default`].
    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    // Poisoning is recovered: every mutation is a single map operation.
    pub(crate) fn read_entries(&self) -> RwLockReadGuard<'_, EntryMap<V>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn write_entries(&self) -> RwLockWriteGuard<'_, EntryMap<V>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Looks up a live entry. Caller must hold the lock.
    fn live<'a>(entries: &'a EntryMap<V>, key: &str, now: i64) -> Option<&'a Entry<V>> {
        entries.get(key).filter(|entry| !entry.is_expired(now))
    }

    /// Inserts or overwrites without locking. Caller must hold the write lock.
    fn insert(&self, entries: &mut EntryMap<V>, key: String, value: V, ttl: Ttl, now: i64) {
        let expires_at = ttl.deadline(self.default_ttl, now);
        entries.insert(key, Entry::with_deadline(value, expires_at));
        self.set_count.fetch_add(1, Ordering::Relaxed);
    }

    /// Sets a value, overwriting any existing entry for `key`.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Ttl) {
        let now = now_nanos();
        let mut entries = self.write_entries();
        self.insert(&mut entries, key.into(), value, ttl, now);
    }

    /// Stores a value only if `key` has no live entry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::AlreadyExists`] and leaves the store untouched
    /// if an unexpired entry is present.
    pub fn add(&self, key: impl Into<String>, value: V, ttl: Ttl) -> Result<()> {
        let key = key.into();
        let now = now_nanos();
        let mut entries = self.write_entries();

        if Self::live(&entries, &key, now).is_some() {
            return Err(CacheError::AlreadyExists(key));
        }
        self.insert(&mut entries, key, value, ttl, now);
        Ok(())
    }

    /// Overwrites the value of `key` only if it has a live entry.
    ///
    /// # Errors
    ///
    /// Returns [`CacheError::NotFound`] and inserts nothing if the key is
    /// absent or expired.
    pub fn replace(&self, key: impl Into<String>, value: V, ttl: Ttl) -> Result<()> {
        let key = key.into();
        let now = now_nanos();
        let mut entries = self.write_entries();

        if Self::live(&entries, &key, now).is_none() {
            return Err(CacheError::NotFound(key));
        }
        self.insert(&mut entries, key, value, ttl, now);
        Ok(())
    }

    /// Deletes a key.
    ///
    /// # Returns
    ///
    /// Returns `true` if an entry (live or expired) was removed.
    pub fn delete(&self, key: &str) -> bool {
        self.del_count.fetch_add(1, Ordering::Relaxed);
        self.write_entries().remove(key).is_some()
    }

    /// Removes every expired entry.
    ///
    /// This is called by the background reaper.
    ///
    /// # Returns
    ///
    /// Returns the number of entries that were removed.
    pub fn delete_expired(&self) -> u64 {
        let now = now_nanos();
        let mut entries = self.write_entries();
        let before = entries.len();

        entries.retain(|_, entry| !entry.is_expired(now));

        let removed = (before - entries.len()) as u64;
        if removed > 0 {
            self.expired_count.fetch_add(removed, Ordering::Relaxed);
        }
        removed
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn count(&self) -> usize {
        self.read_entries().len()
    }

    /// Returns true if the store holds no entries at all.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Removes every entry.
    pub fn flush(&self) {
        *self.write_entries() = HashMap::new();
    }

    /// Returns store statistics.
    pub fn stats(&self) -> StoreStats {
        let get_ops = self.get_count.load(Ordering::Relaxed);
        let hits = self.hit_count.load(Ordering::Relaxed);
        StoreStats {
            keys: self.count() as u64,
            get_ops,
            hits,
            misses: get_ops.saturating_sub(hits),
            set_ops: self.set_count.load(Ordering::Relaxed),
            del_ops: self.del_count.load(Ordering::Relaxed),
            expired: self.expired_count.load(Ordering::Relaxed),
            default_ttl: self.default_ttl,
        }
    }
}

impl<V: Clone> Store<V> {
    /// Gets the value for a key.
    ///
    /// Returns `None` if the key doesn't exist or has expired. Expired
    /// entries are left in place for the reaper.
    pub fn get(&self, key: &str) -> Option<V> {
        self.get_count.fetch_add(1, Ordering::Relaxed);

        let now = now_nanos();
        let entries = self.read_entries();
        let value = Self::live(&entries, key, now).map(|entry| entry.value.clone());

        if value.is_some() {
            self.hit_count.fetch_add(1, Ordering::Relaxed);
        }
        value
    }

    /// Gets the full live entry for a key, including its deadline.
    pub fn get_entry(&self, key: &str) -> Option<Entry<V>> {
        let now = now_nanos();
        Self::live(&self.read_entries(), key, now).cloned()
    }
}

/// Point-in-time store statistics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStats {
    /// Entries currently stored (expired-but-unswept included)
    pub keys: u64,
    /// Total GET operations
    pub get_ops: u64,
    /// GETs that returned a value
    pub hits: u64,
    /// GETs that returned nothing
    pub misses: u64,
    /// Successful writes
    pub set_ops: u64,
    /// DELETE calls
    pub del_ops: u64,
    /// Entries removed by sweeps
    pub expired: u64,
    /// Configured default TTL
    pub default_ttl: Duration,
}
