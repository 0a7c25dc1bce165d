//! # stashkv - An In-Process Key-Value Cache
//!
//! stashkv is a thread-safe, in-memory key-value cache with per-entry
//! time-to-live, a background reaper and binary snapshot persistence.
//! It gives a single process memcache/redis-like semantics without a
//! network layer.
//!
//! ## Features
//!
//! - **Thread-Safe**: One `RwLock` per store; reads run concurrently
//! - **TTL Support**: Never, store-default, or explicit per-entry expiry
//! - **Lazy + Active Expiry**: Reads hide expired entries, a Tokio task removes them
//! - **Snapshots**: Save the entry map to any stream or file and merge it back
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                          Cache<V>                         │
//! │                                                           │
//! │   ┌──────────────────────────────┐    ┌───────────────┐   │
//! │   │           Store<V>           │◀───│    Reaper     │   │
//! │   │  RwLock<HashMap<String,      │    │ (Tokio task)  │   │
//! │   │          Entry<V>>>          │    └───────────────┘   │
//! │   └──────────────┬───────────────┘                        │
//! │                  │ save / load                            │
//! │                  ▼                                        │
//! │   ┌──────────────────────────────┐                        │
//! │   │   bincode snapshot stream    │                        │
//! │   └──────────────────────────────┘                        │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```
//! use stashkv::{Cache, Ttl, Value, NO_EXPIRATION};
//! use std::time::Duration;
//!
//! // Entries written with Ttl::Default live 30 minutes; sweep every 5 seconds
//! let cache = Cache::new(Duration::from_secs(1800), Duration::from_secs(5));
//!
//! cache.set("greeting", Value::from("hello world"), Ttl::After(Duration::from_secs(6)));
//! cache.set("config", Value::from(42), NO_EXPIRATION);
//!
//! assert_eq!(cache.get("greeting"), Some(Value::from("hello world")));
//! assert!(cache.replace("missing", Value::Null, Ttl::Default).is_err());
//! assert_eq!(cache.count(), 2);
//! ```
//!
//! ## Module Overview
//!
//! - [`storage`]: Store, entries, reaper, snapshots and the built-in `Value` type
//! - [`cache`]: The `Cache` handle tying a store to its reaper
//! - [`config`]: Cache configuration
//! - [`error`]: Error types
//!
//! ## Design Highlights
//!
//! ### Expiry
//!
//! Entries with a TTL are expired in two ways:
//! 1. **Lazy**: `get`, `add` and `replace` treat an expired entry as absent
//! 2. **Active**: The reaper periodically removes expired entries
//!
//! `count` is not expiry-aware; it reports entries the reaper has not yet removed.
//!
//! ### Snapshot Merging
//!
//! Loading a snapshot only overwrites keys that already hold a live entry
//! in the destination. It never inserts new keys.

pub mod cache;
pub mod config;
pub mod error;
pub mod storage;

// Re-export commonly used types for convenience
pub use cache::Cache;
pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use storage::{
    Entry, Reaper, Store, StoreStats, Ttl, Value, DEFAULT_EXPIRATION, NO_EXPIRATION,
};

/// Version of stashkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
