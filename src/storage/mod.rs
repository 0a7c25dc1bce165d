//! Storage Module
//!
//! This module provides the core storage functionality for stashkv:
//! a thread-safe key-value store with TTL support, a background reaper
//! and snapshot persistence.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │                 Store<V>                    │
//! │   RwLock<HashMap<String, Entry<V>>>         │
//! └─────────────────────────────────────────────┘
//!        ▲                           ▲
//!        │ delete_expired            │ save / load
//! ┌──────┴──────────┐       ┌────────┴─────────┐
//! │     Reaper      │       │    Snapshots     │
//! │ (Tokio task)    │       │   (bincode)      │
//! └─────────────────┘       └──────────────────┘
//! ```
//!
//! ## Features
//!
//! - **RwLock**: Multiple concurrent readers, exclusive writers
//! - **TTL Support**: Entries carry absolute nanosecond deadlines
//! - **Lazy Expiry**: Expired entries are invisible to reads
//! - **Active Expiry**: The reaper removes them in the background
//! - **Snapshots**: The entry map can be saved to and merged back from any stream
//!
//! ## Example
//!
//! ```
//! use stashkv::storage::{Store, Ttl, Value};
//! use std::time::Duration;
//!
//! let store = Store::new(Duration::ZERO);
//!
//! store.set("name", Value::from("Ariz"), Ttl::Default);
//! assert_eq!(store.get("name"), Some(Value::from("Ariz")));
//!
//! store.set(
//!     "session",
//!     Value::from("token123"),
//!     Ttl::After(Duration::from_secs(3600)),
//! );
//! ```

pub mod engine;
pub mod entry;
pub mod expiry;
pub mod snapshot;
pub mod value;

// Re-export commonly used types
pub use engine::{Store, StoreStats};
pub use entry::{now_nanos, Entry, Ttl, DEFAULT_EXPIRATION, NO_EXPIRATION};
pub use expiry::Reaper;
pub use value::Value;
