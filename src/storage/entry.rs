//! Cache entries and TTL arguments.
//!
//! An [`Entry`] pairs a value with an absolute deadline expressed in
//! nanoseconds since the Unix epoch. A deadline of `0` means the entry
//! never expires. Absolute wall-clock deadlines (instead of `Instant`)
//! let entries survive a snapshot round-trip.

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Deadline value meaning "never expires".
pub const NEVER: i64 = 0;

/// Entry never expires, whatever the store's default TTL is.
pub const NO_EXPIRATION: Ttl = Ttl::Never;

/// Entry uses the store's default TTL.
pub const DEFAULT_EXPIRATION: Ttl = Ttl::Default;

/// How long a value written to the store should live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Ttl {
    /// Never expires.
    Never,
    /// Use the store's default TTL.
    Default,
    /// Expire this long after the write.
    After(Duration),
}

impl From<Duration> for Ttl {
    /// A zero duration is the "default" sentinel; anything else is an explicit TTL.
    fn from(duration: Duration) -> Self {
        if duration.is_zero() {
            Ttl::Default
        } else {
            Ttl::After(duration)
        }
    }
}

impl Ttl {
    /// Resolves this TTL against a store default into an absolute deadline.
    ///
    /// Returns [`NEVER`] when the effective TTL is zero or `Never`.
    pub fn deadline(self, default_ttl: Duration, now: i64) -> i64 {
        let ttl = match self {
            Ttl::Never => return NEVER,
            Ttl::Default => default_ttl,
            Ttl::After(d) if d.is_zero() => default_ttl,
            Ttl::After(d) => d,
        };
        if ttl.is_zero() {
            return NEVER;
        }
        let nanos = i64::try_from(ttl.as_nanos()).unwrap_or(i64::MAX);
        now.saturating_add(nanos)
    }
}

/// Current wall-clock time in nanoseconds since the Unix epoch.
///
/// Clocks set before the epoch read as `1` so a live deadline is never
/// confused with [`NEVER`].
#[inline]
pub fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| i64::try_from(d.as_nanos()).unwrap_or(i64::MAX))
        .unwrap_or(1)
}

/// A stored value with its absolute expiration deadline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry<V> {
    /// The stored value
    pub value: V,
    /// Deadline in nanoseconds since the Unix epoch (`0` = never expires)
    pub expires_at: i64,
}

impl<V> Entry<V> {
    /// Creates an entry that never expires.
    pub fn new(value: V) -> Self {
        Self {
            value,
            expires_at: NEVER,
        }
    }

    /// Creates an entry with an absolute deadline.
    pub fn with_deadline(value: V, expires_at: i64) -> Self {
        Self { value, expires_at }
    }

    /// Checks whether this entry is expired at `now`.
    #[inline]
    pub fn is_expired(&self, now: i64) -> bool {
        self.expires_at != NEVER && now > self.expires_at
    }

    /// Whether this entry carries a deadline at all.
    #[inline]
    pub fn expires(&self) -> bool {
        self.expires_at != NEVER
    }

    /// Remaining lifetime at `now`, or `None` if the entry never expires.
    pub fn remaining(&self, now: i64) -> Option<Duration> {
        if !self.expires() {
            return None;
        }
        let left = self.expires_at.saturating_sub(now).max(0);
        Some(Duration::from_nanos(left as u64))
    }
}
