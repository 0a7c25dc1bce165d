use std::time::Duration;

/// Default period between background sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Configuration for a [`Cache`](crate::Cache).
///
/// # Example
///
/// ```
/// use stashkv::CacheConfig;
/// use std::time::Duration;
///
/// let config = CacheConfig::default()
///     .with_default_ttl(Duration::from_secs(1800))
///     .with_sweep_interval(Duration::from_secs(5));
/// assert_eq!(config.sweep_interval, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheConfig {
    /// TTL applied when a caller passes [`Ttl::Default`](crate::Ttl::Default).
    /// Zero means entries stored that way never expire (default: zero)
    pub default_ttl: Duration,

    /// Interval between reaper sweeps. Zero disables the reaper (default: 60s)
    pub sweep_interval: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::ZERO,
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
        }
    }
}

impl CacheConfig {
    /// Creates a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the TTL used for entries stored with the default expiration.
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    /// Sets how often the reaper removes expired entries.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Whether this configuration starts a background reaper.
    pub fn reaper_enabled(&self) -> bool {
        !self.sweep_interval.is_zero()
    }
}
