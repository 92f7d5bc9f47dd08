//! Pool configuration types

use std::time::Duration;

use serde::{Deserialize, Serialize};
use sqlbridge_core::{DbError, Result};

/// Configuration for a connection pool
///
/// Controls pool sizing, timeouts, and connection recycling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of connections opened when the pool is first created
    min_size: usize,
    /// Maximum number of connections allowed in the pool
    max_size: usize,
    /// Timeout in milliseconds when waiting for a free connection
    acquire_timeout_ms: u64,
    /// Timeout in milliseconds for a single connect attempt
    connect_timeout_ms: u64,
    /// Age in milliseconds after which a connection is closed and replaced
    recycle_interval_ms: u64,
}

impl PoolConfig {
    /// Create a new pool configuration with the given min and max sizes
    ///
    /// # Panics
    ///
    /// Panics if `min_size > max_size` or if `max_size` is 0. Use
    /// [`PoolConfig::try_new`] for sizes that come from user input.
    pub fn new(min_size: usize, max_size: usize) -> Self {
        assert!(
            max_size > 0,
            "max_size must be greater than 0, got {}",
            max_size
        );
        assert!(
            min_size <= max_size,
            "min_size ({}) cannot exceed max_size ({})",
            min_size,
            max_size
        );

        Self {
            min_size,
            max_size,
            acquire_timeout_ms: 30_000,     // 30 seconds default
            connect_timeout_ms: 10_000,     // 10 seconds default
            recycle_interval_ms: 3_600_000, // 1 hour default
        }
    }

    /// Fallible variant of [`PoolConfig::new`]
    pub fn try_new(min_size: usize, max_size: usize) -> Result<Self> {
        if max_size == 0 {
            return Err(DbError::Configuration(
                "pool max_size must be greater than 0".into(),
            ));
        }
        if min_size > max_size {
            return Err(DbError::Configuration(format!(
                "pool min_size ({}) cannot exceed max_size ({})",
                min_size, max_size
            )));
        }
        Ok(Self::new(min_size, max_size))
    }

    /// Set the acquire timeout in milliseconds
    pub fn with_acquire_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.acquire_timeout_ms = timeout_ms;
        self
    }

    /// Set the connect timeout in milliseconds
    pub fn with_connect_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.connect_timeout_ms = timeout_ms;
        self
    }

    /// Set the recycle interval in milliseconds
    pub fn with_recycle_interval_ms(mut self, interval_ms: u64) -> Self {
        self.recycle_interval_ms = interval_ms;
        self
    }

    /// Get the minimum pool size
    pub fn min_size(&self) -> usize {
        self.min_size
    }

    /// Get the maximum pool size
    pub fn max_size(&self) -> usize {
        self.max_size
    }

    /// Get the acquire timeout as a Duration
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    /// Get the connect timeout as a Duration
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Get the recycle interval as a Duration
    pub fn recycle_interval(&self) -> Duration {
        Duration::from_millis(self.recycle_interval_ms)
    }
}

impl Default for PoolConfig {
    /// Create a default pool configuration
    ///
    /// Defaults:
    /// - min_size: 1
    /// - max_size: 5
    /// - acquire_timeout: 30 seconds
    /// - connect_timeout: 10 seconds
    /// - recycle_interval: 1 hour
    fn default() -> Self {
        Self::new(1, 5)
    }
}
