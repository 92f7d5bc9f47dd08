//! Pool lifecycle and statistics types

use serde::{Deserialize, Serialize};

/// Lifecycle state of a [`ConnectionPool`](super::ConnectionPool)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolState {
    /// No connection has been requested yet
    Uninitialized,
    /// The first caller is creating the physical pool
    Initializing,
    /// Connections can be checked out
    Ready,
    /// The pool was shut down; it never reopens
    Closed,
}

/// Snapshot of a connection pool's current state
///
/// Provides insight into pool utilization and churn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolStats {
    pub(crate) state: PoolState,
    /// Total number of live connections (idle + active)
    pub(crate) total: usize,
    /// Number of idle connections available in the pool
    pub(crate) idle: usize,
    /// Number of connections currently checked out
    pub(crate) active: usize,
    /// Number of callers waiting for a connection
    pub(crate) waiting: usize,
    /// Connections opened over the pool's lifetime
    pub(crate) created: u64,
    /// Connections closed because they reached the recycle interval
    pub(crate) recycled: u64,
    /// Successful physical pool creations (at most one)
    pub(crate) initializations: u64,
}

impl PoolStats {
    pub fn state(&self) -> PoolState {
        self.state
    }

    /// Get the total number of connections
    pub fn total(&self) -> usize {
        self.total
    }

    /// Get the number of idle connections
    pub fn idle(&self) -> usize {
        self.idle
    }

    /// Get the number of active (in-use) connections
    pub fn active(&self) -> usize {
        self.active
    }

    /// Get the number of waiting requests
    pub fn waiting(&self) -> usize {
        self.waiting
    }

    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn recycled(&self) -> u64 {
        self.recycled
    }

    pub fn initializations(&self) -> u64 {
        self.initializations
    }

    /// Calculate pool utilization as a percentage (0.0 to 1.0)
    ///
    /// Returns 0.0 if total is 0 to avoid division by zero.
    pub fn utilization(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.active as f64 / self.total as f64
        }
    }
}

impl Default for PoolStats {
    fn default() -> Self {
        Self {
            state: PoolState::Uninitialized,
            total: 0,
            idle: 0,
            active: 0,
            waiting: 0,
            created: 0,
            recycled: 0,
            initializations: 0,
        }
    }
}
