//! sqlbridge connection - pooling and liveness checks
//!
//! This crate owns the lifecycle of physical database sessions: lazy pool
//! creation, bounded checkout, age-based recycling and shutdown.

pub mod health;
pub mod pool;

pub use health::{ConnectionCheck, HealthStatus, check_connection};
pub use pool::{
    ConnectionFactory, ConnectionPool, PoolConfig, PoolState, PoolStats, PooledConnection,
};
