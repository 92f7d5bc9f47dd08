//! Connection pooling for database connections
//!
//! The pool is created lazily: nothing connects until the first
//! [`ConnectionPool::acquire`]. Concurrent first callers share a single
//! initialization, and a failed initialization is reported to every caller
//! that was waiting on it.
//!
//! # Example
//!
//! ```ignore
//! use sqlbridge_connection::pool::{ConnectionPool, PoolConfig};
//!
//! let config = PoolConfig::new(1, 5)
//!     .with_connect_timeout_ms(10_000)
//!     .with_recycle_interval_ms(3_600_000);
//!
//! let pool = ConnectionPool::new(config, connection_factory);
//! let conn = pool.acquire().await?;
//! conn.query("SELECT 1", &[]).await?;
//! pool.release(conn).await;
//! pool.close().await;
//! ```

mod config;
mod pool;
mod stats;


pub use config::PoolConfig;
pub use pool::{ConnectionFactory, ConnectionPool, PooledConnection};
pub use stats::{PoolState, PoolStats};
