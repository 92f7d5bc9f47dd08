//! sqlbridge core - shared abstractions for the pooled tool server
//!
//! This crate provides the fundamental traits and types that all other
//! sqlbridge crates depend on. It defines:
//!
//! - `Connection` - Trait for a single physical database session
//! - `DatabaseConfig` - Connection parameters with password masking
//! - `DbError` - The error taxonomy shared by the pool, drivers and tools
//! - Common types like `Value`, `Row`, `QueryResult`, etc.

mod config;
mod connection;
mod error;
mod types;

pub use config::*;
pub use connection::*;
pub use error::*;
pub use types::*;
