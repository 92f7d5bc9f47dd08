//! MySQL driver for sqlbridge
//!
//! Each [`MySqlConnection`] owns exactly one server session. Pooling is left
//! to `sqlbridge-connection`, which opens sessions through
//! [`MySqlConnectionFactory`].

mod connection;
mod factory;

pub use connection::MySqlConnection;
pub use factory::MySqlConnectionFactory;
