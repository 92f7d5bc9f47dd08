//! Connection trait

use crate::{QueryResult, Result, StatementResult, Value};
use async_trait::async_trait;

/// A single physical database session.
///
/// Implementations are handed out by the connection pool to exactly one
/// caller at a time, so a connection never has to multiplex concurrent
/// statements.
#[async_trait]
pub trait Connection: Send + Sync {
    /// Get the driver name (e.g., "mysql")
    fn driver_name(&self) -> &str;

    /// Execute a statement that modifies data or schema
    /// (CREATE/INSERT/UPDATE/DELETE). `params` are bound positionally to `?`
    /// placeholders.
    async fn execute(&self, sql: &str, params: &[Value]) -> Result<StatementResult>;

    /// Execute a statement that returns rows (SELECT/SHOW)
    async fn query(&self, sql: &str, params: &[Value]) -> Result<QueryResult>;

    /// Round-trip a trivial statement to verify the session is alive
    async fn ping(&self) -> Result<()> {
        tracing::trace!(driver = self.driver_name(), "pinging connection");
        self.query("SELECT 1", &[]).await.map(|_| ())
    }

    /// Close the connection. Closing twice is a no-op.
    async fn close(&self) -> Result<()>;

    /// Check if the connection is closed
    fn is_closed(&self) -> bool;
}
