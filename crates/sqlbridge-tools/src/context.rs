use std::sync::Arc;

use sqlbridge_connection::ConnectionPool;
use sqlbridge_core::DatabaseConfig;

/// Dependencies shared by every tool handler
#[derive(Clone)]
pub struct ToolContext {
    pool: Arc<ConnectionPool>,
    config: DatabaseConfig,
}

impl ToolContext {
    pub fn new(pool: Arc<ConnectionPool>, config: DatabaseConfig) -> Self {
        Self { pool, config }
    }

    pub fn pool(&self) -> &Arc<ConnectionPool> {
        &self.pool
    }

    /// Connection parameters, used for reporting only
    pub fn config(&self) -> &DatabaseConfig {
        &self.config
    }
}
