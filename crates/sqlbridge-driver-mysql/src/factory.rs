//! Connection factory used by the pool

use std::sync::Arc;

use async_trait::async_trait;
use sqlbridge_connection::ConnectionFactory;
use sqlbridge_core::{Connection, DatabaseConfig, Result};

use crate::MySqlConnection;

/// Opens MySQL sessions from a fixed [`DatabaseConfig`]
#[derive(Debug, Clone)]
pub struct MySqlConnectionFactory {
    config: DatabaseConfig,
}

impl MySqlConnectionFactory {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ConnectionFactory for MySqlConnectionFactory {
    async fn connect(&self) -> Result<Arc<dyn Connection>> {
        let conn = MySqlConnection::connect(&self.config).await.inspect_err(|e| {
            tracing::error!(
                host = self.config.host(),
                port = self.config.port(),
                error = %e,
                "failed to connect to MySQL database"
            );
        })?;
        Ok(Arc::new(conn))
    }
}
