//! Command-line and environment configuration

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use sqlbridge_connection::PoolConfig;
use sqlbridge_core::{
    DEFAULT_DATABASE, DEFAULT_HOST, DEFAULT_PASSWORD, DEFAULT_PORT, DEFAULT_USER, DatabaseConfig,
};

use crate::logging::LoggingConfig;

/// Serve MySQL table operations as JSON-RPC tools
#[derive(Parser, Debug)]
#[command(name = "sqlbridge", version, about)]
pub struct Cli {
    /// MySQL host
    #[arg(long, env = "MYSQL_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// MySQL port
    #[arg(long, env = "MYSQL_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// MySQL user
    #[arg(long, env = "MYSQL_USER", default_value = DEFAULT_USER)]
    pub user: String,

    /// MySQL password
    #[arg(long, env = "MYSQL_PASSWORD", default_value = DEFAULT_PASSWORD, hide_env_values = true, hide_default_value = true)]
    pub password: String,

    /// MySQL database name
    #[arg(long, env = "MYSQL_DATABASE", default_value = DEFAULT_DATABASE)]
    pub database: String,

    /// Address the JSON-RPC listener binds to
    #[arg(long, env = "FC_SERVER_HOST", default_value = "0.0.0.0")]
    pub bind_host: String,

    /// Port the JSON-RPC listener binds to
    #[arg(long, env = "FC_SERVER_PORT", default_value_t = 9000)]
    pub bind_port: u16,

    /// Connections opened when the pool is created
    #[arg(long, env = "SQLBRIDGE_POOL_MIN_SIZE", default_value_t = 1)]
    pub pool_min_size: usize,

    /// Upper bound on open connections
    #[arg(long, env = "SQLBRIDGE_POOL_MAX_SIZE", default_value_t = 5)]
    pub pool_max_size: usize,

    /// Seconds allowed for a single connect attempt
    #[arg(long, env = "SQLBRIDGE_CONNECT_TIMEOUT_SECS", default_value_t = 10)]
    pub connect_timeout_secs: u64,

    /// Age in seconds after which a connection is replaced
    #[arg(long, env = "SQLBRIDGE_POOL_RECYCLE_SECS", default_value_t = 3600)]
    pub pool_recycle_secs: u64,

    /// Seconds to wait for a free connection before failing
    #[arg(long, env = "SQLBRIDGE_ACQUIRE_TIMEOUT_SECS", default_value_t = 30)]
    pub acquire_timeout_secs: u64,

    /// Also write JSON logs to daily rolling files
    #[arg(long, env = "SQLBRIDGE_LOG_JSON")]
    pub log_json: bool,

    /// Directory for JSON log files
    #[arg(long, env = "SQLBRIDGE_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

/// Everything the server needs to start
#[derive(Debug, Clone)]
pub struct Settings {
    pub database: DatabaseConfig,
    pub pool: PoolConfig,
    pub bind_host: String,
    pub bind_port: u16,
    pub logging: LoggingConfig,
}

impl Cli {
    pub fn into_settings(self) -> anyhow::Result<Settings> {
        let database = DatabaseConfig::new()
            .with_host(self.host)
            .with_port(self.port)
            .with_user(self.user)
            .with_password(self.password)
            .with_database(self.database);

        let pool = PoolConfig::try_new(self.pool_min_size, self.pool_max_size)
            .context("invalid pool size")?
            .with_connect_timeout_ms(self.connect_timeout_secs.saturating_mul(1000))
            .with_recycle_interval_ms(self.pool_recycle_secs.saturating_mul(1000))
            .with_acquire_timeout_ms(self.acquire_timeout_secs.saturating_mul(1000));

        let mut logging = if cfg!(debug_assertions) {
            LoggingConfig::development()
        } else {
            LoggingConfig::production()
        };
        if self.log_json {
            logging = logging.with_json_logs(true);
        }
        if let Some(dir) = self.log_dir {
            logging = logging.with_log_dir(dir);
        }

        Ok(Settings {
            database,
            pool,
            bind_host: self.bind_host,
            bind_port: self.bind_port,
            logging,
        })
    }
}
