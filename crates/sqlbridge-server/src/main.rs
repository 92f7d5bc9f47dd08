//! sqlbridge - a MySQL tool server
//!
//! Reads configuration from flags and the environment, verifies the database
//! is reachable, then serves tool calls until interrupted.

mod cli;
mod logging;
mod rpc;

use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use sqlbridge_connection::{ConnectionPool, check_connection};
use sqlbridge_driver_mysql::MySqlConnectionFactory;
use sqlbridge_tools::{ToolContext, ToolRegistry};
use tokio::net::TcpListener;

use crate::cli::Cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Cli::parse().into_settings()?;
    let _log_guard = logging::init(&settings.logging).context("failed to initialize logging")?;

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "sqlbridge server starting");
    settings
        .database
        .validate()
        .context("invalid database configuration")?;
    tracing::info!(config = ?settings.database.masked(), "database configuration");

    let pool = Arc::new(ConnectionPool::new(
        settings.pool.clone(),
        MySqlConnectionFactory::new(settings.database.clone()),
    ));

    if let Err(e) = test_connection(&pool).await {
        tracing::error!(error = %e, "database connection test failed, server will not start");
        pool.close().await;
        return Err(e).context("database connection test failed");
    }

    let listener = match TcpListener::bind((settings.bind_host.as_str(), settings.bind_port)).await {
        Ok(listener) => listener,
        Err(e) => {
            pool.close().await;
            return Err(e).with_context(|| {
                format!(
                    "failed to bind {}:{}",
                    settings.bind_host, settings.bind_port
                )
            });
        }
    };
    tracing::info!(
        host = %settings.bind_host,
        port = settings.bind_port,
        "tool server listening"
    );

    let registry = ToolRegistry::new(ToolContext::new(pool.clone(), settings.database.clone()));
    rpc::serve(listener, registry, shutdown_signal()).await;

    pool.close().await;
    tracing::info!("server stopped");
    Ok(())
}

/// Acquire one connection, ping it and hand it back
async fn test_connection(pool: &ConnectionPool) -> sqlbridge_core::Result<()> {
    tracing::info!("testing database connection");
    let conn = pool.acquire().await?;
    let check = check_connection(&*conn).await;
    pool.release(conn).await;

    let check = check?;
    tracing::info!(
        latency_ms = check.latency_ms,
        status = ?check.status,
        "database connection test succeeded"
    );
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received Ctrl-C"),
        _ = terminate => tracing::info!("received SIGTERM"),
    }
}
