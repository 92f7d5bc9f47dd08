//! Liveness checks for database connections
//!
//! Used at startup to verify the configured server is reachable before the
//! transport starts accepting requests.

use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use sqlbridge_core::{Connection, Result};

/// Health status of a connection, classified by round-trip latency
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Round trip within 100ms
    #[default]
    Healthy,
    /// Round trip within 500ms
    Degraded,
    /// Anything slower
    Unhealthy,
}

impl HealthStatus {
    const HEALTHY_THRESHOLD: Duration = Duration::from_millis(100);
    const DEGRADED_THRESHOLD: Duration = Duration::from_millis(500);

    /// Classify a ping latency
    pub fn from_latency(latency: Duration) -> Self {
        if latency <= Self::HEALTHY_THRESHOLD {
            HealthStatus::Healthy
        } else if latency <= Self::DEGRADED_THRESHOLD {
            HealthStatus::Degraded
        } else {
            HealthStatus::Unhealthy
        }
    }

    /// Both `Healthy` and `Degraded` connections can serve requests
    pub fn is_usable(&self) -> bool {
        matches!(self, HealthStatus::Healthy | HealthStatus::Degraded)
    }
}

/// Outcome of a successful liveness check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionCheck {
    pub latency_ms: u64,
    pub status: HealthStatus,
}

/// Ping a connection and measure the round trip.
///
/// Errors from the ping are returned unchanged.
#[tracing::instrument(skip(conn), fields(driver = conn.driver_name()))]
pub async fn check_connection(conn: &dyn Connection) -> Result<ConnectionCheck> {
    let start = Instant::now();
    conn.ping().await?;
    let latency = start.elapsed();

    let check = ConnectionCheck {
        latency_ms: latency.as_millis() as u64,
        status: HealthStatus::from_latency(latency),
    };
    tracing::debug!(latency_ms = check.latency_ms, status = ?check.status, "connection check passed");
    Ok(check)
}
