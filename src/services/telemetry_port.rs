//! Telemetry Port (C4): the seam between the graph/constraint engines and
//! whatever observability backend supplies observed availability. The core
//! only depends on the trait; the SQL-backed adapter below is one concrete
//! implementation, grounded on the same pool the graph store uses.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use uuid::Uuid;

/// A point observation of a service's availability over some lookback
/// window, as reported by the telemetry backend.
#[derive(Debug, Clone, Copy)]
pub struct ObservedAvailability {
    pub availability: f64,
    pub sample_count: i64,
}

#[async_trait]
pub trait TelemetryPort: Send + Sync {
    /// Observed availability for a service over `lookback_days`, if any
    /// samples exist.
    async fn observed_availability(
        &self,
        service_id: Uuid,
        lookback_days: u32,
    ) -> Result<Option<ObservedAvailability>, TelemetryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("telemetry backend unavailable: {0}")]
    Unavailable(String),
}

/// Reads availability samples recorded against the service graph's own
/// database. This keeps the demo/self-contained deployment free of an
/// external metrics dependency while still going through the same `TelemetryPort`
/// seam a real backend (Prometheus, a metrics warehouse) would implement.
pub struct SqlTelemetryAdapter {
    pool: SqlitePool,
}

impl SqlTelemetryAdapter {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TelemetryPort for SqlTelemetryAdapter {
    async fn observed_availability(
        &self,
        service_id: Uuid,
        lookback_days: u32,
    ) -> Result<Option<ObservedAvailability>, TelemetryError> {
        let cutoff: DateTime<Utc> = Utc::now() - chrono::Duration::days(lookback_days as i64);

        let row: Option<(f64, i64)> = sqlx::query_as(
            "SELECT AVG(availability), COUNT(*) FROM availability_samples \
             WHERE service_id = ? AND observed_at >= ?",
        )
        .bind(service_id.to_string())
        .bind(cutoff)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| TelemetryError::Unavailable(e.to_string()))?;

        Ok(row.and_then(|(avg, count)| {
            if count == 0 {
                None
            } else {
                Some(ObservedAvailability { availability: avg, sample_count: count })
            }
        }))
    }
}
