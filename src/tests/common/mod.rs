//! Shared test fixtures: an in-memory SQLite pool with migrations applied,
//! plus small seed helpers for services, edges, and telemetry samples.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::config::GraphPolicyConfig;
use crate::models::{CommunicationMode, Criticality, DependencyCriticality, DiscoverySource, Service, ServiceType};
use crate::services::graph_store::{EdgeUpsert, GraphStore, ServiceUpsert};

pub async fn create_test_db() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(3))
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory sqlite database");
    sqlx::migrate!("./migrations").run(&pool).await.expect("run migrations against test database");
    pool
}

pub fn test_policy() -> Arc<GraphPolicyConfig> {
    Arc::new(GraphPolicyConfig::default())
}

/// Upsert a service directly through the graph store, returning the
/// persisted row.
pub async fn seed_service(
    graph_store: &GraphStore,
    service_id: &str,
    criticality: Criticality,
    service_type: ServiceType,
    published_sla: Option<f64>,
) -> Service {
    let upserts = vec![ServiceUpsert {
        service_id: service_id.to_string(),
        team: None,
        criticality: Some(criticality),
        service_type: Some(service_type),
        published_sla,
        metadata: HashMap::new(),
        discovered: false,
    }];
    graph_store
        .bulk_upsert_services(upserts)
        .await
        .expect("seed service")
        .remove(0)
}

/// Seed a hard-sync, manually-declared edge between two business keys,
/// auto-creating either endpoint that doesn't already exist.
pub async fn seed_hard_sync_edge(graph_store: &GraphStore, source: &str, target: &str) {
    let upserts = vec![EdgeUpsert {
        source_service_id: source.to_string(),
        target_service_id: target.to_string(),
        communication_mode: CommunicationMode::Sync,
        criticality: DependencyCriticality::Hard,
        discovery_source: DiscoverySource::Manual,
        protocol: None,
        timeout_ms: None,
        retry_config: None,
    }];
    graph_store.bulk_upsert_edges(upserts).await.expect("seed edge");
}

/// Insert a raw availability sample observed "now", bypassing the telemetry
/// ingestion pipeline (an external collaborator's concern; see
/// `SqlTelemetryAdapter`).
pub async fn seed_availability_sample(pool: &SqlitePool, service_uuid: Uuid, availability: f64) {
    sqlx::query(
        "INSERT INTO availability_samples (id, service_id, availability, observed_at) VALUES (?, ?, ?, ?)",
    )
    .bind(Uuid::new_v4().to_string())
    .bind(service_uuid.to_string())
    .bind(availability)
    .bind(Utc::now())
    .execute(pool)
    .await
    .expect("seed availability sample");
}
