//! The dependency graph store: the only shared mutable resource in the
//! system. Every read and write to services and edges goes through here.

use crate::models::{
    Criticality, DependencyEdge, DependencyEdgeRow, Service, ServiceRow, ServiceType,
};
use crate::utils::{ApiError, ApiResult};
use chrono::{Duration, Utc};
use sqlx::SqlitePool;
use std::collections::{HashMap, HashSet, VecDeque};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraverseDirection {
    Upstream,
    Downstream,
    Both,
}

impl TraverseDirection {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "upstream" => Some(Self::Upstream),
            "downstream" => Some(Self::Downstream),
            "both" => Some(Self::Both),
            _ => None,
        }
    }
}

/// The result of a bounded graph traversal: the node set always includes the
/// root, and the edge set is restricted to edges whose endpoints are both in
/// the node set.
#[derive(Debug, Clone)]
pub struct Subgraph {
    pub nodes: Vec<Service>,
    pub edges: Vec<DependencyEdge>,
    pub max_depth_reached: u32,
}

#[derive(Clone)]
pub struct GraphStore {
    pool: SqlitePool,
}

impl GraphStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Direct pool access for callers (e.g. the cycle/alert queries) that
    /// need tables the graph store itself doesn't own.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn get_service(&self, service_id: &str) -> ApiResult<Option<Service>> {
        let row: Option<ServiceRow> =
            sqlx::query_as("SELECT * FROM services WHERE service_id = ?")
                .bind(service_id)
                .fetch_optional(&self.pool)
                .await?;
        row.map(|r| r.into_service().map_err(ApiError::from)).transpose()
    }

    pub async fn get_service_by_uuid(&self, id: Uuid) -> ApiResult<Option<Service>> {
        let row: Option<ServiceRow> = sqlx::query_as("SELECT * FROM services WHERE id = ?")
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.map(|r| r.into_service().map_err(ApiError::from)).transpose()
    }

    fn require_service(service_id: &str, found: Option<Service>) -> ApiResult<Service> {
        found.ok_or_else(|| ApiError::not_found(format!("service not found: {service_id}")))
    }

    /// Upsert services matched on `service_id`. Creates them with
    /// `discovered=false` unless `discovered` is explicitly requested.
    pub async fn bulk_upsert_services(
        &self,
        services: Vec<ServiceUpsert>,
    ) -> ApiResult<Vec<Service>> {
        let mut out = Vec::with_capacity(services.len());
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        for s in services {
            let existing: Option<ServiceRow> =
                sqlx::query_as("SELECT * FROM services WHERE service_id = ?")
                    .bind(&s.service_id)
                    .fetch_optional(&mut *tx)
                    .await?;

            let metadata_json = serde_json::to_string(&s.metadata)?;

            if let Some(existing) = existing {
                sqlx::query(
                    "UPDATE services SET team = COALESCE(?, team), \
                     criticality = COALESCE(?, criticality), \
                     service_type = COALESCE(?, service_type), \
                     published_sla = COALESCE(?, published_sla), \
                     metadata = ?, updated_at = ? WHERE id = ?",
                )
                .bind(&s.team)
                .bind(s.criticality.map(|c| c.as_str()))
                .bind(s.service_type.map(|t| t.as_str()))
                .bind(s.published_sla)
                .bind(&metadata_json)
                .bind(now)
                .bind(&existing.id)
                .execute(&mut *tx)
                .await?;
            } else {
                let id = Uuid::new_v4();
                sqlx::query(
                    "INSERT INTO services (id, service_id, team, criticality, service_type, \
                     published_sla, metadata, discovered, created_at, updated_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
                )
                .bind(id.to_string())
                .bind(&s.service_id)
                .bind(&s.team)
                .bind(s.criticality.unwrap_or(Criticality::Medium).as_str())
                .bind(s.service_type.unwrap_or(ServiceType::Internal).as_str())
                .bind(s.published_sla)
                .bind(&metadata_json)
                .bind(s.discovered)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }

            let row: ServiceRow = sqlx::query_as("SELECT * FROM services WHERE service_id = ?")
                .bind(&s.service_id)
                .fetch_one(&mut *tx)
                .await?;
            out.push(row.into_service()?);
        }

        tx.commit().await?;
        Ok(out)
    }

    /// Auto-create a service referenced only as an edge endpoint, per the
    /// ingestion rule: `discovered=true, criticality=medium`.
    async fn ensure_service_exists(
        &self,
        tx: &mut sqlx::Transaction<'_, sqlx::Sqlite>,
        service_id: &str,
    ) -> ApiResult<Uuid> {
        if let Some(row) = sqlx::query_as::<_, ServiceRow>(
            "SELECT * FROM services WHERE service_id = ?",
        )
        .bind(service_id)
        .fetch_optional(&mut **tx)
        .await?
        {
            return Ok(Uuid::parse_str(&row.id).unwrap_or_default());
        }

        let id = Uuid::new_v4();
        let now = Utc::now();
        sqlx::query(
            "INSERT INTO services (id, service_id, team, criticality, service_type, \
             published_sla, metadata, discovered, created_at, updated_at) \
             VALUES (?, ?, NULL, 'medium', 'internal', NULL, '{}', 1, ?, ?)",
        )
        .bind(id.to_string())
        .bind(service_id)
        .bind(now)
        .bind(now)
        .execute(&mut **tx)
        .await?;

        Ok(id)
    }

    pub async fn get_edges_by_source(&self, source_service_id: Uuid) -> ApiResult<Vec<DependencyEdge>> {
        let rows: Vec<DependencyEdgeRow> =
            sqlx::query_as("SELECT * FROM service_dependencies WHERE source_service_id = ?")
                .bind(source_service_id.to_string())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|r| r.into_edge()).collect())
    }

    pub async fn get_edges_by_target(&self, target_service_id: Uuid) -> ApiResult<Vec<DependencyEdge>> {
        let rows: Vec<DependencyEdgeRow> =
            sqlx::query_as("SELECT * FROM service_dependencies WHERE target_service_id = ?")
                .bind(target_service_id.to_string())
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(|r| r.into_edge()).collect())
    }

    /// Upsert edges matched on (source, target, discovery_source),
    /// auto-creating referenced services. Conflicting rows already present
    /// under a *different* discovery source are reconciled by the caller
    /// (the Edge Merger); this method only performs the raw per-source
    /// upsert.
    pub async fn bulk_upsert_edges(
        &self,
        edges: Vec<EdgeUpsert>,
    ) -> ApiResult<Vec<DependencyEdge>> {
        let mut out = Vec::with_capacity(edges.len());
        let mut tx = self.pool.begin().await?;
        let now = Utc::now();

        for e in edges {
            if e.source_service_id == e.target_service_id {
                return Err(ApiError::invalid("self-loops are not allowed"));
            }

            let source_uuid = self.ensure_service_exists(&mut tx, &e.source_service_id).await?;
            let target_uuid = self.ensure_service_exists(&mut tx, &e.target_service_id).await?;

            let existing: Option<DependencyEdgeRow> = sqlx::query_as(
                "SELECT * FROM service_dependencies \
                 WHERE source_service_id = ? AND target_service_id = ? AND discovery_source = ?",
            )
            .bind(source_uuid.to_string())
            .bind(target_uuid.to_string())
            .bind(e.discovery_source.as_str())
            .fetch_optional(&mut *tx)
            .await?;

            let retry_json = e
                .retry_config
                .as_ref()
                .map(serde_json::to_string)
                .transpose()?;

            if let Some(existing) = existing {
                let observation_count = existing.observation_count + 1;
                sqlx::query(
                    "UPDATE service_dependencies SET communication_mode = ?, \
                     dependency_criticality = ?, confidence = ?, observation_count = ?, \
                     protocol = ?, timeout_ms = ?, retry_config = ?, is_stale = 0, \
                     last_observed_at = ?, updated_at = ? WHERE id = ?",
                )
                .bind(e.communication_mode.as_str())
                .bind(e.criticality.as_str())
                .bind(e.discovery_source.base_confidence())
                .bind(observation_count)
                .bind(&e.protocol)
                .bind(e.timeout_ms)
                .bind(&retry_json)
                .bind(now)
                .bind(now)
                .bind(&existing.id)
                .execute(&mut *tx)
                .await?;
            } else {
                let id = Uuid::new_v4();
                sqlx::query(
                    "INSERT INTO service_dependencies (id, source_service_id, target_service_id, \
                     communication_mode, dependency_criticality, discovery_source, confidence, \
                     observation_count, protocol, timeout_ms, retry_config, redundant_group, is_stale, \
                     last_observed_at, created_at, updated_at) \
                     VALUES (?, ?, ?, ?, ?, ?, ?, 1, ?, ?, ?, NULL, 0, ?, ?, ?)",
                )
                .bind(id.to_string())
                .bind(source_uuid.to_string())
                .bind(target_uuid.to_string())
                .bind(e.communication_mode.as_str())
                .bind(e.criticality.as_str())
                .bind(e.discovery_source.as_str())
                .bind(e.discovery_source.base_confidence())
                .bind(&e.protocol)
                .bind(e.timeout_ms)
                .bind(&retry_json)
                .bind(now)
                .bind(now)
                .bind(now)
                .execute(&mut *tx)
                .await?;
            }

            let row: DependencyEdgeRow = sqlx::query_as(
                "SELECT * FROM service_dependencies \
                 WHERE source_service_id = ? AND target_service_id = ? AND discovery_source = ?",
            )
            .bind(source_uuid.to_string())
            .bind(target_uuid.to_string())
            .bind(e.discovery_source.as_str())
            .fetch_one(&mut *tx)
            .await?;
            out.push(row.into_edge());
        }

        tx.commit().await?;
        Ok(out)
    }

    /// Bounded recursive traversal. `direction` controls which edges are
    /// followed from each frontier; the root is always in the returned node
    /// set, and the returned edges are restricted to ones whose both
    /// endpoints landed in the node set.
    pub async fn traverse(
        &self,
        root_service_id: &str,
        direction: TraverseDirection,
        max_depth: u32,
        include_stale: bool,
    ) -> ApiResult<Subgraph> {
        if !(1..=10).contains(&max_depth) {
            return Err(ApiError::invalid("max_depth must be between 1 and 10"));
        }

        let root = Self::require_service(root_service_id, self.get_service(root_service_id).await?)?;

        let mut visited: HashSet<Uuid> = HashSet::new();
        visited.insert(root.id);
        let mut frontier: VecDeque<(Uuid, u32)> = VecDeque::new();
        frontier.push_back((root.id, 0));
        let mut collected_edges: HashMap<(Uuid, Uuid, String), DependencyEdge> = HashMap::new();
        let mut max_depth_reached: u32 = 0;

        while let Some((node, depth)) = frontier.pop_front() {
            if depth >= max_depth {
                continue;
            }

            let mut next: Vec<DependencyEdge> = Vec::new();
            if matches!(direction, TraverseDirection::Downstream | TraverseDirection::Both) {
                next.extend(self.get_edges_by_source(node).await?);
            }
            if matches!(direction, TraverseDirection::Upstream | TraverseDirection::Both) {
                next.extend(self.get_edges_by_target(node).await?);
            }

            for edge in next {
                if edge.is_stale && !include_stale {
                    continue;
                }
                let neighbor = if edge.source_service_id == node {
                    edge.target_service_id
                } else {
                    edge.source_service_id
                };
                let key = (
                    edge.source_service_id,
                    edge.target_service_id,
                    edge.discovery_source.as_str().to_string(),
                );
                collected_edges.insert(key, edge);

                if visited.insert(neighbor) {
                    max_depth_reached = max_depth_reached.max(depth + 1);
                    frontier.push_back((neighbor, depth + 1));
                }
            }
        }

        let mut nodes = Vec::with_capacity(visited.len());
        for id in &visited {
            if let Some(service) = self.get_service_by_uuid(*id).await? {
                nodes.push(service);
            }
        }

        let edges: Vec<DependencyEdge> = collected_edges
            .into_values()
            .filter(|e| visited.contains(&e.source_service_id) && visited.contains(&e.target_service_id))
            .collect();

        Ok(Subgraph { nodes, edges, max_depth_reached })
    }

    /// The non-stale downstream adjacency list, used by the cycle detector.
    pub async fn adjacency_list(&self) -> ApiResult<HashMap<Uuid, Vec<Uuid>>> {
        let rows: Vec<DependencyEdgeRow> =
            sqlx::query_as("SELECT * FROM service_dependencies WHERE is_stale = 0")
                .fetch_all(&self.pool)
                .await?;

        let mut adjacency: HashMap<Uuid, Vec<Uuid>> = HashMap::new();
        for row in rows {
            let edge = row.into_edge();
            adjacency
                .entry(edge.source_service_id)
                .or_default()
                .push(edge.target_service_id);
        }
        Ok(adjacency)
    }

    /// Mark edges stale whose `last_observed_at` predates the threshold;
    /// returns the number of rows marked.
    pub async fn mark_stale_edges(&self, threshold_hours: i64) -> ApiResult<u64> {
        let cutoff = Utc::now() - Duration::hours(threshold_hours);
        let result = sqlx::query(
            "UPDATE service_dependencies SET is_stale = 1 \
             WHERE is_stale = 0 AND last_observed_at < ?",
        )
        .bind(cutoff)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Resolve a set of internal ids to their `service_id` business keys, in
    /// a single round trip.
    pub async fn service_ids_for(&self, ids: &[Uuid]) -> ApiResult<HashMap<Uuid, String>> {
        let mut out = HashMap::with_capacity(ids.len());
        for id in ids {
            if let Some(service) = self.get_service_by_uuid(*id).await? {
                out.insert(*id, service.service_id);
            }
        }
        Ok(out)
    }

    /// Insert a newly discovered cycle alert, unless one with the same
    /// canonical path already exists (per §4.3, duplicates are suppressed,
    /// not an error).
    pub async fn upsert_cycle_alert(&self, canonical_path: &str, cycle_path: &[String]) -> ApiResult<bool> {
        let cycle_path_json = serde_json::to_string(cycle_path)?;
        let result = sqlx::query(
            "INSERT INTO circular_dependency_alerts \
             (id, canonical_cycle_path, cycle_path, status, detected_at, resolution_notes) \
             VALUES (?, ?, ?, 'open', ?, NULL) \
             ON CONFLICT(canonical_cycle_path) DO NOTHING",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(canonical_path)
        .bind(&cycle_path_json)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}

/// Upsert payload for a service, distinct from the persisted `Service` so
/// that callers can omit fields they don't want to overwrite.
#[derive(Debug, Clone)]
pub struct ServiceUpsert {
    pub service_id: String,
    pub team: Option<String>,
    pub criticality: Option<Criticality>,
    pub service_type: Option<ServiceType>,
    pub published_sla: Option<f64>,
    pub metadata: HashMap<String, serde_json::Value>,
    pub discovered: bool,
}

#[derive(Debug, Clone)]
pub struct EdgeUpsert {
    pub source_service_id: String,
    pub target_service_id: String,
    pub communication_mode: crate::models::CommunicationMode,
    pub criticality: crate::models::DependencyCriticality,
    pub discovery_source: crate::models::DiscoverySource,
    pub protocol: Option<String>,
    pub timeout_ms: Option<i64>,
    pub retry_config: Option<crate::models::RetryConfig>,
}
