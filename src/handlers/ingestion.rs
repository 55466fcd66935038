use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::models::{CommunicationMode, Criticality, DependencyCriticality, DependencyEdgeDto, DiscoverySource, ServiceNodeDto};
use crate::services::cycle_detector;
use crate::services::edge_merge_service;
use crate::services::graph_store::{EdgeUpsert, ServiceUpsert};
use crate::utils::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct IngestRequest {
    pub source: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub nodes: Vec<ServiceNodeDto>,
    #[serde(default)]
    pub edges: Vec<DependencyEdgeDto>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CycleAlertSummary {
    pub canonical_path: String,
    pub cycle_path: Vec<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct EdgeConflictSummary {
    pub source: String,
    pub target: String,
    pub resolution: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct IngestResponse {
    pub received_nodes: u32,
    pub received_edges: u32,
    pub upserted_nodes: u32,
    pub upserted_edges: u32,
    pub newly_discovered_cycles: Vec<CycleAlertSummary>,
    pub conflicts: Vec<EdgeConflictSummary>,
    pub warnings: Vec<String>,
}

/// Ingest a batch of discovered/declared nodes and edges from a single
/// discovery source, reconcile them against existing edges via the Edge
/// Merger, and re-run cycle detection over the updated adjacency.
#[utoipa::path(
    post,
    path = "/api/ingest",
    request_body = IngestRequest,
    responses(
        (status = 200, description = "Ingestion processed", body = IngestResponse),
        (status = 400, description = "Unknown source, mode, or criticality; self-loop edge")
    ),
    tag = "Ingestion"
)]
pub async fn ingest(
    State(state): State<Arc<AppState>>,
    Json(req): Json<IngestRequest>,
) -> ApiResult<Json<IngestResponse>> {
    let discovery_source = DiscoverySource::parse(&req.source)
        .ok_or_else(|| ApiError::invalid(format!("unknown source: {}", req.source)))?;

    tracing::debug!(
        source = %req.source,
        timestamp = %req.timestamp,
        nodes = req.nodes.len(),
        edges = req.edges.len(),
        "processing ingestion batch"
    );

    let service_upserts: Vec<ServiceUpsert> = req
        .nodes
        .iter()
        .map(|n| {
            let team = n.metadata.get("team").and_then(|v| v.as_str()).map(str::to_string);
            let criticality =
                n.metadata.get("criticality").and_then(|v| v.as_str()).and_then(Criticality::parse);
            ServiceUpsert {
                service_id: n.service_id.clone(),
                team,
                criticality,
                service_type: None,
                published_sla: None,
                metadata: n.metadata.clone(),
                discovered: false,
            }
        })
        .collect();

    let upserted_nodes = state.graph_store.bulk_upsert_services(service_upserts).await?;

    let mut edge_upserts = Vec::with_capacity(req.edges.len());
    for e in &req.edges {
        let communication_mode =
            CommunicationMode::parse(&e.attributes.communication_mode).ok_or_else(|| {
                ApiError::invalid(format!(
                    "unknown communication_mode: {}",
                    e.attributes.communication_mode
                ))
            })?;
        let criticality = DependencyCriticality::parse(&e.attributes.criticality)
            .ok_or_else(|| ApiError::invalid(format!("unknown criticality: {}", e.attributes.criticality)))?;
        if let Some(rc) = &e.attributes.retry_config {
            rc.validate().map_err(ApiError::invalid)?;
        }
        edge_upserts.push(EdgeUpsert {
            source_service_id: e.source.clone(),
            target_service_id: e.target.clone(),
            communication_mode,
            criticality,
            discovery_source,
            protocol: e.attributes.protocol.clone(),
            timeout_ms: e.attributes.timeout_ms,
            retry_config: e.attributes.retry_config.clone(),
        });
    }

    let upserted_edges = state.graph_store.bulk_upsert_edges(edge_upserts).await?;

    // Reconcile every distinct (source, target) pair touched this round
    // across all its discovery sources; same-source refreshes are not
    // conflicts, only disagreements between two different sources are.
    let mut conflicts = Vec::new();
    let mut seen_pairs = HashSet::new();
    for edge in &upserted_edges {
        let pair = (edge.source_service_id, edge.target_service_id);
        if !seen_pairs.insert(pair) {
            continue;
        }
        let candidates: Vec<_> = state
            .graph_store
            .get_edges_by_source(edge.source_service_id)
            .await?
            .into_iter()
            .filter(|e| e.target_service_id == edge.target_service_id)
            .collect();

        if let Some((_, pair_conflicts)) = edge_merge_service::merge_all(candidates) {
            if !pair_conflicts.is_empty() {
                let names = state
                    .graph_store
                    .service_ids_for(&[edge.source_service_id, edge.target_service_id])
                    .await?;
                let source_name = names.get(&edge.source_service_id).cloned().unwrap_or_default();
                let target_name = names.get(&edge.target_service_id).cloned().unwrap_or_default();
                conflicts.extend(pair_conflicts.into_iter().map(|c| EdgeConflictSummary {
                    source: source_name.clone(),
                    target: target_name.clone(),
                    resolution: c.resolution,
                }));
            }
        }
    }

    let discovered = cycle_detector::run_cycle_detection(&state.graph_store).await?;
    let newly_discovered_cycles = discovered
        .into_iter()
        .map(|c| CycleAlertSummary { canonical_path: c.canonical_path_key, cycle_path: c.service_ids })
        .collect();

    let mut warnings = Vec::new();
    if req.nodes.is_empty() && req.edges.is_empty() {
        warnings.push("ingestion batch carried no nodes or edges".to_string());
    }

    Ok(Json(IngestResponse {
        received_nodes: req.nodes.len() as u32,
        received_edges: req.edges.len() as u32,
        upserted_nodes: upserted_nodes.len() as u32,
        upserted_edges: upserted_edges.len() as u32,
        newly_discovered_cycles,
        conflicts,
        warnings,
    }))
}
