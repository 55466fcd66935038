use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::models::{DependencyEdge, Service};
use crate::services::graph_store::TraverseDirection;
use crate::utils::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct SubgraphQuery {
    #[serde(default = "default_direction")]
    pub direction: String,
    pub depth: Option<u32>,
    #[serde(default)]
    pub include_stale: bool,
}

fn default_direction() -> String {
    "downstream".to_string()
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubgraphStatistics {
    pub total_nodes: u32,
    pub total_edges: u32,
    pub upstream_services: u32,
    pub downstream_services: u32,
    pub max_depth_reached: u32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct SubgraphResponse {
    pub nodes: Vec<Service>,
    pub edges: Vec<DependencyEdge>,
    pub statistics: SubgraphStatistics,
}

/// Bounded traversal of the dependency graph rooted at one service.
#[utoipa::path(
    get,
    path = "/api/services/{service_id}/subgraph",
    params(
        ("service_id" = String, Path, description = "Root service identifier"),
        SubgraphQuery,
    ),
    responses(
        (status = 200, description = "Subgraph rooted at the service", body = SubgraphResponse),
        (status = 404, description = "Service not found"),
        (status = 400, description = "Invalid direction or depth")
    ),
    tag = "Graph"
)]
pub async fn get_subgraph(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
    Query(query): Query<SubgraphQuery>,
) -> ApiResult<Json<SubgraphResponse>> {
    let direction = TraverseDirection::parse(&query.direction)
        .ok_or_else(|| ApiError::invalid(format!("unknown direction: {}", query.direction)))?;
    let depth = query.depth.unwrap_or(state.policy.default_traversal_depth);

    let subgraph = state
        .graph_store
        .traverse(&service_id, direction, depth, query.include_stale)
        .await?;

    let root = state
        .graph_store
        .get_service(&service_id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("service not found: {service_id}")))?;

    let upstream_services =
        subgraph.edges.iter().filter(|e| e.target_service_id == root.id).count() as u32;
    let downstream_services =
        subgraph.edges.iter().filter(|e| e.source_service_id == root.id).count() as u32;

    let statistics = SubgraphStatistics {
        total_nodes: subgraph.nodes.len() as u32,
        total_edges: subgraph.edges.len() as u32,
        upstream_services,
        downstream_services,
        max_depth_reached: subgraph.max_depth_reached,
    };

    Ok(Json(SubgraphResponse { nodes: subgraph.nodes, edges: subgraph.edges, statistics }))
}
