//! Impact-Analysis Engine (C10): projects how a proposed SLI change on one
//! service ripples upstream, recomputing each upstream service's composite
//! bound under the current and proposed scenarios.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::config::GraphPolicyConfig;
use crate::models::Service;
use crate::services::composite_bound_service::{self, DependencyAvailability};
use crate::services::graph_store::{GraphStore, TraverseDirection};
use crate::services::telemetry_port::TelemetryPort;
use crate::utils::{ApiError, ApiResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SliType {
    Availability,
    Latency,
}

impl SliType {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "availability" => Some(Self::Availability),
            "latency" => Some(Self::Latency),
            _ => None,
        }
    }
}

pub struct ProposedChange {
    pub sli_type: SliType,
    pub current_target: f64,
    pub proposed_target: f64,
}

pub struct ImpactAnalysisRequest {
    pub changed_service_id: String,
    pub proposed_change: ProposedChange,
    pub max_depth: u32,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImpactedService {
    pub service_id: String,
    pub current_bound_pct: f64,
    pub projected_bound_pct: f64,
    pub delta_pct: f64,
    pub slo_at_risk: bool,
    pub at_risk_description: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ImpactAnalysisResult {
    pub changed_service_id: String,
    pub impacted: Vec<ImpactedService>,
    pub impacted_count: u32,
    pub at_risk_count: u32,
    pub recommendation: String,
    pub qualitative_note: Option<String>,
    pub generated_at: DateTime<Utc>,
}

pub struct ImpactAnalysisService {
    graph_store: Arc<GraphStore>,
    telemetry: Arc<dyn TelemetryPort>,
    policy: Arc<GraphPolicyConfig>,
}

impl ImpactAnalysisService {
    pub fn new(
        graph_store: Arc<GraphStore>,
        telemetry: Arc<dyn TelemetryPort>,
        policy: Arc<GraphPolicyConfig>,
    ) -> Self {
        Self { graph_store, telemetry, policy }
    }

    pub async fn analyze(&self, request: ImpactAnalysisRequest) -> ApiResult<ImpactAnalysisResult> {
        let changed_service = self
            .graph_store
            .get_service(&request.changed_service_id)
            .await?
            .ok_or_else(|| {
                ApiError::not_found(format!("service not found: {}", request.changed_service_id))
            })?;

        // 1. Traverse UPSTREAM, excluding the root from the returned set.
        let subgraph = self
            .graph_store
            .traverse(
                &request.changed_service_id,
                TraverseDirection::Upstream,
                request.max_depth,
                false,
            )
            .await?;

        let upstream_services: Vec<&Service> =
            subgraph.nodes.iter().filter(|s| s.id != changed_service.id).collect();

        let mut impacted = Vec::with_capacity(upstream_services.len());

        for upstream in upstream_services {
            // 2. U's direct downstream edges.
            let direct_edges = self.graph_store.get_edges_by_source(upstream.id).await?;
            let hard_sync: Vec<_> = direct_edges.iter().filter(|e| e.is_hard_sync()).collect();

            if hard_sync.is_empty() {
                continue;
            }

            let own_observed = self
                .telemetry
                .observed_availability(upstream.id, 30)
                .await
                .ok()
                .flatten()
                .map(|o| o.availability)
                .unwrap_or(self.policy.default_internal_availability);

            let mut current_deps = Vec::with_capacity(hard_sync.len());
            let mut projected_deps = Vec::with_capacity(hard_sync.len());

            for edge in &hard_sync {
                let target = self.graph_store.get_service_by_uuid(edge.target_service_id).await?;
                let name = target.as_ref().map(|s| s.service_id.clone()).unwrap_or_default();

                if edge.target_service_id == changed_service.id
                    && request.proposed_change.sli_type == SliType::Availability
                {
                    current_deps.push(DependencyAvailability {
                        name: name.clone(),
                        availability: request.proposed_change.current_target / 100.0,
                        is_hard: true,
                        redundant_group: edge.redundant_group.clone(),
                        substituted: false,
                    });
                    projected_deps.push(DependencyAvailability {
                        name,
                        availability: request.proposed_change.proposed_target / 100.0,
                        is_hard: true,
                        redundant_group: edge.redundant_group.clone(),
                        substituted: false,
                    });
                    continue;
                }

                let availability = self
                    .telemetry
                    .observed_availability(edge.target_service_id, 30)
                    .await
                    .ok()
                    .flatten()
                    .map(|o| o.availability)
                    .unwrap_or(self.policy.default_internal_availability);

                current_deps.push(DependencyAvailability {
                    name: name.clone(),
                    availability,
                    is_hard: true,
                    redundant_group: edge.redundant_group.clone(),
                    substituted: false,
                });
                projected_deps.push(DependencyAvailability {
                    name,
                    availability,
                    is_hard: true,
                    redundant_group: edge.redundant_group.clone(),
                    substituted: false,
                });
            }

            let current = composite_bound_service::composite_bound(own_observed, &current_deps);
            let projected = composite_bound_service::composite_bound(own_observed, &projected_deps);
            let delta_pct = projected.bound_pct - current.bound_pct;

            let (slo_at_risk, at_risk_description) = self
                .check_at_risk(upstream, projected.bound_pct)
                .await?;

            impacted.push(ImpactedService {
                service_id: upstream.service_id.clone(),
                current_bound_pct: current.bound_pct,
                projected_bound_pct: projected.bound_pct,
                delta_pct,
                slo_at_risk,
                at_risk_description,
            });
        }

        // 3. Sort by |delta| descending.
        impacted.sort_by(|a, b| b.delta_pct.abs().partial_cmp(&a.delta_pct.abs()).unwrap());

        // 4. Summary.
        let at_risk_count = impacted.iter().filter(|i| i.slo_at_risk).count() as u32;
        let recommendation = recommendation_for(at_risk_count);

        // 5. Latency / degradation qualitative note.
        let degraded = impacted.iter().any(|i| i.delta_pct < 0.0);
        let qualitative_note = if request.proposed_change.sli_type == SliType::Latency || degraded {
            Some(
                "Latency percentiles cannot be composed mathematically across a dependency \
                 chain; review the affected services manually."
                    .to_string(),
            )
        } else {
            None
        };

        Ok(ImpactAnalysisResult {
            changed_service_id: changed_service.service_id,
            impacted_count: impacted.len() as u32,
            at_risk_count,
            impacted,
            recommendation,
            qualitative_note,
            generated_at: Utc::now(),
        })
    }

    /// Fetch U's active SLO, if any, and determine whether the projected
    /// bound would fall below its availability target.
    async fn check_at_risk(&self, upstream: &Service, projected_bound_pct: f64) -> ApiResult<(bool, Option<String>)> {
        let row: Option<(Option<f64>,)> =
            sqlx::query_as("SELECT availability_target FROM active_slos WHERE service_id = ?")
                .bind(&upstream.service_id)
                .fetch_optional(self.graph_store.pool())
                .await?;

        let Some((Some(target),)) = row else {
            return Ok((false, None));
        };

        if projected_bound_pct < target {
            let description = format!(
                "projected composite bound {:.2}% falls below {}'s active SLO target of {:.2}%",
                projected_bound_pct, upstream.service_id, target
            );
            Ok((true, Some(description)))
        } else {
            Ok((false, None))
        }
    }
}

fn recommendation_for(at_risk_count: u32) -> String {
    match at_risk_count {
        0 => "No active SLOs are projected to be at risk; the change appears safe to proceed."
            .to_string(),
        1 => "One upstream service's active SLO is at risk; coordinate with its owner before proceeding."
            .to_string(),
        n => format!(
            "{n} upstream services' active SLOs are at risk; this change likely needs a staged rollout \
             or compensating redundancy before proceeding."
        ),
    }
}
