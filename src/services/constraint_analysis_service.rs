//! Constraint-Analysis Orchestrator (C9): the main read path. Resolves a
//! service's downstream dependency chain, fans telemetry reads out
//! concurrently, and combines the Composite Bound Engine, Error-Budget
//! Analyzer and Unachievability Detector into a single response.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use uuid::Uuid;

use crate::config::GraphPolicyConfig;
use crate::models::{AlertStatus, CircularDependencyAlertRow, DependencyEdge, Service};
use crate::services::composite_bound_service::{self, DependencyAvailability};
use crate::services::error_budget_analyzer::{self, ErrorBudgetBreakdown};
use crate::services::external_buffer_service;
use crate::services::graph_store::{GraphStore, TraverseDirection};
use crate::services::telemetry_port::TelemetryPort;
use crate::services::unachievable_detector::{self, UnachievabilityWarning};
use crate::utils::{ApiError, ApiResult};

pub struct ConstraintAnalysisRequest {
    pub service_id: String,
    pub desired_target_pct: Option<f64>,
    pub lookback_days: u32,
    pub max_depth: u32,
}

pub struct ConstraintAnalysisResult {
    pub service_id: String,
    pub target_pct: f64,
    pub composite_bound_pct: f64,
    pub achievable: bool,
    pub error_budget: ErrorBudgetBreakdown,
    pub unachievability_warning: Option<UnachievabilityWarning>,
    pub soft_dependency_names: Vec<String>,
    pub hard_dependency_count: u32,
    pub external_dependency_count: u32,
    pub scc_supernodes: Vec<Vec<String>>,
    pub substitution_notes: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

pub struct ConstraintAnalysisService {
    graph_store: Arc<GraphStore>,
    telemetry: Arc<dyn TelemetryPort>,
    policy: Arc<GraphPolicyConfig>,
}

impl ConstraintAnalysisService {
    pub fn new(
        graph_store: Arc<GraphStore>,
        telemetry: Arc<dyn TelemetryPort>,
        policy: Arc<GraphPolicyConfig>,
    ) -> Self {
        Self { graph_store, telemetry, policy }
    }

    pub async fn analyze(&self, request: ConstraintAnalysisRequest) -> ApiResult<ConstraintAnalysisResult> {
        // 1. Resolve the service.
        let root = self
            .graph_store
            .get_service(&request.service_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("service not found: {}", request.service_id)))?;

        // 2. Choose the target: explicit parameter > active SLO target > default.
        let target_pct = request.desired_target_pct.unwrap_or(self.policy.default_slo_target_pct);

        // 3. Traverse DOWNSTREAM to max_depth.
        let subgraph = self
            .graph_store
            .traverse(&request.service_id, TraverseDirection::Downstream, request.max_depth, false)
            .await?;

        let direct_edges: Vec<&DependencyEdge> = subgraph
            .edges
            .iter()
            .filter(|e| e.source_service_id == root.id)
            .collect();

        if direct_edges.is_empty() {
            return Err(ApiError::invalid("service has no dependencies"));
        }

        // 4. Partition into hard-sync and the rest; count externals.
        let node_by_id: std::collections::HashMap<Uuid, &Service> =
            subgraph.nodes.iter().map(|n| (n.id, n)).collect();

        let (hard_sync, soft_or_async): (Vec<&DependencyEdge>, Vec<&DependencyEdge>) =
            direct_edges.iter().partition(|e| e.is_hard_sync());
        let hard_sync: Vec<&DependencyEdge> = hard_sync.into_iter().copied().collect();
        let soft_dependency_names: Vec<String> = soft_or_async
            .into_iter()
            .filter_map(|e| node_by_id.get(&e.target_service_id).map(|s| s.service_id.clone()))
            .collect();

        let external_dependency_count = hard_sync
            .iter()
            .filter_map(|e| node_by_id.get(&e.target_service_id))
            .filter(|s| s.service_type == crate::models::ServiceType::External)
            .count() as u32;

        // 5. Concurrently fetch observed availability for each hard-sync target.
        let lookback_days = request.lookback_days;
        let telemetry_futures = hard_sync.iter().map(|edge| {
            let telemetry = Arc::clone(&self.telemetry);
            let target_id = edge.target_service_id;
            async move { (target_id, telemetry.observed_availability(target_id, lookback_days).await) }
        });
        let telemetry_results = join_all(telemetry_futures).await;

        let mut substitution_notes = Vec::new();
        let mut dependency_availabilities = Vec::with_capacity(hard_sync.len());

        for edge in &hard_sync {
            let service = node_by_id.get(&edge.target_service_id);
            let name = service.map(|s| s.service_id.clone()).unwrap_or_default();
            let is_external = service
                .map(|s| s.service_type == crate::models::ServiceType::External)
                .unwrap_or(false);

            let observed = telemetry_results
                .iter()
                .find(|(id, _)| *id == edge.target_service_id)
                .and_then(|(_, result)| result.as_ref().ok())
                .and_then(|opt| opt.map(|obs| obs.availability));

            let (availability, substituted) = if is_external {
                let published_sla = service.and_then(|s| s.published_sla);
                let (effective, note) = external_buffer_service::effective_availability(
                    published_sla,
                    observed,
                    self.policy.external_buffer_multiplier,
                    self.policy.default_external_availability,
                );
                substitution_notes.push(format!("{}: {}", name, note));
                (effective.effective, false)
            } else {
                match observed {
                    Some(availability) => (availability, false),
                    None => (self.policy.default_internal_availability, true),
                }
            };

            dependency_availabilities.push(DependencyAvailability {
                name,
                availability,
                is_hard: true,
                redundant_group: edge.redundant_group.clone(),
                substituted,
            });
        }

        // 6. Fetch the root's own observed availability.
        let own_observed = self
            .telemetry
            .observed_availability(root.id, lookback_days)
            .await
            .ok()
            .flatten()
            .map(|o| o.availability)
            .unwrap_or(self.policy.default_internal_availability);

        // 7. Composite bound, error budget, unachievability.
        let bound = composite_bound_service::composite_bound(own_observed, &dependency_availabilities);

        let hard_availabilities: Vec<(String, f64)> = dependency_availabilities
            .iter()
            .map(|d| (d.name.clone(), d.availability))
            .collect();

        let error_budget = error_budget_analyzer::analyze(
            target_pct,
            own_observed,
            &hard_availabilities,
            self.policy.moderate_risk_threshold_pct,
            self.policy.high_risk_threshold_pct,
            self.policy.monthly_budget_minutes,
        );

        let unachievability_warning =
            unachievable_detector::check(target_pct, bound.bound_ratio, hard_sync.len() as u32);

        // 8. Existing open cycle alerts whose path contains the root service.
        let scc_supernodes = self.open_cycle_alerts_containing(&root.service_id).await?;

        let mut notes = substitution_notes;
        notes.extend(bound.substitution_notes.clone());

        Ok(ConstraintAnalysisResult {
            service_id: root.service_id,
            target_pct,
            composite_bound_pct: bound.bound_pct,
            achievable: unachievability_warning.is_none(),
            error_budget,
            unachievability_warning,
            soft_dependency_names,
            hard_dependency_count: hard_sync.len() as u32,
            external_dependency_count,
            scc_supernodes,
            substitution_notes: notes,
            generated_at: Utc::now(),
        })
    }

    async fn open_cycle_alerts_containing(&self, service_id: &str) -> ApiResult<Vec<Vec<String>>> {
        let rows: Vec<CircularDependencyAlertRow> = sqlx::query_as(
            "SELECT * FROM circular_dependency_alerts WHERE status = 'open'",
        )
        .fetch_all(self.graph_store.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| r.into_alert())
            .filter(|alert| alert.status == AlertStatus::Open && alert.cycle_path.iter().any(|s| s == service_id))
            .map(|alert| alert.cycle_path)
            .collect())
    }
}
