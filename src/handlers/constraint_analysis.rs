use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::handlers::dto::{ErrorBudgetDto, UnachievabilityWarningDto};
use crate::services::constraint_analysis_service::ConstraintAnalysisRequest;
use crate::utils::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ConstraintAnalysisQuery {
    pub desired_target_pct: Option<f64>,
    pub lookback_days: Option<u32>,
    pub max_depth: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConstraintAnalysisResponse {
    pub service_id: String,
    pub target_pct: f64,
    pub composite_bound_pct: f64,
    pub achievable: bool,
    pub error_budget: ErrorBudgetDto,
    pub unachievability_warning: Option<UnachievabilityWarningDto>,
    pub soft_dependency_names: Vec<String>,
    pub hard_dependency_count: u32,
    pub external_dependency_count: u32,
    pub scc_supernodes: Vec<Vec<String>>,
    pub substitution_notes: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// The core read path: composite availability bound, error budget, and
/// unachievability warning for a service's hard-sync dependency chain.
#[utoipa::path(
    get,
    path = "/api/services/{service_id}/constraint-analysis",
    params(
        ("service_id" = String, Path, description = "Service identifier"),
        ConstraintAnalysisQuery,
    ),
    responses(
        (status = 200, description = "Constraint analysis result", body = ConstraintAnalysisResponse),
        (status = 404, description = "Service not found"),
        (status = 400, description = "Invalid parameter or no dependencies")
    ),
    tag = "Analysis"
)]
pub async fn get_constraint_analysis(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
    Query(query): Query<ConstraintAnalysisQuery>,
) -> ApiResult<Json<ConstraintAnalysisResponse>> {
    if let Some(pct) = query.desired_target_pct {
        if !(90.0..=99.9999).contains(&pct) {
            return Err(ApiError::invalid("desired_target_pct must be in [90, 99.9999]"));
        }
    }
    let lookback_days = query.lookback_days.unwrap_or(30);
    if !(7..=365).contains(&lookback_days) {
        return Err(ApiError::invalid("lookback_days must be in [7, 365]"));
    }
    let max_depth = query.max_depth.unwrap_or(state.policy.default_traversal_depth);
    if !(1..=10).contains(&max_depth) {
        return Err(ApiError::invalid("max_depth must be in [1, 10]"));
    }

    let result = state
        .constraint_analysis_service
        .analyze(ConstraintAnalysisRequest {
            service_id,
            desired_target_pct: query.desired_target_pct,
            lookback_days,
            max_depth,
        })
        .await?;

    Ok(Json(ConstraintAnalysisResponse {
        service_id: result.service_id,
        target_pct: result.target_pct,
        composite_bound_pct: result.composite_bound_pct,
        achievable: result.achievable,
        error_budget: (&result.error_budget).into(),
        unachievability_warning: result.unachievability_warning.as_ref().map(Into::into),
        soft_dependency_names: result.soft_dependency_names,
        hard_dependency_count: result.hard_dependency_count,
        external_dependency_count: result.external_dependency_count,
        scc_supernodes: result.scc_supernodes,
        substitution_notes: result.substitution_notes,
        generated_at: result.generated_at,
    }))
}
