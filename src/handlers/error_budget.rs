use axum::extract::{Path, Query, State};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::{IntoParams, ToSchema};

use crate::handlers::dto::ErrorBudgetDto;
use crate::services::constraint_analysis_service::ConstraintAnalysisRequest;
use crate::utils::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize, IntoParams)]
pub struct ErrorBudgetQuery {
    pub desired_target_pct: Option<f64>,
    pub lookback_days: Option<u32>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBudgetResponse {
    pub service_id: String,
    pub target_pct: f64,
    pub error_budget: ErrorBudgetDto,
    pub generated_at: DateTime<Utc>,
}

/// A lighter-weight view of the error budget, restricted to a service's
/// direct (depth-1) hard-sync dependencies.
#[utoipa::path(
    get,
    path = "/api/services/{service_id}/error-budget",
    params(
        ("service_id" = String, Path, description = "Service identifier"),
        ErrorBudgetQuery,
    ),
    responses(
        (status = 200, description = "Error-budget breakdown", body = ErrorBudgetResponse),
        (status = 404, description = "Service not found"),
        (status = 400, description = "Invalid parameter or no dependencies")
    ),
    tag = "Analysis"
)]
pub async fn get_error_budget(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
    Query(query): Query<ErrorBudgetQuery>,
) -> ApiResult<Json<ErrorBudgetResponse>> {
    if let Some(pct) = query.desired_target_pct {
        if !(90.0..=99.9999).contains(&pct) {
            return Err(ApiError::invalid("desired_target_pct must be in [90, 99.9999]"));
        }
    }
    let lookback_days = query.lookback_days.unwrap_or(30);
    if !(7..=365).contains(&lookback_days) {
        return Err(ApiError::invalid("lookback_days must be in [7, 365]"));
    }

    let result = state
        .constraint_analysis_service
        .analyze(ConstraintAnalysisRequest {
            service_id,
            desired_target_pct: query.desired_target_pct,
            lookback_days,
            max_depth: 1,
        })
        .await?;

    Ok(Json(ErrorBudgetResponse {
        service_id: result.service_id,
        target_pct: result.target_pct,
        error_budget: (&result.error_budget).into(),
        generated_at: result.generated_at,
    }))
}
