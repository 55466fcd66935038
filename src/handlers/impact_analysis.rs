use axum::extract::State;
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::services::impact_analysis_service::{
    ImpactAnalysisRequest as ServiceRequest, ImpactAnalysisResult, ProposedChange, SliType,
};
use crate::utils::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct ProposedChangeDto {
    pub sli_type: String,
    pub current_target: f64,
    pub proposed_target: f64,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct ImpactAnalysisRequestDto {
    pub service_id: String,
    pub proposed_change: ProposedChangeDto,
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,
}

fn default_max_depth() -> u32 {
    10
}

/// Project how a proposed SLI change on one service ripples upstream
/// through every caller's composite availability bound.
#[utoipa::path(
    post,
    path = "/api/impact-analysis",
    request_body = ImpactAnalysisRequestDto,
    responses(
        (status = 200, description = "Impact analysis result", body = ImpactAnalysisResult),
        (status = 404, description = "Service not found"),
        (status = 400, description = "Invalid sli_type or depth")
    ),
    tag = "Analysis"
)]
pub async fn post_impact_analysis(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ImpactAnalysisRequestDto>,
) -> ApiResult<Json<ImpactAnalysisResult>> {
    let sli_type = SliType::parse(&req.proposed_change.sli_type)
        .ok_or_else(|| ApiError::invalid(format!("unknown sli_type: {}", req.proposed_change.sli_type)))?;
    if !(1..=10).contains(&req.max_depth) {
        return Err(ApiError::invalid("max_depth must be in [1, 10]"));
    }

    let result = state
        .impact_analysis_service
        .analyze(ServiceRequest {
            changed_service_id: req.service_id,
            proposed_change: ProposedChange {
                sli_type,
                current_target: req.proposed_change.current_target,
                proposed_target: req.proposed_change.proposed_target,
            },
            max_depth: req.max_depth,
        })
        .await?;

    Ok(Json(result))
}
