use axum::extract::{Path, State};
use axum::Json;
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{ActiveSlo, SloAuditEntry};
use crate::services::slo_lifecycle::{LifecycleAction, LifecycleTransitionRequest, SloModifications, SloTier};
use crate::utils::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SloModificationsDto {
    pub availability_target: Option<f64>,
    pub latency_p95_target_ms: Option<i64>,
    pub latency_p99_target_ms: Option<i64>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct SloTransitionRequestDto {
    pub action: String,
    pub selected_tier: String,
    pub modifications: Option<SloModificationsDto>,
    pub rationale: Option<String>,
    pub actor: String,
    pub recommendation_id: Option<Uuid>,
}

/// Apply an accept/modify/reject transition to a service's SLO, atomically
/// updating the active SLO (for accept/modify) and appending an audit entry.
#[utoipa::path(
    post,
    path = "/api/services/{service_id}/slo",
    params(("service_id" = String, Path, description = "Service identifier")),
    request_body = SloTransitionRequestDto,
    responses(
        (status = 200, description = "Active SLO after the transition, or the prior one if rejected", body = ActiveSlo),
        (status = 400, description = "Unknown action or tier")
    ),
    tag = "SLO Lifecycle"
)]
pub async fn transition_slo(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
    Json(req): Json<SloTransitionRequestDto>,
) -> ApiResult<Json<Option<ActiveSlo>>> {
    let action = LifecycleAction::parse(&req.action)
        .ok_or_else(|| ApiError::invalid(format!("unknown action: {}", req.action)))?;
    let selected_tier = SloTier::parse(&req.selected_tier)
        .ok_or_else(|| ApiError::invalid(format!("unknown tier: {}", req.selected_tier)))?;

    let modifications = req.modifications.map(|m| SloModifications {
        availability_target: m.availability_target,
        latency_p95_target_ms: m.latency_p95_target_ms,
        latency_p99_target_ms: m.latency_p99_target_ms,
    });

    let result = state
        .slo_lifecycle_service
        .transition(LifecycleTransitionRequest {
            service_id,
            action,
            selected_tier,
            modifications,
            rationale: req.rationale,
            actor: req.actor,
            recommendation_id: req.recommendation_id,
        })
        .await?;

    Ok(Json(result))
}

/// The SLO currently in force for a service.
#[utoipa::path(
    get,
    path = "/api/services/{service_id}/slo",
    params(("service_id" = String, Path, description = "Service identifier")),
    responses(
        (status = 200, description = "Active SLO", body = ActiveSlo),
        (status = 404, description = "No active SLO for the service")
    ),
    tag = "SLO Lifecycle"
)]
pub async fn get_active_slo(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
) -> ApiResult<Json<ActiveSlo>> {
    let active = state.slo_lifecycle_service.get_active(&service_id).await?;
    Ok(Json(active))
}

/// Full audit history for a service's SLO, newest first.
#[utoipa::path(
    get,
    path = "/api/services/{service_id}/slo/history",
    params(("service_id" = String, Path, description = "Service identifier")),
    responses(
        (status = 200, description = "Audit history, newest first", body = Vec<SloAuditEntry>),
    ),
    tag = "SLO Lifecycle"
)]
pub async fn get_slo_history(
    State(state): State<Arc<AppState>>,
    Path(service_id): Path<String>,
) -> ApiResult<Json<Vec<SloAuditEntry>>> {
    let history = state.slo_lifecycle_service.history(&service_id).await?;
    Ok(Json(history))
}
