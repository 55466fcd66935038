use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SloSource {
    RecommendationAccepted,
    RecommendationModified,
    Manual,
}

impl SloSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            SloSource::RecommendationAccepted => "recommendation_accepted",
            SloSource::RecommendationModified => "recommendation_modified",
            SloSource::Manual => "manual",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "recommendation_accepted" => Some(SloSource::RecommendationAccepted),
            "recommendation_modified" => Some(SloSource::RecommendationModified),
            "manual" => Some(SloSource::Manual),
            _ => None,
        }
    }
}

/// The SLO currently in force for a service. At most one per service; a new
/// accept/modify replaces it outright (history lives in the audit log).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ActiveSlo {
    pub id: Uuid,
    pub service_id: String,
    pub availability_target: Option<f64>,
    pub latency_p95_target_ms: Option<i64>,
    pub latency_p99_target_ms: Option<i64>,
    pub source: SloSource,
    pub selected_tier: Option<String>,
    pub recommendation_id: Option<Uuid>,
    pub activated_at: DateTime<Utc>,
    pub activated_by: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct ActiveSloRow {
    pub id: String,
    pub service_id: String,
    pub availability_target: Option<f64>,
    pub latency_p95_target_ms: Option<i64>,
    pub latency_p99_target_ms: Option<i64>,
    pub source: String,
    pub selected_tier: Option<String>,
    pub recommendation_id: Option<String>,
    pub activated_at: DateTime<Utc>,
    pub activated_by: String,
}

impl ActiveSloRow {
    pub fn into_active_slo(self) -> ActiveSlo {
        ActiveSlo {
            id: Uuid::parse_str(&self.id).unwrap_or_default(),
            service_id: self.service_id,
            availability_target: self.availability_target,
            latency_p95_target_ms: self.latency_p95_target_ms,
            latency_p99_target_ms: self.latency_p99_target_ms,
            source: SloSource::parse(&self.source).unwrap_or(SloSource::Manual),
            selected_tier: self.selected_tier,
            recommendation_id: self
                .recommendation_id
                .and_then(|s| Uuid::parse_str(&s).ok()),
            activated_at: self.activated_at,
            activated_by: self.activated_by,
        }
    }
}

/// Snapshot of an `ActiveSlo`, used for `previous_slo`/`new_slo` on an audit
/// entry. Mirrors the fields of `ActiveSlo` without the identifier, matching
/// the lifecycle's `_snapshot_slo` reference behavior.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SloSnapshot {
    pub availability_target: Option<f64>,
    pub latency_p95_target_ms: Option<i64>,
    pub latency_p99_target_ms: Option<i64>,
    pub source: String,
    pub selected_tier: Option<String>,
    pub activated_by: String,
    pub activated_at: DateTime<Utc>,
}

impl From<&ActiveSlo> for SloSnapshot {
    fn from(slo: &ActiveSlo) -> Self {
        Self {
            availability_target: slo.availability_target,
            latency_p95_target_ms: slo.latency_p95_target_ms,
            latency_p99_target_ms: slo.latency_p99_target_ms,
            source: slo.source.as_str().to_string(),
            selected_tier: slo.selected_tier.clone(),
            activated_by: slo.activated_by.clone(),
            activated_at: slo.activated_at,
        }
    }
}

/// Default availability/latency targets for a tier, injected into the
/// lifecycle rather than baked into the orchestrator (see design notes).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
pub struct TierTargets {
    pub availability: f64,
    pub latency_p95_ms: i64,
    pub latency_p99_ms: i64,
}
