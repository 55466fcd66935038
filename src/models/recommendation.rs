use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A single tier's candidate SLO, as produced by the (external) recommendation
/// generator. The core only ever consumes these; it never produces them. See
/// §1/§9 — the generator is an opaque collaborator.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecommendationTier {
    pub availability_target: f64,
    pub latency_p95_target_ms: Option<i64>,
    pub latency_p99_target_ms: Option<i64>,
    pub estimated_breach_probability: f64,
    pub confidence_interval_low: f64,
    pub confidence_interval_high: f64,
    pub monthly_error_budget_minutes: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SloRecommendation {
    pub service_id: String,
    pub conservative: RecommendationTier,
    pub balanced: RecommendationTier,
    pub aggressive: RecommendationTier,
    pub data_quality: String,
    pub explanation: String,
}
