//! SLO Lifecycle & Audit (C11): the accept/modify/reject state machine and
//! its append-only audit trail.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::models::{
    ActiveSlo, SloAction, SloAuditEntry, SloSnapshot, SloSource, TierTargets,
};
use crate::utils::{ApiError, ApiResult};

use super::repository::SloRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SloTier {
    Conservative,
    Balanced,
    Aggressive,
}

impl SloTier {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "conservative" => Some(Self::Conservative),
            "balanced" => Some(Self::Balanced),
            "aggressive" => Some(Self::Aggressive),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SloTier::Conservative => "conservative",
            SloTier::Balanced => "balanced",
            SloTier::Aggressive => "aggressive",
        }
    }

    /// Tier default targets, used when a recommendation body is not
    /// supplied (e.g. the accept/reject demo path).
    pub fn defaults(&self) -> TierTargets {
        match self {
            SloTier::Conservative => {
                TierTargets { availability: 99.5, latency_p95_ms: 300, latency_p99_ms: 1200 }
            }
            SloTier::Balanced => {
                TierTargets { availability: 99.9, latency_p95_ms: 200, latency_p99_ms: 800 }
            }
            SloTier::Aggressive => {
                TierTargets { availability: 99.95, latency_p95_ms: 150, latency_p99_ms: 500 }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Accept,
    Modify,
    Reject,
}

impl LifecycleAction {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "accept" => Some(Self::Accept),
            "modify" => Some(Self::Modify),
            "reject" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// Overrides applied on top of the tier defaults for a `modify` action.
#[derive(Debug, Clone, Default)]
pub struct SloModifications {
    pub availability_target: Option<f64>,
    pub latency_p95_target_ms: Option<i64>,
    pub latency_p99_target_ms: Option<i64>,
}

pub struct LifecycleTransitionRequest {
    pub service_id: String,
    pub action: LifecycleAction,
    pub selected_tier: SloTier,
    pub modifications: Option<SloModifications>,
    pub rationale: Option<String>,
    pub actor: String,
    pub recommendation_id: Option<Uuid>,
}

pub struct SloLifecycleService {
    repository: Arc<dyn SloRepository>,
}

impl SloLifecycleService {
    pub fn new(repository: Arc<dyn SloRepository>) -> Self {
        Self { repository }
    }

    pub async fn get_active(&self, service_id: &str) -> ApiResult<ActiveSlo> {
        self.repository
            .get_active(service_id)
            .await?
            .ok_or_else(|| ApiError::not_found(format!("no active SLO for service: {service_id}")))
    }

    pub async fn history(&self, service_id: &str) -> ApiResult<Vec<SloAuditEntry>> {
        self.repository.history(service_id).await
    }

    /// Apply one lifecycle transition. `reject` has no precondition and may
    /// leave the service without an active SLO, so the result is optional;
    /// `accept`/`modify` always install and return a new active SLO.
    pub async fn transition(&self, request: LifecycleTransitionRequest) -> ApiResult<Option<ActiveSlo>> {
        let previous = self.repository.get_active(&request.service_id).await?;
        let previous_snapshot = previous.as_ref().map(SloSnapshot::from);

        match request.action {
            LifecycleAction::Reject => {
                let entry = SloAuditEntry {
                    id: Uuid::new_v4(),
                    service_id: request.service_id.clone(),
                    action: SloAction::Reject,
                    actor: request.actor,
                    timestamp: Utc::now(),
                    recommendation_id: request.recommendation_id,
                    previous_slo: previous_snapshot,
                    new_slo: None,
                    selected_tier: Some(request.selected_tier.as_str().to_string()),
                    rationale: request.rationale,
                    modification_delta: None,
                };
                self.repository.append_only(entry).await?;
                Ok(previous)
            }
            LifecycleAction::Accept | LifecycleAction::Modify => {
                let defaults = request.selected_tier.defaults();
                let (targets, modification_delta, action) = match (request.action, &request.modifications) {
                    (LifecycleAction::Modify, Some(modifications)) => {
                        let applied = TierTargets {
                            availability: modifications.availability_target.unwrap_or(defaults.availability),
                            latency_p95_ms: modifications
                                .latency_p95_target_ms
                                .unwrap_or(defaults.latency_p95_ms),
                            latency_p99_ms: modifications
                                .latency_p99_target_ms
                                .unwrap_or(defaults.latency_p99_ms),
                        };
                        (applied, Some(modification_delta_of(&defaults, modifications)), SloAction::Modify)
                    }
                    (LifecycleAction::Modify, None) => (defaults, None, SloAction::Modify),
                    _ => (defaults, None, SloAction::Accept),
                };

                let source = match action {
                    SloAction::Modify => SloSource::RecommendationModified,
                    _ => SloSource::RecommendationAccepted,
                };

                let new_active = ActiveSlo {
                    id: Uuid::new_v4(),
                    service_id: request.service_id.clone(),
                    availability_target: Some(targets.availability),
                    latency_p95_target_ms: Some(targets.latency_p95_ms),
                    latency_p99_target_ms: Some(targets.latency_p99_ms),
                    source,
                    selected_tier: Some(request.selected_tier.as_str().to_string()),
                    recommendation_id: request.recommendation_id,
                    activated_at: Utc::now(),
                    activated_by: request.actor.clone(),
                };

                let entry = SloAuditEntry {
                    id: Uuid::new_v4(),
                    service_id: request.service_id.clone(),
                    action,
                    actor: request.actor,
                    timestamp: Utc::now(),
                    recommendation_id: request.recommendation_id,
                    previous_slo: previous_snapshot,
                    new_slo: Some(SloSnapshot::from(&new_active)),
                    selected_tier: Some(request.selected_tier.as_str().to_string()),
                    rationale: request.rationale,
                    modification_delta,
                };

                self.repository.set_active_and_append(new_active.clone(), entry).await?;
                Ok(Some(new_active))
            }
        }
    }
}

fn modification_delta_of(
    defaults: &TierTargets,
    modifications: &SloModifications,
) -> HashMap<String, serde_json::Value> {
    let mut delta = HashMap::new();
    if let Some(value) = modifications.availability_target {
        if (value - defaults.availability).abs() > f64::EPSILON {
            delta.insert(
                "availability_target".to_string(),
                serde_json::json!({ "from": defaults.availability, "to": value }),
            );
        }
    }
    if let Some(value) = modifications.latency_p95_target_ms {
        if value != defaults.latency_p95_ms {
            delta.insert(
                "latency_p95_target_ms".to_string(),
                serde_json::json!({ "from": defaults.latency_p95_ms, "to": value }),
            );
        }
    }
    if let Some(value) = modifications.latency_p99_target_ms {
        if value != defaults.latency_p99_ms {
            delta.insert(
                "latency_p99_target_ms".to_string(),
                serde_json::json!({ "from": defaults.latency_p99_ms, "to": value }),
            );
        }
    }
    delta
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::slo_lifecycle::repository::MemorySloRepository;

    fn service() -> SloLifecycleService {
        SloLifecycleService::new(Arc::new(MemorySloRepository::new()))
    }

    #[tokio::test]
    async fn accept_installs_tier_defaults() {
        let svc = service();
        let active = svc
            .transition(LifecycleTransitionRequest {
                service_id: "checkout".to_string(),
                action: LifecycleAction::Accept,
                selected_tier: SloTier::Balanced,
                modifications: None,
                rationale: Some("demo".to_string()),
                actor: "alice".to_string(),
                recommendation_id: None,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.availability_target, Some(99.9));
        assert_eq!(active.source, SloSource::RecommendationAccepted);
    }

    #[tokio::test]
    async fn modify_overlays_tier_defaults_and_records_delta() {
        let svc = service();
        let active = svc
            .transition(LifecycleTransitionRequest {
                service_id: "checkout".to_string(),
                action: LifecycleAction::Modify,
                selected_tier: SloTier::Balanced,
                modifications: Some(SloModifications {
                    availability_target: Some(99.95),
                    latency_p95_target_ms: None,
                    latency_p99_target_ms: None,
                }),
                rationale: None,
                actor: "bob".to_string(),
                recommendation_id: None,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(active.availability_target, Some(99.95));
        assert_eq!(active.latency_p95_target_ms, Some(200));

        let history = svc.history("checkout").await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].modification_delta.as_ref().unwrap().contains_key("availability_target"));
    }

    #[tokio::test]
    async fn reject_does_not_change_active_slo() {
        let svc = service();
        svc.transition(LifecycleTransitionRequest {
            service_id: "checkout".to_string(),
            action: LifecycleAction::Accept,
            selected_tier: SloTier::Conservative,
            modifications: None,
            rationale: None,
            actor: "alice".to_string(),
            recommendation_id: None,
        })
        .await
        .unwrap();

        let before = svc.get_active("checkout").await.unwrap();

        let result = svc
            .transition(LifecycleTransitionRequest {
                service_id: "checkout".to_string(),
                action: LifecycleAction::Reject,
                selected_tier: SloTier::Aggressive,
                modifications: None,
                rationale: Some("too aggressive".to_string()),
                actor: "carol".to_string(),
                recommendation_id: None,
            })
            .await
            .unwrap()
            .unwrap();

        assert_eq!(result.availability_target, before.availability_target);
        let history = svc.history("checkout").await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].action, SloAction::Reject);
    }

    #[tokio::test]
    async fn history_is_newest_first() {
        let svc = service();
        for tier in [SloTier::Conservative, SloTier::Balanced, SloTier::Aggressive] {
            svc.transition(LifecycleTransitionRequest {
                service_id: "checkout".to_string(),
                action: LifecycleAction::Accept,
                selected_tier: tier,
                modifications: None,
                rationale: None,
                actor: "alice".to_string(),
                recommendation_id: None,
            })
            .await
            .unwrap();
        }
        let history = svc.history("checkout").await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].selected_tier.as_deref(), Some("aggressive"));
        assert_eq!(history[2].selected_tier.as_deref(), Some("conservative"));
    }
}
