use std::sync::Arc;

use crate::services::slo_lifecycle::{
    LifecycleAction, LifecycleTransitionRequest, SloLifecycleService, SloTier, SqlSloRepository,
};

use super::common;

#[tokio::test]
async fn accept_then_reject_round_trip_persists_through_the_sql_repository() {
    let pool = common::create_test_db().await;
    let repository = Arc::new(SqlSloRepository::new(pool));
    let lifecycle = SloLifecycleService::new(repository);

    let accepted = lifecycle
        .transition(LifecycleTransitionRequest {
            service_id: "checkout-service".to_string(),
            action: LifecycleAction::Accept,
            selected_tier: SloTier::Balanced,
            modifications: None,
            rationale: Some("initial rollout".to_string()),
            actor: "alice".to_string(),
            recommendation_id: None,
        })
        .await
        .expect("accept transition")
        .expect("accept always installs an active SLO");
    assert_eq!(accepted.availability_target, Some(99.9));

    let fetched = lifecycle.get_active("checkout-service").await.expect("active SLO must exist");
    assert_eq!(fetched.id, accepted.id);

    let rejected = lifecycle
        .transition(LifecycleTransitionRequest {
            service_id: "checkout-service".to_string(),
            action: LifecycleAction::Reject,
            selected_tier: SloTier::Aggressive,
            modifications: None,
            rationale: Some("too aggressive for this team".to_string()),
            actor: "bob".to_string(),
            recommendation_id: None,
        })
        .await
        .expect("reject transition")
        .expect("reject returns the unchanged previous active SLO");
    assert_eq!(rejected.id, accepted.id);

    let still_active = lifecycle.get_active("checkout-service").await.expect("active SLO unchanged by reject");
    assert_eq!(still_active.id, accepted.id);

    let history = lifecycle.history("checkout-service").await.expect("history");
    assert_eq!(history.len(), 2);
    assert_eq!(history[0].action.as_str(), "reject");
    assert_eq!(history[1].action.as_str(), "accept");
}

#[tokio::test]
async fn get_active_is_not_found_before_any_transition() {
    let pool = common::create_test_db().await;
    let repository = Arc::new(SqlSloRepository::new(pool));
    let lifecycle = SloLifecycleService::new(repository);

    let result = lifecycle.get_active("never-touched-service").await;
    assert!(result.is_err());
}
