use std::sync::Arc;

use crate::models::{Criticality, ServiceType};
use crate::services::graph_store::GraphStore;
use crate::services::impact_analysis_service::{
    ImpactAnalysisRequest, ImpactAnalysisService, ProposedChange, SliType,
};
use crate::services::slo_lifecycle::{
    LifecycleAction, LifecycleTransitionRequest, SloLifecycleService, SloTier, SqlSloRepository,
};
use crate::services::telemetry_port::{SqlTelemetryAdapter, TelemetryPort};

use super::common;

#[tokio::test]
async fn tightening_a_dependency_target_flags_its_caller_as_at_risk() {
    let pool = common::create_test_db().await;
    let graph_store = Arc::new(GraphStore::new(pool.clone()));
    let telemetry: Arc<dyn TelemetryPort> = Arc::new(SqlTelemetryAdapter::new(pool.clone()));
    let policy = common::test_policy();

    let checkout = common::seed_service(
        &graph_store,
        "checkout-service",
        Criticality::Critical,
        ServiceType::Internal,
        None,
    )
    .await;
    common::seed_service(&graph_store, "payment-service", Criticality::Critical, ServiceType::Internal, None).await;
    common::seed_hard_sync_edge(&graph_store, "checkout-service", "payment-service").await;
    common::seed_availability_sample(&pool, checkout.id, 0.999).await;

    let slo_repository = Arc::new(SqlSloRepository::new(pool.clone()));
    let lifecycle_service = SloLifecycleService::new(slo_repository);
    lifecycle_service
        .transition(LifecycleTransitionRequest {
            service_id: "checkout-service".to_string(),
            action: LifecycleAction::Accept,
            selected_tier: SloTier::Balanced,
            modifications: None,
            rationale: Some("balanced tier for checkout".to_string()),
            actor: "alice".to_string(),
            recommendation_id: None,
        })
        .await
        .expect("accept an SLO for checkout-service so it can be found at risk");

    let impact_service = ImpactAnalysisService::new(Arc::clone(&graph_store), telemetry, policy);

    let result = impact_service
        .analyze(ImpactAnalysisRequest {
            changed_service_id: "payment-service".to_string(),
            proposed_change: ProposedChange {
                sli_type: SliType::Availability,
                current_target: 99.9,
                proposed_target: 99.5,
            },
            max_depth: 5,
        })
        .await
        .expect("impact analysis");

    assert_eq!(result.impacted_count, 1);
    assert_eq!(result.at_risk_count, 1);

    let impacted = &result.impacted[0];
    assert_eq!(impacted.service_id, "checkout-service");
    assert!((impacted.delta_pct - (-0.3996)).abs() < 1e-3);
    assert!(impacted.slo_at_risk);
    assert!(impacted.at_risk_description.is_some());
}
