use std::sync::Arc;

use crate::models::{Criticality, ServiceType};
use crate::services::constraint_analysis_service::{ConstraintAnalysisRequest, ConstraintAnalysisService};
use crate::services::error_budget_analyzer::RiskLevel;
use crate::services::graph_store::GraphStore;
use crate::services::telemetry_port::{SqlTelemetryAdapter, TelemetryPort};

use super::common;

#[tokio::test]
async fn two_hard_dependencies_are_achievable_but_flagged_high_risk() {
    let pool = common::create_test_db().await;
    let graph_store = Arc::new(GraphStore::new(pool.clone()));
    let telemetry: Arc<dyn TelemetryPort> = Arc::new(SqlTelemetryAdapter::new(pool.clone()));
    let policy = common::test_policy();

    let root = common::seed_service(&graph_store, "api-gateway", Criticality::Critical, ServiceType::Internal, None).await;
    let dep1 =
        common::seed_service(&graph_store, "auth-service", Criticality::High, ServiceType::Internal, None).await;
    let dep2 =
        common::seed_service(&graph_store, "billing-service", Criticality::High, ServiceType::Internal, None).await;
    common::seed_hard_sync_edge(&graph_store, "api-gateway", "auth-service").await;
    common::seed_hard_sync_edge(&graph_store, "api-gateway", "billing-service").await;

    common::seed_availability_sample(&pool, root.id, 0.9999).await;
    common::seed_availability_sample(&pool, dep1.id, 0.9996).await;
    common::seed_availability_sample(&pool, dep2.id, 0.9996).await;

    let service = ConstraintAnalysisService::new(Arc::clone(&graph_store), telemetry, policy);

    let result = service
        .analyze(ConstraintAnalysisRequest {
            service_id: "api-gateway".to_string(),
            desired_target_pct: Some(99.9),
            lookback_days: 30,
            max_depth: 3,
        })
        .await
        .expect("analyze at 99.9% target");

    assert!(result.achievable);
    assert!(result.unachievability_warning.is_none());
    assert_eq!(result.hard_dependency_count, 2);
    assert!((result.composite_bound_pct - 99.9100239984).abs() < 1e-6);

    for consumption in &result.error_budget.dependency_consumptions {
        assert!((consumption.consumption_pct - 40.0).abs() < 1e-6);
        assert_eq!(consumption.risk, RiskLevel::High);
    }
    assert_eq!(result.error_budget.high_risk_dependencies.len(), 2);
}

#[tokio::test]
async fn same_dependencies_become_unachievable_at_a_tighter_target() {
    let pool = common::create_test_db().await;
    let graph_store = Arc::new(GraphStore::new(pool.clone()));
    let telemetry: Arc<dyn TelemetryPort> = Arc::new(SqlTelemetryAdapter::new(pool.clone()));
    let policy = common::test_policy();

    let root = common::seed_service(&graph_store, "api-gateway", Criticality::Critical, ServiceType::Internal, None).await;
    let dep1 =
        common::seed_service(&graph_store, "auth-service", Criticality::High, ServiceType::Internal, None).await;
    let dep2 =
        common::seed_service(&graph_store, "billing-service", Criticality::High, ServiceType::Internal, None).await;
    common::seed_hard_sync_edge(&graph_store, "api-gateway", "auth-service").await;
    common::seed_hard_sync_edge(&graph_store, "api-gateway", "billing-service").await;

    common::seed_availability_sample(&pool, root.id, 0.9999).await;
    common::seed_availability_sample(&pool, dep1.id, 0.9996).await;
    common::seed_availability_sample(&pool, dep2.id, 0.9996).await;

    let service = ConstraintAnalysisService::new(Arc::clone(&graph_store), telemetry, policy);

    let result = service
        .analyze(ConstraintAnalysisRequest {
            service_id: "api-gateway".to_string(),
            desired_target_pct: Some(99.99),
            lookback_days: 30,
            max_depth: 3,
        })
        .await
        .expect("analyze at 99.99% target");

    assert!(!result.achievable);
    let warning = result.unachievability_warning.expect("expected an unachievability warning");
    assert!((warning.gap_pct - 0.0799760016).abs() < 1e-4);
    assert!((warning.required_per_dependency_pct - 99.996667).abs() < 1e-3);
    assert_eq!(warning.remediation.len(), 3);
}

#[tokio::test]
async fn external_dependency_without_telemetry_falls_back_to_buffered_published_sla() {
    let pool = common::create_test_db().await;
    let graph_store = Arc::new(GraphStore::new(pool.clone()));
    let telemetry: Arc<dyn TelemetryPort> = Arc::new(SqlTelemetryAdapter::new(pool.clone()));
    let policy = common::test_policy();

    let root =
        common::seed_service(&graph_store, "payment-gateway", Criticality::Critical, ServiceType::Internal, None)
            .await;
    common::seed_service(&graph_store, "stripe-api", Criticality::High, ServiceType::External, Some(0.9999)).await;
    common::seed_hard_sync_edge(&graph_store, "payment-gateway", "stripe-api").await;
    common::seed_availability_sample(&pool, root.id, 0.9995).await;

    let service = ConstraintAnalysisService::new(Arc::clone(&graph_store), telemetry, policy);

    let result = service
        .analyze(ConstraintAnalysisRequest {
            service_id: "payment-gateway".to_string(),
            desired_target_pct: Some(99.9),
            lookback_days: 30,
            max_depth: 3,
        })
        .await
        .expect("analyze with an external dependency");

    assert_eq!(result.external_dependency_count, 1);

    let stripe_consumption = result
        .error_budget
        .dependency_consumptions
        .iter()
        .find(|d| d.name == "stripe-api")
        .expect("stripe-api consumption entry");
    assert!((stripe_consumption.consumption_pct - 110.0).abs() < 1e-6);

    assert!(result.substitution_notes.iter().any(|note| note.contains("stripe-api") && note.contains("0.9989")));
}
