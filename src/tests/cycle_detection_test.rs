use crate::models::{Criticality, ServiceType};
use crate::services::cycle_detector;
use crate::services::graph_store::GraphStore;

use super::common;

#[tokio::test]
async fn finds_one_cycle_among_four_services_and_does_not_rediscover_it() {
    let pool = common::create_test_db().await;
    let graph_store = GraphStore::new(pool.clone());

    for name in ["service-a", "service-b", "service-c", "service-d"] {
        common::seed_service(&graph_store, name, Criticality::Medium, ServiceType::Internal, None).await;
    }
    common::seed_hard_sync_edge(&graph_store, "service-a", "service-b").await;
    common::seed_hard_sync_edge(&graph_store, "service-b", "service-c").await;
    common::seed_hard_sync_edge(&graph_store, "service-c", "service-a").await;
    // service-d is seeded but left unconnected.

    let discovered = cycle_detector::run_cycle_detection(&graph_store).await.expect("run cycle detection");
    assert_eq!(discovered.len(), 1);

    let mut members = discovered[0].service_ids.clone();
    members.sort();
    assert_eq!(members, vec!["service-a".to_string(), "service-b".to_string(), "service-c".to_string()]);

    let rerun = cycle_detector::run_cycle_detection(&graph_store).await.expect("rerun cycle detection");
    assert!(rerun.is_empty(), "the same cycle must not be reported twice");
}

#[tokio::test]
async fn acyclic_graph_reports_no_cycles() {
    let pool = common::create_test_db().await;
    let graph_store = GraphStore::new(pool.clone());

    common::seed_service(&graph_store, "service-a", Criticality::Medium, ServiceType::Internal, None).await;
    common::seed_service(&graph_store, "service-b", Criticality::Medium, ServiceType::Internal, None).await;
    common::seed_service(&graph_store, "service-c", Criticality::Medium, ServiceType::Internal, None).await;
    common::seed_hard_sync_edge(&graph_store, "service-a", "service-b").await;
    common::seed_hard_sync_edge(&graph_store, "service-b", "service-c").await;

    let discovered = cycle_detector::run_cycle_detection(&graph_store).await.expect("run cycle detection");
    assert!(discovered.is_empty());
}
