use crate::models::{Criticality, ServiceType};
use crate::services::graph_store::{GraphStore, TraverseDirection};

use super::common;

#[tokio::test]
async fn downstream_traversal_returns_direct_neighbor_only() {
    let pool = common::create_test_db().await;
    let graph_store = GraphStore::new(pool.clone());

    common::seed_service(&graph_store, "service-a", Criticality::High, ServiceType::Internal, None).await;
    common::seed_service(&graph_store, "service-b", Criticality::Medium, ServiceType::Internal, None).await;
    common::seed_hard_sync_edge(&graph_store, "service-a", "service-b").await;

    let subgraph = graph_store
        .traverse("service-a", TraverseDirection::Downstream, 3, false)
        .await
        .expect("traverse downstream");

    assert_eq!(subgraph.nodes.len(), 2);
    assert_eq!(subgraph.edges.len(), 1);
    assert_eq!(subgraph.max_depth_reached, 1);

    let root = subgraph.nodes.iter().find(|s| s.service_id == "service-a").unwrap();
    let downstream_count = subgraph.edges.iter().filter(|e| e.source_service_id == root.id).count();
    let upstream_count = subgraph.edges.iter().filter(|e| e.target_service_id == root.id).count();
    assert_eq!(downstream_count, 1);
    assert_eq!(upstream_count, 0);
}

#[tokio::test]
async fn traverse_rejects_depth_outside_allowed_range() {
    let pool = common::create_test_db().await;
    let graph_store = GraphStore::new(pool.clone());
    common::seed_service(&graph_store, "solo", Criticality::Low, ServiceType::Internal, None).await;

    assert!(graph_store.traverse("solo", TraverseDirection::Both, 0, false).await.is_err());
    assert!(graph_store.traverse("solo", TraverseDirection::Both, 11, false).await.is_err());
}
