use crate::services::composite_bound_service::{self, DependencyAvailability};
use crate::services::error_budget_analyzer;

#[test]
fn self_consumption_is_zero_at_full_availability_and_total_at_the_target_floor() {
    let target_pct = 99.9;
    let error_budget_ratio = 1.0 - target_pct / 100.0;
    let target_floor = 1.0 - error_budget_ratio;

    let at_full = error_budget_analyzer::analyze(target_pct, 1.0, &[], 20.0, 30.0, 43_200.0);
    assert!(at_full.self_consumption_pct.abs() < 1e-9);

    let at_floor = error_budget_analyzer::analyze(target_pct, target_floor, &[], 20.0, 30.0, 43_200.0);
    assert!((at_floor.self_consumption_pct - 100.0).abs() < 1e-6);
}

#[test]
fn composite_bound_never_exceeds_the_weakest_link() {
    let deps = vec![
        DependencyAvailability {
            name: "strong-dep".to_string(),
            availability: 0.9999,
            is_hard: true,
            redundant_group: None,
            substituted: false,
        },
        DependencyAvailability {
            name: "weak-dep".to_string(),
            availability: 0.95,
            is_hard: true,
            redundant_group: None,
            substituted: false,
        },
    ];

    let bound = composite_bound_service::composite_bound(0.9999, &deps);

    assert!(bound.bound_ratio <= 0.9999 + 1e-12);
    assert!(bound.bound_ratio <= 0.95 + 1e-12);
}
