//! Composite Bound Engine (C6): computes the best achievable availability
//! for a service given its own observed availability and its hard
//! dependencies' availabilities. Pure and synchronous.

/// One dependency's contribution to the composite bound.
#[derive(Debug, Clone)]
pub struct DependencyAvailability {
    pub name: String,
    pub availability: f64,
    pub is_hard: bool,
    pub redundant_group: Option<String>,
    /// Set when telemetry was missing and a default was substituted.
    pub substituted: bool,
}

#[derive(Debug, Clone)]
pub struct CompositeBound {
    pub bound_ratio: f64,
    pub bound_pct: f64,
    pub substitution_notes: Vec<String>,
}

/// `C = s * Π a_i` over hard dependencies only, with any dependencies
/// sharing a `redundant_group` combined as `1 - Π(1 - a_j)` before entering
/// the product. Soft/async dependencies never enter the computation.
pub fn composite_bound(own_availability: f64, dependencies: &[DependencyAvailability]) -> CompositeBound {
    let mut substitution_notes = Vec::new();
    for dep in dependencies {
        if dep.is_hard && dep.substituted {
            substitution_notes.push(format!(
                "missing telemetry for '{}', substituted default availability {:.4}",
                dep.name, dep.availability
            ));
        }
    }

    let hard: Vec<&DependencyAvailability> = dependencies.iter().filter(|d| d.is_hard).collect();

    let mut groups: std::collections::HashMap<String, f64> = std::collections::HashMap::new();
    let mut standalone_product = 1.0_f64;

    for dep in &hard {
        match &dep.redundant_group {
            Some(group) => {
                let entry = groups.entry(group.clone()).or_insert(1.0);
                *entry *= 1.0 - dep.availability;
            }
            None => standalone_product *= dep.availability,
        }
    }

    let mut product = standalone_product;
    for unavailability_product in groups.into_values() {
        let group_availability = 1.0 - unavailability_product;
        product *= group_availability;
    }

    let bound_ratio = (own_availability * product).clamp(0.0, 1.0);

    CompositeBound { bound_ratio, bound_pct: bound_ratio * 100.0, substitution_notes }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dep(name: &str, availability: f64, is_hard: bool) -> DependencyAvailability {
        DependencyAvailability {
            name: name.to_string(),
            availability,
            is_hard,
            redundant_group: None,
            substituted: false,
        }
    }

    #[test]
    fn soft_dependencies_are_ignored() {
        let deps = vec![dep("hard-dep", 0.99, true), dep("soft-dep", 0.5, false)];
        let result = composite_bound(0.999, &deps);
        let expected = 0.999 * 0.99;
        assert!((result.bound_ratio - expected).abs() < 1e-9);
    }

    #[test]
    fn redundant_group_combines_before_product() {
        let deps = vec![
            DependencyAvailability {
                name: "replica-a".to_string(),
                availability: 0.9,
                is_hard: true,
                redundant_group: Some("cache-cluster".to_string()),
                substituted: false,
            },
            DependencyAvailability {
                name: "replica-b".to_string(),
                availability: 0.9,
                is_hard: true,
                redundant_group: Some("cache-cluster".to_string()),
                substituted: false,
            },
        ];
        let result = composite_bound(1.0, &deps);
        // group availability = 1 - (1-0.9)*(1-0.9) = 1 - 0.01 = 0.99
        assert!((result.bound_ratio - 0.99).abs() < 1e-9);
    }

    #[test]
    fn substitution_notes_are_recorded() {
        let deps = vec![DependencyAvailability {
            name: "payments".to_string(),
            availability: 0.999,
            is_hard: true,
            redundant_group: None,
            substituted: true,
        }];
        let result = composite_bound(0.999, &deps);
        assert_eq!(result.substitution_notes.len(), 1);
    }
}
