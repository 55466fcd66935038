//! Unachievability Detector (C8): flags when a desired SLO target cannot be
//! met by the current dependency chain, and suggests the per-dependency
//! target that would make it achievable (the "10x rule": split the error
//! budget evenly across self + N dependencies).

const TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone)]
pub struct UnachievabilityWarning {
    pub gap_pct: f64,
    pub required_per_dependency_pct: f64,
    pub message: String,
    pub remediation: Vec<String>,
}

/// `target_pct` on the percentage scale, `composite_bound_ratio` in `[0,1]`.
/// Returns `None` when the target is achievable within tolerance.
pub fn check(
    target_pct: f64,
    composite_bound_ratio: f64,
    hard_dependency_count: u32,
) -> Option<UnachievabilityWarning> {
    let target_ratio = target_pct / 100.0;
    if composite_bound_ratio >= target_ratio - TOLERANCE {
        return None;
    }

    let composite_bound_pct = composite_bound_ratio * 100.0;
    let gap_pct = target_pct - composite_bound_pct;

    let n = hard_dependency_count as f64;
    let required_per_dependency_pct = (1.0 - (1.0 - target_ratio) / (n + 1.0)) * 100.0;

    let message = format!(
        "Target {:.2}% is not achievable with the current dependency chain; \
         composite bound is {:.2}%.",
        target_pct, composite_bound_pct
    );

    Some(UnachievabilityWarning {
        gap_pct,
        required_per_dependency_pct,
        message,
        remediation: vec![
            "Add redundancy for the weakest hard dependencies (parallel, independent paths)."
                .to_string(),
            "Convert hard-sync dependencies to soft or asynchronous where the call can tolerate it."
                .to_string(),
            "Relax the target, or accept a lower tier until the dependency chain improves."
                .to_string(),
        ],
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn achievable_target_yields_no_warning() {
        assert!(check(99.0, 0.999, 2).is_none());
    }

    #[test]
    fn boundary_within_tolerance_is_achievable() {
        assert!(check(99.9, 0.999, 0).is_none());
    }

    #[test]
    fn unachievable_target_reports_gap_and_remediation() {
        let warning = check(99.99, 0.95, 3).unwrap();
        assert!(warning.gap_pct > 0.0);
        assert_eq!(warning.remediation.len(), 3);
        assert!(warning.message.contains("99.99"));
    }

    #[test]
    fn required_per_dependency_follows_10x_rule() {
        // T=99.9%, N=1 -> required = (1 - 0.001/2)*100 = 99.95
        let warning = check(99.9, 0.50, 1).unwrap();
        assert!((warning.required_per_dependency_pct - 99.95).abs() < 1e-9);
    }
}
