//! Error-Budget Analyzer (C7): translates an SLO target and the composite
//! chain's hard dependency availabilities into a monthly error budget and a
//! per-dependency risk classification. Pure and synchronous.

/// Sentinel used when the target is >= 100%, where the budget formula
/// divides by zero.
pub const INFINITY_SENTINEL: f64 = 999_999.99;

pub const MONTHLY_BUDGET_MINUTES_BASE: f64 = 43_200.0; // 30 * 24 * 60

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn classify(consumption_pct: f64, moderate_threshold: f64, high_threshold: f64) -> Self {
        if consumption_pct > high_threshold {
            RiskLevel::High
        } else if consumption_pct >= moderate_threshold {
            RiskLevel::Moderate
        } else {
            RiskLevel::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Moderate => "moderate",
            RiskLevel::High => "high",
        }
    }
}

#[derive(Debug, Clone)]
pub struct DependencyConsumption {
    pub name: String,
    pub consumption_pct: f64,
    pub risk: RiskLevel,
}

#[derive(Debug, Clone)]
pub struct ErrorBudgetBreakdown {
    pub monthly_budget_minutes: f64,
    pub self_consumption_pct: f64,
    pub dependency_consumptions: Vec<DependencyConsumption>,
    pub high_risk_dependencies: Vec<String>,
    pub total_dependency_consumption_pct: f64,
}

/// `target_pct` and dependency availabilities are both expected on the
/// percentage/ratio scales documented on each field: `target_pct` is a
/// percentage (e.g. 99.9), availabilities are ratios in `[0,1]`.
pub fn analyze(
    target_pct: f64,
    own_availability: f64,
    hard_sync_dependencies: &[(String, f64)],
    moderate_threshold_pct: f64,
    high_threshold_pct: f64,
    monthly_budget_minutes_base: f64,
) -> ErrorBudgetBreakdown {
    if target_pct >= 100.0 {
        return ErrorBudgetBreakdown {
            monthly_budget_minutes: 0.0,
            self_consumption_pct: INFINITY_SENTINEL,
            dependency_consumptions: hard_sync_dependencies
                .iter()
                .map(|(name, _)| DependencyConsumption {
                    name: name.clone(),
                    consumption_pct: INFINITY_SENTINEL,
                    risk: RiskLevel::High,
                })
                .collect(),
            high_risk_dependencies: hard_sync_dependencies.iter().map(|(n, _)| n.clone()).collect(),
            total_dependency_consumption_pct: INFINITY_SENTINEL,
        };
    }

    let error_budget_ratio = 1.0 - target_pct / 100.0;
    let monthly_budget_minutes = error_budget_ratio * monthly_budget_minutes_base;

    let consumption_pct = |availability: f64| -> f64 { (1.0 - availability) / error_budget_ratio * 100.0 };

    let self_consumption_pct = consumption_pct(own_availability);

    let mut total = 0.0;
    let mut high_risk_dependencies = Vec::new();
    let dependency_consumptions = hard_sync_dependencies
        .iter()
        .map(|(name, availability)| {
            let pct = consumption_pct(*availability);
            total += pct;
            let risk = RiskLevel::classify(pct, moderate_threshold_pct, high_threshold_pct);
            if risk == RiskLevel::High {
                high_risk_dependencies.push(name.clone());
            }
            DependencyConsumption { name: name.clone(), consumption_pct: pct, risk }
        })
        .collect();

    ErrorBudgetBreakdown {
        monthly_budget_minutes,
        self_consumption_pct,
        dependency_consumptions,
        high_risk_dependencies,
        total_dependency_consumption_pct: total,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn target_at_100_percent_uses_sentinel() {
        let result = analyze(100.0, 0.999, &[("payments".into(), 0.999)], 20.0, 30.0, MONTHLY_BUDGET_MINUTES_BASE);
        assert_eq!(result.monthly_budget_minutes, 0.0);
        assert_eq!(result.self_consumption_pct, INFINITY_SENTINEL);
    }

    #[test]
    fn risk_thresholds_classify_correctly() {
        assert_eq!(RiskLevel::classify(10.0, 20.0, 30.0), RiskLevel::Low);
        assert_eq!(RiskLevel::classify(20.0, 20.0, 30.0), RiskLevel::Moderate);
        assert_eq!(RiskLevel::classify(30.0, 20.0, 30.0), RiskLevel::Moderate);
        assert_eq!(RiskLevel::classify(30.01, 20.0, 30.0), RiskLevel::High);
    }

    #[test]
    fn budget_at_99_9_percent_target() {
        let result = analyze(99.9, 0.9995, &[], 20.0, 30.0, MONTHLY_BUDGET_MINUTES_BASE);
        // error budget ratio = 0.001, budget = 43.2 minutes
        assert!((result.monthly_budget_minutes - 43.2).abs() < 1e-6);
    }

    #[test]
    fn consumption_can_exceed_100_percent() {
        let result = analyze(99.99, 0.90, &[], 20.0, 30.0, MONTHLY_BUDGET_MINUTES_BASE);
        assert!(result.self_consumption_pct > 100.0);
    }
}
