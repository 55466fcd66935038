//! Response DTOs shared between the constraint-analysis and error-budget
//! handlers. The domain services return plain, non-serializable structs
//! (see `error_budget_analyzer`, `unachievable_detector`) so the wire shape
//! lives here rather than on the core algorithms.

use serde::Serialize;
use utoipa::ToSchema;

use crate::services::error_budget_analyzer::{DependencyConsumption, ErrorBudgetBreakdown, RiskLevel};
use crate::services::unachievable_detector::UnachievabilityWarning;

#[derive(Debug, Serialize, ToSchema)]
pub struct DependencyConsumptionDto {
    pub name: String,
    pub consumption_pct: f64,
    pub risk: String,
}

impl From<&DependencyConsumption> for DependencyConsumptionDto {
    fn from(value: &DependencyConsumption) -> Self {
        Self {
            name: value.name.clone(),
            consumption_pct: value.consumption_pct,
            risk: risk_str(value.risk).to_string(),
        }
    }
}

fn risk_str(risk: RiskLevel) -> &'static str {
    match risk {
        RiskLevel::Low => "low",
        RiskLevel::Moderate => "moderate",
        RiskLevel::High => "high",
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBudgetDto {
    pub monthly_budget_minutes: f64,
    pub self_consumption_pct: f64,
    pub dependency_consumptions: Vec<DependencyConsumptionDto>,
    pub high_risk_dependencies: Vec<String>,
    pub total_dependency_consumption_pct: f64,
}

impl From<&ErrorBudgetBreakdown> for ErrorBudgetDto {
    fn from(value: &ErrorBudgetBreakdown) -> Self {
        Self {
            monthly_budget_minutes: value.monthly_budget_minutes,
            self_consumption_pct: value.self_consumption_pct,
            dependency_consumptions: value.dependency_consumptions.iter().map(Into::into).collect(),
            high_risk_dependencies: value.high_risk_dependencies.clone(),
            total_dependency_consumption_pct: value.total_dependency_consumption_pct,
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UnachievabilityWarningDto {
    pub gap_pct: f64,
    pub required_per_dependency_pct: f64,
    pub message: String,
    pub remediation: Vec<String>,
}

impl From<&UnachievabilityWarning> for UnachievabilityWarningDto {
    fn from(value: &UnachievabilityWarning) -> Self {
        Self {
            gap_pct: value.gap_pct,
            required_per_dependency_pct: value.required_per_dependency_pct,
            message: value.message.clone(),
            remediation: value.remediation.clone(),
        }
    }
}
