//! SLO Reliability-Analysis Server library
//!
//! This library contains the core modules for the dependency-graph /
//! constraint-analysis server.

use std::sync::Arc;

use sqlx::SqlitePool;

pub mod config;
pub mod db;
pub mod handlers;
pub mod models;
pub mod services;
pub mod utils;

#[cfg(test)]
mod tests;

pub use config::{Config, GraphPolicyConfig};
pub use services::{
    ConstraintAnalysisService, GraphStore, ImpactAnalysisService, SloLifecycleService,
    SqlTelemetryAdapter, TelemetryPort,
};

/// Application shared state.
///
/// Rust's type system is the DI container: every service is wrapped in
/// `Arc` for cheap cloning and thread safety, and `AppState` itself is
/// `Clone` so axum can hand a copy to each request.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub policy: Arc<GraphPolicyConfig>,

    pub graph_store: Arc<GraphStore>,
    pub telemetry: Arc<dyn TelemetryPort>,
    pub constraint_analysis_service: Arc<ConstraintAnalysisService>,
    pub impact_analysis_service: Arc<ImpactAnalysisService>,
    pub slo_lifecycle_service: Arc<SloLifecycleService>,
}
