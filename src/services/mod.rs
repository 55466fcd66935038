pub mod composite_bound_service;
pub mod constraint_analysis_service;
pub mod cycle_detector;
pub mod edge_merge_service;
pub mod error_budget_analyzer;
pub mod external_buffer_service;
pub mod graph_store;
pub mod impact_analysis_service;
pub mod slo_lifecycle;
pub mod stale_edge_sweep;
pub mod telemetry_port;
pub mod unachievable_detector;

pub use constraint_analysis_service::ConstraintAnalysisService;
pub use graph_store::GraphStore;
pub use impact_analysis_service::ImpactAnalysisService;
pub use slo_lifecycle::SloLifecycleService;
pub use stale_edge_sweep::StaleEdgeSweepTask;
pub use telemetry_port::{SqlTelemetryAdapter, TelemetryPort};
