pub mod common;

mod constraint_analysis_test;
mod cycle_detection_test;
mod impact_analysis_test;
mod invariants_test;
mod slo_lifecycle_test;
mod subgraph_test;
