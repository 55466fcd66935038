//! Background sweeps for the graph store: marking stale edges and
//! re-running cycle detection over the current adjacency snapshot. Both
//! tolerate concurrent edge upserts by operating on a point-in-time read.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::services::cycle_detector;
use crate::services::graph_store::GraphStore;
use crate::utils::ScheduledTask;

pub struct StaleEdgeSweepTask {
    graph_store: Arc<GraphStore>,
    threshold_hours: i64,
}

impl StaleEdgeSweepTask {
    pub fn new(graph_store: Arc<GraphStore>, threshold_hours: i64) -> Self {
        Self { graph_store, threshold_hours }
    }

    async fn execute(&self) -> Result<(), anyhow::Error> {
        let marked = self.graph_store.mark_stale_edges(self.threshold_hours).await?;
        if marked > 0 {
            tracing::info!("stale-edge sweep marked {} edge(s) stale", marked);
        }

        let discovered = cycle_detector::run_cycle_detection(&self.graph_store).await?;
        if !discovered.is_empty() {
            tracing::warn!(
                "cycle sweep discovered {} new circular dependency alert(s)",
                discovered.len()
            );
        }

        Ok(())
    }
}

impl ScheduledTask for StaleEdgeSweepTask {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<(), anyhow::Error>> + Send + '_>> {
        Box::pin(async move { self.execute().await })
    }
}
