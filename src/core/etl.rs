use crate::domain::model::ComposeReport;
use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::PhaseMonitor;

/// Drives a pipeline through extract, transform and load.
pub struct ComposeEngine<P: Pipeline> {
    pipeline: P,
    monitor_enabled: bool,
}

impl<P: Pipeline> ComposeEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self {
            pipeline,
            monitor_enabled: false,
        }
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor_enabled,
        }
    }

    pub fn pipeline(&self) -> &P {
        &self.pipeline
    }

    pub async fn run(&self) -> Result<ComposeReport> {
        let mut monitor = PhaseMonitor::new(self.monitor_enabled);
        tracing::info!("Starting composition...");

        tracing::info!("Fetching drawings...");
        let extracted = self.pipeline.extract().await?;
        monitor.finish_phase("extract");

        tracing::info!("Laying out plans...");
        let composed = self.pipeline.transform(extracted).await?;
        monitor.finish_phase("transform");

        tracing::info!("Uploading document...");
        let report = self.pipeline.load(composed).await?;
        monitor.finish_phase("load");

        tracing::info!(
            "Placed {} items in {} plan(s), {} failed, {} plan(s) skipped",
            report.placed_items(),
            report.plans.len(),
            report.failed_items.len(),
            report.skipped_plans.len()
        );
        monitor.log_final_stats();

        Ok(report)
    }
}
