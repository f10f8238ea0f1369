use crate::domain::ports::Pipeline;
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

/// Runs a pipeline's extract, transform and load phases in order.
pub struct OrderEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> OrderEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<String> {
        tracing::info!("Starting portfolio ordering run");
        self.monitor.log_phase("start");

        let snapshot = self.pipeline.extract().await?;
        let fetched: usize = snapshot.sections.iter().map(|s| s.documents.len()).sum();
        tracing::info!(
            "Fetched {} documents across {} sections",
            fetched,
            snapshot.sections.len()
        );
        self.monitor.log_phase("fetch");

        let portfolio = self.pipeline.transform(snapshot).await?;
        for ordered in &portfolio.sections {
            if ordered.skipped > 0 {
                tracing::warn!(
                    "{}: ordered {} records, skipped {} malformed",
                    ordered.section,
                    ordered.items.len(),
                    ordered.skipped
                );
            } else {
                tracing::info!("{}: ordered {} records", ordered.section, ordered.items.len());
            }
        }
        self.monitor.log_phase("order");

        let output_path = self.pipeline.load(portfolio).await?;
        tracing::info!("Output saved to: {}", output_path);
        self.monitor.log_final_stats();

        Ok(output_path)
    }
}
