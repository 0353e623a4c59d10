use crate::core::{LoadSummary, Pipeline};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    pub async fn run(&self) -> Result<LoadSummary> {
        tracing::info!("🚀 Starting Kenya external debt ETL pipeline");

        // Extract
        tracing::info!("📥 Fetching data from World Bank API...");
        let raw_data = self.pipeline.extract().await?;
        tracing::info!("Extracted {} observations", raw_data.len());
        self.monitor.log_phase("Extract", raw_data.len());

        // Transform
        tracing::info!("🔄 Cleaning and transforming data...");
        let transformed = self.pipeline.transform(raw_data).await?;
        tracing::info!("Transformed {} records", transformed.records.len());
        self.monitor.log_phase("Transform", transformed.records.len());

        // Load
        tracing::info!("📤 Loading data...");
        let summary = self.pipeline.load(transformed).await?;
        self.monitor.log_phase("Load", summary.records_loaded);
        self.monitor.log_final_stats();

        tracing::info!("🏁 ETL process completed");
        Ok(summary)
    }
}
