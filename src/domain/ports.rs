use crate::domain::model::{DebtRecord, LoadSummary, Observation, TransformResult, UpsertOutcome};
use crate::utils::error::Result;
use async_trait::async_trait;

pub trait Storage: Send + Sync {
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    /// Human readable location of `path`, used in log lines and summaries.
    fn location(&self, path: &str) -> String;
}

/// Where raw observations come from.
#[async_trait]
pub trait DebtSource: Send + Sync {
    async fn fetch_observations(&self) -> Result<Vec<Observation>>;
}

/// Where cleaned records end up.
#[async_trait]
pub trait DebtStore: Send + Sync {
    async fn ensure_schema(&self) -> Result<()>;
    async fn upsert(&self, records: &[DebtRecord]) -> Result<UpsertOutcome>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Vec<Observation>>;
    async fn transform(&self, data: Vec<Observation>) -> Result<TransformResult>;
    async fn load(&self, result: TransformResult) -> Result<LoadSummary>;
}
