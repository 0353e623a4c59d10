use crate::config::toml_config::TomlConfig;
use crate::core::export;
use crate::core::transform::clean_observations;
use crate::core::{DebtSource, DebtStore, LoadSummary, Observation, Pipeline, Storage, TransformResult};
use crate::utils::error::Result;

/// World Bank → PostgreSQL 管道；store 為 None 時只做匯出
pub struct DebtPipeline<Src: DebtSource, Db: DebtStore, S: Storage> {
    pub(crate) source: Src,
    pub(crate) store: Option<Db>,
    pub(crate) storage: S,
    pub(crate) config: TomlConfig,
}

impl<Src: DebtSource, Db: DebtStore, S: Storage> DebtPipeline<Src, Db, S> {
    pub fn new(source: Src, store: Option<Db>, storage: S, config: TomlConfig) -> Self {
        Self {
            source,
            store,
            storage,
            config,
        }
    }
}

#[async_trait::async_trait]
impl<Src: DebtSource, Db: DebtStore, S: Storage> Pipeline for DebtPipeline<Src, Db, S> {
    async fn extract(&self) -> Result<Vec<Observation>> {
        self.source.fetch_observations().await
    }

    async fn transform(&self, data: Vec<Observation>) -> Result<TransformResult> {
        let result = clean_observations(data, &self.config.source, &self.config.transform);

        if result.dropped > 0 {
            tracing::info!("🧹 Dropped {} observations during cleaning", result.dropped);
        }
        if result.interpolated > 0 {
            tracing::info!("📈 Interpolated {} missing values", result.interpolated);
        }
        Ok(result)
    }

    async fn load(&self, result: TransformResult) -> Result<LoadSummary> {
        let mut summary = LoadSummary::default();

        if result.records.is_empty() {
            tracing::warn!("⚠️ No data to load");
            summary.database_skipped = true;
            return Ok(summary);
        }

        match &self.store {
            Some(store) => {
                store.ensure_schema().await?;
                let outcome = store.upsert(&result.records).await?;
                tracing::info!(
                    "✅ Successfully loaded {} records ({} inserted, {} updated)",
                    result.records.len(),
                    outcome.inserted,
                    outcome.updated
                );
                summary.records_loaded = result.records.len();
                summary.inserted = outcome.inserted;
                summary.updated = outcome.updated;
            }
            None => {
                tracing::info!("⏭️ Database load skipped");
                summary.database_skipped = true;
            }
        }

        if let Some(export_config) = self.config.export_config() {
            let bundle = export::build_bundle(&result.records, export_config)?;
            tracing::debug!("Writing export bundle ({} bytes)", bundle.len());
            self.storage
                .write_file(&export_config.filename, &bundle)
                .await?;

            let location = self.storage.location(&export_config.filename);
            tracing::info!("📁 Export written to: {}", location);
            summary.export_path = Some(location);
        }

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::{ExportConfig, MissingValueStrategy};
    use crate::domain::model::{DebtRecord, IdValue, UpsertOutcome};
    use crate::utils::error::EtlError;
    use std::collections::HashMap;
    use std::sync::Arc;
    use tokio::sync::Mutex;

    struct MockSource {
        observations: Vec<Observation>,
    }

    #[async_trait::async_trait]
    impl DebtSource for MockSource {
        async fn fetch_observations(&self) -> Result<Vec<Observation>> {
            Ok(self.observations.clone())
        }
    }

    #[derive(Clone, Default)]
    struct MockStore {
        rows: Arc<Mutex<HashMap<i32, DebtRecord>>>,
        schema_calls: Arc<Mutex<usize>>,
        fail_upsert: bool,
    }

    #[async_trait::async_trait]
    impl DebtStore for MockStore {
        async fn ensure_schema(&self) -> Result<()> {
            *self.schema_calls.lock().await += 1;
            Ok(())
        }

        async fn upsert(&self, records: &[DebtRecord]) -> Result<UpsertOutcome> {
            if self.fail_upsert {
                return Err(EtlError::ProcessingError {
                    message: "upsert failed".to_string(),
                });
            }
            let mut rows = self.rows.lock().await;
            let mut outcome = UpsertOutcome::default();
            for record in records {
                match rows.insert(record.year, record.clone()) {
                    Some(_) => outcome.updated += 1,
                    None => outcome.inserted += 1,
                }
            }
            Ok(outcome)
        }
    }

    #[derive(Clone, Default)]
    struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl Storage for MockStorage {
        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }

        fn location(&self, path: &str) -> String {
            format!("mock://{}", path)
        }
    }

    fn observation(date: &str, value: Option<f64>) -> Observation {
        Observation {
            indicator: None,
            country: Some(IdValue {
                id: "KE".to_string(),
                value: "Kenya".to_string(),
            }),
            countryiso3code: Some("KEN".to_string()),
            date: date.to_string(),
            value,
            unit: None,
            obs_status: None,
            decimal: None,
        }
    }

    fn pipeline(
        observations: Vec<Observation>,
        store: Option<MockStore>,
        storage: MockStorage,
        config: TomlConfig,
    ) -> DebtPipeline<MockSource, MockStore, MockStorage> {
        DebtPipeline::new(MockSource { observations }, store, storage, config)
    }

    #[tokio::test]
    async fn test_full_run_upserts_records() {
        let store = MockStore::default();
        let p = pipeline(
            vec![observation("2011", Some(2.0)), observation("2010", Some(1.0))],
            Some(store.clone()),
            MockStorage::default(),
            TomlConfig::default(),
        );

        let raw = p.extract().await.unwrap();
        let transformed = p.transform(raw).await.unwrap();
        let summary = p.load(transformed).await.unwrap();

        assert_eq!(summary.records_loaded, 2);
        assert_eq!(summary.inserted, 2);
        assert_eq!(summary.updated, 0);
        assert!(!summary.database_skipped);
        assert!(summary.export_path.is_none());
        assert_eq!(*store.schema_calls.lock().await, 1);
        assert_eq!(store.rows.lock().await.get(&2010).unwrap().external_debt, Some(1.0));
    }

    #[tokio::test]
    async fn test_second_run_counts_updates() {
        let store = MockStore::default();
        let p = pipeline(
            vec![observation("2010", Some(1.0))],
            Some(store.clone()),
            MockStorage::default(),
            TomlConfig::default(),
        );

        let raw = p.extract().await.unwrap();
        p.load(p.transform(raw).await.unwrap()).await.unwrap();

        let raw = p.extract().await.unwrap();
        let summary = p.load(p.transform(raw).await.unwrap()).await.unwrap();
        assert_eq!(summary.inserted, 0);
        assert_eq!(summary.updated, 1);
        assert_eq!(store.rows.lock().await.len(), 1);
    }

    #[tokio::test]
    async fn test_empty_data_skips_database() {
        let store = MockStore::default();
        let p = pipeline(
            Vec::new(),
            Some(store.clone()),
            MockStorage::default(),
            TomlConfig::default(),
        );

        let summary = p.load(TransformResult::default()).await.unwrap();

        assert!(summary.database_skipped);
        assert_eq!(summary.records_loaded, 0);
        assert_eq!(*store.schema_calls.lock().await, 0);
    }

    #[tokio::test]
    async fn test_export_without_database() {
        let storage = MockStorage::default();
        let mut config = TomlConfig::default();
        config.load.export = Some(ExportConfig::default());
        config.transform.missing_values = MissingValueStrategy::Interpolate;

        let p = pipeline(
            vec![
                observation("2010", Some(10.0)),
                observation("2011", None),
                observation("2012", Some(30.0)),
            ],
            None,
            storage.clone(),
            config,
        );

        let raw = p.extract().await.unwrap();
        let transformed = p.transform(raw).await.unwrap();
        assert_eq!(transformed.interpolated, 1);

        let summary = p.load(transformed).await.unwrap();
        assert!(summary.database_skipped);
        assert_eq!(
            summary.export_path.as_deref(),
            Some("mock://kenya_external_debt.zip")
        );

        let files = storage.files.lock().await;
        let bundle = files.get("kenya_external_debt.zip").unwrap().clone();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(bundle)).unwrap();
        assert_eq!(archive.len(), 2);
    }

    #[tokio::test]
    async fn test_store_failure_propagates() {
        let store = MockStore {
            fail_upsert: true,
            ..MockStore::default()
        };
        let p = pipeline(
            vec![observation("2010", Some(1.0))],
            Some(store),
            MockStorage::default(),
            TomlConfig::default(),
        );

        let raw = p.extract().await.unwrap();
        let transformed = p.transform(raw).await.unwrap();
        assert!(p.load(transformed).await.is_err());
    }
}
