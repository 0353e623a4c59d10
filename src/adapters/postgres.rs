use crate::config::toml_config::DatabaseConfig;
use crate::domain::model::{DebtRecord, UpsertOutcome};
use crate::domain::ports::DebtStore;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgSslMode};
use std::time::Duration;

pub fn create_table_sql(table: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS {table} (
    country VARCHAR(50),
    year INT PRIMARY KEY,
    external_debt DOUBLE PRECISION,
    last_updated TIMESTAMP DEFAULT CURRENT_TIMESTAMP
)"
    )
}

pub fn create_index_sql(table: &str) -> String {
    format!("CREATE INDEX IF NOT EXISTS idx_{table}_year ON {table}(year)")
}

/// 以 UNNEST 一次寫入整批資料；`xmax = 0` 表示新插入的列
pub fn upsert_sql(table: &str) -> String {
    format!(
        "INSERT INTO {table} (country, year, external_debt)
SELECT * FROM UNNEST($1::varchar[], $2::int4[], $3::float8[])
ON CONFLICT (year) DO UPDATE SET
    external_debt = EXCLUDED.external_debt,
    last_updated = CURRENT_TIMESTAMP
RETURNING (xmax = 0) AS inserted"
    )
}

pub fn connect_options(config: &DatabaseConfig) -> Result<PgConnectOptions> {
    let ssl_mode: PgSslMode =
        config
            .ssl_mode
            .parse()
            .map_err(|_| EtlError::InvalidConfigValueError {
                field: "database.ssl_mode".to_string(),
                value: config.ssl_mode.clone(),
                reason: "Unknown PostgreSQL sslmode".to_string(),
            })?;

    let mut options = PgConnectOptions::new()
        .host(&config.host)
        .port(config.port)
        .database(&config.name)
        .username(&config.user)
        .ssl_mode(ssl_mode)
        .application_name("kenya-debt-etl");

    if let Some(password) = &config.password {
        options = options.password(password);
    }

    Ok(options)
}

pub struct PostgresStore {
    pool: PgPool,
    table: String,
    batch_size: usize,
}

impl PostgresStore {
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        tracing::info!(
            "🐘 Connecting to PostgreSQL at {}:{}/{} (sslmode={})",
            config.host,
            config.port,
            config.name,
            config.ssl_mode
        );

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .connect_with(connect_options(config)?)
            .await?;

        Ok(Self::from_pool(pool, &config.table, config.batch_size))
    }

    pub fn from_pool(pool: PgPool, table: &str, batch_size: usize) -> Self {
        Self {
            pool,
            table: table.to_string(),
            batch_size: batch_size.max(1),
        }
    }
}

#[async_trait]
impl DebtStore for PostgresStore {
    async fn ensure_schema(&self) -> Result<()> {
        let create_table = create_table_sql(&self.table);
        let create_index = create_index_sql(&self.table);

        let mut tx = self.pool.begin().await?;
        sqlx::query(&create_table).execute(&mut *tx).await?;
        sqlx::query(&create_index).execute(&mut *tx).await?;
        tx.commit().await?;

        tracing::info!("✅ Table {} is ready", self.table);
        Ok(())
    }

    async fn upsert(&self, records: &[DebtRecord]) -> Result<UpsertOutcome> {
        let mut outcome = UpsertOutcome::default();
        if records.is_empty() {
            return Ok(outcome);
        }

        let sql = upsert_sql(&self.table);
        let mut tx = self.pool.begin().await?;

        for chunk in records.chunks(self.batch_size) {
            let countries: Vec<String> = chunk.iter().map(|r| r.country.clone()).collect();
            let years: Vec<i32> = chunk.iter().map(|r| r.year).collect();
            let debts: Vec<Option<f64>> = chunk.iter().map(|r| r.external_debt).collect();

            let flags: Vec<bool> = sqlx::query_scalar(&sql)
                .bind(countries)
                .bind(years)
                .bind(debts)
                .fetch_all(&mut *tx)
                .await?;

            if flags.len() != chunk.len() {
                return Err(EtlError::ProcessingError {
                    message: format!(
                        "upsert returned {} rows for a batch of {}",
                        flags.len(),
                        chunk.len()
                    ),
                });
            }

            let inserted = flags.iter().filter(|inserted| **inserted).count();
            outcome.inserted += inserted;
            outcome.updated += flags.len() - inserted;
            tracing::debug!("Upserted batch of {} rows", chunk.len());
        }

        // 任何一批失敗都會整體回滾
        tx.commit().await?;
        Ok(outcome)
    }
}
