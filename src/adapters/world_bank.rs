use crate::config::toml_config::SourceConfig;
use crate::domain::model::{Observation, PageMeta};
use crate::domain::ports::DebtSource;
use crate::utils::error::{EtlError, Result};
use async_trait::async_trait;
use backon::{ExponentialBuilder, Retryable};
use chrono::NaiveDate;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;

const MAX_RETRY_DELAY: Duration = Duration::from_secs(30);

/// World Bank Indicators API (v2) 客戶端
pub struct WorldBankClient {
    client: Client,
    source: SourceConfig,
}

impl WorldBankClient {
    pub fn new(source: SourceConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(source.timeout_seconds))
            .user_agent(concat!("kenya-debt-etl/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client, source })
    }

    fn backoff(&self) -> ExponentialBuilder {
        ExponentialBuilder::default()
            .with_min_delay(Duration::from_millis(self.source.retry_delay_ms))
            .with_max_delay(MAX_RETRY_DELAY)
            .with_max_times(self.source.retry_attempts)
            .with_jitter()
    }

    async fn fetch_page(&self, page: u32) -> Result<(PageMeta, Vec<Observation>)> {
        let url = self.source.indicator_url();
        tracing::debug!("Requesting {} (page {})", url, page);

        let response = self
            .client
            .get(&url)
            .query(&[
                ("format", "json".to_string()),
                ("date", self.source.date_range()),
                ("per_page", self.source.per_page.to_string()),
                ("page", page.to_string()),
            ])
            .send()
            .await?;

        let status = response.status();
        tracing::debug!("API response status: {}", status);

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.trim().parse().ok());
            return Err(EtlError::RateLimitError { retry_after });
        }
        if !status.is_success() {
            return Err(EtlError::HttpStatusError {
                status: status.as_u16(),
                url,
            });
        }

        let body: Value = response.json().await?;
        parse_envelope(body)
    }

    async fn fetch_page_with_retry(&self, page: u32) -> Result<(PageMeta, Vec<Observation>)> {
        (|| self.fetch_page(page))
            .retry(self.backoff())
            .when(EtlError::is_retryable)
            .notify(|err: &EtlError, delay: Duration| {
                tracing::warn!("⏳ Page {} failed ({}), retrying in {:?}", page, err, delay);
            })
            .await
    }
}

#[async_trait]
impl DebtSource for WorldBankClient {
    async fn fetch_observations(&self) -> Result<Vec<Observation>> {
        tracing::info!(
            "🌍 Fetching {} for {} ({}) from World Bank API",
            self.source.indicator,
            self.source.country_code,
            self.source.date_range()
        );

        let mut observations = Vec::new();
        let mut page = 1;

        loop {
            let (meta, rows) = self.fetch_page_with_retry(page).await?;
            if page == 1 {
                if let Some(updated) = meta.last_updated {
                    let age = chrono::Utc::now().date_naive() - updated;
                    tracing::info!(
                        "📅 Source last updated: {} ({} days ago)",
                        updated,
                        age.num_days()
                    );
                }
            }
            tracing::debug!(
                "Page {}/{}: {} rows (total {})",
                meta.page,
                meta.pages,
                rows.len(),
                meta.total
            );
            observations.extend(rows);

            if page >= meta.pages.max(1) {
                break;
            }
            if page >= self.source.max_pages {
                tracing::warn!(
                    "⚠️ Stopping after {} pages (max_pages); the API reports {}",
                    page,
                    meta.pages
                );
                break;
            }
            page += 1;
        }

        Ok(observations)
    }
}

/// 解析 `[meta, data]` 格式的回應
pub fn parse_envelope(body: Value) -> Result<(PageMeta, Vec<Observation>)> {
    let mut parts = match body {
        Value::Array(parts) => parts,
        _ => return Err(unexpected_shape("top level is not an array")),
    };

    if let Some(message) = parts.first().and_then(api_message) {
        return Err(EtlError::ApiResponseError { message });
    }
    if parts.len() < 2 {
        return Err(unexpected_shape("expected [metadata, data]"));
    }

    let data = parts.swap_remove(1);
    let meta = page_meta(&parts[0]);

    let observations = match data {
        Value::Null => Vec::new(),
        Value::Array(_) => serde_json::from_value(data)?,
        _ => return Err(unexpected_shape("data element is not an array")),
    };

    Ok((meta, observations))
}

fn unexpected_shape(detail: &str) -> EtlError {
    EtlError::ApiResponseError {
        message: format!("unexpected response shape: {}", detail),
    }
}

fn api_message(meta: &Value) -> Option<String> {
    let messages = meta.get("message")?.as_array()?;
    let text = messages
        .iter()
        .map(|m| {
            let key = m.get("key").and_then(Value::as_str).unwrap_or("error");
            let value = m.get("value").and_then(Value::as_str).unwrap_or("");
            format!("{}: {}", key, value)
        })
        .collect::<Vec<_>>()
        .join("; ");
    Some(text)
}

fn page_meta(meta: &Value) -> PageMeta {
    // API 有時把數字編成字串
    let number = |key: &str| match meta.get(key) {
        Some(Value::Number(n)) => n.as_u64().unwrap_or(0) as u32,
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    };

    PageMeta {
        page: number("page"),
        pages: number("pages"),
        per_page: number("per_page"),
        total: number("total"),
        last_updated: meta
            .get("lastupdated")
            .and_then(Value::as_str)
            .and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok()),
    }
}
