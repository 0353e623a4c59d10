use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// `country VARCHAR(50)` 欄位長度
pub const MAX_COUNTRY_CHARS: usize = 50;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IdValue {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub value: String,
}

/// World Bank API 回傳的一筆觀測值
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    #[serde(default)]
    pub indicator: Option<IdValue>,
    #[serde(default)]
    pub country: Option<IdValue>,
    #[serde(default)]
    pub countryiso3code: Option<String>,
    pub date: String,
    #[serde(default)]
    pub value: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub obs_status: Option<String>,
    #[serde(default)]
    pub decimal: Option<i64>,
}

impl Observation {
    pub fn country_name(&self) -> Option<&str> {
        self.country
            .as_ref()
            .map(|c| c.value.as_str())
            .filter(|name| !name.is_empty())
    }
}

/// Paging metadata, the first element of every World Bank response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PageMeta {
    pub page: u32,
    pub pages: u32,
    pub per_page: u32,
    pub total: u32,
    pub last_updated: Option<NaiveDate>,
}

/// 清理後準備寫入資料庫的一列
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DebtRecord {
    pub country: String,
    pub year: i32,
    pub external_debt: Option<f64>,
    #[serde(default)]
    pub interpolated: bool,
}

#[derive(Debug, Clone, Default)]
pub struct TransformResult {
    pub records: Vec<DebtRecord>,
    pub dropped: usize,
    pub interpolated: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UpsertOutcome {
    pub inserted: usize,
    pub updated: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub records_loaded: usize,
    pub inserted: usize,
    pub updated: usize,
    pub export_path: Option<String>,
    pub database_skipped: bool,
}
