use crate::domain::model::MAX_COUNTRY_CHARS;
use crate::utils::error::{EtlError, Result};
use crate::utils::validation::{self, Validate};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const DEFAULT_TABLE: &str = "kenya_external_debt";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TomlConfig {
    pub pipeline: PipelineConfig,
    pub source: SourceConfig,
    pub transform: TransformConfig,
    pub database: Option<DatabaseConfig>,
    pub load: LoadConfig,
    pub monitoring: Option<MonitoringConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub name: String,
    pub description: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            name: "kenya-external-debt".to_string(),
            description: "Kenya external debt stocks (World Bank DT.DOD.DECT.CD)".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub base_url: String,
    pub country_code: String,
    pub indicator: String,
    pub start_year: i32,
    pub end_year: i32,
    pub per_page: u32,
    pub max_pages: u32,
    pub timeout_seconds: u64,
    pub retry_attempts: usize,
    pub retry_delay_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.worldbank.org/v2".to_string(),
            country_code: "KE".to_string(),
            indicator: "DT.DOD.DECT.CD".to_string(),
            start_year: 2010,
            end_year: 2024,
            per_page: 1000,
            max_pages: 50,
            timeout_seconds: 30,
            retry_attempts: 3,
            retry_delay_ms: 500,
        }
    }
}

impl SourceConfig {
    pub fn indicator_url(&self) -> String {
        format!(
            "{}/country/{}/indicator/{}",
            self.base_url.trim_end_matches('/'),
            self.country_code,
            self.indicator
        )
    }

    pub fn date_range(&self) -> String {
        format!("{}:{}", self.start_year, self.end_year)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MissingValueStrategy {
    /// 寫入 NULL
    #[default]
    Keep,
    Drop,
    Interpolate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransformConfig {
    pub country_name: String,
    /// 優先使用 API 回傳的國名，缺少時才用 country_name
    pub use_source_country: bool,
    pub missing_values: MissingValueStrategy,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            country_name: "Kenya".to_string(),
            use_source_country: false,
            missing_values: MissingValueStrategy::Keep,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub host: String,
    pub port: u16,
    pub name: String,
    pub user: String,
    pub password: Option<String>,
    pub ssl_mode: String,
    pub table: String,
    pub max_connections: u32,
    pub connect_timeout_seconds: u64,
    pub batch_size: usize,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            name: String::new(),
            user: String::new(),
            password: None,
            ssl_mode: "prefer".to_string(),
            table: DEFAULT_TABLE.to_string(),
            max_connections: 5,
            connect_timeout_seconds: 30,
            batch_size: 500,
        }
    }
}

impl DatabaseConfig {
    /// 從 DB_HOST / DB_PORT / DB_NAME / DB_USER / DB_PASSWORD / SSL_MODE 讀取
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| EtlError::MissingConfigError {
                    field: key.to_string(),
                })
        };

        let defaults = Self::default();
        let port = match lookup("DB_PORT").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| EtlError::InvalidConfigValueError {
                    field: "DB_PORT".to_string(),
                    value: raw.clone(),
                    reason: "Port must be a number between 1 and 65535".to_string(),
                })?,
            None => defaults.port,
        };

        Ok(Self {
            host: required("DB_HOST")?,
            port,
            name: required("DB_NAME")?,
            user: required("DB_USER")?,
            password: lookup("DB_PASSWORD"),
            ssl_mode: lookup("SSL_MODE")
                .filter(|v| !v.trim().is_empty())
                .unwrap_or(defaults.ssl_mode),
            ..defaults
        })
    }
}

impl Validate for DatabaseConfig {
    fn validate(&self) -> Result<()> {
        let resolved = [
            Some(&self.host),
            Some(&self.name),
            Some(&self.user),
            self.password.as_ref(),
            Some(&self.ssl_mode),
            Some(&self.table),
        ];
        for value in resolved.into_iter().flatten() {
            validation::reject_unresolved_placeholder(value)?;
        }

        validation::validate_non_empty_string("database.host", &self.host)?;
        validation::validate_non_empty_string("database.name", &self.name)?;
        validation::validate_non_empty_string("database.user", &self.user)?;
        validation::validate_sql_identifier("database.table", &self.table)?;
        validation::validate_positive_number("database.batch_size", self.batch_size, 1)?;
        validation::validate_range("database.max_connections", self.max_connections, 1, 100)?;

        let valid_modes = ["disable", "allow", "prefer", "require", "verify-ca", "verify-full"];
        if !valid_modes.contains(&self.ssl_mode.as_str()) {
            return Err(EtlError::InvalidConfigValueError {
                field: "database.ssl_mode".to_string(),
                value: self.ssl_mode.clone(),
                reason: format!("Valid modes: {}", valid_modes.join(", ")),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadConfig {
    pub output_path: String,
    pub export: Option<ExportConfig>,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            output_path: "./output".to_string(),
            export: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    pub enabled: bool,
    pub filename: String,
    pub formats: Vec<String>,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            filename: "kenya_external_debt.zip".to_string(),
            formats: vec!["csv".to_string(), "json".to_string()],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitoringConfig {
    pub enabled: bool,
}

impl TomlConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(EtlError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Self::from_toml_str_with(content, |key| std::env::var(key).ok())
    }

    /// 同 `from_toml_str`，`${VAR}` 的值改由 `lookup` 提供
    pub fn from_toml_str_with<F>(content: &str, lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let processed_content = Self::substitute_env_vars(content, lookup);

        toml::from_str(&processed_content).map_err(|e| EtlError::ConfigValidationError {
            field: "toml_parsing".to_string(),
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 替換環境變數 (例如 ${DB_PASSWORD})，未設定的保持原樣，交給驗證階段回報
    fn substitute_env_vars<F>(content: &str, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        validation::env_placeholder_regex()
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                lookup(var_name).unwrap_or_else(|| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    /// `[database]` 優先，否則回退到環境變數
    pub fn resolve_database(&self) -> Result<DatabaseConfig> {
        let database = match &self.database {
            Some(db) => db.clone(),
            None => DatabaseConfig::from_env()?,
        };
        database.validate()?;
        Ok(database)
    }

    pub fn output_path(&self) -> &str {
        &self.load.output_path
    }

    pub fn export_config(&self) -> Option<&ExportConfig> {
        self.load.export.as_ref().filter(|e| e.enabled)
    }

    pub fn monitoring_enabled(&self) -> bool {
        self.monitoring.as_ref().map(|m| m.enabled).unwrap_or(false)
    }
}

impl Validate for TomlConfig {
    fn validate(&self) -> Result<()> {
        let source = &self.source;
        validation::validate_url("source.base_url", &source.base_url)?;
        validation::validate_country_code("source.country_code", &source.country_code)?;
        validation::validate_non_empty_string("source.indicator", &source.indicator)?;
        validation::validate_range("source.start_year", source.start_year, 1960, 2100)?;
        validation::validate_range("source.end_year", source.end_year, 1960, 2100)?;
        if source.start_year > source.end_year {
            return Err(EtlError::ConfigValidationError {
                field: "source.start_year".to_string(),
                message: format!(
                    "start_year {} is after end_year {}",
                    source.start_year, source.end_year
                ),
            });
        }
        validation::validate_range("source.per_page", source.per_page, 1, 32_500)?;
        validation::validate_positive_number("source.max_pages", source.max_pages as usize, 1)?;
        validation::validate_range("source.retry_attempts", source.retry_attempts, 0, 10)?;

        let country_name = &self.transform.country_name;
        validation::validate_non_empty_string("transform.country_name", country_name)?;
        if country_name.chars().count() > MAX_COUNTRY_CHARS {
            return Err(EtlError::InvalidConfigValueError {
                field: "transform.country_name".to_string(),
                value: country_name.clone(),
                reason: format!("Country column holds at most {} characters", MAX_COUNTRY_CHARS),
            });
        }

        if let Some(database) = &self.database {
            database.validate()?;
        }

        validation::validate_path("load.output_path", &self.load.output_path)?;
        if let Some(export) = self.export_config() {
            validation::validate_path("load.export.filename", &export.filename)?;
            if export.formats.is_empty() {
                return Err(EtlError::ConfigValidationError {
                    field: "load.export.formats".to_string(),
                    message: "At least one export format is required".to_string(),
                });
            }
            let valid_formats = ["csv", "json"];
            for format in &export.formats {
                if !valid_formats.contains(&format.as_str()) {
                    return Err(EtlError::InvalidConfigValueError {
                        field: "load.export.formats".to_string(),
                        value: format.clone(),
                        reason: format!(
                            "Unsupported format. Valid formats: {}",
                            valid_formats.join(", ")
                        ),
                    });
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = TomlConfig::from_toml_str("").unwrap();

        assert_eq!(
            config.source.indicator_url(),
            "https://api.worldbank.org/v2/country/KE/indicator/DT.DOD.DECT.CD"
        );
        assert_eq!(config.source.date_range(), "2010:2024");
        assert_eq!(config.source.per_page, 1000);
        assert_eq!(config.transform.country_name, "Kenya");
        assert_eq!(config.transform.missing_values, MissingValueStrategy::Keep);
        assert!(config.database.is_none());
        assert!(config.export_config().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml_content = r#"
[pipeline]
name = "debt-test"

[source]
base_url = "http://localhost:9000/v2/"
start_year = 2015
end_year = 2020
retry_attempts = 1

[transform]
missing_values = "interpolate"

[database]
host = "db.example.com"
port = 25060
name = "defaultdb"
user = "avnadmin"
password = "secret"
ssl_mode = "require"
batch_size = 100

[load]
output_path = "./exports"

[load.export]
formats = ["csv"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();

        assert_eq!(config.pipeline.name, "debt-test");
        assert_eq!(
            config.source.indicator_url(),
            "http://localhost:9000/v2/country/KE/indicator/DT.DOD.DECT.CD"
        );
        assert_eq!(config.transform.missing_values, MissingValueStrategy::Interpolate);

        let db = config.database.as_ref().unwrap();
        assert_eq!(db.port, 25060);
        assert_eq!(db.table, DEFAULT_TABLE);
        assert_eq!(db.batch_size, 100);

        let export = config.export_config().unwrap();
        assert_eq!(export.filename, "kenya_external_debt.zip");
        assert_eq!(export.formats, vec!["csv"]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("KENYA_ETL_TEST_DB_PASSWORD", "from-env");

        let toml_content = r#"
[database]
host = "localhost"
name = "debt"
user = "etl"
password = "${KENYA_ETL_TEST_DB_PASSWORD}"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(
            config.database.unwrap().password.as_deref(),
            Some("from-env")
        );

        std::env::remove_var("KENYA_ETL_TEST_DB_PASSWORD");
    }

    #[test]
    fn test_example_config_without_db_env_reports_missing_variable() {
        let content = include_str!("../../etl-config.example.toml");
        let config = TomlConfig::from_toml_str_with(content, |_| None).unwrap();

        let db = config.database.as_ref().unwrap();
        assert_eq!(db.host, "${DB_HOST}");

        match config.validate() {
            Err(EtlError::MissingConfigError { field }) => assert_eq!(field, "DB_HOST"),
            other => panic!("expected missing DB_HOST, got {:?}", other),
        }
        assert!(matches!(
            config.resolve_database(),
            Err(EtlError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_unresolved_password_is_rejected() {
        let content = include_str!("../../etl-config.example.toml");
        let config = TomlConfig::from_toml_str_with(content, |key| match key {
            "DB_HOST" => Some("pg.example.com".to_string()),
            "DB_NAME" => Some("defaultdb".to_string()),
            "DB_USER" => Some("avnadmin".to_string()),
            _ => None,
        })
        .unwrap();

        match config.resolve_database() {
            Err(EtlError::MissingConfigError { field }) => assert_eq!(field, "DB_PASSWORD"),
            other => panic!("expected missing DB_PASSWORD, got {:?}", other),
        }
    }

    #[test]
    fn test_example_config_with_db_env_is_valid() {
        let content = include_str!("../../etl-config.example.toml");
        let config = TomlConfig::from_toml_str_with(content, |key| {
            key.strip_prefix("DB_").map(|rest| rest.to_lowercase())
        })
        .unwrap();

        assert!(config.validate().is_ok());
        let db = config.resolve_database().unwrap();
        assert_eq!(db.host, "host");
        assert_eq!(db.password.as_deref(), Some("password"));
        assert_eq!(db.ssl_mode, "require");
    }

    #[test]
    fn test_year_range_validation() {
        let toml_content = r#"
[source]
start_year = 2024
end_year = 2010
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unsafe_table_name() {
        let toml_content = r#"
[database]
host = "localhost"
name = "debt"
user = "etl"
table = "debt; DROP TABLE users"
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_unknown_export_format() {
        let toml_content = r#"
[load.export]
formats = ["csv", "parquet"]
"#;

        let config = TomlConfig::from_toml_str(toml_content).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_database_from_env_lookup() {
        let env: HashMap<&str, &str> = [
            ("DB_HOST", "pg.aivencloud.com"),
            ("DB_PORT", "12691"),
            ("DB_NAME", "defaultdb"),
            ("DB_USER", "avnadmin"),
            ("DB_PASSWORD", "pw"),
            ("SSL_MODE", "require"),
        ]
        .into_iter()
        .collect();

        let db = DatabaseConfig::from_lookup(|k| env.get(k).map(|v| v.to_string())).unwrap();

        assert_eq!(db.host, "pg.aivencloud.com");
        assert_eq!(db.port, 12691);
        assert_eq!(db.ssl_mode, "require");
        assert_eq!(db.password.as_deref(), Some("pw"));
        assert_eq!(db.table, DEFAULT_TABLE);
    }

    #[test]
    fn test_database_from_dotenv_file() {
        let mut env_file = NamedTempFile::new().unwrap();
        env_file
            .write_all(
                b"# Aiven credentials\nDB_HOST=pg.aivencloud.com\nDB_PORT=12691\nDB_NAME=defaultdb\nDB_USER=avnadmin\nDB_PASSWORD=\"s3cr3t pw\"\nSSL_MODE=require\n",
            )
            .unwrap();

        let env: HashMap<String, String> = dotenvy::from_path_iter(env_file.path())
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        let lookup = |key: &str| env.get(key).cloned();

        let db = DatabaseConfig::from_lookup(lookup).unwrap();
        assert_eq!(db.host, "pg.aivencloud.com");
        assert_eq!(db.port, 12691);
        assert_eq!(db.password.as_deref(), Some("s3cr3t pw"));

        let content = include_str!("../../etl-config.example.toml");
        let config = TomlConfig::from_toml_str_with(content, lookup).unwrap();
        assert!(config.validate().is_ok());
        assert_eq!(config.resolve_database().unwrap().user, "avnadmin");
    }

    #[test]
    fn test_database_from_env_missing_host() {
        let result = DatabaseConfig::from_lookup(|k| match k {
            "DB_NAME" => Some("debt".to_string()),
            "DB_USER" => Some("etl".to_string()),
            _ => None,
        });

        match result {
            Err(EtlError::MissingConfigError { field }) => assert_eq!(field, "DB_HOST"),
            other => panic!("expected missing DB_HOST, got {:?}", other),
        }
    }

    #[test]
    fn test_database_from_env_bad_port() {
        let result = DatabaseConfig::from_lookup(|k| match k {
            "DB_HOST" => Some("localhost".to_string()),
            "DB_NAME" => Some("debt".to_string()),
            "DB_USER" => Some("etl".to_string()),
            "DB_PORT" => Some("not-a-port".to_string()),
            _ => None,
        });

        assert!(matches!(
            result,
            Err(EtlError::InvalidConfigValueError { .. })
        ));
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file
            .write_all(b"[pipeline]\nname = \"file-test\"\n")
            .unwrap();

        let config = TomlConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.pipeline.name, "file-test");
        assert_eq!(config.source.country_code, "KE");
    }
}
