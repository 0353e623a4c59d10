pub mod cli;
pub mod dry_run;
pub mod toml_config;

use std::path::PathBuf;

/// 載入目前目錄（或上層）的 `.env`，讓 DB_* 與 `${VAR}` 都能取得其中的值。
/// 已存在的環境變數不會被覆蓋。
pub fn load_env_file() -> Option<PathBuf> {
    dotenvy::dotenv().ok()
}

#[cfg(feature = "cli")]
use clap::{Parser, ValueEnum};

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Compact,
    Json,
}

#[cfg(feature = "cli")]
#[derive(Debug, Clone, Parser)]
#[command(name = "kenya-debt-etl")]
#[command(about = "Load Kenya's external debt statistics from the World Bank API into PostgreSQL")]
pub struct CliConfig {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    #[arg(long, value_enum, default_value = "compact")]
    pub log_format: LogFormat,

    /// Log CPU / memory usage after each phase
    #[arg(long)]
    pub monitor: bool,

    /// Override source.start_year
    #[arg(long)]
    pub start_year: Option<i32>,

    /// Override source.end_year
    #[arg(long)]
    pub end_year: Option<i32>,

    /// Extract and transform only; write the export bundle if configured
    #[arg(long)]
    pub skip_database: bool,

    /// Show what would be processed without executing
    #[arg(long)]
    pub dry_run: bool,
}

#[cfg(feature = "cli")]
impl CliConfig {
    /// 命令列參數覆蓋 TOML 設定
    pub fn apply_overrides(&self, config: &mut toml_config::TomlConfig) {
        if let Some(start) = self.start_year {
            config.source.start_year = start;
            tracing::info!("🔧 start_year overridden to: {}", start);
        }
        if let Some(end) = self.end_year {
            config.source.end_year = end;
            tracing::info!("🔧 end_year overridden to: {}", end);
        }
        if self.monitor {
            config.monitoring = Some(toml_config::MonitoringConfig { enabled: true });
        }
        if self.skip_database && config.database.take().is_some() {
            tracing::info!("🔧 [database] section ignored (--skip-database)");
        }
    }
}
