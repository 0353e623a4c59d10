use crate::config::toml_config::TomlConfig;
use std::fmt::Write;

/// 只根據配置描述將要執行的請求與寫入，不做任何網路或資料庫 I/O
pub fn dry_run_report(config: &TomlConfig, skip_database: bool) -> String {
    let source = &config.source;
    let mut report = String::new();

    let _ = writeln!(report, "🔍 Dry Run Analysis:");
    let _ = writeln!(report);
    let _ = writeln!(report, "📡 Data Source:");
    let _ = writeln!(report, "  GET {}", source.indicator_url());
    let _ = writeln!(
        report,
        "  ?format=json&date={}&per_page={}&page=1..{}",
        source.date_range(),
        source.per_page,
        source.max_pages
    );
    let _ = writeln!(
        report,
        "  Retries: {} (initial delay {}ms), timeout {}s",
        source.retry_attempts, source.retry_delay_ms, source.timeout_seconds
    );

    let _ = writeln!(report);
    let _ = writeln!(report, "💾 Load:");
    if skip_database {
        let _ = writeln!(report, "  Database load skipped");
    } else {
        match config.resolve_database() {
            Ok(db) => {
                let _ = writeln!(
                    report,
                    "  Upsert into {} on {}:{}/{} in batches of {}",
                    db.table, db.host, db.port, db.name, db.batch_size
                );
            }
            Err(e) => {
                let _ = writeln!(report, "  ⚠️ Database not configured: {}", e);
            }
        }
    }
    if let Some(export) = config.export_config() {
        let _ = writeln!(
            report,
            "  Export {} to {}/{}",
            export.formats.join(", "),
            config.output_path(),
            export.filename
        );
    }

    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::toml_config::DatabaseConfig;

    #[test]
    fn test_report_describes_request_and_upsert() {
        let mut config = TomlConfig::default();
        config.database = Some(DatabaseConfig {
            host: "pg.example.com".to_string(),
            name: "defaultdb".to_string(),
            user: "avnadmin".to_string(),
            ..DatabaseConfig::default()
        });

        let report = dry_run_report(&config, false);

        assert!(report.contains("GET https://api.worldbank.org/v2/country/KE/indicator/DT.DOD.DECT.CD"));
        assert!(report.contains("date=2010:2024&per_page=1000&page=1..50"));
        assert!(report.contains("Upsert into kenya_external_debt on pg.example.com:5432/defaultdb"));
    }

    #[test]
    fn test_report_with_skipped_database() {
        let report = dry_run_report(&TomlConfig::default(), true);
        assert!(report.contains("Database load skipped"));
        assert!(!report.contains("Upsert into"));
    }
}
