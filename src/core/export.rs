use crate::config::toml_config::ExportConfig;
use crate::domain::model::DebtRecord;
use crate::utils::error::{EtlError, Result};
use std::io::Write;
use zip::write::{FileOptions, ZipWriter};

pub const CSV_ENTRY: &str = "external_debt.csv";
pub const JSON_ENTRY: &str = "external_debt.json";

pub fn records_to_csv(records: &[DebtRecord]) -> Result<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    writer.write_record(["country", "year", "external_debt", "interpolated"])?;

    for record in records {
        let year = record.year.to_string();
        let debt = record
            .external_debt
            .map(|v| v.to_string())
            .unwrap_or_default();
        writer.write_record([
            record.country.as_str(),
            year.as_str(),
            debt.as_str(),
            if record.interpolated { "true" } else { "false" },
        ])?;
    }

    writer
        .into_inner()
        .map_err(|e| EtlError::IoError(e.into_error()))
}

/// 打包成 ZIP，方便匯入儀表板工具
pub fn build_bundle(records: &[DebtRecord], export: &ExportConfig) -> Result<Vec<u8>> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for format in &export.formats {
        match format.as_str() {
            "csv" => {
                zip.start_file::<_, ()>(CSV_ENTRY, FileOptions::default())?;
                zip.write_all(&records_to_csv(records)?)?;
            }
            "json" => {
                zip.start_file::<_, ()>(JSON_ENTRY, FileOptions::default())?;
                zip.write_all(serde_json::to_string_pretty(records)?.as_bytes())?;
            }
            other => {
                return Err(EtlError::ProcessingError {
                    message: format!("unsupported export format '{}'", other),
                })
            }
        }
    }

    let cursor = zip.finish()?;
    Ok(cursor.into_inner())
}
