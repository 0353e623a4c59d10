use crate::config::toml_config::{MissingValueStrategy, SourceConfig, TransformConfig};
use crate::domain::model::{DebtRecord, Observation, TransformResult, MAX_COUNTRY_CHARS};
use std::collections::HashSet;

/// 把 API 觀測值整理成依年份排序、年份唯一的資料列
pub fn clean_observations(
    observations: Vec<Observation>,
    source: &SourceConfig,
    transform: &TransformConfig,
) -> TransformResult {
    let mut dropped = 0;
    let mut seen_years = HashSet::new();
    let mut records = Vec::with_capacity(observations.len());

    for observation in observations {
        let year = match observation.date.trim().parse::<i32>() {
            Ok(year) => year,
            Err(_) => {
                tracing::warn!("Skipping observation with unparsable date '{}'", observation.date);
                dropped += 1;
                continue;
            }
        };

        if year < source.start_year || year > source.end_year {
            tracing::debug!("Skipping {} outside {}", year, source.date_range());
            dropped += 1;
            continue;
        }

        if !seen_years.insert(year) {
            tracing::warn!("Duplicate observation for {}, keeping the first one", year);
            dropped += 1;
            continue;
        }

        let country = match observation.country_name() {
            Some(name) if transform.use_source_country => {
                if name.chars().count() <= MAX_COUNTRY_CHARS {
                    name.to_string()
                } else {
                    tracing::warn!(
                        "Country name '{}' exceeds {} characters, using '{}'",
                        name,
                        MAX_COUNTRY_CHARS,
                        transform.country_name
                    );
                    transform.country_name.clone()
                }
            }
            _ => transform.country_name.clone(),
        };

        records.push(DebtRecord {
            country,
            year,
            external_debt: observation.value.filter(|v| v.is_finite()),
            interpolated: false,
        });
    }

    records.sort_by_key(|r| r.year);

    let mut interpolated = 0;
    match transform.missing_values {
        MissingValueStrategy::Keep => {}
        MissingValueStrategy::Drop => {
            let before = records.len();
            records.retain(|r| r.external_debt.is_some());
            dropped += before - records.len();
        }
        MissingValueStrategy::Interpolate => {
            interpolated = interpolate_missing(&mut records);
        }
    }

    let missing = records.iter().filter(|r| r.external_debt.is_none()).count();
    if missing > 0 {
        tracing::warn!("⚠️ {} years have no external debt value and will be stored as NULL", missing);
    }

    TransformResult {
        records,
        dropped,
        interpolated,
    }
}

/// Linear interpolation by year between the nearest known neighbours.
/// Leading and trailing gaps stay empty. `records` must be sorted by year.
pub fn interpolate_missing(records: &mut [DebtRecord]) -> usize {
    let known: Vec<(usize, i32, f64)> = records
        .iter()
        .enumerate()
        .filter_map(|(i, r)| r.external_debt.map(|v| (i, r.year, v)))
        .collect();

    let mut filled = 0;
    for pair in known.windows(2) {
        let (start, start_year, start_value) = pair[0];
        let (end, end_year, end_value) = pair[1];
        let span = f64::from(end_year - start_year);

        for record in &mut records[start + 1..end] {
            let offset = f64::from(record.year - start_year);
            record.external_debt = Some(start_value + (end_value - start_value) * offset / span);
            record.interpolated = true;
            filled += 1;
        }
    }
    filled
}
