use crate::utils::error::{EtlError, Result};
use regex::Regex;
use std::sync::OnceLock;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: impl ToString, reason: impl Into<String>) -> EtlError {
    EtlError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(invalid(
                field_name,
                url_str,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(invalid(
            field_name,
            url_str,
            format!("Invalid URL format: {}", e),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be at least {}", min_value),
        ));
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            value,
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

/// 表名會直接拼進 SQL，只接受單純的識別字
pub fn validate_sql_identifier(field_name: &str, value: &str) -> Result<()> {
    static IDENT: OnceLock<Regex> = OnceLock::new();
    let re = IDENT.get_or_init(|| {
        Regex::new(r"^[A-Za-z_][A-Za-z0-9_]{0,62}$").expect("identifier pattern is valid")
    });

    if !re.is_match(value) {
        return Err(invalid(
            field_name,
            value,
            "Must start with a letter or underscore, contain only letters, digits and underscores, and be at most 63 characters",
        ));
    }
    Ok(())
}

/// `${VAR}` 佔位符
pub fn env_placeholder_regex() -> &'static Regex {
    static ENV_VAR: OnceLock<Regex> = OnceLock::new();
    ENV_VAR.get_or_init(|| Regex::new(r"\$\{([^}]+)\}").expect("placeholder pattern is valid"))
}

/// 環境變數沒設定時，替換後仍會留下 `${VAR}`
pub fn reject_unresolved_placeholder(value: &str) -> Result<()> {
    match env_placeholder_regex().captures(value) {
        Some(caps) => Err(EtlError::MissingConfigError {
            field: caps[1].to_string(),
        }),
        None => Ok(()),
    }
}

/// World Bank 接受 ISO2 / ISO3 國碼
pub fn validate_country_code(field_name: &str, value: &str) -> Result<()> {
    let valid_len = matches!(value.len(), 2 | 3);
    if !valid_len || !value.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(invalid(
            field_name,
            value,
            "Country code must be a 2 or 3 character ISO code",
        ));
    }
    Ok(())
}
