use thiserror::Error;

#[derive(Error, Debug)]
pub enum EtlError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),

    #[error("API returned HTTP {status} for {url}")]
    HttpStatusError { status: u16, url: String },

    #[error("API rate limit hit (retry after {retry_after:?}s)")]
    RateLimitError { retry_after: Option<u64> },

    #[error("API response error: {message}")]
    ApiResponseError { message: String },

    #[error("Database error: {0}")]
    DatabaseError(#[from] sqlx::Error),

    #[error("CSV processing error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Configuration error in '{field}': {message}")]
    ConfigValidationError { field: String, message: String },

    #[error("Invalid value '{value}' for '{field}': {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Data processing error: {message}")]
    ProcessingError { message: String },
}

pub type Result<T> = std::result::Result<T, EtlError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Network,
    Api,
    Database,
    Data,
    Configuration,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl ErrorSeverity {
    /// 根據錯誤嚴重程度決定退出碼
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

impl EtlError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            EtlError::ApiError(_) => ErrorCategory::Network,
            EtlError::HttpStatusError { .. }
            | EtlError::RateLimitError { .. }
            | EtlError::ApiResponseError { .. } => ErrorCategory::Api,
            EtlError::DatabaseError(_) => ErrorCategory::Database,
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. } => ErrorCategory::Data,
            EtlError::ConfigValidationError { .. }
            | EtlError::InvalidConfigValueError { .. }
            | EtlError::MissingConfigError { .. } => ErrorCategory::Configuration,
            EtlError::ZipError(_) | EtlError::IoError(_) => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self.category() {
            ErrorCategory::Network | ErrorCategory::Database => ErrorSeverity::Medium,
            ErrorCategory::Api => {
                if self.is_retryable() {
                    ErrorSeverity::Medium
                } else {
                    ErrorSeverity::High
                }
            }
            ErrorCategory::Data => ErrorSeverity::High,
            ErrorCategory::Configuration | ErrorCategory::System => ErrorSeverity::Critical,
        }
    }

    /// 暫時性錯誤（限流、5xx、逾時、連線失敗）才值得重試
    pub fn is_retryable(&self) -> bool {
        match self {
            EtlError::ApiError(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            EtlError::RateLimitError { .. } => true,
            EtlError::HttpStatusError { status, .. } => *status >= 500,
            _ => false,
        }
    }

    pub fn exit_code(&self) -> i32 {
        self.severity().exit_code()
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            EtlError::RateLimitError { .. } => {
                "The World Bank API is throttling requests; wait a few minutes or raise source.retry_delay_ms"
            }
            EtlError::HttpStatusError { .. } | EtlError::ApiError(_) => {
                "Check network connectivity and source.base_url, then run the pipeline again"
            }
            EtlError::ApiResponseError { .. } => {
                "Check source.country_code, source.indicator and the year range"
            }
            EtlError::DatabaseError(_) => {
                "Check the database host, credentials and ssl_mode (or the DB_* environment variables)"
            }
            EtlError::MissingConfigError { .. } => {
                "Add a [database] section to the config file or export DB_HOST, DB_NAME and DB_USER"
            }
            EtlError::ConfigValidationError { .. } | EtlError::InvalidConfigValueError { .. } => {
                "Fix the configuration value and run again; --dry-run shows the effective settings"
            }
            EtlError::CsvError(_)
            | EtlError::SerializationError(_)
            | EtlError::ProcessingError { .. } => {
                "Inspect the API response with --verbose; the data may have changed shape"
            }
            EtlError::ZipError(_) | EtlError::IoError(_) => {
                "Check that load.output_path exists and is writable"
            }
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Network => format!("Could not reach the data source: {}", self),
            ErrorCategory::Api => format!("The data source rejected the request: {}", self),
            ErrorCategory::Database => format!("Loading into PostgreSQL failed: {}", self),
            ErrorCategory::Data => format!("The debt data could not be processed: {}", self),
            ErrorCategory::Configuration => format!("Invalid configuration: {}", self),
            ErrorCategory::System => format!("A local file operation failed: {}", self),
        }
    }
}
