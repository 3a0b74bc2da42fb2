use thiserror::Error;

use crate::processors::quality_gate::QualityCheck;

pub type Result<T> = std::result::Result<T, ProcessingError>;

#[derive(Error, Debug)]
pub enum ProcessingError {
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Date parsing error: {0}")]
    DateParse(#[from] chrono::ParseError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Settings error: {0}")]
    Settings(#[from] config::ConfigError),

    #[error("Validation error: {0}")]
    Validation(#[from] validator::ValidationErrors),

    #[error("Weather provider error after {attempts} attempt(s): {message}")]
    Provider { attempts: u32, message: String },

    #[error("No data: {0}")]
    NoData(String),

    #[error("Silver {table} schema mismatch. Missing columns: {missing:?}")]
    SchemaMismatch { table: String, missing: Vec<String> },

    #[error("[QUALITY_GATE] {check} check failed: {message}{}", format_sample(.sample))]
    Quality {
        check: QualityCheck,
        message: String,
        sample: Vec<String>,
    },

    #[error("Object store {operation} failed for {bucket}/{key}: {message}")]
    Store {
        operation: &'static str,
        bucket: String,
        key: String,
        message: String,
    },

    #[error("Invalid data format: {0}")]
    InvalidFormat(String),

    #[cfg(feature = "postgres")]
    #[error("Database error: {0}")]
    Database(#[from] diesel::result::Error),

    #[cfg(feature = "postgres")]
    #[error("Database connection error: {0}")]
    DatabaseConnection(#[from] diesel::ConnectionError),
}

impl ProcessingError {
    pub(crate) fn store(
        operation: &'static str,
        bucket: &str,
        key: &str,
        message: impl ToString,
    ) -> Self {
        Self::Store {
            operation,
            bucket: bucket.to_string(),
            key: key.to_string(),
            message: message.to_string(),
        }
    }
}

fn format_sample(sample: &[String]) -> String {
    if sample.is_empty() {
        String::new()
    } else {
        format!(". Sample: [{}]", sample.join(", "))
    }
}
