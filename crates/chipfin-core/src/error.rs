use chrono::NaiveDate;
use thiserror::Error;

use crate::model::Metric;

#[derive(Debug, Error)]
pub enum ChipFinError {
    #[error("Invalid input: {field}: {reason}")]
    InvalidInput { field: String, reason: String },

    #[error("Duplicate fact for {company} {period} {metric}")]
    DuplicateFact {
        company: String,
        period: NaiveDate,
        metric: Metric,
    },

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Date error: {0}")]
    DateError(String),

    #[error("Source '{source_name}' failed: {reason}")]
    Source { source_name: String, reason: String },

    #[error("Artifact '{path}': {reason}")]
    Artifact { path: String, reason: String },

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("I/O error: {0}")]
    Io(String),
}

impl From<serde_json::Error> for ChipFinError {
    fn from(e: serde_json::Error) -> Self {
        ChipFinError::SerializationError(e.to_string())
    }
}

impl From<std::io::Error> for ChipFinError {
    fn from(e: std::io::Error) -> Self {
        ChipFinError::Io(e.to_string())
    }
}

#[cfg(feature = "artifact")]
impl From<csv::Error> for ChipFinError {
    fn from(e: csv::Error) -> Self {
        ChipFinError::SerializationError(e.to_string())
    }
}
