//! Custom error types for rustskgc.
//!
//! Only [`SkgcError::Config`] is fatal to a run. Everything else is caught at
//! the stage that produced it and degraded to an empty or sentinel value.

use thiserror::Error;

/// Main error type for rustskgc operations.
#[derive(Debug, Error)]
pub enum SkgcError {
    /// Missing credential or invalid run configuration
    #[error("Config error: {0}")]
    Config(String),

    /// Network/HTTP request error
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Chat-completion endpoint returned a non-success status
    #[error("API error: {code} - {message}")]
    Api {
        /// HTTP status code
        code: u16,
        /// Response body or reason
        message: String,
    },

    /// Unparseable model output or input data
    #[error("Parse error: {0}")]
    Parse(String),

    /// Prompt template file missing or malformed
    #[error("Template error: {0}")]
    Template(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// YAML deserialization error
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// CSV export error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

/// Result type alias using `SkgcError`
pub type Result<T> = std::result::Result<T, SkgcError>;

impl SkgcError {
    /// Whether this error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, SkgcError::Config(_))
    }
}
