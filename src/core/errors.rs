//! Custom error types for translation operations

use thiserror::Error;

use crate::core::models::TranslationMethod;

/// Translation-related errors
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Language code unknown to the backend that was asked to handle it
    #[error("Unsupported language code '{code}' for {backend} backend")]
    UnsupportedLanguage {
        /// Code as supplied
        code: String,
        /// Backend that rejected it
        backend: String,
    },

    /// Dictionary or dataset source absent at load time
    #[error("Missing resource: {path}")]
    MissingResource {
        /// Path that was not found
        path: String,
    },

    /// Full-dictionary context requested before priming
    #[error("Dictionary guidelines are not primed; prime them before requesting full-dictionary context")]
    NotPrimed,

    /// Transport, quota or timeout failure reported by a backend
    #[error("{backend} backend failure: {message}")]
    BackendFailure {
        /// Backend that failed
        backend: TranslationMethod,
        /// Failure description
        message: String,
    },

    /// Request rejected before dispatch
    #[error("Invalid request: {message}")]
    InvalidRequest {
        /// Why the request was rejected
        message: String,
    },

    /// Configuration error
    #[error("Configuration error: {message}")]
    ConfigError {
        /// What is wrong
        message: String,
    },

    /// Invalid file format
    #[error("Invalid file format: {format}")]
    InvalidFormat {
        /// Format problem
        format: String,
    },

    /// Failure inside the service itself, such as a crashed worker task
    #[error("Internal error: {0}")]
    InternalError(String),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Reqwest error
    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl TranslationError {
    /// Shorthand for a backend failure
    pub fn backend(backend: TranslationMethod, message: impl Into<String>) -> Self {
        TranslationError::BackendFailure {
            backend,
            message: message.into(),
        }
    }

    /// Stable machine-readable code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            TranslationError::UnsupportedLanguage { .. } => "unsupported_language",
            TranslationError::MissingResource { .. } => "missing_resource",
            TranslationError::NotPrimed => "not_primed",
            TranslationError::BackendFailure { .. } => "backend_failure",
            TranslationError::InvalidRequest { .. } => "invalid_request",
            TranslationError::ConfigError { .. } => "config_error",
            TranslationError::InvalidFormat { .. } => "invalid_format",
            TranslationError::InternalError(_)
            | TranslationError::IoError(_)
            | TranslationError::HttpError(_)
            | TranslationError::JsonError(_)
            | TranslationError::CsvError(_) => "internal_error",
        }
    }
}

/// Result type for translation operations
pub type Result<T> = std::result::Result<T, TranslationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_keep_kind() {
        let err = TranslationError::UnsupportedLanguage {
            code: "desia".to_string(),
            backend: "neural".to_string(),
        };
        assert_eq!(err.code(), "unsupported_language");
        assert!(err.to_string().contains("desia"));

        let err = TranslationError::backend(TranslationMethod::Llm, "quota exhausted");
        assert_eq!(err.code(), "backend_failure");
        assert_eq!(err.to_string(), "llm backend failure: quota exhausted");
    }
}
