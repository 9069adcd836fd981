//! Error types for Ozette
//!
//! This module defines all error types used throughout the application,
//! using `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Main error type for Ozette operations
///
/// This enum encompasses all possible errors that can occur during
/// configuration loading, transport interactions, session submission,
/// and attachment handling.
#[derive(Error, Debug)]
pub enum OzetteError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Transport-related errors (connection refused/reset before streaming)
    #[error("Transport error: {0}")]
    Transport(String),

    /// Submit rejected because the pending input is empty or whitespace-only
    #[error("Nothing to send: message is empty")]
    EmptySubmit,

    /// Submit rejected because no model is selected
    #[error("No model selected")]
    NoModelSelected,

    /// Submit rejected because a session is already in flight
    #[error("A response is already streaming; wait for it to settle")]
    SessionBusy,

    /// Attachment staging/resolution errors
    #[error("Attachment error: {0}")]
    Attachment(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// YAML parsing errors
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// HTTP request errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Result type alias for Ozette operations
///
/// This is a convenience alias that uses `anyhow::Error` as the error type,
/// allowing for rich error context and easy error propagation.
pub type Result<T> = anyhow::Result<T>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_error_display() {
        let error = OzetteError::Config("invalid format".to_string());
        assert_eq!(error.to_string(), "Configuration error: invalid format");
    }

    #[test]
    fn test_transport_error_display() {
        let error = OzetteError::Transport("connection refused".to_string());
        assert_eq!(error.to_string(), "Transport error: connection refused");
    }

    #[test]
    fn test_empty_submit_display() {
        let error = OzetteError::EmptySubmit;
        assert_eq!(error.to_string(), "Nothing to send: message is empty");
    }

    #[test]
    fn test_no_model_selected_display() {
        let error = OzetteError::NoModelSelected;
        assert_eq!(error.to_string(), "No model selected");
    }

    #[test]
    fn test_session_busy_display() {
        let error = OzetteError::SessionBusy;
        assert!(error.to_string().contains("already streaming"));
    }

    #[test]
    fn test_attachment_error_display() {
        let error = OzetteError::Attachment("upload failed".to_string());
        assert_eq!(error.to_string(), "Attachment error: upload failed");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error: OzetteError = io_error.into();
        assert!(matches!(error, OzetteError::Io(_)));
    }

    #[test]
    fn test_json_error_conversion() {
        let json_str = "{invalid json}";
        let json_error = serde_json::from_str::<serde_json::Value>(json_str).unwrap_err();
        let error: OzetteError = json_error.into();
        assert!(matches!(error, OzetteError::Serialization(_)));
    }

    #[test]
    fn test_yaml_error_conversion() {
        let yaml_str = "invalid: : yaml";
        let yaml_error = serde_yaml::from_str::<serde_yaml::Value>(yaml_str).unwrap_err();
        let error: OzetteError = yaml_error.into();
        assert!(matches!(error, OzetteError::Yaml(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<OzetteError>();
    }
}
