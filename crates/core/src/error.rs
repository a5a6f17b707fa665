//! Error types for the meetq task-processing layer.

use thiserror::Error;

/// The main error type for the meetq library.
#[derive(Error, Debug)]
pub enum MeetqError {
    /// JSON serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Backing store operation error.
    #[error("Store error: {0}")]
    Store(String),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A dequeued payload that does not parse as any known task kind.
    #[error("Unknown task {id}: {detail}")]
    UnknownTask { id: String, detail: String },
}

/// Result type alias using MeetqError.
pub type Result<T> = std::result::Result<T, MeetqError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_store() {
        let err = MeetqError::Store("connection refused".to_string());
        assert_eq!(format!("{}", err), "Store error: connection refused");
    }

    #[test]
    fn test_error_display_config() {
        let err = MeetqError::Config("missing namespace".to_string());
        assert_eq!(format!("{}", err), "Configuration error: missing namespace");
    }

    #[test]
    fn test_error_display_unknown_task() {
        let err = MeetqError::UnknownTask {
            id: "t1".to_string(),
            detail: "unknown variant".to_string(),
        };
        assert_eq!(format!("{}", err), "Unknown task t1: unknown variant");
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err: serde_json::Error = serde_json::from_str::<i32>("not a number").unwrap_err();
        let err: MeetqError = json_err.into();
        assert!(matches!(err, MeetqError::Serialization(_)));
    }
}
