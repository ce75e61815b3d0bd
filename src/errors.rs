//! Error types for session orchestration

use std::io;
use std::time::Duration;
use thiserror::Error;

/// Result type for runbox operations
pub type Result<T> = std::result::Result<T, RunboxError>;

/// Errors that can occur while orchestrating sandboxed sessions
#[derive(Error, Debug)]
pub enum RunboxError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Isolation runtime unavailable: {0}")]
    RuntimeUnavailable(String),

    #[error("Failed to spawn isolated process: {0}")]
    Spawn(String),

    #[error("Session already exists: {0}")]
    DuplicateSession(String),

    #[error("No such session: {0}")]
    NoSuchSession(String),

    #[error("Input already pending for session: {0}")]
    DuplicatePendingInput(String),

    #[error("No pending input for session: {0}")]
    NoSuchPendingInput(String),

    #[error("Session is not awaiting input: {0}")]
    NotAwaitingInput(String),

    #[error("Input not supplied within {}s", .0.as_secs())]
    InputTimeout(Duration),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = RunboxError::NoSuchSession("abc".to_string());
        assert_eq!(err.to_string(), "No such session: abc");
    }

    #[test]
    fn test_input_timeout_display() {
        let err = RunboxError::InputTimeout(Duration::from_secs(120));
        assert_eq!(err.to_string(), "Input not supplied within 120s");
    }

    #[test]
    fn test_error_from_io() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let err = RunboxError::from(io_err);
        assert!(err.to_string().contains("IO error"));
    }

    #[test]
    fn test_result_type() {
        fn returns_result() -> Result<i32> {
            Ok(42)
        }
        assert_eq!(returns_result().unwrap(), 42);
    }

    #[test]
    fn test_runtime_unavailable_carries_diagnostics() {
        let err = RunboxError::RuntimeUnavailable("docker build failed: exit 1".to_string());
        assert!(err.to_string().contains("docker build failed"));
    }
}
