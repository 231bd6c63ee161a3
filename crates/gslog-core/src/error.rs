//! Error types for gslog

use std::path::PathBuf;

use thiserror::Error;

/// Main error type for gslog operations
#[derive(Error, Debug)]
pub enum LogError {
    /// General I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The log directory could not be created
    #[error("Failed to create log directory {path}: {source}")]
    CreateDirectory {
        /// Directory that could not be created
        path: PathBuf,
        /// Underlying error
        source: std::io::Error,
    },

    /// No usable log file could be opened within the attempt budget
    #[error("Rotation exhausted after {attempts} attempts (last tried {last_path})")]
    RotationExhausted {
        /// Number of files tried
        attempts: u32,
        /// Last candidate path
        last_path: PathBuf,
    },

    /// The dispatch queue is closed; the service has been shut down
    #[error("Log service is shut down")]
    ServiceClosed,

    /// A sink was used after being closed
    #[error("Sink closed: {0}")]
    SinkClosed(String),

    /// A sink panicked while receiving a message
    #[error("Sink '{sink}' panicked: {reason}")]
    SinkPanicked {
        /// Name of the sink
        sink: String,
        /// Panic payload, when it was a string
        reason: String,
    },

    /// A step of archive creation or extraction failed
    #[error("Archive error at {path}: {reason}")]
    Archive {
        /// File being processed when the step failed
        path: PathBuf,
        /// What failed
        reason: String,
    },

    /// Refusing to overwrite an existing file
    #[error("File already exists: {0}")]
    AlreadyExists(PathBuf),

    /// Day token was not `YYYYMMDD`
    #[error("Invalid day '{0}', expected YYYYMMDD")]
    InvalidDay(String),

    /// Unknown level name in a level list
    #[error("Invalid level: {0}")]
    InvalidLevel(String),

    /// Configuration value could not be parsed
    #[error("Config error: {0}")]
    Config(String),
}

impl LogError {
    pub(crate) fn archive(path: impl Into<PathBuf>, reason: impl std::fmt::Display) -> Self {
        LogError::Archive {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type alias using LogError
pub type LogResult<T> = Result<T, LogError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LogError::InvalidDay("2024-01-01".to_string());
        assert_eq!(
            format!("{}", err),
            "Invalid day '2024-01-01', expected YYYYMMDD"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let log_err: LogError = io_err.into();
        assert!(matches!(log_err, LogError::Io(_)));
    }

    #[test]
    fn test_rotation_exhausted_names_path() {
        let err = LogError::RotationExhausted {
            attempts: 3,
            last_path: PathBuf::from("/tmp/app_main_20240101_2.log"),
        };
        assert!(err.to_string().contains("app_main_20240101_2.log"));
    }
}
