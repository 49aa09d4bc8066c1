/*!
 * Error types for Starfinder
 */

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, StarfinderError>;

/// Exit code constants for structured process exit
pub const EXIT_SUCCESS: i32 = 0;
pub const EXIT_PARTIAL: i32 = 1;
pub const EXIT_FATAL: i32 = 2;

#[derive(Error, Debug)]
pub enum StarfinderError {
    /// Star name could not be resolved to coordinates
    #[error("EDSM system API error: {0}")]
    Resolution(String),

    /// Sphere query failed or returned malformed data
    #[error("EDSM sphere-systems API error: {0}")]
    Query(String),

    /// Cache entry could not be written (never fatal to a search)
    #[error("Cache write failed for {}: {message}", path.display())]
    CacheWrite { path: PathBuf, message: String },

    /// Transport-level HTTP failure (connect, timeout, body read)
    #[error("HTTP error: {0}")]
    Http(String),

    /// Every retry attempt failed at the transport level
    #[error("All {attempts} request attempts failed: {last_error}")]
    RetriesExhausted { attempts: u32, last_error: String },

    /// The overall search deadline elapsed between network steps
    #[error("Search deadline of {}s exceeded", .0.as_secs_f64())]
    DeadlineExceeded(std::time::Duration),

    /// A search is already running for this session
    #[error("A search is already in progress")]
    SearchInProgress,

    /// Radius outside the configured bounds
    #[error("Invalid radius {radius}: must be between {min} and {max} ly")]
    InvalidRadius { radius: f64, min: f64, max: f64 },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Operation or error log could not be written
    #[error("Operation log error: {0}")]
    OperationLog(String),

    /// Export of results failed
    #[error("Export error: {0}")]
    Export(String),

    /// Import of results failed
    #[error("Import error: {0}")]
    Import(String),
}

impl StarfinderError {
    /// Get the process exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            StarfinderError::Config(_) | StarfinderError::InvalidRadius { .. } => EXIT_FATAL,
            _ => EXIT_PARTIAL,
        }
    }

    /// Check if this error is transient (temporary, worth retrying)
    pub fn is_transient(&self) -> bool {
        match self {
            StarfinderError::Http(_) => true,
            StarfinderError::Io(io_err) => Self::is_io_transient(io_err),
            _ => false,
        }
    }

    fn is_io_transient(io_err: &io::Error) -> bool {
        use io::ErrorKind::*;
        matches!(
            io_err.kind(),
            ConnectionRefused
                | ConnectionReset
                | ConnectionAborted
                | NotConnected
                | BrokenPipe
                | TimedOut
                | Interrupted
                | WouldBlock
        )
    }

    /// Get error category for logging
    pub fn category(&self) -> ErrorCategory {
        match self {
            StarfinderError::Resolution(_) | StarfinderError::Query(_) => ErrorCategory::Upstream,
            StarfinderError::Http(_)
            | StarfinderError::RetriesExhausted { .. }
            | StarfinderError::DeadlineExceeded(_) => ErrorCategory::Network,
            StarfinderError::CacheWrite { .. } => ErrorCategory::Cache,
            StarfinderError::SearchInProgress => ErrorCategory::Concurrency,
            StarfinderError::InvalidRadius { .. } => ErrorCategory::Validation,
            StarfinderError::Config(_) => ErrorCategory::Configuration,
            StarfinderError::Io(_) => ErrorCategory::IoError,
            StarfinderError::Json(_) => ErrorCategory::Codec,
            StarfinderError::OperationLog(_) => ErrorCategory::Audit,
            StarfinderError::Export(_) | StarfinderError::Import(_) => ErrorCategory::Results,
        }
    }
}

/// Error category for classification and reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// EDSM returned an error or unexpected data
    Upstream,
    /// Network/transport errors
    Network,
    /// Cache store errors
    Cache,
    /// Overlapping searches
    Concurrency,
    /// Input validation errors
    Validation,
    /// Configuration errors
    Configuration,
    /// I/O operation errors
    IoError,
    /// Serialization errors
    Codec,
    /// Operation/error log errors
    Audit,
    /// Export/import errors
    Results,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Upstream => write!(f, "upstream"),
            ErrorCategory::Network => write!(f, "network"),
            ErrorCategory::Cache => write!(f, "cache"),
            ErrorCategory::Concurrency => write!(f, "concurrency"),
            ErrorCategory::Validation => write!(f, "validation"),
            ErrorCategory::Configuration => write!(f, "configuration"),
            ErrorCategory::IoError => write!(f, "io"),
            ErrorCategory::Codec => write!(f, "codec"),
            ErrorCategory::Audit => write!(f, "audit"),
            ErrorCategory::Results => write!(f, "results"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_display() {
        let err = StarfinderError::Resolution("Coordinates not available for system.".into());
        assert_eq!(
            err.to_string(),
            "EDSM system API error: Coordinates not available for system."
        );
    }

    #[test]
    fn test_query_display() {
        let err = StarfinderError::Query("unexpected result".into());
        assert_eq!(
            err.to_string(),
            "EDSM sphere-systems API error: unexpected result"
        );
    }

    #[test]
    fn test_transient_errors() {
        assert!(StarfinderError::Http("timeout".into()).is_transient());
        let io_err = io::Error::new(io::ErrorKind::ConnectionReset, "reset");
        assert!(StarfinderError::Io(io_err).is_transient());

        assert!(!StarfinderError::Resolution("nope".into()).is_transient());
        assert!(!StarfinderError::Io(io::Error::other("disk")).is_transient());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(StarfinderError::Config("bad".into()).exit_code(), EXIT_FATAL);
        assert_eq!(
            StarfinderError::InvalidRadius {
                radius: 2.0,
                min: 4.0,
                max: 40.0
            }
            .exit_code(),
            EXIT_FATAL
        );
        assert_eq!(StarfinderError::Query("x".into()).exit_code(), EXIT_PARTIAL);
    }

    #[test]
    fn test_error_categories() {
        assert_eq!(
            StarfinderError::Resolution("x".into()).category(),
            ErrorCategory::Upstream
        );
        assert_eq!(
            StarfinderError::RetriesExhausted {
                attempts: 4,
                last_error: "refused".into()
            }
            .category(),
            ErrorCategory::Network
        );
        assert_eq!(
            StarfinderError::CacheWrite {
                path: PathBuf::from("/tmp/x.json"),
                message: "denied".into()
            }
            .category(),
            ErrorCategory::Cache
        );
        assert_eq!(ErrorCategory::Network.to_string(), "network");
    }

    #[test]
    fn test_deadline_display() {
        let err = StarfinderError::DeadlineExceeded(std::time::Duration::from_secs(30));
        assert_eq!(err.to_string(), "Search deadline of 30s exceeded");
        assert_eq!(err.category(), ErrorCategory::Network);
    }

    #[test]
    fn test_from_io() {
        let err: StarfinderError = io::Error::new(io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, StarfinderError::Io(_)));
    }
}
