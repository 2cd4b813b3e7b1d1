//! Error types for telemetry sampling and aggregation.
//!
//! Every per-tick failure (command, parse, unit) is recoverable: the driver
//! logs it and skips the tick. Configuration and bind errors surface at
//! startup instead.

use chrono::{DateTime, Utc};
use std::fmt;
use std::io;
use std::time::Duration;
use thiserror::Error;

/// Why an invocation of the diagnostic command did not yield a report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessFailure {
    /// The executable could not be started.
    Spawn(String),
    /// The command exited with a non-zero status (`None` when killed by a signal).
    Exit(Option<i32>),
    /// The command did not finish within the configured timeout and was killed.
    Timeout(Duration),
}

impl fmt::Display for ProcessFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn(reason) => write!(f, "could not start: {reason}"),
            Self::Exit(Some(code)) => write!(f, "exited with status {code}"),
            Self::Exit(None) => write!(f, "terminated by signal"),
            Self::Timeout(limit) => write!(f, "timed out after {}ms", limit.as_millis()),
        }
    }
}

/// Error type for telemetry operations.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The external diagnostic command failed.
    #[error("diagnostic command '{command}' {failure}")]
    Process {
        /// Command that was invoked.
        command: String,
        /// Failure classification.
        failure: ProcessFailure,
    },

    /// The separator / device-0 / metrics row pattern is absent from the report.
    #[error("telemetry anchor not found: no separator, device 0 and metrics row sequence")]
    ParseNotFound,

    /// A memory token carries a byte-magnitude suffix outside the known set.
    #[error("unknown memory unit in token '{0}'")]
    UnknownUnit(String),

    /// A token in the metrics row is not a number, or is outside its field's range.
    #[error("invalid {field} value '{token}'")]
    InvalidNumber {
        /// Which field was being extracted.
        field: &'static str,
        /// The offending token.
        token: String,
    },

    /// The anchor matched but a required column is missing.
    #[error("report row is missing the {0} column")]
    MissingField(&'static str),

    /// A marker was requested before any sample exists.
    #[error("series is empty: no sample to attach the event marker to")]
    EmptySeries,

    /// A sample is older than the last appended one.
    #[error("sample captured at {got} precedes last sample at {last}")]
    OutOfOrder {
        /// Timestamp of the last appended sample.
        last: DateTime<Utc>,
        /// Timestamp of the rejected sample.
        got: DateTime<Utc>,
    },

    /// Configuration parsing error with line number.
    #[error("configuration error at line {line}: {message}")]
    ConfigParse {
        /// Line number where the error occurred (1-indexed).
        line: usize,
        /// Error message describing the issue.
        message: String,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {0}")]
    ConfigNotFound(String),

    /// Invalid configuration value.
    #[error("invalid configuration value for '{key}': {message}")]
    ConfigInvalid {
        /// The configuration key with invalid value.
        key: String,
        /// Error message describing why the value is invalid.
        message: String,
    },

    /// The HTTP probe could not be started.
    #[error("http surface error: {0}")]
    Http(String),

    /// Dashboard rendering or encoding failed.
    #[error("render error: {0}")]
    Render(#[from] crate::Error),

    /// Filesystem error (export directories, replay files).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl TelemetryError {
    /// Returns true for errors that only invalidate a single sampling tick.
    #[must_use]
    pub fn is_per_tick(&self) -> bool {
        matches!(
            self,
            Self::Process { .. }
                | Self::ParseNotFound
                | Self::UnknownUnit(_)
                | Self::InvalidNumber { .. }
                | Self::MissingField(_)
                | Self::OutOfOrder { .. }
        )
    }
}

/// Result type alias for telemetry operations.
pub type Result<T> = std::result::Result<T, TelemetryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_process_error_includes_command_and_status() {
        let err = TelemetryError::Process {
            command: "nvidia-smi".to_string(),
            failure: ProcessFailure::Exit(Some(9)),
        };
        let display = err.to_string();

        assert!(display.contains("nvidia-smi"), "Error should include command: {}", display);
        assert!(display.contains("status 9"), "Error should include status: {}", display);
    }

    #[test]
    fn test_timeout_reports_limit() {
        let failure = ProcessFailure::Timeout(Duration::from_millis(250));
        assert_eq!(failure.to_string(), "timed out after 250ms");
    }

    #[test]
    fn test_unknown_unit_includes_token() {
        let err = TelemetryError::UnknownUnit("2048MB".to_string());
        assert!(err.to_string().contains("2048MB"));
    }

    #[test]
    fn test_config_parse_error_includes_line_number() {
        let err = TelemetryError::ConfigParse { line: 7, message: "bad".to_string() };
        assert!(err.to_string().contains('7'));
    }

    #[test]
    fn test_per_tick_classification() {
        assert!(TelemetryError::ParseNotFound.is_per_tick());
        assert!(TelemetryError::UnknownUnit("x".into()).is_per_tick());
        assert!(!TelemetryError::EmptySeries.is_per_tick());
        assert!(!TelemetryError::Http("bind".into()).is_per_tick());
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = io::Error::new(io::ErrorKind::NotFound, "gone");
        let err: TelemetryError = io_err.into();
        assert!(matches!(err, TelemetryError::Io(_)));
    }

    #[test]
    fn test_error_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<TelemetryError>();
    }
}
