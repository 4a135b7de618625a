//! Error types for CLI operations.

use fall_engine::EngineError;
use contracts::MonitorError;
use thiserror::Error;

/// Why one replayed record produced no report
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Line is not a valid track update
    #[error("line {line}: malformed record: {message}")]
    MalformedRecord { line: u64, message: String },

    /// Engine rejected the update
    #[error("line {line}: {source}")]
    Rejected {
        line: u64,
        #[source]
        source: EngineError,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn malformed_record(line: u64, message: impl Into<String>) -> Self {
        Self::MalformedRecord {
            line,
            message: message.into(),
        }
    }

    /// Metric label for a record that never became a report
    pub fn reason(&self) -> &'static str {
        match self {
            Self::MalformedRecord { .. } => "malformed_record",
            Self::Rejected {
                source: EngineError::Input(MonitorError::KeypointShape { .. }),
                ..
            } => "keypoint_shape",
            Self::Rejected {
                source: EngineError::Input(MonitorError::NonFiniteKeypoint { .. }),
                ..
            } => "non_finite_keypoint",
            Self::Rejected {
                source: EngineError::Input(MonitorError::InvalidBBox { .. }),
                ..
            } => "invalid_bbox",
            Self::Rejected { .. } => "engine_error",
            Self::ConfigNotFound { .. } | Self::Io(_) => "io",
        }
    }
}
