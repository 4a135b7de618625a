//! Layered error definitions
//!
//! Categorized by source: config / input / io

use thiserror::Error;

/// Unified error type for configuration and input contract violations
#[derive(Debug, Error)]
pub enum MonitorError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Input Errors =====
    /// Keypoint vector does not describe 17 (x, y) pairs
    #[error("keypoint shape error for track {track_id}: expected {expected} values, got {got}")]
    KeypointShape {
        track_id: u64,
        expected: usize,
        got: usize,
    },

    /// Keypoint coordinate that is NaN or infinite
    #[error("non-finite keypoint {index} for track {track_id}")]
    NonFiniteKeypoint { track_id: u64, index: usize },

    /// Bounding box with non-finite or negative extent
    #[error("invalid bbox for track {track_id}: {message}")]
    InvalidBBox { track_id: u64, message: String },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl MonitorError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create bbox error
    pub fn invalid_bbox(track_id: u64, message: impl Into<String>) -> Self {
        Self::InvalidBBox {
            track_id,
            message: message.into(),
        }
    }
}
