//! Geometry errors
//!
//! Both variants are recoverable: the frame yields no pose label and the
//! fall detector decays its counters.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    /// A required landmark carried the missing sentinel; the window was not touched
    #[error("incomplete frame: landmark '{landmark}' is missing")]
    IncompleteFrame { landmark: &'static str },

    /// Smoothed torso or thigh vector has zero length
    #[error("degenerate geometry: zero-length {segment} vector")]
    DegenerateGeometry { segment: &'static str },
}
