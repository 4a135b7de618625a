//! Engine errors
//!
//! Only input contract violations and startup configuration problems are
//! errors here. Incomplete frames, degenerate geometry and failed blinded
//! comparisons are reported through `FrameStatus` instead.

use blinded::CryptoError;
use contracts::MonitorError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed track update (keypoint shape, bbox)
    #[error(transparent)]
    Input(#[from] MonitorError),

    /// Key material unusable or without headroom
    #[error("encrypted classifier unavailable: {0}")]
    Crypto(#[from] CryptoError),
}

impl EngineError {
    pub fn is_input(&self) -> bool {
        matches!(self, Self::Input(_))
    }
}
