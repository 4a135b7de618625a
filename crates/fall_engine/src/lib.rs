//! # Fall Engine
//!
//! Per-track fall detection over pose labels and bounding-box motion.
//!
//! ## Flow per frame
//!
//! ```text
//! TrackUpdate ─► TrackRegistry (lazy per-track state)
//!             ─► GeometryExtractor (track's smoothing window)
//!             ─► PlainClassifier | EncryptedClassifier
//!             ─► FallDetector (track's history + counters)
//!             ─► diagnose ─► FrameReport
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use contracts::MonitorBlueprint;
//! use fall_engine::MonitorEngine;
//!
//! let engine = MonitorEngine::new(&MonitorBlueprint::default())?;
//! let report = engine.process(&update)?;
//! if report.fall_alert {
//!     // notify caregiver
//! }
//! ```

pub mod detector;
pub mod diagnosis;
mod engine;
mod error;
pub mod history;
pub mod registry;

pub use detector::{FallCounters, FallDetector, FallParams, MotionInput, PoseEvidence};
pub use diagnosis::diagnose;
pub use engine::{MonitorEngine, PoseClassifier};
pub use error::EngineError;
pub use history::{HistoryEntry, TrackHistory};
pub use registry::{TrackRegistry, TrackState};
