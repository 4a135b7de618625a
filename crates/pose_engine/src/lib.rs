//! # Pose Engine
//!
//! Plaintext posture classification from COCO keypoints.
//!
//! Responsibilities:
//! - Pick the 8 body landmarks the classifier needs out of 17 keypoints
//! - Average them over a per-track smoothing window
//! - Derive torso/thigh angles and limb ratios
//! - Map the geometry to a `PoseLabel` through threshold rules
//!
//! ## Example
//!
//! ```
//! use contracts::Keypoints17;
//! use pose_engine::{GeometryExtractor, PlainClassifier, SmoothingWindow};
//!
//! let mut flat = vec![0.0; 34];
//! // shoulders, hips, knees, ankles stacked vertically
//! for (idx, y) in [(5, 80.0), (6, 80.0), (11, 200.0), (12, 200.0),
//!                  (13, 300.0), (14, 300.0), (15, 400.0), (16, 400.0)] {
//!     flat[idx * 2] = if idx % 2 == 1 { 90.0 } else { 110.0 };
//!     flat[idx * 2 + 1] = y;
//! }
//! let keypoints = Keypoints17::from_flat(1, &flat).unwrap();
//!
//! let extractor = GeometryExtractor::new(-1.0);
//! let mut window = SmoothingWindow::new(5);
//! let metrics = extractor.extract(&keypoints, &mut window).unwrap();
//! assert_eq!(PlainClassifier::default().classify(&metrics).as_str(), "standing");
//! ```

mod classifier;
mod error;
mod geometry;

pub use classifier::{classify_predicates, ClassifierThresholds, PlainClassifier};
pub use error::GeometryError;
pub use geometry::{
    angle_to_up, GeometryExtractor, LandmarkFrame, SmoothingWindow, DEFAULT_SMOOTHING_WINDOW,
};

pub use contracts::{PoseLabel, PoseMetrics, PosePredicates};
