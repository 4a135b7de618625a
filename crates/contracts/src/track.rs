//! TrackUpdate - per-frame input from the upstream tracker
//!
//! One record per tracked person per frame. Tracks arrive with stable ids;
//! association across frames is done upstream.

use serde::{Deserialize, Serialize};

use crate::{MonitorError, SourceId};

/// Number of COCO body keypoints
pub const KEYPOINT_COUNT: usize = 17;

/// Length of the flat `[x0, y0, x1, y1, ...]` keypoint vector
pub const FLAT_KEYPOINT_LEN: usize = KEYPOINT_COUNT * 2;

/// Raw 2D keypoint (pixels). A coordinate equal to the configured
/// missing sentinel marks the point as not detected.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f64,
    pub y: f64,
}

impl Keypoint {
    #[inline]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// True when either coordinate carries the sentinel
    #[inline]
    pub fn is_missing(&self, sentinel: f64) -> bool {
        self.x == sentinel || self.y == sentinel
    }
}

/// The 17 COCO keypoints of one person in one frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoints17(pub [Keypoint; KEYPOINT_COUNT]);

impl Keypoints17 {
    /// Build from the flat wire layout.
    ///
    /// # Errors
    /// `KeypointShape` when `flat` is not exactly 34 values long,
    /// `NonFiniteKeypoint` when any coordinate is NaN or infinite.
    pub fn from_flat(track_id: u64, flat: &[f64]) -> Result<Self, MonitorError> {
        if flat.len() != FLAT_KEYPOINT_LEN {
            return Err(MonitorError::KeypointShape {
                track_id,
                expected: FLAT_KEYPOINT_LEN,
                got: flat.len(),
            });
        }

        let mut points = [Keypoint::default(); KEYPOINT_COUNT];
        for (index, (point, pair)) in points.iter_mut().zip(flat.chunks_exact(2)).enumerate() {
            if !(pair[0].is_finite() && pair[1].is_finite()) {
                return Err(MonitorError::NonFiniteKeypoint { track_id, index });
            }
            *point = Keypoint::new(pair[0], pair[1]);
        }
        Ok(Self(points))
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&Keypoint> {
        self.0.get(index)
    }

    pub fn to_flat(&self) -> Vec<f64> {
        self.0.iter().flat_map(|p| [p.x, p.y]).collect()
    }
}

/// Axis-aligned bounding box, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BBox {
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl BBox {
    #[inline]
    pub fn new(x: f64, y: f64, w: f64, h: f64) -> Self {
        Self { x, y, w, h }
    }

    /// Reject boxes the detector could never produce
    pub fn check(&self, track_id: u64) -> Result<(), MonitorError> {
        let finite = [self.x, self.y, self.w, self.h].iter().all(|v| v.is_finite());
        if !finite {
            return Err(MonitorError::invalid_bbox(track_id, "non-finite coordinate"));
        }
        if self.w < 0.0 || self.h < 0.0 {
            return Err(MonitorError::invalid_bbox(
                track_id,
                format!("negative extent {}x{}", self.w, self.h),
            ));
        }
        Ok(())
    }
}

/// Identity of one tracked subject: (camera, tracker id)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackKey {
    pub source_id: SourceId,
    pub track_id: u64,
}

impl TrackKey {
    pub fn new(source_id: impl Into<SourceId>, track_id: u64) -> Self {
        Self {
            source_id: source_id.into(),
            track_id,
        }
    }
}

impl std::fmt::Display for TrackKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.source_id, self.track_id)
    }
}

/// Track update record
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackUpdate {
    /// Camera that produced the frame
    #[serde(default, alias = "camera_id")]
    pub source_id: SourceId,

    /// Stable tracker id
    pub track_id: u64,

    pub bbox: BBox,

    /// Flat `[x0, y0, ..., x16, y16]`
    pub keypoints: Vec<f64>,

    /// Capture rate used to convert history age to milliseconds;
    /// the configured rate applies when absent
    #[serde(default)]
    pub fps: Option<f64>,

    /// Smoothing window length for a track seen for the first time
    #[serde(default)]
    pub window_size: Option<usize>,

    /// Per-frame override of the bbox velocity threshold (px/ms)
    #[serde(default)]
    pub v_bbox_threshold: Option<f64>,
}

impl TrackUpdate {
    pub fn key(&self) -> TrackKey {
        TrackKey::new(self.source_id.clone(), self.track_id)
    }

    /// Parse the keypoint vector into 17 points
    pub fn keypoints17(&self) -> Result<Keypoints17, MonitorError> {
        Keypoints17::from_flat(self.track_id, &self.keypoints)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flat_pairs_coordinates() {
        let flat: Vec<f64> = (0..34).map(|i| i as f64).collect();
        let kps = Keypoints17::from_flat(1, &flat).unwrap();
        assert_eq!(kps.0[0], Keypoint::new(0.0, 1.0));
        assert_eq!(kps.0[16], Keypoint::new(32.0, 33.0));
        assert_eq!(kps.to_flat(), flat);
    }

    #[test]
    fn test_from_flat_rejects_wrong_length() {
        let err = Keypoints17::from_flat(7, &[0.0; 20]).unwrap_err();
        assert!(matches!(
            err,
            MonitorError::KeypointShape {
                track_id: 7,
                expected: 34,
                got: 20
            }
        ));
    }

    #[test]
    fn test_from_flat_rejects_non_finite() {
        let mut flat = vec![10.0; 34];
        flat[2 * 5] = f64::NAN;
        let err = Keypoints17::from_flat(2, &flat).unwrap_err();
        assert!(matches!(
            err,
            MonitorError::NonFiniteKeypoint {
                track_id: 2,
                index: 5
            }
        ));

        flat[2 * 5] = 10.0;
        flat[33] = f64::NEG_INFINITY;
        let err = Keypoints17::from_flat(2, &flat).unwrap_err();
        assert!(matches!(err, MonitorError::NonFiniteKeypoint { index: 16, .. }));
    }

    #[test]
    fn test_missing_sentinel() {
        assert!(Keypoint::new(-1.0, 20.0).is_missing(-1.0));
        assert!(Keypoint::new(20.0, -1.0).is_missing(-1.0));
        assert!(!Keypoint::new(0.0, 0.0).is_missing(-1.0));
    }

    #[test]
    fn test_bbox_check() {
        assert!(BBox::new(0.0, 0.0, 10.0, 20.0).check(1).is_ok());
        assert!(BBox::new(0.0, 0.0, -1.0, 20.0).check(1).is_err());
        assert!(BBox::new(f64::NAN, 0.0, 1.0, 1.0).check(1).is_err());
    }

    #[test]
    fn test_update_defaults_from_json() {
        let json = r#"{
            "camera_id": "cam-1",
            "track_id": 3,
            "bbox": { "x": 1.0, "y": 2.0, "w": 3.0, "h": 4.0 },
            "keypoints": []
        }"#;
        let update: TrackUpdate = serde_json::from_str(json).unwrap();
        assert_eq!(update.source_id, "cam-1");
        assert!(update.fps.is_none());
        assert!(update.window_size.is_none());
        assert_eq!(update.key(), TrackKey::new("cam-1", 3));
    }
}
