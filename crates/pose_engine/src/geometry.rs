//! Landmark extraction, temporal smoothing and derived geometry.
//!
//! Only complete frames (all 8 landmarks present) ever enter a window, so the
//! per-landmark mean is always taken over the same set of frames.

use std::fmt;

use contracts::{Keypoint, Keypoints17, PoseMetrics};
use nalgebra::Vector2;
use ringbuf::{traits::*, HeapRb};
use tracing::debug;

use crate::GeometryError;

pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// COCO indices of the landmarks the classifier uses, with their names
const LANDMARKS: [(usize, &str); 8] = [
    (5, "left_shoulder"),
    (6, "right_shoulder"),
    (11, "left_hip"),
    (12, "right_hip"),
    (13, "left_knee"),
    (14, "right_knee"),
    (15, "left_ankle"),
    (16, "right_ankle"),
];

/// Scene up in image coordinates (y grows downward)
fn up() -> Vector2<f64> {
    Vector2::new(0.0, -1.0)
}

/// The 8 named landmarks of one complete frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LandmarkFrame {
    pub left_shoulder: Vector2<f64>,
    pub right_shoulder: Vector2<f64>,
    pub left_hip: Vector2<f64>,
    pub right_hip: Vector2<f64>,
    pub left_knee: Vector2<f64>,
    pub right_knee: Vector2<f64>,
    pub left_ankle: Vector2<f64>,
    pub right_ankle: Vector2<f64>,
}

impl LandmarkFrame {
    /// Pick the 8 landmarks out of the 17 keypoints.
    ///
    /// # Errors
    /// `IncompleteFrame` naming the first landmark equal to `sentinel`
    /// or carrying a non-finite coordinate.
    pub fn from_keypoints(keypoints: &Keypoints17, sentinel: f64) -> Result<Self, GeometryError> {
        let mut points = [Vector2::zeros(); 8];
        for (slot, &(index, name)) in points.iter_mut().zip(LANDMARKS.iter()) {
            let kp: Keypoint = keypoints.0[index];
            if kp.is_missing(sentinel) || !(kp.x.is_finite() && kp.y.is_finite()) {
                return Err(GeometryError::IncompleteFrame { landmark: name });
            }
            *slot = Vector2::new(kp.x, kp.y);
        }
        Ok(Self::from_array(points))
    }

    fn from_array(p: [Vector2<f64>; 8]) -> Self {
        Self {
            left_shoulder: p[0],
            right_shoulder: p[1],
            left_hip: p[2],
            right_hip: p[3],
            left_knee: p[4],
            right_knee: p[5],
            left_ankle: p[6],
            right_ankle: p[7],
        }
    }

    fn to_array(self) -> [Vector2<f64>; 8] {
        [
            self.left_shoulder,
            self.right_shoulder,
            self.left_hip,
            self.right_hip,
            self.left_knee,
            self.right_knee,
            self.left_ankle,
            self.right_ankle,
        ]
    }

    #[inline]
    pub fn shoulder_center(&self) -> Vector2<f64> {
        (self.left_shoulder + self.right_shoulder) / 2.0
    }

    #[inline]
    pub fn hip_center(&self) -> Vector2<f64> {
        (self.left_hip + self.right_hip) / 2.0
    }

    #[inline]
    pub fn knee_center(&self) -> Vector2<f64> {
        (self.left_knee + self.right_knee) / 2.0
    }
}

/// Bounded FIFO of complete landmark frames for one track
pub struct SmoothingWindow {
    frames: HeapRb<LandmarkFrame>,
    capacity: usize,
}

impl fmt::Debug for SmoothingWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmoothingWindow")
            .field("len", &self.frames.occupied_len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

impl Default for SmoothingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_SMOOTHING_WINDOW)
    }
}

impl SmoothingWindow {
    /// Capacity is clamped to at least 1
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: HeapRb::new(capacity),
            capacity,
        }
    }

    /// Append a frame, dropping the oldest when full
    #[inline]
    pub fn push(&mut self, frame: LandmarkFrame) {
        if self.frames.is_full() {
            let _ = self.frames.try_pop();
        }
        let _ = self.frames.try_push(frame);
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.frames.occupied_len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn clear(&mut self) {
        while self.frames.try_pop().is_some() {}
    }

    /// Per-landmark arithmetic mean over all frames in the window
    pub fn mean(&self) -> Option<LandmarkFrame> {
        let n = self.len();
        if n == 0 {
            return None;
        }

        let mut sums = [Vector2::zeros(); 8];
        for frame in self.frames.iter() {
            for (sum, point) in sums.iter_mut().zip(frame.to_array()) {
                *sum += point;
            }
        }
        for sum in sums.iter_mut() {
            *sum /= n as f64;
        }
        Some(LandmarkFrame::from_array(sums))
    }
}

/// Angle in degrees between `v` and scene up, `None` for a zero vector
pub fn angle_to_up(v: &Vector2<f64>) -> Option<f64> {
    let norm = v.norm();
    if norm == 0.0 {
        return None;
    }
    let cos = (v.dot(&up()) / norm).clamp(-1.0, 1.0);
    Some(cos.acos().to_degrees())
}

fn ratio_or_one(numerator: f64, denominator: f64) -> f64 {
    if denominator == 0.0 {
        1.0
    } else {
        numerator / denominator
    }
}

/// Turns raw keypoints into smoothed pose geometry
#[derive(Debug, Clone, Copy)]
pub struct GeometryExtractor {
    missing_value: f64,
}

impl Default for GeometryExtractor {
    fn default() -> Self {
        Self::new(-1.0)
    }
}

impl GeometryExtractor {
    pub fn new(missing_value: f64) -> Self {
        Self { missing_value }
    }

    #[inline]
    pub fn missing_value(&self) -> f64 {
        self.missing_value
    }

    /// Push the frame into `window` and derive metrics from the smoothed landmarks.
    ///
    /// # Errors
    /// - `IncompleteFrame`: a landmark is missing; `window` is left unchanged
    /// - `DegenerateGeometry`: torso or thigh collapsed to a point; the frame
    ///   has already been pushed
    pub fn extract(
        &self,
        keypoints: &Keypoints17,
        window: &mut SmoothingWindow,
    ) -> Result<PoseMetrics, GeometryError> {
        let frame = LandmarkFrame::from_keypoints(keypoints, self.missing_value)?;
        window.push(frame);

        // window holds at least the frame just pushed
        let smoothed = window.mean().unwrap_or(frame);
        let metrics = Self::derive(&smoothed)?;

        debug!(
            torso_angle = metrics.torso_angle,
            thigh_uprightness = metrics.thigh_uprightness,
            window_len = window.len(),
            "pose geometry"
        );
        Ok(metrics)
    }

    /// Angles and limb lengths of one (smoothed) landmark frame
    pub fn derive(frame: &LandmarkFrame) -> Result<PoseMetrics, GeometryError> {
        let hip_c = frame.hip_center();
        let torso = frame.shoulder_center() - hip_c;
        let thigh = frame.knee_center() - hip_c;

        let torso_angle =
            angle_to_up(&torso).ok_or(GeometryError::DegenerateGeometry { segment: "torso" })?;
        let thigh_angle =
            angle_to_up(&thigh).ok_or(GeometryError::DegenerateGeometry { segment: "thigh" })?;

        let mean_len = |a: (Vector2<f64>, Vector2<f64>), b: (Vector2<f64>, Vector2<f64>)| {
            ((a.0 - a.1).norm() + (b.0 - b.1).norm()) / 2.0
        };
        let thigh_length = mean_len(
            (frame.left_hip, frame.left_knee),
            (frame.right_hip, frame.right_knee),
        );
        let calf_length = mean_len(
            (frame.left_knee, frame.left_ankle),
            (frame.right_knee, frame.right_ankle),
        );
        let torso_height = mean_len(
            (frame.left_shoulder, frame.left_hip),
            (frame.right_shoulder, frame.right_hip),
        );
        let leg_length = mean_len(
            (frame.left_hip, frame.left_ankle),
            (frame.right_hip, frame.right_ankle),
        );

        Ok(PoseMetrics {
            torso_angle,
            thigh_angle,
            thigh_uprightness: (thigh_angle - 180.0).abs(),
            thigh_calf_ratio: ratio_or_one(thigh_length, calf_length),
            torso_leg_ratio: ratio_or_one(torso_height, leg_length),
            thigh_length,
            calf_length,
            torso_height,
            leg_length,
        })
    }
}
