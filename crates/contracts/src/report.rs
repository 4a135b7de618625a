//! FrameReport - monitor output
//!
//! Field names of [`FrameReport`] are the JSON contract consumed by the
//! caregiver dashboard.

use serde::{Deserialize, Serialize};

use crate::{PoseLabel, PosePredicates, SourceId};

/// Outcome of one detection algorithm for one frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MethodVerdict {
    pub detected: bool,
    pub counter: u32,
}

impl MethodVerdict {
    #[inline]
    pub fn new(detected: bool, counter: u32) -> Self {
        Self { detected, counter }
    }
}

/// Verdicts of the three fall algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FallVerdict {
    /// Algorithm 1: bbox motion only
    pub bbox_only: MethodVerdict,
    /// Algorithm 2: bbox motion AND strict pose
    pub motion_pose: MethodVerdict,
    /// Algorithm 3: flexible pose verified by either counter
    pub flexible: MethodVerdict,
}

impl FallVerdict {
    /// Primary alert (algorithm 3)
    #[inline]
    pub fn alert(&self) -> bool {
        self.flexible.detected
    }

    pub fn any_detected(&self) -> bool {
        self.bbox_only.detected || self.motion_pose.detected || self.flexible.detected
    }
}

/// How far the frame got through the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameStatus {
    /// Pose label produced
    Classified,
    /// A required landmark carried the missing sentinel
    IncompleteFrame,
    /// Zero-length torso or thigh vector
    DegenerateGeometry,
    /// Blinded comparison rejected; no label, no fall signal
    FailedClosed,
}

impl FrameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Classified => "classified",
            Self::IncompleteFrame => "incomplete_frame",
            Self::DegenerateGeometry => "degenerate_geometry",
            Self::FailedClosed => "failed_closed",
        }
    }

    pub fn has_pose(&self) -> bool {
        matches!(self, Self::Classified)
    }
}

/// Caregiver alert level
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertLevel {
    Normal,
    Low,
    Medium,
    High,
    Critical,
}

/// Risk assessment attached to each report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub fall_detected: bool,
    pub fall_confidence: f64,
    pub overall_risk: f64,
    pub alert_level: AlertLevel,
    pub recommendations: Vec<String>,
}

/// Per-frame output record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FrameReport {
    pub source_id: SourceId,
    pub track_id: u64,
    pub status: FrameStatus,
    pub label: Option<PoseLabel>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub torso_angle: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thigh_uprightness: Option<f64>,
    pub fall_detected_method1: bool,
    pub fall_counter_method1: u32,
    pub fall_detected_method2: bool,
    pub fall_counter_method2: u32,
    pub fall_detected_method3: bool,
    pub fall_counter_method3: u32,
    pub fall_threshold: u32,
    pub fall_alert: bool,
    /// Comparison bits, present only for blinded classification
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<PosePredicates>,
    pub diagnosis: Diagnosis,
}

impl FrameReport {
    /// Fold the verdict into the flat report layout
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_id: SourceId,
        track_id: u64,
        status: FrameStatus,
        label: Option<PoseLabel>,
        angles: Option<(f64, f64)>,
        verdict: FallVerdict,
        fall_threshold: u32,
        flags: Option<PosePredicates>,
        diagnosis: Diagnosis,
    ) -> Self {
        Self {
            source_id,
            track_id,
            status,
            label,
            torso_angle: angles.map(|(torso, _)| torso),
            thigh_uprightness: angles.map(|(_, thigh)| thigh),
            fall_detected_method1: verdict.bbox_only.detected,
            fall_counter_method1: verdict.bbox_only.counter,
            fall_detected_method2: verdict.motion_pose.detected,
            fall_counter_method2: verdict.motion_pose.counter,
            fall_detected_method3: verdict.flexible.detected,
            fall_counter_method3: verdict.flexible.counter,
            fall_threshold,
            fall_alert: verdict.alert(),
            flags,
            diagnosis,
        }
    }

    /// Reassemble the structured verdict
    pub fn verdict(&self) -> FallVerdict {
        FallVerdict {
            bbox_only: MethodVerdict::new(self.fall_detected_method1, self.fall_counter_method1),
            motion_pose: MethodVerdict::new(self.fall_detected_method2, self.fall_counter_method2),
            flexible: MethodVerdict::new(self.fall_detected_method3, self.fall_counter_method3),
        }
    }
}
