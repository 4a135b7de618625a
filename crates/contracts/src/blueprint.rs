//! MonitorBlueprint - Config Loader output
//!
//! Every section has defaults, so an empty file is a valid configuration
//! that reproduces the deployed behaviour.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete monitor configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct MonitorBlueprint {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Keypoint smoothing and classification thresholds
    #[serde(default)]
    #[validate(nested)]
    pub pose: PoseConfig,

    /// Fall detector parameters
    #[serde(default)]
    #[validate(nested)]
    pub fall: FallConfig,

    /// Plain or blinded classification
    #[serde(default)]
    #[validate(nested)]
    pub privacy: PrivacyConfig,

    /// Track lifecycle
    #[serde(default)]
    #[validate(nested)]
    pub tracks: TrackConfig,
}

/// Geometry / classifier section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PoseConfig {
    /// Frames averaged per landmark
    #[serde(default = "default_smoothing_window")]
    #[validate(range(min = 1, max = 120))]
    pub smoothing_window: usize,

    /// Coordinate value the keypoint model emits for undetected points
    #[serde(default = "default_missing_value")]
    pub missing_value: f64,

    /// thigh/calf below this reads as sitting
    #[serde(default = "default_thigh_calf_ratio")]
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub thigh_calf_ratio: f64,

    /// torso/leg below this reads as bending down
    #[serde(default = "default_torso_leg_ratio")]
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub torso_leg_ratio: f64,
}

fn default_smoothing_window() -> usize {
    5
}

fn default_missing_value() -> f64 {
    -1.0
}

fn default_thigh_calf_ratio() -> f64 {
    0.7
}

fn default_torso_leg_ratio() -> f64 {
    0.5
}

impl Default for PoseConfig {
    fn default() -> Self {
        Self {
            smoothing_window: default_smoothing_window(),
            missing_value: default_missing_value(),
            thigh_calf_ratio: default_thigh_calf_ratio(),
            torso_leg_ratio: default_torso_leg_ratio(),
        }
    }
}

/// Fall detector section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct FallConfig {
    /// Frames of bbox history compared against the current frame
    #[serde(default = "default_queue_size")]
    #[validate(range(min = 1, max = 300))]
    pub queue_size: usize,

    /// Capture rate assumed when an update carries none
    #[serde(default = "default_fps")]
    #[validate(range(min = 0.0))]
    pub fps: f64,

    /// Downward bbox velocity that counts as motion (px/ms)
    #[serde(default = "default_v_bbox_y")]
    #[validate(range(exclusive_min = 0.0))]
    pub v_bbox_y: f64,

    /// Counter value at which an algorithm raises its alarm
    #[serde(default = "default_count_threshold")]
    #[validate(range(min = 1, max = 100))]
    pub count_threshold: u32,
}

fn default_queue_size() -> usize {
    5
}

fn default_fps() -> f64 {
    30.0
}

fn default_v_bbox_y() -> f64 {
    0.43
}

fn default_count_threshold() -> u32 {
    2
}

impl Default for FallConfig {
    fn default() -> Self {
        Self {
            queue_size: default_queue_size(),
            fps: default_fps(),
            v_bbox_y: default_v_bbox_y(),
            count_threshold: default_count_threshold(),
        }
    }
}

/// Which classifier produces the pose label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierMode {
    #[default]
    Plain,
    Encrypted,
}

impl ClassifierMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::Encrypted => "encrypted",
        }
    }
}

/// Privacy section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct PrivacyConfig {
    #[serde(default)]
    pub mode: ClassifierMode,

    /// Largest feature magnitude the key headroom must cover
    #[serde(default = "default_max_feature_value")]
    #[validate(range(exclusive_min = 0.0))]
    pub max_feature_value: f64,

    /// Key override; deployed constants are used when absent
    #[serde(default)]
    #[validate(nested)]
    pub keys: Option<KeyConfig>,
}

fn default_max_feature_value() -> f64 {
    10_000.0
}

impl Default for PrivacyConfig {
    fn default() -> Self {
        Self {
            mode: ClassifierMode::default(),
            max_feature_value: default_max_feature_value(),
            keys: None,
        }
    }
}

/// Key constants as decimal strings (they exceed 128 bits)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct KeyConfig {
    #[validate(length(min = 1))]
    pub p: String,
    #[validate(length(min = 1))]
    pub q: String,
    #[validate(length(min = 1))]
    pub r: String,
    #[validate(length(min = 1))]
    pub s: String,
    #[validate(length(min = 1))]
    pub t: String,
    #[validate(length(min = 1))]
    pub w: String,
    /// Blinding integer
    #[validate(length(min = 1))]
    pub u: String,
}

impl KeyConfig {
    /// `(name, value)` pairs in modulus order, blinding integer last
    pub fn entries(&self) -> [(&'static str, &str); 7] {
        [
            ("p", &self.p),
            ("q", &self.q),
            ("r", &self.r),
            ("s", &self.s),
            ("t", &self.t),
            ("w", &self.w),
            ("u", &self.u),
        ]
    }
}

/// Track lifecycle section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct TrackConfig {
    /// Frames without an update before a track's state is dropped
    #[serde(default = "default_max_idle_frames")]
    #[validate(range(min = 1))]
    pub max_idle_frames: u64,
}

fn default_max_idle_frames() -> u64 {
    900
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            max_idle_frames: default_max_idle_frames(),
        }
    }
}
