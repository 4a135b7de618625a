//! Pose classification outputs shared by the plain and the blinded classifier.

use serde::{Deserialize, Serialize};

/// Discrete posture label. Flat enum, no ordering implied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseLabel {
    Standing,
    Sitting,
    BendingDown,
    LyingDown,
    #[default]
    Unknown,
}

impl PoseLabel {
    /// Decode the 2-bit pose code emitted by the comparison circuit
    pub fn from_code(code: u8) -> Self {
        match code {
            0 => Self::Standing,
            1 => Self::Sitting,
            2 => Self::BendingDown,
            3 => Self::LyingDown,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Standing => "standing",
            Self::Sitting => "sitting",
            Self::BendingDown => "bending_down",
            Self::LyingDown => "lying_down",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for PoseLabel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scalars derived from the smoothed landmark window.
///
/// Angles are in degrees, lengths in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseMetrics {
    /// Angle between torso (hip -> shoulder) and scene up, 0 = upright
    pub torso_angle: f64,
    /// Angle between thigh (hip -> knee) and scene up
    pub thigh_angle: f64,
    /// `|thigh_angle - 180|`, 0 = thigh hanging straight down
    pub thigh_uprightness: f64,
    pub thigh_calf_ratio: f64,
    pub torso_leg_ratio: f64,
    pub thigh_length: f64,
    pub calf_length: f64,
    pub torso_height: f64,
    pub leg_length: f64,
}

/// The six comparison bits the pose decision depends on.
///
/// Each bit is "feature is at least the threshold", which is the complement
/// of the strict `<` tests in the decision tree. On the wire they are `a..f`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PosePredicates {
    /// torso_angle >= 30
    #[serde(rename = "a")]
    pub torso_ge_30: bool,
    /// thigh_uprightness >= 40
    #[serde(rename = "b")]
    pub thigh_ge_40: bool,
    /// torso_angle >= 80
    #[serde(rename = "c")]
    pub torso_ge_80: bool,
    /// thigh_length * 10 >= calf_length * 7
    #[serde(rename = "d")]
    pub thigh_calf_ge_07: bool,
    /// torso_height * 10 >= leg_length * 5
    #[serde(rename = "e")]
    pub torso_leg_ge_05: bool,
    /// thigh_uprightness >= 60
    #[serde(rename = "f")]
    pub thigh_ge_60: bool,
}

impl PosePredicates {
    /// Unpack from a 6-bit mask, bit 0 = `a` ... bit 5 = `f`
    pub fn from_bits(bits: u8) -> Self {
        Self {
            torso_ge_30: bits & 0b000001 != 0,
            thigh_ge_40: bits & 0b000010 != 0,
            torso_ge_80: bits & 0b000100 != 0,
            thigh_calf_ge_07: bits & 0b001000 != 0,
            torso_leg_ge_05: bits & 0b010000 != 0,
            thigh_ge_60: bits & 0b100000 != 0,
        }
    }

    pub fn to_bits(&self) -> u8 {
        [
            self.torso_ge_30,
            self.thigh_ge_40,
            self.torso_ge_80,
            self.thigh_calf_ge_07,
            self.torso_leg_ge_05,
            self.thigh_ge_60,
        ]
        .iter()
        .enumerate()
        .fold(0u8, |acc, (i, &bit)| acc | ((bit as u8) << i))
    }
}
