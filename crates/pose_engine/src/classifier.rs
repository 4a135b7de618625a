//! Threshold rules mapping pose geometry to a posture label.

use contracts::{PoseConfig, PoseLabel, PoseMetrics, PosePredicates};

/// Angle cut points of the decision tree (degrees)
const TORSO_UPRIGHT: f64 = 30.0;
const TORSO_FLAT: f64 = 80.0;
const THIGH_BENT: f64 = 40.0;
const THIGH_RAISED: f64 = 60.0;

/// Limb-ratio thresholds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClassifierThresholds {
    /// thigh/calf below this reads as sitting
    pub thigh_calf_ratio: f64,
    /// torso/leg below this reads as bending down
    pub torso_leg_ratio: f64,
}

impl Default for ClassifierThresholds {
    fn default() -> Self {
        Self {
            thigh_calf_ratio: 0.7,
            torso_leg_ratio: 0.5,
        }
    }
}

impl From<&PoseConfig> for ClassifierThresholds {
    fn from(config: &PoseConfig) -> Self {
        Self {
            thigh_calf_ratio: config.thigh_calf_ratio,
            torso_leg_ratio: config.torso_leg_ratio,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct PlainClassifier {
    thresholds: ClassifierThresholds,
}

impl PlainClassifier {
    pub fn new(thresholds: ClassifierThresholds) -> Self {
        Self { thresholds }
    }

    #[inline]
    pub fn thresholds(&self) -> &ClassifierThresholds {
        &self.thresholds
    }

    /// Decision tree over smoothed geometry
    pub fn classify(&self, m: &PoseMetrics) -> PoseLabel {
        let upright = m.torso_angle < TORSO_UPRIGHT;

        if upright && m.thigh_uprightness < THIGH_BENT {
            if m.thigh_calf_ratio < self.thresholds.thigh_calf_ratio {
                PoseLabel::Sitting
            } else if m.torso_leg_ratio < self.thresholds.torso_leg_ratio {
                PoseLabel::BendingDown
            } else {
                PoseLabel::Standing
            }
        } else if upright {
            PoseLabel::Sitting
        } else if m.torso_angle < TORSO_FLAT && m.thigh_uprightness < THIGH_RAISED {
            PoseLabel::BendingDown
        } else {
            PoseLabel::LyingDown
        }
    }

    /// The six comparison bits for `m`, as the blinded classifier would decrypt them.
    ///
    /// Ratio tests are cross-multiplied so a zero denominator behaves the same
    /// as the ratio fallback of 1.0.
    pub fn predicates(&self, m: &PoseMetrics) -> PosePredicates {
        PosePredicates {
            torso_ge_30: m.torso_angle >= TORSO_UPRIGHT,
            thigh_ge_40: m.thigh_uprightness >= THIGH_BENT,
            torso_ge_80: m.torso_angle >= TORSO_FLAT,
            thigh_calf_ge_07: m.thigh_length >= m.calf_length * self.thresholds.thigh_calf_ratio,
            torso_leg_ge_05: m.torso_height >= m.leg_length * self.thresholds.torso_leg_ratio,
            thigh_ge_60: m.thigh_uprightness >= THIGH_RAISED,
        }
    }
}

/// The same decision tree evaluated over comparison bits
pub fn classify_predicates(p: &PosePredicates) -> PoseLabel {
    let upright = !p.torso_ge_30;

    if upright && !p.thigh_ge_40 {
        if !p.thigh_calf_ge_07 {
            PoseLabel::Sitting
        } else if !p.torso_leg_ge_05 {
            PoseLabel::BendingDown
        } else {
            PoseLabel::Standing
        }
    } else if upright {
        PoseLabel::Sitting
    } else if !p.torso_ge_80 && !p.thigh_ge_60 {
        PoseLabel::BendingDown
    } else {
        PoseLabel::LyingDown
    }
}
