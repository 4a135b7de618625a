//! Three hysteresis fall-detection algorithms over bbox motion and pose.
//!
//! - Algorithm 1: downward bbox motion only
//! - Algorithm 2: motion and a strict lying pose, weighted
//! - Algorithm 3: flexible pose, confirmed by either counter
//!
//! Counters move by at most 2 per frame and are clamped to
//! `[0, count_threshold]`, so a single noisy frame cannot raise algorithm 1.
//! A frame without a usable pose only decays the counters.

use contracts::{FallConfig, FallVerdict, MethodVerdict, PoseMetrics, PosePredicates};
use tracing::trace;

use crate::history::{HistoryEntry, TrackHistory};

/// Detector parameters
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FallParams {
    pub queue_size: usize,
    /// Rate used when an update carries none
    pub default_fps: f64,
    /// Downward motion threshold (px/ms)
    pub v_bbox_y: f64,
    pub count_threshold: u32,
}

impl Default for FallParams {
    fn default() -> Self {
        Self::from(&FallConfig::default())
    }
}

impl From<&FallConfig> for FallParams {
    fn from(config: &FallConfig) -> Self {
        Self {
            queue_size: config.queue_size.max(1),
            default_fps: config.fps,
            v_bbox_y: config.v_bbox_y,
            count_threshold: config.count_threshold,
        }
    }
}

/// Hysteresis counters of one track
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FallCounters {
    pub bbox_only: u32,
    pub motion_pose: u32,
}

impl FallCounters {
    /// Step both counters toward zero
    pub fn decay(&mut self) {
        self.bbox_only = self.bbox_only.saturating_sub(1);
        self.motion_pose = self.motion_pose.saturating_sub(1);
    }

    #[inline]
    pub fn virtual_counter(&self) -> u32 {
        self.bbox_only.max(self.motion_pose)
    }
}

fn step(counter: u32, delta: i32, threshold: u32) -> u32 {
    let next = counter as i64 + delta as i64;
    next.clamp(0, threshold as i64) as u32
}

/// Pose conditions the detector consumes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoseEvidence {
    /// No usable pose this frame (incomplete, degenerate, failed closed)
    Unavailable,
    Available {
        /// Torso flat and thigh raised
        strict: bool,
        /// Torso flat, or leaning with thigh raised
        flexible: bool,
    },
}

impl PoseEvidence {
    /// From plaintext angles
    pub fn from_metrics(m: &PoseMetrics) -> Self {
        let torso = m.torso_angle;
        let thigh = m.thigh_uprightness;
        Self::Available {
            strict: torso > 80.0 && thigh > 60.0,
            flexible: torso > 80.0 || (torso > 30.0 && torso < 80.0 && thigh > 60.0),
        }
    }

    /// From decrypted comparison bits (angles are never revealed)
    pub fn from_flags(p: &PosePredicates) -> Self {
        let (a, c, f) = (p.torso_ge_30, p.torso_ge_80, p.thigh_ge_60);
        Self::Available {
            strict: c && f,
            flexible: c || (a && !c && f),
        }
    }

    #[inline]
    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available { .. })
    }
}

/// Per-frame motion inputs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionInput {
    pub fps: f64,
    pub v_threshold: f64,
}

/// Stateless rules; all state lives in the track's history and counters
#[derive(Debug, Clone, Copy, Default)]
pub struct FallDetector {
    params: FallParams,
}

impl FallDetector {
    pub fn new(params: FallParams) -> Self {
        Self { params }
    }

    #[inline]
    pub fn params(&self) -> &FallParams {
        &self.params
    }

    #[inline]
    pub fn threshold(&self) -> u32 {
        self.params.count_threshold
    }

    /// Motion inputs for one update, applying per-frame overrides
    pub fn motion_input(&self, fps: Option<f64>, v_threshold: Option<f64>) -> MotionInput {
        MotionInput {
            fps: fps.unwrap_or(self.params.default_fps),
            v_threshold: v_threshold.unwrap_or(self.params.v_bbox_y),
        }
    }

    /// Age of the oldest history entry in milliseconds
    pub fn elapsed_ms(&self, fps: f64) -> f64 {
        let frames = self.params.queue_size as f64;
        if fps > 0.0 {
            frames * 1000.0 / fps
        } else {
            frames * 1000.0
        }
    }

    /// Advance one frame
    pub fn update(
        &self,
        history: &mut TrackHistory,
        counters: &mut FallCounters,
        current: HistoryEntry,
        evidence: PoseEvidence,
        motion: MotionInput,
    ) -> FallVerdict {
        let threshold = self.params.count_threshold;

        let (strict, flexible) = match evidence {
            PoseEvidence::Unavailable => {
                // history is left as is; only the counters move
                counters.decay();
                return FallVerdict::default();
            }
            PoseEvidence::Available { strict, flexible } => (strict, flexible),
        };

        if !history.is_warm() {
            history.push(current);
            if counters.bbox_only == 0 {
                return FallVerdict::default();
            }
            // coast through a history gap on the bbox counter
            counters.decay();
            return FallVerdict {
                bbox_only: MethodVerdict::new(true, counters.bbox_only),
                motion_pose: MethodVerdict::new(false, counters.motion_pose),
                flexible: MethodVerdict::default(),
            };
        }

        let Some(old) = history.rotate(current) else {
            return FallVerdict::default();
        };

        let elapsed = self.elapsed_ms(motion.fps);
        let v_top = (current.bbox.y - old.bbox.y) / elapsed;
        let v_height = (old.bbox.h - current.bbox.h) / elapsed;
        let moving = v_top > motion.v_threshold || v_height > motion.v_threshold;

        counters.bbox_only = step(counters.bbox_only, if moving { 1 } else { -1 }, threshold);
        let weighted = match (moving, strict) {
            (true, true) => 2,
            (true, false) | (false, true) => 1,
            (false, false) => -1,
        };
        counters.motion_pose = step(counters.motion_pose, weighted, threshold);

        let virtual_counter = counters.virtual_counter();
        trace!(v_top, v_height, moving, strict, flexible, ?counters, "fall step");

        FallVerdict {
            bbox_only: MethodVerdict::new(counters.bbox_only >= threshold, counters.bbox_only),
            motion_pose: MethodVerdict::new(
                counters.motion_pose >= threshold,
                counters.motion_pose,
            ),
            flexible: MethodVerdict::new(
                flexible && virtual_counter >= threshold,
                virtual_counter,
            ),
        }
    }
}
