//! Per-frame pipeline: geometry, pose classification, fall detection, diagnosis.

use std::sync::Arc;

use blinded::{EncryptedClassifier, KeyMaterial};
use contracts::{
    ClassifierMode, FrameReport, FrameStatus, MonitorBlueprint, PoseLabel, PosePredicates,
    TrackKey, TrackUpdate,
};
use pose_engine::{ClassifierThresholds, GeometryError, GeometryExtractor, PlainClassifier};
use tracing::{debug, info, instrument};

use crate::detector::{FallDetector, FallParams, PoseEvidence};
use crate::diagnosis::diagnose;
use crate::error::EngineError;
use crate::history::HistoryEntry;
use crate::registry::{lock_track, TrackRegistry, TrackState};

/// Pose classifier selected at startup
#[derive(Debug, Clone)]
pub enum PoseClassifier {
    Plain(PlainClassifier),
    Encrypted(EncryptedClassifier),
}

impl PoseClassifier {
    pub fn mode(&self) -> ClassifierMode {
        match self {
            Self::Plain(_) => ClassifierMode::Plain,
            Self::Encrypted(_) => ClassifierMode::Encrypted,
        }
    }
}

/// Pose outcome of one frame, before fall detection
struct PoseOutcome {
    status: FrameStatus,
    label: Option<PoseLabel>,
    angles: Option<(f64, f64)>,
    flags: Option<PosePredicates>,
    evidence: PoseEvidence,
}

impl PoseOutcome {
    fn unavailable(status: FrameStatus) -> Self {
        Self {
            status,
            label: None,
            angles: None,
            flags: None,
            evidence: PoseEvidence::Unavailable,
        }
    }
}

/// Fall monitor for any number of (camera, track) subjects.
///
/// `process` takes `&self`; frames of different tracks may be processed
/// concurrently, frames of one track must arrive in order.
#[derive(Debug)]
pub struct MonitorEngine {
    extractor: GeometryExtractor,
    classifier: PoseClassifier,
    detector: FallDetector,
    registry: TrackRegistry,
    default_window: usize,
    max_idle_frames: u64,
}

impl MonitorEngine {
    /// Build from a validated blueprint.
    ///
    /// Key material is loaded and its headroom checked whenever encrypted
    /// mode is selected or keys are configured, so bad keys fail at startup.
    pub fn new(blueprint: &MonitorBlueprint) -> Result<Self, EngineError> {
        let privacy = &blueprint.privacy;
        let keys = if privacy.mode == ClassifierMode::Encrypted || privacy.keys.is_some() {
            let keys = KeyMaterial::from_config(privacy.keys.as_ref())?;
            keys.validate_headroom(privacy.max_feature_value)?;
            Some(Arc::new(keys))
        } else {
            None
        };

        let classifier = match (privacy.mode, keys) {
            (ClassifierMode::Encrypted, Some(keys)) => PoseClassifier::Encrypted(
                EncryptedClassifier::new(keys, privacy.max_feature_value)?,
            ),
            _ => PoseClassifier::Plain(PlainClassifier::new(ClassifierThresholds::from(
                &blueprint.pose,
            ))),
        };

        info!(
            mode = classifier.mode().as_str(),
            queue_size = blueprint.fall.queue_size,
            count_threshold = blueprint.fall.count_threshold,
            "monitor engine ready"
        );

        Ok(Self {
            extractor: GeometryExtractor::new(blueprint.pose.missing_value),
            classifier,
            detector: FallDetector::new(FallParams::from(&blueprint.fall)),
            registry: TrackRegistry::new(),
            default_window: blueprint.pose.smoothing_window,
            max_idle_frames: blueprint.tracks.max_idle_frames,
        })
    }

    #[inline]
    pub fn mode(&self) -> ClassifierMode {
        self.classifier.mode()
    }

    #[inline]
    pub fn classifier(&self) -> &PoseClassifier {
        &self.classifier
    }

    #[inline]
    pub fn detector(&self) -> &FallDetector {
        &self.detector
    }

    #[inline]
    pub fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    /// Process one track update.
    ///
    /// # Errors
    /// `EngineError::Input` when the keypoint vector or bbox is malformed.
    /// No track state is touched in that case.
    #[instrument(
        name = "monitor_process",
        skip(self, update),
        fields(source = %update.source_id, track = update.track_id)
    )]
    pub fn process(&self, update: &TrackUpdate) -> Result<FrameReport, EngineError> {
        let keypoints = update.keypoints17()?;
        update.bbox.check(update.track_id)?;

        let key = update.key();
        let now = self.registry.tick();
        let queue_size = self.detector.params().queue_size;
        let window = update.window_size.unwrap_or(self.default_window);
        let track = self
            .registry
            .get_or_create(&key, || TrackState::new(window, queue_size));

        let mut state = lock_track(&track);
        state.last_seen = now;

        let outcome = match self.extractor.extract(&keypoints, &mut state.window) {
            Ok(metrics) => self.classify(&metrics),
            Err(e) => {
                debug!(error = %e, "pose unavailable");
                PoseOutcome::unavailable(match e {
                    GeometryError::IncompleteFrame { .. } => FrameStatus::IncompleteFrame,
                    GeometryError::DegenerateGeometry { .. } => FrameStatus::DegenerateGeometry,
                })
            }
        };

        let state = &mut *state;
        let verdict = self.detector.update(
            &mut state.history,
            &mut state.counters,
            HistoryEntry::new(update.bbox, keypoints),
            outcome.evidence,
            self.detector
                .motion_input(update.fps, update.v_bbox_threshold),
        );

        if verdict.alert() {
            info!(
                track = %key,
                label = ?outcome.label,
                counter = verdict.flexible.counter,
                "fall alarm"
            );
        }

        let threshold = self.detector.threshold();
        let diagnosis = diagnose(outcome.label, &verdict, threshold);
        Ok(FrameReport::new(
            key.source_id,
            key.track_id,
            outcome.status,
            outcome.label,
            outcome.angles,
            verdict,
            threshold,
            outcome.flags,
            diagnosis,
        ))
    }

    fn classify(&self, metrics: &contracts::PoseMetrics) -> PoseOutcome {
        match &self.classifier {
            PoseClassifier::Plain(classifier) => PoseOutcome {
                status: FrameStatus::Classified,
                label: Some(classifier.classify(metrics)),
                angles: Some((metrics.torso_angle, metrics.thigh_uprightness)),
                flags: None,
                evidence: PoseEvidence::from_metrics(metrics),
            },
            PoseClassifier::Encrypted(classifier) => match classifier.classify(metrics) {
                Ok(verdict) => PoseOutcome {
                    status: FrameStatus::Classified,
                    label: Some(verdict.label),
                    angles: None,
                    flags: Some(verdict.flags),
                    evidence: PoseEvidence::from_flags(&verdict.flags),
                },
                Err(e) => {
                    debug!(error = %e, "pose unavailable");
                    PoseOutcome::unavailable(FrameStatus::FailedClosed)
                }
            },
        }
    }

    pub fn forget_track(&self, key: &TrackKey) -> bool {
        self.registry.forget_track(key)
    }

    pub fn forget_source(&self, source_id: &str) -> usize {
        self.registry.forget_source(source_id)
    }

    /// Evict tracks idle for longer than the configured number of frames
    pub fn evict_idle(&self) -> usize {
        self.registry.evict_idle(self.max_idle_frames)
    }

    pub fn active_tracks(&self) -> usize {
        self.registry.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{BBox, KeyConfig};

    /// Upright subject with the hip center at `(100, hip_y)`
    fn standing_keypoints(hip_y: f64) -> Vec<f64> {
        let mut kps = vec![0.0; 34];
        let mut set = |i: usize, x: f64, y: f64| {
            kps[2 * i] = x;
            kps[2 * i + 1] = y;
        };
        set(5, 90.0, hip_y - 60.0);
        set(6, 110.0, hip_y - 60.0);
        set(11, 90.0, hip_y);
        set(12, 110.0, hip_y);
        set(13, 90.0, hip_y + 45.0);
        set(14, 110.0, hip_y + 45.0);
        set(15, 90.0, hip_y + 90.0);
        set(16, 110.0, hip_y + 90.0);
        kps
    }

    fn update(track_id: u64, bbox_y: f64, keypoints: Vec<f64>) -> TrackUpdate {
        TrackUpdate {
            source_id: "cam".into(),
            track_id,
            bbox: BBox::new(80.0, bbox_y, 40.0, 160.0),
            keypoints,
            fps: Some(30.0),
            window_size: None,
            v_bbox_threshold: None,
        }
    }

    #[test]
    fn test_standing_frames_are_quiet() {
        let engine = MonitorEngine::new(&MonitorBlueprint::default()).unwrap();
        for _ in 0..10 {
            let report = engine.process(&update(1, 40.0, standing_keypoints(100.0))).unwrap();
            assert_eq!(report.status, FrameStatus::Classified);
            assert_eq!(report.label, Some(PoseLabel::Standing));
            assert!(!report.fall_alert);
            assert_eq!(report.verdict(), Default::default());
            assert!(report.torso_angle.unwrap() < 1.0);
        }
        assert_eq!(engine.active_tracks(), 1);
    }

    #[test]
    fn test_wrong_keypoint_count_touches_no_state() {
        let engine = MonitorEngine::new(&MonitorBlueprint::default()).unwrap();
        let err = engine.process(&update(1, 0.0, vec![1.0; 10])).unwrap_err();
        assert!(err.is_input());
        assert_eq!(engine.active_tracks(), 0);
    }

    #[test]
    fn test_non_finite_keypoint_is_rejected_before_smoothing() {
        let engine = MonitorEngine::new(&MonitorBlueprint::default()).unwrap();
        engine.process(&update(1, 40.0, standing_keypoints(100.0))).unwrap();

        let mut kps = standing_keypoints(100.0);
        kps[2 * 5] = f64::NAN;
        let err = engine.process(&update(1, 40.0, kps)).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Input(contracts::MonitorError::NonFiniteKeypoint { index: 5, .. })
        ));

        for _ in 0..4 {
            let report = engine.process(&update(1, 40.0, standing_keypoints(100.0))).unwrap();
            assert_eq!(report.label, Some(PoseLabel::Standing));
            assert!(report.torso_angle.unwrap().is_finite());
        }
    }

    #[test]
    fn test_missing_landmark_reports_incomplete() {
        let engine = MonitorEngine::new(&MonitorBlueprint::default()).unwrap();
        let mut kps = standing_keypoints(100.0);
        kps[2 * 13] = -1.0;
        let report = engine.process(&update(1, 0.0, kps)).unwrap();
        assert_eq!(report.status, FrameStatus::IncompleteFrame);
        assert_eq!(report.label, None);
        assert_eq!(report.torso_angle, None);
    }

    #[test]
    fn test_degenerate_geometry_yields_no_pose() {
        let engine = MonitorEngine::new(&MonitorBlueprint::default()).unwrap();

        // every landmark on one point: torso and thigh have zero length
        let collapsed = TrackUpdate {
            window_size: Some(1),
            ..update(2, 40.0, vec![50.0; 34])
        };
        let report = engine.process(&collapsed).unwrap();
        assert_eq!(report.status, FrameStatus::DegenerateGeometry);
        assert_eq!(report.label, None);
        assert_eq!(report.torso_angle, None);
        assert_eq!(report.verdict(), Default::default());
    }

    #[test]
    fn test_encrypted_mode_hides_angles() {
        let mut blueprint = MonitorBlueprint::default();
        blueprint.privacy.mode = ClassifierMode::Encrypted;
        let engine = MonitorEngine::new(&blueprint).unwrap();
        assert_eq!(engine.mode(), ClassifierMode::Encrypted);

        let report = engine.process(&update(1, 40.0, standing_keypoints(100.0))).unwrap();
        assert_eq!(report.label, Some(PoseLabel::Standing));
        assert_eq!(report.torso_angle, None);
        let flags = report.flags.unwrap();
        assert!(!flags.torso_ge_30 && !flags.torso_ge_80);
    }

    #[test]
    fn test_feature_beyond_validated_range_fails_closed() {
        let mut blueprint = MonitorBlueprint::default();
        blueprint.privacy.mode = ClassifierMode::Encrypted;
        blueprint.privacy.max_feature_value = 300.0;
        let engine = MonitorEngine::new(&blueprint).unwrap();

        let report = engine.process(&update(1, 40.0, standing_keypoints(100.0))).unwrap();
        assert_eq!(report.status, FrameStatus::Classified);

        let mut stretched = standing_keypoints(100.0);
        stretched[2 * 15 + 1] = 5000.0;
        stretched[2 * 16 + 1] = 5000.0;
        let report = engine.process(&update(2, 40.0, stretched)).unwrap();
        assert_eq!(report.status, FrameStatus::FailedClosed);
        assert_eq!(report.label, None);
        assert!(!report.fall_alert);
    }

    #[test]
    fn test_bad_keys_fail_at_startup() {
        let mut blueprint = MonitorBlueprint::default();
        blueprint.privacy.mode = ClassifierMode::Encrypted;
        blueprint.privacy.keys = Some(KeyConfig {
            p: "7".into(),
            q: "11".into(),
            r: "13".into(),
            s: "17".into(),
            t: "19".into(),
            w: "23".into(),
            u: "29".into(),
        });
        let err = MonitorEngine::new(&blueprint).unwrap_err();
        assert!(matches!(err, EngineError::Crypto(_)));
    }

    #[test]
    fn test_forget_and_evict() {
        let mut blueprint = MonitorBlueprint::default();
        blueprint.tracks.max_idle_frames = 3;
        let engine = MonitorEngine::new(&blueprint).unwrap();

        engine.process(&update(1, 40.0, standing_keypoints(100.0))).unwrap();
        for _ in 0..5 {
            engine.process(&update(2, 40.0, standing_keypoints(100.0))).unwrap();
        }
        assert_eq!(engine.evict_idle(), 1);
        assert!(engine.forget_track(&TrackKey::new("cam", 2)));
        assert_eq!(engine.forget_source("cam"), 0);
        assert_eq!(engine.active_tracks(), 0);
    }
}
