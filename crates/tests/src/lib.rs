//! # Integration Tests
//!
//! Cross-crate scenarios for the fall monitor.
//!
//! Covers:
//! - Comparison circuit against the plaintext decision tree
//! - End-to-end fall scenarios in plain and encrypted mode
//! - JSONL replay through the CLI pipeline

/// Keypoint fixtures shared by the scenario modules
#[cfg(test)]
mod fixtures {
    use contracts::{BBox, TrackUpdate};

    /// Flat COCO keypoints for a subject whose hip center is at `(x, y)`.
    ///
    /// `torso_deg` is the torso angle from scene up; `thigh_up_deg` is the
    /// thigh uprightness (0 = hanging straight down). The calf continues the
    /// thigh direction.
    pub fn pose(x: f64, y: f64, torso_deg: f64, thigh_up_deg: f64) -> Vec<f64> {
        let dir = |deg: f64| {
            let r = deg.to_radians();
            (r.sin(), -r.cos())
        };
        let (tx, ty) = dir(torso_deg);
        let (lx, ly) = dir(180.0 - thigh_up_deg);

        let hip = (x, y);
        let shoulder = (x + tx * 60.0, y + ty * 60.0);
        let knee = (x + lx * 45.0, y + ly * 45.0);
        let ankle = (knee.0 + lx * 45.0, knee.1 + ly * 45.0);

        let mut kps = vec![0.0; 34];
        for (left, right, center) in [(5, 6, shoulder), (11, 12, hip), (13, 14, knee), (15, 16, ankle)] {
            kps[2 * left] = center.0 - 10.0;
            kps[2 * left + 1] = center.1;
            kps[2 * right] = center.0 + 10.0;
            kps[2 * right + 1] = center.1;
        }
        kps
    }

    pub fn standing() -> Vec<f64> {
        pose(100.0, 100.0, 0.0, 0.0)
    }

    pub fn lying() -> Vec<f64> {
        pose(100.0, 200.0, 85.0, 65.0)
    }

    pub fn update(track_id: u64, bbox_y: f64, keypoints: Vec<f64>) -> TrackUpdate {
        TrackUpdate {
            source_id: "ward-1".into(),
            track_id,
            bbox: BBox::new(60.0, bbox_y, 80.0, 180.0),
            keypoints,
            fps: Some(30.0),
            window_size: Some(1),
            v_bbox_threshold: None,
        }
    }
}

#[cfg(test)]
mod circuit_tests {
    use blinded::circuit;
    use contracts::{PoseLabel, PosePredicates};
    use pose_engine::classify_predicates;

    #[test]
    fn test_circuit_matches_tree_for_all_flag_combinations() {
        for bits in 0u8..64 {
            let flags = PosePredicates::from_bits(bits);
            assert_eq!(
                circuit::evaluate(&flags),
                classify_predicates(&flags),
                "flags {bits:06b}"
            );
        }
    }

    #[test]
    fn test_circuit_never_yields_unknown() {
        for bits in 0u8..64 {
            let label = circuit::evaluate(&PosePredicates::from_bits(bits));
            assert_ne!(label, PoseLabel::Unknown);
        }
    }
}

#[cfg(test)]
mod classifier_agreement_tests {
    use std::sync::Arc;

    use blinded::{EncryptedClassifier, KeyMaterial};
    use contracts::PoseMetrics;
    use pose_engine::{ClassifierThresholds, PlainClassifier};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_encrypted_labels_match_plain_labels() {
        let plain = PlainClassifier::new(ClassifierThresholds::default());
        let keys = Arc::new(KeyMaterial::deployed().unwrap());
        let encrypted = EncryptedClassifier::new(keys, 10_000.0).unwrap();
        let mut rng = StdRng::seed_from_u64(2024);

        let mut checked = 0;
        while checked < 300 {
            let thigh_length = rng.random_range(5.0..120.0);
            let calf_length = rng.random_range(5.0..120.0);
            let torso_height = rng.random_range(5.0..200.0);
            let leg_length = rng.random_range(5.0..250.0);
            let m = PoseMetrics {
                torso_angle: rng.random_range(0.0..180.0),
                thigh_uprightness: rng.random_range(0.0..180.0),
                thigh_length,
                calf_length,
                torso_height,
                leg_length,
                thigh_calf_ratio: thigh_length / calf_length,
                torso_leg_ratio: torso_height / leg_length,
                ..Default::default()
            };
            // truncation to hundredths may flip a ratio sitting on its threshold
            if (m.thigh_calf_ratio - 0.7).abs() < 0.01 || (m.torso_leg_ratio - 0.5).abs() < 0.01 {
                continue;
            }

            let verdict = encrypted.classify_with_rng(&m, &mut rng).unwrap();
            assert_eq!(verdict.label, plain.classify(&m), "{m:?}");
            assert_eq!(verdict.flags, plain.predicates(&m), "{m:?}");
            checked += 1;
        }
    }
}

#[cfg(test)]
mod scenario_tests {
    use contracts::{ClassifierMode, FrameStatus, MonitorBlueprint, PoseLabel};
    use fall_engine::registry::lock_track;
    use fall_engine::MonitorEngine;

    use crate::fixtures::{lying, standing, update};

    fn engine(mode: ClassifierMode) -> MonitorEngine {
        let mut blueprint = MonitorBlueprint::default();
        blueprint.privacy.mode = mode;
        MonitorEngine::new(&blueprint).unwrap()
    }

    fn warm_up(engine: &MonitorEngine, track_id: u64) {
        for _ in 0..5 {
            let report = engine.process(&update(track_id, 40.0, standing())).unwrap();
            assert_eq!(report.label, Some(PoseLabel::Standing));
            assert!(!report.fall_alert);
        }
    }

    fn lying_fall_raises_all_methods(mode: ClassifierMode) {
        let engine = engine(mode);
        warm_up(&engine, 1);

        let mut all_raised_at = None;
        for frame in 1..=3u32 {
            let report = engine
                .process(&update(1, 40.0 + 100.0 * frame as f64, lying()))
                .unwrap();
            assert_eq!(report.status, FrameStatus::Classified);
            assert_eq!(report.label, Some(PoseLabel::LyingDown));
            if report.fall_detected_method1
                && report.fall_detected_method2
                && report.fall_detected_method3
            {
                all_raised_at.get_or_insert(frame);
                assert!(report.fall_alert);
                assert!(report.diagnosis.fall_detected);
            }
        }
        assert!(all_raised_at.is_some_and(|f| f <= 3));
    }

    #[test]
    fn test_lying_fall_plain() {
        lying_fall_raises_all_methods(ClassifierMode::Plain);
    }

    #[test]
    fn test_lying_fall_encrypted() {
        lying_fall_raises_all_methods(ClassifierMode::Encrypted);
    }

    #[test]
    fn test_standing_ten_frames_stays_quiet() {
        for mode in [ClassifierMode::Plain, ClassifierMode::Encrypted] {
            let engine = engine(mode);
            for _ in 0..10 {
                let report = engine.process(&update(2, 40.0, standing())).unwrap();
                assert!(!report.fall_detected_method1);
                assert!(!report.fall_detected_method2);
                assert!(!report.fall_detected_method3);
                assert_eq!(report.fall_counter_method1, 0);
                assert_eq!(report.fall_counter_method2, 0);
                assert_eq!(report.fall_counter_method3, 0);
            }
        }
    }

    #[test]
    fn test_missing_keypoints_after_alarm_decay_counters() {
        let engine = engine(ClassifierMode::Plain);
        warm_up(&engine, 3);
        for frame in 1..=3u32 {
            engine
                .process(&update(3, 40.0 + 100.0 * frame as f64, lying()))
                .unwrap();
        }

        let key = contracts::TrackKey::new("ward-1", 3);
        let track = engine.registry().get(&key).unwrap();
        assert_eq!(lock_track(&track).counters.bbox_only, 2);

        let mut incomplete = lying();
        incomplete[2 * 15] = -1.0;
        for frame in 1..=5u32 {
            let report = engine.process(&update(3, 400.0, incomplete.clone())).unwrap();
            assert_eq!(report.status, FrameStatus::IncompleteFrame);
            assert!(!report.fall_alert);
            assert_eq!(report.verdict(), Default::default());

            let counters = lock_track(&track).counters;
            if frame >= 2 {
                assert_eq!(counters.bbox_only, 0);
                assert_eq!(counters.motion_pose, 0);
            }
        }
        assert!(lock_track(&track).history.is_warm());
    }

    #[test]
    fn test_dropped_keypoint_frame_mid_fall_still_alarms() {
        let engine = engine(ClassifierMode::Plain);
        warm_up(&engine, 4);

        let mut incomplete = lying();
        incomplete[2 * 15] = -1.0;
        let report = engine.process(&update(4, 90.0, incomplete)).unwrap();
        assert_eq!(report.status, FrameStatus::IncompleteFrame);

        let mut alarm_at = None;
        for frame in 1..=3u32 {
            let report = engine
                .process(&update(4, 40.0 + 100.0 * frame as f64, lying()))
                .unwrap();
            if report.fall_detected_method3 {
                alarm_at.get_or_insert(frame);
            }
        }
        assert_eq!(alarm_at, Some(1));
    }

    #[test]
    fn test_tracks_do_not_share_state() {
        let engine = engine(ClassifierMode::Plain);
        warm_up(&engine, 10);
        warm_up(&engine, 11);

        for frame in 1..=3u32 {
            let falling = engine
                .process(&update(10, 40.0 + 100.0 * frame as f64, lying()))
                .unwrap();
            let quiet = engine.process(&update(11, 40.0, standing())).unwrap();
            assert_eq!(quiet.label, Some(PoseLabel::Standing));
            assert!(!quiet.fall_alert);
            if frame == 3 {
                assert!(falling.fall_alert);
            }
        }
    }
}

#[cfg(test)]
mod config_tests {
    use config_loader::{ConfigFormat, ConfigLoader};
    use contracts::ClassifierMode;
    use fall_engine::MonitorEngine;

    #[test]
    fn test_engine_from_toml() {
        let toml = r#"
            [fall]
            queue_size = 3
            count_threshold = 4

            [privacy]
            mode = "encrypted"
        "#;
        let blueprint = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        let engine = MonitorEngine::new(&blueprint).unwrap();
        assert_eq!(engine.mode(), ClassifierMode::Encrypted);
        assert_eq!(engine.detector().threshold(), 4);
        assert_eq!(engine.detector().params().queue_size, 3);
    }

    #[test]
    fn test_headroom_violation_fails_at_startup() {
        let toml = r#"
            [privacy]
            mode = "encrypted"
            max_feature_value = 1e30
        "#;
        let blueprint = ConfigLoader::load_from_str(toml, ConfigFormat::Toml).unwrap();
        assert!(MonitorEngine::new(&blueprint).is_err());
    }
}

#[cfg(test)]
mod pipeline_tests {
    use std::collections::HashMap;
    use std::io::Write;

    use config_loader::ConfigLoader;
    use contracts::{ClassifierMode, FrameReport, PoseLabel};
    use fall_monitor_cli::{Pipeline, PipelineConfig};

    use crate::fixtures::{lying, standing, update};

    fn write_input(lines: &[String]) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();
        for line in lines {
            writeln!(file, "{line}").unwrap();
        }
        file
    }

    #[tokio::test]
    async fn test_replay_emits_ordered_reports_per_track() {
        let mut lines = Vec::new();
        for frame in 0..8u32 {
            let falling = if frame < 5 {
                update(1, 40.0, standing())
            } else {
                update(1, 40.0 + 100.0 * (frame - 4) as f64, lying())
            };
            lines.push(serde_json::to_string(&falling).unwrap());
            lines.push(serde_json::to_string(&update(2, 40.0, standing())).unwrap());
        }
        lines.push("{ not json".to_string());
        lines.push(serde_json::to_string(&update(3, 40.0, vec![1.0; 4])).unwrap());
        lines.push(String::new());

        let input = write_input(&lines);
        let output = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();

        let stats = Pipeline::new(PipelineConfig {
            blueprint: ConfigLoader::load_or_default(None).unwrap(),
            input: input.path().to_path_buf(),
            output: Some(output.path().to_path_buf()),
            workers: 3,
            buffer_size: 4,
            max_frames: None,
        })
        .run()
        .await
        .unwrap();

        assert_eq!(stats.records_read, 18);
        assert_eq!(stats.reports_written, 16);
        assert_eq!(stats.records_rejected, 2);
        assert_eq!(stats.metrics.rejected_updates, 2);
        assert_eq!(stats.active_tracks, 2);

        let text = std::fs::read_to_string(output.path()).unwrap();
        let mut by_track: HashMap<u64, Vec<FrameReport>> = HashMap::new();
        for line in text.lines() {
            let report: FrameReport = serde_json::from_str(line).unwrap();
            by_track.entry(report.track_id).or_default().push(report);
        }

        let falling = &by_track[&1];
        assert_eq!(falling.len(), 8);
        assert!(falling[..5].iter().all(|r| !r.fall_alert));
        // frames of one track come out in input order
        let counters: Vec<u32> = falling.iter().map(|r| r.fall_counter_method1).collect();
        assert_eq!(counters, vec![0, 0, 0, 0, 0, 1, 2, 2]);
        assert!(falling[7].fall_alert);

        assert!(by_track[&2].iter().all(|r| !r.fall_alert));
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_encrypted_replay_on_single_thread_runtime() {
        let mut lines = Vec::new();
        for frame in 0..8u32 {
            let record = if frame < 5 {
                update(5, 40.0, standing())
            } else {
                update(5, 40.0 + 100.0 * (frame - 4) as f64, lying())
            };
            lines.push(serde_json::to_string(&record).unwrap());
        }
        let input = write_input(&lines);
        let output = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();

        let mut blueprint = ConfigLoader::load_or_default(None).unwrap();
        blueprint.privacy.mode = ClassifierMode::Encrypted;
        let stats = Pipeline::new(PipelineConfig {
            blueprint,
            input: input.path().to_path_buf(),
            output: Some(output.path().to_path_buf()),
            workers: 2,
            buffer_size: 2,
            max_frames: None,
        })
        .run()
        .await
        .unwrap();
        assert_eq!(stats.reports_written, 8);

        let text = std::fs::read_to_string(output.path()).unwrap();
        let reports: Vec<FrameReport> =
            text.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
        assert!(reports.iter().all(|r| r.torso_angle.is_none()));
        assert_eq!(reports[4].label, Some(PoseLabel::Standing));
        assert_eq!(reports[7].label, Some(PoseLabel::LyingDown));
        assert!(reports[7].fall_alert);
    }

    #[tokio::test]
    async fn test_replay_respects_max_frames() {
        let lines: Vec<String> = (0..10)
            .map(|_| serde_json::to_string(&update(1, 40.0, standing())).unwrap())
            .collect();
        let input = write_input(&lines);
        let output = tempfile::Builder::new().suffix(".jsonl").tempfile().unwrap();

        let stats = Pipeline::new(PipelineConfig {
            blueprint: ConfigLoader::load_or_default(None).unwrap(),
            input: input.path().to_path_buf(),
            output: Some(output.path().to_path_buf()),
            workers: 1,
            buffer_size: 8,
            max_frames: Some(4),
        })
        .run()
        .await
        .unwrap();

        assert_eq!(stats.records_read, 4);
        assert_eq!(stats.reports_written, 4);
        assert_eq!(stats.metrics.summary().total_frames, 4);
    }

    #[tokio::test]
    async fn test_missing_input_is_an_error() {
        let result = Pipeline::new(PipelineConfig {
            blueprint: ConfigLoader::load_or_default(None).unwrap(),
            input: "/nonexistent/updates.jsonl".into(),
            output: None,
            workers: 1,
            buffer_size: 1,
            max_frames: None,
        })
        .run()
        .await;
        assert!(result.is_err());
    }
}
