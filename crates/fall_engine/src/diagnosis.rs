//! Caregiver-facing risk assessment derived from a fall verdict.

use contracts::{AlertLevel, Diagnosis, FallVerdict, PoseLabel};

/// Baseline risk of a posture when no fall is underway
pub fn activity_risk(label: Option<PoseLabel>) -> f64 {
    match label {
        Some(PoseLabel::LyingDown) => 0.8,
        Some(PoseLabel::BendingDown) => 0.5,
        Some(PoseLabel::Standing) => 0.3,
        Some(PoseLabel::Sitting) => 0.2,
        Some(PoseLabel::Unknown) | None => 0.5,
    }
}

/// Confidence in [0, 1] from the hysteresis counters
pub fn fall_confidence(verdict: &FallVerdict, threshold: u32) -> f64 {
    let c1 = verdict.bbox_only.counter;
    let c2 = verdict.motion_pose.counter;
    let counter = if verdict.any_detected() { c1.max(c2) } else { c1.min(c2) };
    (counter as f64 / threshold.max(1) as f64).min(1.0)
}

pub fn alert_level(fall_detected: bool, risk: f64) -> AlertLevel {
    if fall_detected || risk >= 0.8 {
        AlertLevel::Critical
    } else if risk >= 0.6 {
        AlertLevel::High
    } else if risk >= 0.4 {
        AlertLevel::Medium
    } else if risk >= 0.2 {
        AlertLevel::Low
    } else {
        AlertLevel::Normal
    }
}

fn recommendations(fall_detected: bool, risk: f64, label: Option<PoseLabel>) -> Vec<String> {
    let mut out: Vec<&str> = Vec::new();
    if fall_detected {
        out.extend([
            "FALL DETECTED - Immediate caregiver attention required!",
            "Check patient position and vital signs immediately",
            "Emergency response may be needed",
        ]);
    } else if risk >= 0.8 {
        out.extend([
            "Immediate caregiver attention required",
            "High fall risk detected - monitor closely",
        ]);
    } else if risk >= 0.6 {
        out.extend([
            "Increased monitoring recommended",
            "Check patient environment for hazards",
        ]);
    }
    if label == Some(PoseLabel::LyingDown) {
        out.push("Monitor for prolonged immobility");
    }
    out.into_iter().map(String::from).collect()
}

/// Full assessment of one frame
pub fn diagnose(label: Option<PoseLabel>, verdict: &FallVerdict, threshold: u32) -> Diagnosis {
    let fall_detected = verdict.any_detected();
    let confidence = fall_confidence(verdict, threshold);
    let overall_risk = if fall_detected {
        0.8 + 0.2 * confidence
    } else {
        0.7 * confidence + 0.3 * activity_risk(label)
    }
    .min(1.0);

    Diagnosis {
        fall_detected,
        fall_confidence: confidence,
        overall_risk,
        alert_level: alert_level(fall_detected, overall_risk),
        recommendations: recommendations(fall_detected, overall_risk, label),
    }
}
