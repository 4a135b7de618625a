//! Fall monitor metrics
//!
//! Prometheus-style metrics recorded per frame report, plus an in-memory
//! aggregator for end-of-run summaries.

use std::collections::BTreeMap;

use contracts::{AlertLevel, FrameReport, FrameStatus};
use metrics::{counter, gauge, histogram};

/// Record metrics for one emitted report
///
/// # Example
///
/// ```ignore
/// use observability::metrics::record_frame_report;
///
/// let started = std::time::Instant::now();
/// let report = engine.process(&update)?;
/// record_frame_report(&report, started.elapsed().as_secs_f64() * 1000.0);
/// ```
pub fn record_frame_report(report: &FrameReport, latency_ms: f64) {
    counter!(
        "fall_monitor_frames_total",
        "status" => report.status.as_str()
    )
    .increment(1);

    if let Some(label) = report.label {
        counter!("fall_monitor_pose_labels_total", "label" => label.as_str()).increment(1);
    }

    let methods = [
        ("bbox_only", report.fall_detected_method1, report.fall_counter_method1),
        ("motion_pose", report.fall_detected_method2, report.fall_counter_method2),
        ("flexible", report.fall_detected_method3, report.fall_counter_method3),
    ];
    for (method, detected, count) in methods {
        if detected {
            counter!("fall_monitor_alarm_frames_total", "method" => method).increment(1);
        }
        histogram!("fall_monitor_counter_value", "method" => method).record(count as f64);
    }

    if report.fall_alert {
        counter!(
            "fall_monitor_alerts_total",
            "source_id" => report.source_id.to_string()
        )
        .increment(1);
    }

    histogram!("fall_monitor_overall_risk").record(report.diagnosis.overall_risk);
    histogram!("fall_monitor_classification_latency_ms").record(latency_ms);
}

/// Record the number of live tracks
pub fn record_active_tracks(count: usize) {
    gauge!("fall_monitor_active_tracks").set(count as f64);
}

/// Record tracks dropped by idle eviction or explicit forget
pub fn record_tracks_evicted(count: usize) {
    if count > 0 {
        counter!("fall_monitor_tracks_evicted_total").increment(count as u64);
    }
}

/// Record an input record that never reached the engine
pub fn record_rejected_update(reason: &'static str) {
    counter!("fall_monitor_rejected_updates_total", "reason" => reason).increment(1);
}

/// In-memory aggregation of frame reports
#[derive(Debug, Clone, Default)]
pub struct MonitorMetricsAggregator {
    pub total_frames: u64,

    /// Frames per pipeline status
    pub status_counts: BTreeMap<&'static str, u64>,

    /// Frames per pose label
    pub label_counts: BTreeMap<&'static str, u64>,

    /// Frames with each algorithm's alarm raised (1, 2, 3)
    pub alarm_frames: [u64; 3],

    /// Frames at each alert level
    pub alert_levels: BTreeMap<AlertLevel, u64>,

    pub rejected_updates: u64,

    pub latency_stats: RunningStats,

    pub risk_stats: RunningStats,
}

impl MonitorMetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, report: &FrameReport, latency_ms: f64) {
        self.total_frames += 1;
        *self.status_counts.entry(report.status.as_str()).or_insert(0) += 1;
        if let Some(label) = report.label {
            *self.label_counts.entry(label.as_str()).or_insert(0) += 1;
        }

        let detected = [
            report.fall_detected_method1,
            report.fall_detected_method2,
            report.fall_detected_method3,
        ];
        for (slot, hit) in self.alarm_frames.iter_mut().zip(detected) {
            *slot += hit as u64;
        }

        *self
            .alert_levels
            .entry(report.diagnosis.alert_level)
            .or_insert(0) += 1;
        self.latency_stats.push(latency_ms);
        self.risk_stats.push(report.diagnosis.overall_risk);
    }

    pub fn record_rejected(&mut self) {
        self.rejected_updates += 1;
    }

    pub fn summary(&self) -> MetricsSummary {
        let classified = self
            .status_counts
            .get(FrameStatus::Classified.as_str())
            .copied()
            .unwrap_or(0);
        MetricsSummary {
            total_frames: self.total_frames,
            classified_rate: if self.total_frames > 0 {
                classified as f64 / self.total_frames as f64 * 100.0
            } else {
                0.0
            },
            status_counts: self.status_counts.clone(),
            label_counts: self.label_counts.clone(),
            alarm_frames: self.alarm_frames,
            alert_levels: self.alert_levels.clone(),
            rejected_updates: self.rejected_updates,
            latency_ms: StatsSummary::from(&self.latency_stats),
            overall_risk: StatsSummary::from(&self.risk_stats),
        }
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Snapshot of an aggregator
#[derive(Debug, Clone, Default)]
pub struct MetricsSummary {
    pub total_frames: u64,
    pub classified_rate: f64,
    pub status_counts: BTreeMap<&'static str, u64>,
    pub label_counts: BTreeMap<&'static str, u64>,
    pub alarm_frames: [u64; 3],
    pub alert_levels: BTreeMap<AlertLevel, u64>,
    pub rejected_updates: u64,
    pub latency_ms: StatsSummary,
    pub overall_risk: StatsSummary,
}

impl std::fmt::Display for MetricsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Fall Monitor Summary ===")?;
        writeln!(
            f,
            "Frames: {} ({:.2}% classified)",
            self.total_frames, self.classified_rate
        )?;
        if self.rejected_updates > 0 {
            writeln!(f, "Rejected updates: {}", self.rejected_updates)?;
        }
        for (status, count) in &self.status_counts {
            writeln!(f, "  status {status}: {count}")?;
        }
        for (label, count) in &self.label_counts {
            writeln!(f, "  pose {label}: {count}")?;
        }
        writeln!(
            f,
            "Alarm frames: method1={} method2={} method3={}",
            self.alarm_frames[0], self.alarm_frames[1], self.alarm_frames[2]
        )?;
        for (level, count) in &self.alert_levels {
            writeln!(f, "  alert {level:?}: {count}")?;
        }
        writeln!(f, "Latency (ms): {}", self.latency_ms)?;
        writeln!(f, "Overall risk: {}", self.overall_risk)?;
        Ok(())
    }
}

/// min / max / mean / std of one series
#[derive(Debug, Clone, Default)]
pub struct StatsSummary {
    pub count: u64,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub std_dev: f64,
}

impl From<&RunningStats> for StatsSummary {
    fn from(stats: &RunningStats) -> Self {
        Self {
            count: stats.count,
            min: stats.min,
            max: stats.max,
            mean: stats.mean(),
            std_dev: stats.std_dev(),
        }
    }
}

impl std::fmt::Display for StatsSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.count == 0 {
            return write!(f, "N/A");
        }
        write!(
            f,
            "min={:.3}, max={:.3}, mean={:.3}, std={:.3} (n={})",
            self.min, self.max, self.mean, self.std_dev, self.count
        )
    }
}

/// Online mean/variance (Welford)
#[derive(Debug, Clone, Default)]
pub struct RunningStats {
    count: u64,
    mean: f64,
    m2: f64,
    min: f64,
    max: f64,
}

impl RunningStats {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        if self.count == 1 {
            self.min = value;
            self.max = value;
            self.mean = value;
            self.m2 = 0.0;
            return;
        }

        self.min = self.min.min(value);
        self.max = self.max.max(value);
        let delta = value - self.mean;
        self.mean += delta / self.count as f64;
        self.m2 += delta * (value - self.mean);
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.mean
        }
    }

    /// Sample variance
    pub fn variance(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            self.m2 / (self.count - 1) as f64
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{Diagnosis, FallVerdict, MethodVerdict, PoseLabel};

    fn report(status: FrameStatus, label: Option<PoseLabel>, alarm: bool) -> FrameReport {
        let verdict = if alarm {
            FallVerdict {
                bbox_only: MethodVerdict::new(true, 2),
                motion_pose: MethodVerdict::new(true, 2),
                flexible: MethodVerdict::new(true, 2),
            }
        } else {
            FallVerdict::default()
        };
        FrameReport::new(
            "cam".into(),
            1,
            status,
            label,
            None,
            verdict,
            2,
            None,
            Diagnosis {
                fall_detected: alarm,
                fall_confidence: if alarm { 1.0 } else { 0.0 },
                overall_risk: if alarm { 1.0 } else { 0.1 },
                alert_level: if alarm { AlertLevel::Critical } else { AlertLevel::Normal },
                recommendations: vec![],
            },
        )
    }

    #[test]
    fn test_running_stats() {
        let mut stats = RunningStats::default();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            stats.push(v);
        }
        assert_eq!(stats.count(), 5);
        assert!((stats.mean() - 3.0).abs() < 1e-10);
        assert!((stats.min() - 1.0).abs() < 1e-10);
        assert!((stats.max() - 5.0).abs() < 1e-10);
        assert!((stats.variance() - 2.5).abs() < 1e-10);
    }

    #[test]
    fn test_aggregator_update() {
        let mut agg = MonitorMetricsAggregator::new();
        agg.update(&report(FrameStatus::Classified, Some(PoseLabel::Standing), false), 0.5);
        agg.update(&report(FrameStatus::Classified, Some(PoseLabel::LyingDown), true), 0.7);
        agg.update(&report(FrameStatus::IncompleteFrame, None, false), 0.1);

        assert_eq!(agg.total_frames, 3);
        assert_eq!(agg.status_counts.get("classified"), Some(&2));
        assert_eq!(agg.status_counts.get("incomplete_frame"), Some(&1));
        assert_eq!(agg.label_counts.get("lying_down"), Some(&1));
        assert_eq!(agg.alarm_frames, [1, 1, 1]);
        assert_eq!(agg.alert_levels.get(&AlertLevel::Critical), Some(&1));
        assert_eq!(agg.latency_stats.count(), 3);
    }

    #[test]
    fn test_summary_display() {
        let mut agg = MonitorMetricsAggregator::new();
        agg.update(&report(FrameStatus::Classified, Some(PoseLabel::Sitting), false), 1.0);
        agg.record_rejected();

        let output = agg.summary().to_string();
        assert!(output.contains("Frames: 1 (100.00% classified)"));
        assert!(output.contains("Rejected updates: 1"));
        assert!(output.contains("pose sitting: 1"));
    }

    #[test]
    fn test_record_functions_without_recorder() {
        // no global recorder installed: must be a no-op
        record_frame_report(&report(FrameStatus::Classified, None, true), 1.0);
        record_active_tracks(3);
        record_tracks_evicted(2);
        record_rejected_update("keypoint_shape");
    }
}
