//! Pipeline statistics.

use std::time::Duration;

use observability::MonitorMetricsAggregator;

/// Statistics from a replay run
#[derive(Debug, Clone, Default)]
pub struct PipelineStats {
    /// Non-blank input lines read
    pub records_read: u64,

    /// Reports written to the output
    pub reports_written: u64,

    /// Records that produced no report
    pub records_rejected: u64,

    /// Total duration of the run
    pub duration: Duration,

    pub workers: usize,

    /// Tracks alive at the end of the run
    pub active_tracks: usize,

    /// Tracks dropped by idle eviction
    pub tracks_evicted: usize,

    pub metrics: MonitorMetricsAggregator,
}

impl PipelineStats {
    /// Reports per second
    pub fn fps(&self) -> f64 {
        if self.duration.as_secs_f64() > 0.0 {
            self.reports_written as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    pub fn print_summary(&self) {
        eprintln!("\n=== Replay Statistics ===");
        eprintln!("  Duration: {:.2}s", self.duration.as_secs_f64());
        eprintln!("  Records read: {}", self.records_read);
        eprintln!("  Reports written: {}", self.reports_written);
        eprintln!("  Records rejected: {}", self.records_rejected);
        eprintln!("  Throughput: {:.2} frames/s", self.fps());
        eprintln!("  Workers: {}", self.workers);
        eprintln!(
            "  Tracks: {} active, {} evicted",
            self.active_tracks, self.tracks_evicted
        );
        eprintln!();
        eprint!("{}", self.metrics.summary());
    }
}
