//! Replay orchestrator.
//!
//! ```text
//! reader ──shard by track──► worker 0..N (MonitorEngine::process) ──► writer
//! ```
//!
//! Every track is pinned to one worker, so its frames stay in input order
//! while different tracks are classified in parallel. Workers hand each
//! frame to the blocking pool; encrypted classification is bignum work.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{FrameReport, MonitorBlueprint, TrackKey, TrackUpdate};
use fall_engine::MonitorEngine;
use observability::{
    record_active_tracks, record_frame_report, record_rejected_update, record_tracks_evicted,
};
use tokio::io::{AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::PipelineStats;
use crate::error::CliError;

/// Records between idle-eviction sweeps
const EVICTION_INTERVAL: u64 = 1024;

/// Pipeline configuration
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub blueprint: MonitorBlueprint,

    /// JSONL track updates
    pub input: PathBuf,

    /// JSONL frame reports (None = stdout)
    pub output: Option<PathBuf>,

    pub workers: usize,

    /// Channel buffer size
    pub buffer_size: usize,

    /// Maximum number of records to replay (None = unlimited)
    pub max_frames: Option<u64>,
}

enum WorkerEvent {
    Report { report: FrameReport, latency_ms: f64 },
    Rejected(CliError),
}

/// Main replay orchestrator
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self { config }
    }

    /// Run the replay to completion
    pub async fn run(self) -> Result<PipelineStats> {
        let start_time = Instant::now();
        let engine =
            Arc::new(MonitorEngine::new(&self.config.blueprint).context("Failed to build engine")?);

        let input = tokio::fs::File::open(&self.config.input)
            .await
            .with_context(|| format!("Failed to open {}", self.config.input.display()))?;

        let sink: Box<dyn AsyncWrite + Unpin + Send> = match &self.config.output {
            Some(path) => Box::new(
                tokio::fs::File::create(path)
                    .await
                    .with_context(|| format!("Failed to create {}", path.display()))?,
            ),
            None => Box::new(tokio::io::stdout()),
        };

        let workers = self.config.workers.max(1);
        let buffer_size = self.config.buffer_size.max(1);
        info!(
            mode = engine.mode().as_str(),
            workers,
            input = %self.config.input.display(),
            "Starting replay"
        );

        let (event_tx, event_rx) = mpsc::channel::<WorkerEvent>(buffer_size);
        let writer = tokio::spawn(write_reports(sink, event_rx));

        let mut shards = Vec::with_capacity(workers);
        let mut handles: Vec<JoinHandle<()>> = Vec::with_capacity(workers);
        for worker_id in 0..workers {
            let (tx, rx) = mpsc::channel::<(u64, TrackUpdate)>(buffer_size);
            shards.push(tx);
            handles.push(tokio::spawn(run_worker(
                worker_id,
                Arc::clone(&engine),
                rx,
                event_tx.clone(),
            )));
        }

        let mut lines = BufReader::new(input).lines();
        let mut line_no = 0u64;
        let mut records_read = 0u64;
        let mut tracks_evicted = 0usize;

        while let Some(line) = lines.next_line().await.context("Failed to read input")? {
            line_no += 1;
            if line.trim().is_empty() {
                continue;
            }
            if let Some(max) = self.config.max_frames {
                if records_read >= max {
                    info!(records = records_read, "Reached max frames limit");
                    break;
                }
            }
            records_read += 1;

            match serde_json::from_str::<TrackUpdate>(&line) {
                Ok(update) => {
                    let shard = shard_for(&update.key(), workers);
                    if shards[shard].send((line_no, update)).await.is_err() {
                        warn!(shard, "Worker channel closed");
                        break;
                    }
                }
                Err(e) => {
                    let rejected = CliError::malformed_record(line_no, e.to_string());
                    if event_tx.send(WorkerEvent::Rejected(rejected)).await.is_err() {
                        break;
                    }
                }
            }

            if records_read % EVICTION_INTERVAL == 0 {
                let evicted = engine.evict_idle();
                record_tracks_evicted(evicted);
                record_active_tracks(engine.active_tracks());
                tracks_evicted += evicted;
            }
        }

        drop(shards);
        drop(event_tx);
        for handle in handles {
            handle.await.context("Worker task panicked")?;
        }
        let mut stats = writer.await.context("Writer task panicked")??;

        record_active_tracks(engine.active_tracks());
        stats.records_read = records_read;
        stats.workers = workers;
        stats.active_tracks = engine.active_tracks();
        stats.tracks_evicted = tracks_evicted;
        stats.duration = start_time.elapsed();

        info!(
            records = stats.records_read,
            reports = stats.reports_written,
            rejected = stats.records_rejected,
            duration_secs = stats.duration.as_secs_f64(),
            "Replay complete"
        );
        Ok(stats)
    }
}

/// Stable worker index of a track
pub fn shard_for(key: &TrackKey, workers: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    key.hash(&mut hasher);
    (hasher.finish() % workers.max(1) as u64) as usize
}

async fn run_worker(
    worker_id: usize,
    engine: Arc<MonitorEngine>,
    mut rx: mpsc::Receiver<(u64, TrackUpdate)>,
    events: mpsc::Sender<WorkerEvent>,
) {
    while let Some((line, update)) = rx.recv().await {
        let engine = Arc::clone(&engine);
        let processed = tokio::task::spawn_blocking(move || {
            let started = Instant::now();
            let result = engine.process(&update);
            (result, started.elapsed())
        })
        .await;

        let event = match processed {
            Ok((Ok(report), elapsed)) => WorkerEvent::Report {
                report,
                latency_ms: elapsed.as_secs_f64() * 1000.0,
            },
            Ok((Err(source), _)) => WorkerEvent::Rejected(CliError::Rejected { line, source }),
            Err(e) => {
                warn!(worker_id, line, error = %e, "Engine task failed");
                continue;
            }
        };
        if events.send(event).await.is_err() {
            break;
        }
    }
    debug!(worker_id, "Worker finished");
}

async fn write_reports(
    sink: Box<dyn AsyncWrite + Unpin + Send>,
    mut events: mpsc::Receiver<WorkerEvent>,
) -> Result<PipelineStats> {
    let mut out = BufWriter::new(sink);
    let mut stats = PipelineStats::default();

    while let Some(event) = events.recv().await {
        match event {
            WorkerEvent::Report { report, latency_ms } => {
                record_frame_report(&report, latency_ms);
                stats.metrics.update(&report, latency_ms);

                let mut json =
                    serde_json::to_vec(&report).context("Failed to serialize frame report")?;
                json.push(b'\n');
                out.write_all(&json)
                    .await
                    .context("Failed to write frame report")?;
                stats.reports_written += 1;
            }
            WorkerEvent::Rejected(err) => {
                warn!(error = %err, "Record rejected");
                record_rejected_update(err.reason());
                stats.metrics.record_rejected();
                stats.records_rejected += 1;
            }
        }
    }

    out.flush().await.context("Failed to flush output")?;
    Ok(stats)
}
