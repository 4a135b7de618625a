//! Replay pipeline module.

mod orchestrator;
mod stats;

pub use orchestrator::{shard_for, Pipeline, PipelineConfig};
pub use stats::PipelineStats;
