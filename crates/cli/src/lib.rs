//! # Fall Monitor CLI
//!
//! Replay pipeline shared by the `fall-monitor` binary and the integration
//! tests: JSONL track updates in, JSONL frame reports out.

pub mod error;
pub mod pipeline;

pub use error::CliError;
pub use pipeline::{Pipeline, PipelineConfig, PipelineStats};
