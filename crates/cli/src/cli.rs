//! CLI argument definitions using clap.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Fall Monitor - pose classification and fall alarms from tracked skeletons
#[derive(Parser, Debug)]
#[command(
    name = "fall-monitor",
    author,
    version,
    about = "Skeletal fall monitor",
    long_about = "Classifies posture from tracked COCO keypoints, in plaintext or through \n\
                  blinded CRT comparisons, and raises fall alarms from bounding-box motion \n\
                  with hysteresis counters."
)]
pub struct Cli {
    /// Increase logging verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true, env = "FALL_MONITOR_VERBOSE")]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Log output format
    #[arg(
        long,
        value_enum,
        default_value = "pretty",
        global = true,
        env = "FALL_MONITOR_LOG_FORMAT"
    )]
    pub log_format: LogFormat,

    /// Prometheus metrics port (0 = disabled)
    #[arg(long, default_value = "0", global = true, env = "FALL_MONITOR_METRICS_PORT")]
    pub metrics_port: u16,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a JSONL file of track updates and emit frame reports
    Run(RunArgs),

    /// Validate configuration and key headroom without running
    Validate(ValidateArgs),

    /// Display the effective configuration
    Info(InfoArgs),
}

/// Arguments for the `run` command
#[derive(Parser, Debug, Clone)]
pub struct RunArgs {
    /// JSONL file with one track update per line
    #[arg(short, long, env = "FALL_MONITOR_INPUT")]
    pub input: PathBuf,

    /// Where to write JSONL frame reports (stdout when omitted)
    #[arg(short, long, env = "FALL_MONITOR_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Configuration file (TOML or JSON); defaults apply when omitted
    #[arg(short, long, env = "FALL_MONITOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the classifier mode from configuration
    #[arg(long, value_enum, env = "FALL_MONITOR_MODE")]
    pub mode: Option<ModeArg>,

    /// Number of worker tasks; each track is pinned to one worker
    #[arg(long, default_value = "4", env = "FALL_MONITOR_WORKERS")]
    pub workers: usize,

    /// Channel buffer size for internal queues
    #[arg(long, default_value = "256", env = "FALL_MONITOR_BUFFER_SIZE")]
    pub buffer_size: usize,

    /// Maximum number of records to replay (0 = unlimited)
    #[arg(long, default_value = "0", env = "FALL_MONITOR_MAX_FRAMES")]
    pub max_frames: u64,

    /// Suppress the end-of-run summary
    #[arg(long)]
    pub no_summary: bool,
}

/// Arguments for the `validate` command
#[derive(Parser, Debug)]
pub struct ValidateArgs {
    /// Path to configuration file to validate
    #[arg(short, long, env = "FALL_MONITOR_CONFIG")]
    pub config: PathBuf,

    /// Output validation result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the `info` command
#[derive(Parser, Debug)]
pub struct InfoArgs {
    /// Configuration file; defaults are shown when omitted
    #[arg(short, long, env = "FALL_MONITOR_CONFIG")]
    pub config: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Log output format
#[derive(ValueEnum, Clone, Copy, Debug, Default)]
pub enum LogFormat {
    /// JSON structured logging
    Json,
    /// Human-readable pretty format
    #[default]
    Pretty,
    /// Compact single-line format
    Compact,
}

impl From<LogFormat> for observability::LogFormat {
    fn from(format: LogFormat) -> Self {
        match format {
            LogFormat::Json => Self::Json,
            LogFormat::Pretty => Self::Pretty,
            LogFormat::Compact => Self::Compact,
        }
    }
}

/// Classifier mode override
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeArg {
    Plain,
    Encrypted,
}

impl From<ModeArg> for contracts::ClassifierMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Plain => Self::Plain,
            ModeArg::Encrypted => Self::Encrypted,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run() {
        let cli = Cli::try_parse_from([
            "fall-monitor",
            "run",
            "--input",
            "frames.jsonl",
            "--mode",
            "encrypted",
            "--workers",
            "2",
        ])
        .unwrap();

        match cli.command {
            Commands::Run(args) => {
                assert_eq!(args.input, PathBuf::from("frames.jsonl"));
                assert_eq!(args.mode, Some(ModeArg::Encrypted));
                assert_eq!(args.workers, 2);
                assert!(args.output.is_none());
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_quiet_conflicts_with_verbose() {
        let result = Cli::try_parse_from(["fall-monitor", "-q", "-v", "info"]);
        assert!(result.is_err());
    }
}
