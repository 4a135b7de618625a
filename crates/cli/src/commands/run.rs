//! `run` command implementation.

use anyhow::{Context, Result};
use fall_monitor_cli::{CliError, Pipeline, PipelineConfig};
use tracing::{info, warn};

use crate::cli::RunArgs;

/// Execute the `run` command
pub async fn run_pipeline(args: &RunArgs) -> Result<()> {
    if let Some(path) = &args.config {
        if !path.exists() {
            return Err(CliError::config_not_found(path.display().to_string()).into());
        }
    }

    let mut blueprint = config_loader::ConfigLoader::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;

    if let Some(mode) = args.mode {
        info!(mode = ?mode, "Overriding classifier mode from CLI");
        blueprint.privacy.mode = mode.into();
    }

    info!(
        mode = blueprint.privacy.mode.as_str(),
        queue_size = blueprint.fall.queue_size,
        fps = blueprint.fall.fps,
        count_threshold = blueprint.fall.count_threshold,
        "Configuration loaded"
    );

    let pipeline = Pipeline::new(PipelineConfig {
        blueprint,
        input: args.input.clone(),
        output: args.output.clone(),
        workers: args.workers,
        buffer_size: args.buffer_size,
        max_frames: (args.max_frames != 0).then_some(args.max_frames),
    });

    let shutdown_signal = setup_shutdown_signal();

    tokio::select! {
        result = pipeline.run() => {
            let stats = result.context("Replay failed")?;
            if !args.no_summary {
                stats.print_summary();
            }
        }
        _ = shutdown_signal => {
            warn!("Received shutdown signal, stopping replay...");
        }
    }

    info!("Fall Monitor finished");
    Ok(())
}

/// Resolve on Ctrl+C or SIGTERM
async fn setup_shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
