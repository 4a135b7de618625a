//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::MonitorBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    source: String,
    pose: PoseInfo,
    fall: FallInfo,
    privacy: PrivacyInfo,
    max_idle_frames: u64,
}

#[derive(Serialize)]
struct PoseInfo {
    smoothing_window: usize,
    missing_value: f64,
    thigh_calf_ratio: f64,
    torso_leg_ratio: f64,
}

#[derive(Serialize)]
struct FallInfo {
    queue_size: usize,
    fps: f64,
    v_bbox_y: f64,
    count_threshold: u32,
    history_ms: f64,
}

#[derive(Serialize)]
struct PrivacyInfo {
    mode: String,
    max_feature_value: f64,
    /// Key values are never printed
    custom_keys: bool,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    let source = match &args.config {
        Some(path) => {
            if !path.exists() {
                anyhow::bail!("Configuration file not found: {}", path.display());
            }
            path.display().to_string()
        }
        None => "(defaults)".to_string(),
    };
    info!(config = %source, "Loading configuration info");

    let blueprint = config_loader::ConfigLoader::load_or_default(args.config.as_deref())
        .with_context(|| format!("Failed to load config from {}", source))?;

    let info = build_config_info(&blueprint, source);
    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &MonitorBlueprint, source: String) -> ConfigInfo {
    let fall = &blueprint.fall;
    let history_ms = fall_engine::FallDetector::new(fall_engine::FallParams::from(fall))
        .elapsed_ms(fall.fps);

    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        source,
        pose: PoseInfo {
            smoothing_window: blueprint.pose.smoothing_window,
            missing_value: blueprint.pose.missing_value,
            thigh_calf_ratio: blueprint.pose.thigh_calf_ratio,
            torso_leg_ratio: blueprint.pose.torso_leg_ratio,
        },
        fall: FallInfo {
            queue_size: fall.queue_size,
            fps: fall.fps,
            v_bbox_y: fall.v_bbox_y,
            count_threshold: fall.count_threshold,
            history_ms,
        },
        privacy: PrivacyInfo {
            mode: blueprint.privacy.mode.as_str().to_string(),
            max_feature_value: blueprint.privacy.max_feature_value,
            custom_keys: blueprint.privacy.keys.is_some(),
        },
        max_idle_frames: blueprint.tracks.max_idle_frames,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("=== Fall Monitor Configuration ===");
    println!("Source: {} ({})\n", info.source, info.version);

    println!("Pose");
    println!("   ├─ Smoothing window: {} frames", info.pose.smoothing_window);
    println!("   ├─ Missing sentinel: {}", info.pose.missing_value);
    println!("   ├─ Thigh/calf ratio: {}", info.pose.thigh_calf_ratio);
    println!("   └─ Torso/leg ratio: {}", info.pose.torso_leg_ratio);

    println!("\nFall detector");
    println!(
        "   ├─ History: {} frames ({:.1} ms at {} fps)",
        info.fall.queue_size, info.fall.history_ms, info.fall.fps
    );
    println!("   ├─ Motion threshold: {} px/ms", info.fall.v_bbox_y);
    println!("   └─ Count threshold: {}", info.fall.count_threshold);

    println!("\nPrivacy");
    println!("   ├─ Mode: {}", info.privacy.mode);
    println!("   ├─ Max feature value: {}", info.privacy.max_feature_value);
    println!(
        "   └─ Keys: {}",
        if info.privacy.custom_keys {
            "configured"
        } else {
            "deployed"
        }
    );

    println!("\nTracks");
    println!("   └─ Max idle frames: {}", info.max_idle_frames);
    println!();
}
