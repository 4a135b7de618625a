//! `validate` command implementation.

use anyhow::{Context, Result};
use blinded::KeyMaterial;
use contracts::MonitorBlueprint;
use serde::Serialize;
use tracing::info;

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    mode: String,
    queue_size: usize,
    count_threshold: u32,
    key_source: String,
    blinding_bits: u32,
    public_modulus_bits: u32,
    max_feature_value: f64,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{}", json);
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();
    let invalid = |config_path: String, error: String| ValidationResult {
        valid: false,
        config_path,
        error: Some(error),
        warnings: None,
        summary: None,
    };

    if !args.config.exists() {
        return invalid(
            config_path,
            format!("File not found: {}", args.config.display()),
        );
    }

    let blueprint = match config_loader::ConfigLoader::load_from_path(&args.config) {
        Ok(blueprint) => blueprint,
        Err(e) => return invalid(config_path, e.to_string()),
    };

    // keys are checked in plain mode too, so switching modes cannot fail later
    let keys = match KeyMaterial::from_config(blueprint.privacy.keys.as_ref()).and_then(|keys| {
        keys.validate_headroom(blueprint.privacy.max_feature_value)?;
        Ok(keys)
    }) {
        Ok(keys) => keys,
        Err(e) => return invalid(config_path, e.to_string()),
    };

    let warnings = collect_warnings(&blueprint);
    ValidationResult {
        valid: true,
        config_path,
        error: None,
        warnings: if warnings.is_empty() {
            None
        } else {
            Some(warnings)
        },
        summary: Some(ConfigSummary {
            version: format!("{:?}", blueprint.version),
            mode: blueprint.privacy.mode.as_str().to_string(),
            queue_size: blueprint.fall.queue_size,
            count_threshold: blueprint.fall.count_threshold,
            key_source: if blueprint.privacy.keys.is_some() {
                "configured".to_string()
            } else {
                "deployed".to_string()
            },
            blinding_bits: keys.u().significant_bits(),
            public_modulus_bits: keys.n2().significant_bits(),
            max_feature_value: blueprint.privacy.max_feature_value,
        }),
    }
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(blueprint: &MonitorBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.fall.fps <= 0.0 {
        warnings.push(
            "fall.fps is not positive - history age falls back to queue_size seconds".to_string(),
        );
    }

    if blueprint.fall.count_threshold == 1 {
        warnings.push(
            "fall.count_threshold = 1 - a single motion spike raises the bbox alarm".to_string(),
        );
    }

    if blueprint.pose.smoothing_window == 1 {
        warnings.push("pose.smoothing_window = 1 - keypoints are not smoothed".to_string());
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Mode: {}", summary.mode);
            println!("  Queue size: {}", summary.queue_size);
            println!("  Count threshold: {}", summary.count_threshold);
            println!(
                "  Keys: {} (u {} bits, p*q {} bits)",
                summary.key_source, summary.blinding_bits, summary.public_modulus_bits
            );
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {}", warning);
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {}", error);
        }
    }
}
