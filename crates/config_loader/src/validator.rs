//! Configuration validation
//!
//! Two passes:
//! - field ranges declared with `#[validate(...)]` on the blueprint types
//! - cross-field rules the derive cannot express
//!
//! Rules checked here:
//! - missing_value is finite and cannot be a plausible pixel coordinate
//! - key override strings are decimal integers
//! - the seven key constants are pairwise distinct

use std::collections::{BTreeMap, HashSet};

use contracts::{KeyConfig, MonitorBlueprint, MonitorError};
use validator::{Validate, ValidationErrors, ValidationErrorsKind};

/// Validate a MonitorBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &MonitorBlueprint) -> Result<(), MonitorError> {
    validate_ranges(blueprint)?;
    validate_missing_value(blueprint)?;
    if let Some(keys) = &blueprint.privacy.keys {
        validate_key_strings(keys)?;
        validate_key_distinct(keys)?;
    }
    Ok(())
}

/// Run the derived range checks and report the first failing field path
fn validate_ranges(blueprint: &MonitorBlueprint) -> Result<(), MonitorError> {
    blueprint.validate().map_err(|errors| {
        let field = first_field_path(&errors).unwrap_or_else(|| "<root>".to_string());
        MonitorError::config_validation(field, errors.to_string())
    })
}

/// Depth-first walk to the first leaf field, keys visited in sorted order
fn first_field_path(errors: &ValidationErrors) -> Option<String> {
    let sorted: BTreeMap<_, _> = errors.errors().iter().collect();
    for (name, kind) in sorted {
        match kind {
            ValidationErrorsKind::Field(_) => return Some(name.to_string()),
            ValidationErrorsKind::Struct(inner) => {
                let tail = first_field_path(inner).unwrap_or_default();
                return Some(format!("{name}.{tail}"));
            }
            ValidationErrorsKind::List(items) => {
                if let Some((index, inner)) = items.iter().next() {
                    let tail = first_field_path(inner).unwrap_or_default();
                    return Some(format!("{name}[{index}].{tail}"));
                }
            }
        }
    }
    None
}

/// The sentinel must never collide with a real coordinate
fn validate_missing_value(blueprint: &MonitorBlueprint) -> Result<(), MonitorError> {
    let sentinel = blueprint.pose.missing_value;
    if !sentinel.is_finite() {
        return Err(MonitorError::config_validation(
            "pose.missing_value",
            "missing_value must be finite",
        ));
    }
    if sentinel >= 0.0 {
        return Err(MonitorError::config_validation(
            "pose.missing_value",
            format!("missing_value must be negative, got {sentinel}"),
        ));
    }
    Ok(())
}

/// Key override strings must be plain decimal integers
fn validate_key_strings(keys: &KeyConfig) -> Result<(), MonitorError> {
    for (name, value) in keys.entries() {
        let trimmed = value.trim();
        if trimmed.is_empty() || !trimmed.bytes().all(|b| b.is_ascii_digit()) {
            return Err(MonitorError::config_validation(
                format!("privacy.keys.{name}"),
                format!("expected a decimal integer, got {value:?}"),
            ));
        }
    }
    Ok(())
}

/// Repeated constants would collapse the CRT system
fn validate_key_distinct(keys: &KeyConfig) -> Result<(), MonitorError> {
    let mut seen = HashSet::new();
    for (name, value) in keys.entries() {
        let normalized = value.trim().trim_start_matches('0');
        if !seen.insert(normalized) {
            return Err(MonitorError::config_validation(
                format!("privacy.keys.{name}"),
                "duplicate key constant",
            ));
        }
    }
    Ok(())
}
