//! # Config Loader
//!
//! Configuration loading for the fall monitor.
//!
//! Responsibilities:
//! - Parse TOML/JSON configuration files
//! - Validate field ranges and cross-field rules
//! - Produce a `MonitorBlueprint`
//!
//! # Example
//!
//! ```no_run
//! use config_loader::ConfigLoader;
//! use std::path::Path;
//!
//! let blueprint = ConfigLoader::load_from_path(Path::new("monitor.toml")).unwrap();
//! println!("queue size: {}", blueprint.fall.queue_size);
//! ```

mod parser;
mod validator;

pub use contracts::MonitorBlueprint;
pub use parser::ConfigFormat;

use contracts::MonitorError;
use std::path::Path;

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from file path
    ///
    /// Format is detected from the file extension (.toml / .json).
    ///
    /// # Errors
    /// - File read failure
    /// - Unsupported format
    /// - Parse failure
    /// - Validation failure
    pub fn load_from_path(path: &Path) -> Result<MonitorBlueprint, MonitorError> {
        let format = Self::detect_format(path)?;
        let content = Self::read_file(path)?;
        Self::load_from_str(&content, format)
    }

    /// Load configuration from string
    pub fn load_from_str(
        content: &str,
        format: ConfigFormat,
    ) -> Result<MonitorBlueprint, MonitorError> {
        let blueprint = parser::parse(content, format)?;
        validator::validate(&blueprint)?;
        Ok(blueprint)
    }

    /// Load from `path`, or fall back to validated defaults when no path is given
    pub fn load_or_default(path: Option<&Path>) -> Result<MonitorBlueprint, MonitorError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => {
                let blueprint = MonitorBlueprint::default();
                validator::validate(&blueprint)?;
                Ok(blueprint)
            }
        }
    }

    /// Serialize MonitorBlueprint to TOML string
    pub fn to_toml(blueprint: &MonitorBlueprint) -> Result<String, MonitorError> {
        toml::to_string_pretty(blueprint)
            .map_err(|e| MonitorError::config_parse(format!("TOML serialize error: {e}")))
    }

    /// Serialize MonitorBlueprint to JSON string
    pub fn to_json(blueprint: &MonitorBlueprint) -> Result<String, MonitorError> {
        serde_json::to_string_pretty(blueprint)
            .map_err(|e| MonitorError::config_parse(format!("JSON serialize error: {e}")))
    }
}

impl ConfigLoader {
    fn detect_format(path: &Path) -> Result<ConfigFormat, MonitorError> {
        let ext = path.extension().and_then(|e| e.to_str()).ok_or_else(|| {
            MonitorError::config_parse("cannot determine file format from extension")
        })?;

        ConfigFormat::from_extension(ext).ok_or_else(|| {
            MonitorError::config_parse(format!("unsupported config format: .{ext}"))
        })
    }

    fn read_file(path: &Path) -> Result<String, MonitorError> {
        Ok(std::fs::read_to_string(path)?)
    }
}
