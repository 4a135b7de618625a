//! Configuration parsing
//!
//! TOML is the primary format, JSON is accepted as well.

use contracts::{MonitorBlueprint, MonitorError};

/// Configuration file format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// TOML (recommended)
    Toml,
    Json,
}

impl ConfigFormat {
    /// Infer format from a file extension
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "toml" => Some(Self::Toml),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// Parse TOML configuration
pub fn parse_toml(content: &str) -> Result<MonitorBlueprint, MonitorError> {
    toml::from_str(content).map_err(|e| MonitorError::ConfigParse {
        message: format!("TOML parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Parse JSON configuration
pub fn parse_json(content: &str) -> Result<MonitorBlueprint, MonitorError> {
    serde_json::from_str(content).map_err(|e| MonitorError::ConfigParse {
        message: format!("JSON parse error: {e}"),
        source: Some(Box::new(e)),
    })
}

pub fn parse(content: &str, format: ConfigFormat) -> Result<MonitorBlueprint, MonitorError> {
    match format {
        ConfigFormat::Toml => parse_toml(content),
        ConfigFormat::Json => parse_json(content),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::ClassifierMode;

    #[test]
    fn test_parse_toml_sections() {
        let content = r#"
[pose]
smoothing_window = 8

[fall]
queue_size = 10
v_bbox_y = 0.5

[privacy]
mode = "encrypted"
"#;
        let bp = parse_toml(content).unwrap();
        assert_eq!(bp.pose.smoothing_window, 8);
        assert_eq!(bp.pose.thigh_calf_ratio, 0.7);
        assert_eq!(bp.fall.queue_size, 10);
        assert_eq!(bp.fall.count_threshold, 2);
        assert_eq!(bp.privacy.mode, ClassifierMode::Encrypted);
    }

    #[test]
    fn test_parse_json_keys() {
        let content = r#"{
            "privacy": {
                "mode": "encrypted",
                "keys": { "p": "11", "q": "13", "r": "17", "s": "19",
                          "t": "23", "w": "29", "u": "31" }
            }
        }"#;
        let bp = parse_json(content).unwrap();
        let keys = bp.privacy.keys.unwrap();
        assert_eq!(keys.u, "31");
    }

    #[test]
    fn test_parse_toml_syntax_error() {
        let result = parse_toml("invalid toml [[[");
        assert!(matches!(result, Err(MonitorError::ConfigParse { .. })));
    }

    #[test]
    fn test_unknown_mode_is_parse_error() {
        let result = parse_toml("[privacy]\nmode = \"homomorphic\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_format_from_extension() {
        assert_eq!(ConfigFormat::from_extension("toml"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("TOML"), Some(ConfigFormat::Toml));
        assert_eq!(ConfigFormat::from_extension("json"), Some(ConfigFormat::Json));
        assert_eq!(ConfigFormat::from_extension("yaml"), None);
    }
}
