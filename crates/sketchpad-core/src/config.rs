//! Sketchpad configuration.

use crate::debounce::DEFAULT_DEBOUNCE_MS;
use crate::sizing::{DEFAULT_BASE_SIZE, DEFAULT_MIN_WIDTH, SizingRules};
use crate::style::{self, DEFAULT_LINE_WIDTH, DEFAULT_MAX_LINE_WIDTH, StyleState};
use kurbo::Size;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Storage key for the persisted drawing.
pub const DEFAULT_STORAGE_KEY: &str = "sketchpad.canvas";

/// File name offered for exported drawings.
pub const DEFAULT_EXPORT_FILE_NAME: &str = "my-canvas.png";

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SketchConfig {
    pub title: String,
    /// Smallest logical surface width.
    pub min_width: f64,
    /// Largest logical surface width; with `base_height` fixes the aspect.
    pub base_width: f64,
    pub base_height: f64,
    pub stroke_color: String,
    pub background_color: String,
    pub line_width: f64,
    pub max_line_width: f64,
    pub storage_key: String,
    pub export_file_name: String,
    /// Quiet period for resize and pixel ratio changes, in milliseconds.
    pub resize_debounce_ms: u64,
}

impl Default for SketchConfig {
    fn default() -> Self {
        Self {
            title: "Sketchpad".to_string(),
            min_width: DEFAULT_MIN_WIDTH,
            base_width: DEFAULT_BASE_SIZE.width,
            base_height: DEFAULT_BASE_SIZE.height,
            stroke_color: "#000000".to_string(),
            background_color: "#ffffff".to_string(),
            line_width: DEFAULT_LINE_WIDTH,
            max_line_width: DEFAULT_MAX_LINE_WIDTH,
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            export_file_name: DEFAULT_EXPORT_FILE_NAME.to_string(),
            resize_debounce_ms: DEFAULT_DEBOUNCE_MS,
        }
    }
}

impl SketchConfig {
    /// Parse and validate a JSON config. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        positive("min_width", self.min_width)?;
        positive("base_width", self.base_width)?;
        positive("base_height", self.base_height)?;
        positive("line_width", self.line_width)?;
        positive("max_line_width", self.max_line_width)?;
        if self.min_width > self.base_width {
            return Err(invalid("min_width", "must not exceed base_width"));
        }
        if self.line_width > self.max_line_width {
            return Err(invalid("line_width", "must not exceed max_line_width"));
        }
        if style::parse_color(&self.stroke_color).is_none() {
            return Err(invalid("stroke_color", "expected #rrggbb or #rgb"));
        }
        if style::parse_color(&self.background_color).is_none() {
            return Err(invalid("background_color", "expected #rrggbb or #rgb"));
        }
        if self.storage_key.is_empty() {
            return Err(invalid("storage_key", "must not be empty"));
        }
        if self.export_file_name.is_empty() {
            return Err(invalid("export_file_name", "must not be empty"));
        }
        Ok(())
    }

    /// Sizing limits derived from this config.
    pub fn sizing_rules(&self) -> SizingRules {
        SizingRules {
            min_width: self.min_width,
            base_size: Size::new(self.base_width, self.base_height),
        }
    }

    /// Initial style state. Invalid colors fall back to the defaults.
    pub fn initial_style(&self) -> StyleState {
        let defaults = StyleState::default();
        StyleState {
            stroke_color: style::parse_color(&self.stroke_color).unwrap_or(defaults.stroke_color),
            background_color: style::parse_color(&self.background_color)
                .unwrap_or(defaults.background_color),
            line_width: self.line_width,
        }
    }

    pub fn resize_debounce(&self) -> Duration {
        Duration::from_millis(self.resize_debounce_ms)
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(field, "must be a positive number"))
    }
}

fn invalid(field: &'static str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        field,
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use peniko::Color;

    #[test]
    fn test_default_config_is_valid() {
        let config = SketchConfig::default();
        config.validate().unwrap();
        assert_eq!(config.export_file_name, "my-canvas.png");
        assert_eq!(config.sizing_rules(), SizingRules::default());
        assert_eq!(config.initial_style(), StyleState::default());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = SketchConfig::from_json(r##"{ "background_color": "#ff0000" }"##).unwrap();
        assert_eq!(config.initial_style().background_color, Color::from_rgba8(255, 0, 0, 255));
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(matches!(
            SketchConfig::from_json(r#"{ "min_width": 900 }"#),
            Err(ConfigError::Invalid { field: "min_width", .. })
        ));
        assert!(matches!(
            SketchConfig::from_json(r#"{ "stroke_color": "blue" }"#),
            Err(ConfigError::Invalid { field: "stroke_color", .. })
        ));
        assert!(matches!(
            SketchConfig::from_json(r#"{ "base_height": -1 }"#),
            Err(ConfigError::Invalid { field: "base_height", .. })
        ));
        assert!(matches!(SketchConfig::from_json("not json"), Err(ConfigError::Parse(_))));
    }
}
