//! Scanner configuration.
//!
//! Covers preview geometry and the background queue. The recognized
//! symbologies are not configurable here; see [`super::DEFAULT_SYMBOLOGIES`].

use serde::{Deserialize, Serialize};
use std::path::Path;

/// How the live preview fills its bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum VideoGravity {
    /// Preserve aspect ratio, fit inside bounds.
    ResizeAspect,
    /// Preserve aspect ratio, fill bounds and crop the overflow.
    #[default]
    ResizeAspectFill,
    /// Stretch to bounds.
    Resize,
}

/// Visible bounds of the screen, in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScreenBounds {
    pub width: f64,
    pub height: f64,
}

impl Default for ScreenBounds {
    fn default() -> Self {
        Self {
            width: 375.0,
            height: 667.0,
        }
    }
}

/// Configuration for the capture pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Bounds the preview surface is sized to.
    pub preview_bounds: ScreenBounds,
    /// Fill policy for the preview surface.
    pub preview_gravity: VideoGravity,
    /// Label of the serial background queue (also its thread name).
    pub queue_label: String,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            preview_bounds: ScreenBounds::default(),
            preview_gravity: VideoGravity::ResizeAspectFill,
            queue_label: "barcode-scanner.session".to_string(),
        }
    }
}

impl ScannerConfig {
    /// Creates a configuration with the specified preview bounds.
    pub fn with_bounds(width: f64, height: f64) -> Self {
        Self {
            preview_bounds: ScreenBounds { width, height },
            ..Default::default()
        }
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let ScreenBounds { width, height } = self.preview_bounds;
        if !(width.is_finite() && height.is_finite()) || width <= 0.0 || height <= 0.0 {
            return Err(ConfigError::InvalidBounds);
        }
        if self.queue_label.trim().is_empty() {
            return Err(ConfigError::EmptyQueueLabel);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid preview bounds")]
    InvalidBounds,
    #[error("queue label must not be empty")]
    EmptyQueueLabel,
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FileConfig {
    #[serde(default)]
    pub scanner: ScannerConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// Output configuration for the demo binary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Keep scanning until interrupted (true) or stop after `code_count` results.
    pub continuous: bool,
    /// Number of results to present if not continuous.
    pub code_count: u32,
    /// Milliseconds between simulated camera frames.
    pub frame_interval_ms: u64,
    /// Metrics server port (0 to disable).
    pub metrics_port: u16,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            continuous: false,
            code_count: 3,
            frame_interval_ms: 100,
            metrics_port: 9090,
        }
    }
}

impl FileConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parses configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: FileConfig =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.scanner.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        let config = ScannerConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.preview_gravity, VideoGravity::ResizeAspectFill);
    }

    #[test]
    fn test_zero_bounds_invalid() {
        let config = ScannerConfig::with_bounds(0.0, 480.0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidBounds)));
    }

    #[test]
    fn test_empty_queue_label_invalid() {
        let mut config = ScannerConfig::default();
        config.queue_label = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyQueueLabel)
        ));
    }

    #[test]
    fn test_parse_partial_file() {
        let config = FileConfig::from_toml(
            r#"
            [scanner]
            preview_bounds = { width = 390.0, height = 844.0 }
            preview_gravity = "resize-aspect"
            queue_label = "scanner.test"

            [output]
            continuous = true
            code_count = 1
            frame_interval_ms = 50
            metrics_port = 0
            "#,
        )
        .unwrap();

        assert_eq!(config.scanner.preview_bounds.width, 390.0);
        assert_eq!(config.scanner.preview_gravity, VideoGravity::ResizeAspect);
        assert!(config.output.continuous);
        assert_eq!(config.output.metrics_port, 0);
    }

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = FileConfig::from_toml("").unwrap();
        assert_eq!(config.scanner.queue_label, "barcode-scanner.session");
        assert_eq!(config.output.code_count, 3);
    }

    #[test]
    fn test_invalid_file_rejected() {
        let result = FileConfig::from_toml("[scanner]\npreview_bounds = { width = -1.0, height = 1.0 }\npreview_gravity = \"resize\"\nqueue_label = \"q\"");
        assert!(matches!(result, Err(ConfigError::InvalidBounds)));
    }
}
