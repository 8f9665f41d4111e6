//! Configuration parsing.
//!
//! Every field has a default, so an empty TOML document is a valid
//! configuration.
//!
//! ```toml
//! sample_interval_ms = 1000
//! alert_capacity = 50
//! tracked_label = "person"
//!
//! [camera]
//! ideal_width = 1280
//! ideal_height = 720
//! facing = "user"
//!
//! [overlay]
//! low_confidence_threshold = 0.5
//! normal_color = "#10b981"
//! warning_color = "#f59e0b"
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::camera::StreamConstraints;
use crate::detection::PERSON_LABEL;
use crate::error::ConfigError;
use crate::overlay::Rgba;

/// Top-level proctor configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProctorConfig {
    /// Detection cadence.
    pub sample_interval_ms: u64,

    /// Optional deadline for one detector call. An expired call counts as a
    /// detection failure for that tick.
    pub detection_timeout_ms: Option<u64>,

    /// Maximum number of alerts retained.
    pub alert_capacity: usize,

    /// Detection label counted as a person.
    pub tracked_label: String,

    pub camera: StreamConstraints,

    pub overlay: OverlayStyle,
}

impl Default for ProctorConfig {
    fn default() -> Self {
        Self {
            sample_interval_ms: 1000,
            detection_timeout_ms: None,
            alert_capacity: 50,
            tracked_label: PERSON_LABEL.to_string(),
            camera: StreamConstraints::default(),
            overlay: OverlayStyle::default(),
        }
    }
}

impl ProctorConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed or validated.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }

    /// Parse and validate configuration from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the TOML is invalid or a value is out of range.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sample_interval_ms == 0 {
            return Err(ConfigError::Validation(
                "sample_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.detection_timeout_ms == Some(0) {
            return Err(ConfigError::Validation(
                "detection_timeout_ms must be greater than zero when set".to_string(),
            ));
        }
        if self.alert_capacity == 0 {
            return Err(ConfigError::Validation(
                "alert_capacity must be greater than zero".to_string(),
            ));
        }
        if self.tracked_label.is_empty() {
            return Err(ConfigError::Validation(
                "tracked_label must not be empty".to_string(),
            ));
        }
        self.overlay.validate()
    }

    pub fn sample_interval(&self) -> Duration {
        Duration::from_millis(self.sample_interval_ms)
    }

    pub fn detection_timeout(&self) -> Option<Duration> {
        self.detection_timeout_ms.map(Duration::from_millis)
    }
}

/// Overlay appearance. Lengths are in source-frame pixels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverlayStyle {
    /// Scores below this use `warning_color`.
    pub low_confidence_threshold: f32,
    pub normal_color: Rgba,
    pub warning_color: Rgba,
    pub text_color: Rgba,
    pub line_width: f32,
    pub font_px: f32,
    pub label_height: f32,
    pub label_padding: f32,
    /// Used until the stream reports its intrinsic resolution.
    pub default_frame_width: u32,
    pub default_frame_height: u32,
}

impl Default for OverlayStyle {
    fn default() -> Self {
        Self {
            low_confidence_threshold: 0.5,
            normal_color: Rgba::EMERALD,
            warning_color: Rgba::AMBER,
            text_color: Rgba::WHITE,
            line_width: 3.0,
            font_px: 14.0,
            label_height: 25.0,
            label_padding: 5.0,
            default_frame_width: 640,
            default_frame_height: 480,
        }
    }
}

impl OverlayStyle {
    fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.low_confidence_threshold) {
            return Err(ConfigError::Validation(
                "overlay.low_confidence_threshold must be within [0, 1]".to_string(),
            ));
        }
        if self.default_frame_width == 0 || self.default_frame_height == 0 {
            return Err(ConfigError::Validation(
                "overlay default frame size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}
