//! Installation configuration: named fields, documented defaults, one
//! validation pass at load time.
//!
//! The config file is JSON; every field is optional and falls back to the
//! defaults below, so an empty `{}` is a valid configuration.

use serde::Deserialize;
use std::error::Error;
use std::fmt;
use std::fs;
use std::path::Path;

/// An inclusive `(min, max)` range for a tunable parameter.
#[derive(Clone, Copy, Debug, Deserialize, PartialEq)]
pub struct Range {
    pub min: f64,
    pub max: f64,
}

impl Range {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Tunables for the motion-mirror controller.
///
/// The two `Range` fields are the endpoints of the operator knobs: the
/// actual `fade` and `hue_rotation` values are interpolated between them
/// in `control_steps` discrete steps (one step per panel row).
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct MirrorConfig {
    /// Per-channel value above which a pixel counts as motion.
    pub brightness_threshold: u8,
    /// Hue advance per tick, knob endpoints.
    pub color_rotation: Range,
    /// Multiplicative decay of the previous composite, knob endpoints.
    pub fade: Range,
    /// Seconds a detected movement keeps counting as "recent".
    pub movement_timeout: f64,
    /// Seconds the control overlay stays visible after the last event.
    pub control_timeout: f64,
    /// Minimum number of above-threshold pixels for a frame to count as movement.
    pub min_move_count: usize,
    /// Cooldown in seconds after going idle before movement can re-wake us.
    pub min_sleep_time: f64,
    /// Consecutive movement frames required to wake from idle.
    pub min_wake_move: u32,
    /// Settings passed through to the fallback cycler.
    pub rotator: RotatorConfig,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            brightness_threshold: 10,
            color_rotation: Range::new(0.005, 0.1),
            fade: Range::new(0.90, 0.99),
            movement_timeout: 5.0,
            control_timeout: 2.0,
            min_move_count: 5,
            min_sleep_time: 5.0,
            min_wake_move: 3,
            rotator: RotatorConfig::default(),
        }
    }
}

/// Settings for the idle fallback cycler.
#[derive(Clone, Debug, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct RotatorConfig {
    /// Milliseconds between idle redraws.
    pub interval_ms: u64,
    /// Frames per full brightness pulse cycle.
    pub pulse_period: u32,
}

impl Default for RotatorConfig {
    fn default() -> Self {
        Self {
            interval_ms: 500,
            pulse_period: 64,
        }
    }
}

impl MirrorConfig {
    /// Load configuration from a JSON file and validate it.
    pub fn load(path: &Path) -> Result<Self, Box<dyn Error>> {
        let text = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations the controller cannot interpolate over.
    /// Called once at load/construction; the controller itself assumes
    /// a valid config thereafter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.fade.min > self.fade.max {
            return Err(ConfigError::InvertedRange("fade"));
        }
        if self.color_rotation.min > self.color_rotation.max {
            return Err(ConfigError::InvertedRange("color_rotation"));
        }
        if self.movement_timeout < 0.0 || self.min_sleep_time < 0.0 || self.control_timeout < 0.0 {
            return Err(ConfigError::NegativeTimeout);
        }
        Ok(())
    }
}

/// Validation failures for a [`MirrorConfig`].
#[derive(Debug, PartialEq, Eq)]
pub enum ConfigError {
    InvertedRange(&'static str),
    NegativeTimeout,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvertedRange(field) => {
                write!(f, "config range '{field}' has min > max")
            }
            ConfigError::NegativeTimeout => write!(f, "config timeouts must be non-negative"),
        }
    }
}

impl Error for ConfigError {}
