//! Drive configuration parameters
//!
//! All tunable parameters for the tilt mixer and the link lifecycle.
//! Defaults are compiled in; the host may supply a JSON override at startup.
//! Nothing here is ever written back.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Tilt-to-PWM mixer constants.
///
/// Two sensor variants are in the field: the default set (`G = 4.5`,
/// `D = 0.5`) and the wide-range one from [`MixerConfig::wide`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerConfig {
    /// Sensor range `G`: raw readings are clamped to `[-G, G]`.
    pub sensor_range: f32,
    /// Dead zone `D`: readings with `|v| < D` count as zero.
    pub dead_zone: f32,
    /// Full-scale PWM duty value.
    pub max_pwm: i16,
}

impl MixerConfig {
    /// Wide-range sensor variant (`G = 5.5`, `D = 0.7`).
    pub const fn wide() -> Self {
        Self {
            sensor_range: 5.5,
            dead_zone: 0.7,
            max_pwm: 255,
        }
    }

    /// Reject values the mixer cannot work with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.sensor_range.is_finite() || self.sensor_range <= 0.0 {
            return Err(ConfigError::ValidationFailed(
                "sensor_range must be finite and positive",
            ));
        }
        if !self.dead_zone.is_finite() || self.dead_zone < 0.0 {
            return Err(ConfigError::ValidationFailed(
                "dead_zone must be finite and non-negative",
            ));
        }
        if self.dead_zone >= self.sensor_range {
            return Err(ConfigError::ValidationFailed(
                "dead_zone must be below sensor_range",
            ));
        }
        if self.max_pwm <= 0 {
            return Err(ConfigError::ValidationFailed("max_pwm must be positive"));
        }
        Ok(())
    }
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            sensor_range: 4.5,
            dead_zone: 0.5,
            max_pwm: 255,
        }
    }
}

/// Core drive configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriveConfig {
    // --- Mixer ---
    pub mixer: MixerConfig,

    // --- Timing ---
    /// Tilt sampling interval (milliseconds)
    pub sample_interval_ms: u32,
    /// Delay between the neutral command and closing the channel (milliseconds)
    pub disconnect_grace_ms: u32,

    // --- Link ---
    /// Opaque initialization line sent right after the channel opens.
    pub handshake: (i16, i16),
}

impl Default for DriveConfig {
    fn default() -> Self {
        Self {
            mixer: MixerConfig::default(),
            sample_interval_ms: 100, // 10 Hz
            disconnect_grace_ms: 500,
            handshake: (255, 255),
        }
    }
}

impl DriveConfig {
    /// Parse a (possibly partial) JSON override; missing fields keep defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json).map_err(|_| ConfigError::Corrupted)?;
        config.validate()?;
        Ok(config)
    }

    /// Range-check every field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.mixer.validate()?;
        if self.sample_interval_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "sample_interval_ms must be positive",
            ));
        }
        if self.disconnect_grace_ms == 0 {
            return Err(ConfigError::ValidationFailed(
                "disconnect_grace_ms must be positive",
            ));
        }
        Ok(())
    }
}

/// Errors from loading or validating a [`DriveConfig`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// The override could not be deserialized.
    Corrupted,
    /// A field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
        }
    }
}

impl core::error::Error for ConfigError {}
