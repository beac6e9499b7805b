//! Autopilot settings
//!
//! Settings arrive as whole snapshots from the host and replace the previous
//! snapshot atomically. The engine always reads the latest snapshot and never
//! assumes one has arrived.

use crate::error::{AutopilotError, Result};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_ROV_SPEED: f64 = 2.2;
pub const DEFAULT_HEADING_ERROR: f64 = 10.0;
pub const DEFAULT_DEPTH_ERROR: f64 = 5.0;
pub const DEFAULT_CHECKING_INTERVAL_MS: u64 = 100;
pub const DEFAULT_STABILIZATION_TIME_MS: u64 = 3000;
/// Fraction of the requested magnitude at which a movement counts as done
pub const DEFAULT_COMPLETION_THRESHOLD: f64 = 0.96;

fn default_rov_speed() -> f64 {
    DEFAULT_ROV_SPEED
}

fn default_heading_error() -> f64 {
    DEFAULT_HEADING_ERROR
}

fn default_depth_error() -> f64 {
    DEFAULT_DEPTH_ERROR
}

fn default_checking_interval() -> u64 {
    DEFAULT_CHECKING_INTERVAL_MS
}

fn default_stabilization_time() -> u64 {
    DEFAULT_STABILIZATION_TIME_MS
}

fn default_completion_threshold() -> f64 {
    DEFAULT_COMPLETION_THRESHOLD
}

/// Tunable autopilot parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Assumed forward speed in m/s, used for dead reckoning
    #[serde(rename = "rov_current_speed", alias = "rovSpeed", default = "default_rov_speed")]
    pub rov_speed: f64,
    /// Allowed heading deviation during forward motion, degrees
    #[serde(rename = "heading_error", alias = "headingErrorMargin", default = "default_heading_error")]
    pub heading_error_margin: f64,
    /// Allowed depth deviation during forward motion, meters
    #[serde(rename = "depth_error", alias = "depthErrorMargin", default = "default_depth_error")]
    pub depth_error_margin: f64,
    /// Completion monitor cadence, milliseconds
    #[serde(rename = "checking_interval", alias = "pollIntervalMs", default = "default_checking_interval")]
    pub poll_interval_ms: u64,
    /// Settling pause after a movement, milliseconds
    #[serde(rename = "stabilization_time", alias = "stabilizationMs", default = "default_stabilization_time")]
    pub stabilization_ms: u64,
    #[serde(alias = "completionThreshold", default = "default_completion_threshold")]
    pub completion_threshold: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            rov_speed: DEFAULT_ROV_SPEED,
            heading_error_margin: DEFAULT_HEADING_ERROR,
            depth_error_margin: DEFAULT_DEPTH_ERROR,
            poll_interval_ms: DEFAULT_CHECKING_INTERVAL_MS,
            stabilization_ms: DEFAULT_STABILIZATION_TIME_MS,
            completion_threshold: DEFAULT_COMPLETION_THRESHOLD,
        }
    }
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn stabilization(&self) -> Duration {
        Duration::from_millis(self.stabilization_ms)
    }

    /// Dead-reckoned travel time for a distance, in milliseconds
    pub fn distance_to_time_ms(&self, meters: f64) -> f64 {
        (meters / self.rov_speed) * 1000.0
    }

    /// Dead time added to a forward move by one trajectory correction
    pub fn correction_offset(&self) -> Duration {
        self.stabilization() + self.poll_interval()
    }

    pub fn validate(&self) -> Result<()> {
        if !self.rov_speed.is_finite() || self.rov_speed <= 0.0 {
            return Err(AutopilotError::invalid_settings(format!(
                "rov_current_speed must be positive, got {}",
                self.rov_speed
            )));
        }
        if !self.heading_error_margin.is_finite() || self.heading_error_margin < 0.0 {
            return Err(AutopilotError::invalid_settings(format!(
                "heading_error must be non-negative, got {}",
                self.heading_error_margin
            )));
        }
        if !self.depth_error_margin.is_finite() || self.depth_error_margin < 0.0 {
            return Err(AutopilotError::invalid_settings(format!(
                "depth_error must be non-negative, got {}",
                self.depth_error_margin
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(AutopilotError::invalid_settings(
                "checking_interval must be at least 1 ms",
            ));
        }
        if !(self.completion_threshold > 0.0 && self.completion_threshold <= 1.0) {
            return Err(AutopilotError::invalid_settings(format!(
                "completion_threshold must be in (0, 1], got {}",
                self.completion_threshold
            )));
        }
        Ok(())
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Settings = serde_json::from_str(json)
            .map_err(|e| AutopilotError::invalid_settings(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load and validate a settings document from disk
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| AutopilotError::SettingsLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_json_str(&contents).map_err(|e| AutopilotError::SettingsLoad {
            path: path.display().to_string(),
            reason: e.to_string(),
        })
    }

    /// Declared settings schema, as published to the host's settings UI
    pub fn schema() -> serde_json::Value {
        json!({
            "title": "Autopilot Plugin",
            "type": "object",
            "id": "autopilot",
            "properties": {
                "rov_current_speed": {
                    "type": "number",
                    "description": "Assumed forward speed used for dead reckoning",
                    "unit": "m/s",
                    "default": DEFAULT_ROV_SPEED,
                },
                "heading_error": {
                    "type": "number",
                    "description": "Allowed heading deviation while moving forward",
                    "unit": "degrees",
                    "default": DEFAULT_HEADING_ERROR,
                },
                "depth_error": {
                    "type": "number",
                    "description": "Allowed depth deviation while moving forward",
                    "unit": "meters",
                    "default": DEFAULT_DEPTH_ERROR,
                },
                "checking_interval": {
                    "type": "integer",
                    "description": "How often progress is checked",
                    "unit": "ms",
                    "default": DEFAULT_CHECKING_INTERVAL_MS,
                },
                "stabilization_time": {
                    "type": "integer",
                    "description": "Pause after each movement to let the vehicle settle",
                    "unit": "ms",
                    "default": DEFAULT_STABILIZATION_TIME_MS,
                },
                "completion_threshold": {
                    "type": "number",
                    "description": "Fraction of the requested movement that counts as done",
                    "default": DEFAULT_COMPLETION_THRESHOLD,
                },
            },
            "required": [
                "rov_current_speed",
                "heading_error",
                "depth_error",
                "checking_interval",
                "stabilization_time",
            ],
        })
    }
}

/// Holder of the latest settings snapshot; latest wins
#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    current: Option<Arc<Settings>>,
}

impl SettingsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the snapshot. Invalid settings leave the previous one in force.
    pub fn replace(&mut self, settings: Settings) -> Result<()> {
        settings.validate()?;
        self.current = Some(Arc::new(settings));
        Ok(())
    }

    pub fn current(&self) -> Option<Arc<Settings>> {
        self.current.clone()
    }

    pub fn is_ready(&self) -> bool {
        self.current.is_some()
    }
}
