//! Error types for the autopilot engine
//!
//! Nothing here is fatal to the engine itself: every error condition ends
//! with the vehicle holding position (all-stop) while the engine waits for
//! corrected input or an abort.

use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, AutopilotError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AutopilotError {
    /// A movement instruction needs settings and no snapshot has arrived yet
    #[error("Configuration not ready: no settings received before dispatching task {index}")]
    ConfigurationNotReady { index: usize },

    #[error("Invalid settings: {0}")]
    InvalidSettings(String),

    #[error("Invalid instruction at position {index}: {reason}")]
    InvalidInstruction { index: usize, reason: String },

    #[error("Failed to load settings from {path}: {reason}")]
    SettingsLoad { path: String, reason: String },

    #[error("Autopilot executor is no longer running")]
    ExecutorClosed,
}

impl AutopilotError {
    pub fn invalid_settings(reason: impl Into<String>) -> Self {
        Self::InvalidSettings(reason.into())
    }

    pub fn invalid_instruction(index: usize, reason: impl Into<String>) -> Self {
        Self::InvalidInstruction {
            index,
            reason: reason.into(),
        }
    }

    /// Errors caused by client input rather than by engine state
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidSettings(_) | Self::InvalidInstruction { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AutopilotError::invalid_instruction(2, "value is negative");
        assert_eq!(
            err.to_string(),
            "Invalid instruction at position 2: value is negative"
        );

        let err = AutopilotError::ConfigurationNotReady { index: 0 };
        assert!(err.to_string().contains("no settings received"));
    }

    #[test]
    fn test_client_error_classification() {
        assert!(AutopilotError::invalid_settings("speed").is_client_error());
        assert!(AutopilotError::invalid_instruction(0, "bad").is_client_error());
        assert!(!AutopilotError::ExecutorClosed.is_client_error());
        assert!(!AutopilotError::ConfigurationNotReady { index: 1 }.is_client_error());
    }
}
