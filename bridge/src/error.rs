//! Error types for the ROV bridge
//!
//! # Error Categories
//!
//! - Transport errors: stdin/stdout I/O, malformed lines
//! - Engine errors: anything surfaced by the autopilot
//! - Startup errors: logging and configuration

use rov_autopilot::AutopilotError;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum BridgeError {
    // =========================================================================
    // Transport Errors
    // =========================================================================

    #[error("I/O error: {0}")]
    Io(String),

    /// Inbound line that is not a known event
    #[error("Cannot decode inbound line: {reason}")]
    Decode { line: String, reason: String },

    #[error("Cannot encode outbound message: {0}")]
    Encode(String),

    // =========================================================================
    // Engine Errors
    // =========================================================================

    #[error(transparent)]
    Autopilot(#[from] AutopilotError),

    // =========================================================================
    // Startup Errors
    // =========================================================================

    #[error("Logging initialization failed: {0}")]
    Logging(String),
}

impl BridgeError {
    pub fn decode(line: &str, reason: impl ToString) -> Self {
        Self::Decode {
            line: line.to_string(),
            reason: reason.to_string(),
        }
    }

    /// Errors that only affect one line and leave the stream usable
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::Decode { .. } | Self::Encode(_) => true,
            Self::Autopilot(e) => e.is_client_error(),
            Self::Io(_) | Self::Logging(_) => false,
        }
    }
}

impl From<std::io::Error> for BridgeError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_errors() {
        assert!(BridgeError::decode("{", "EOF while parsing").is_recoverable());
        assert!(BridgeError::from(AutopilotError::invalid_settings("bad")).is_recoverable());
        assert!(!BridgeError::from(AutopilotError::ExecutorClosed).is_recoverable());
        assert!(!BridgeError::from(std::io::Error::other("pipe closed")).is_recoverable());
    }

    #[test]
    fn test_autopilot_errors_are_transparent() {
        let err = BridgeError::from(AutopilotError::ExecutorClosed);
        assert_eq!(err.to_string(), AutopilotError::ExecutorClosed.to_string());
    }
}
