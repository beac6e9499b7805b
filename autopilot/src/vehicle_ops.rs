//! Vehicle Operations Trait
//!
//! This module defines the interface for the motor and hold controllers the
//! autopilot drives. The actual implementation is provided by the host (the
//! bridge crate, or a simulator in tests).

use crate::hold::HoldRequest;
use crate::messages::VehicleCommand;
use async_trait::async_trait;
use std::sync::Arc;

/// Result type for vehicle operations
pub type VehicleResult<T> = Result<T, String>;

/// Trait defining the vehicle operations needed by the autopilot
///
/// Rates are normalized to [-1, 1]. The autopilot calls these methods
/// without knowing how they reach the thrusters.
#[async_trait]
pub trait VehicleOps: Send + Sync {
    // =========================================================================
    // MOTOR OPERATIONS
    // =========================================================================

    /// Set forward/backward thrust rate
    async fn set_throttle(&self, rate: f64) -> VehicleResult<()>;

    /// Set yaw rate (negative turns left)
    async fn set_yaw(&self, rate: f64) -> VehicleResult<()>;

    /// Set vertical rate (positive rises)
    async fn set_lift(&self, rate: f64) -> VehicleResult<()>;

    /// Zero all motor output
    async fn all_stop(&self) -> VehicleResult<()>;

    // =========================================================================
    // HOLD CONTROLLER OPERATIONS
    // =========================================================================

    /// Engage or release depth hold (target in controller units)
    async fn set_depth_hold(&self, request: HoldRequest) -> VehicleResult<()>;

    /// Engage or release heading hold (target in degrees)
    async fn set_heading_hold(&self, request: HoldRequest) -> VehicleResult<()>;
}

/// Shared reference to vehicle operations
pub type SharedVehicleOps = Arc<dyn VehicleOps>;

/// Route a command to the matching operation
pub async fn apply_command(ops: &dyn VehicleOps, command: VehicleCommand) -> VehicleResult<()> {
    match command {
        VehicleCommand::SetThrottle(rate) => ops.set_throttle(rate).await,
        VehicleCommand::SetYaw(rate) => ops.set_yaw(rate).await,
        VehicleCommand::SetLift(rate) => ops.set_lift(rate).await,
        VehicleCommand::AllStop => ops.all_stop().await,
        VehicleCommand::SetDepthHold(request) => ops.set_depth_hold(request).await,
        VehicleCommand::SetHeadingHold(request) => ops.set_heading_hold(request).await,
    }
}

/// Vehicle operations that only log. Used when no vehicle is attached.
pub struct NullVehicleOps;

#[async_trait]
impl VehicleOps for NullVehicleOps {
    async fn set_throttle(&self, rate: f64) -> VehicleResult<()> {
        tracing::debug!("NullVehicleOps: set_throttle({})", rate);
        Ok(())
    }

    async fn set_yaw(&self, rate: f64) -> VehicleResult<()> {
        tracing::debug!("NullVehicleOps: set_yaw({})", rate);
        Ok(())
    }

    async fn set_lift(&self, rate: f64) -> VehicleResult<()> {
        tracing::debug!("NullVehicleOps: set_lift({})", rate);
        Ok(())
    }

    async fn all_stop(&self) -> VehicleResult<()> {
        tracing::debug!("NullVehicleOps: all_stop");
        Ok(())
    }

    async fn set_depth_hold(&self, request: HoldRequest) -> VehicleResult<()> {
        tracing::debug!("NullVehicleOps: set_depth_hold({:?})", request);
        Ok(())
    }

    async fn set_heading_hold(&self, request: HoldRequest) -> VehicleResult<()> {
        tracing::debug!("NullVehicleOps: set_heading_hold({:?})", request);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        calls: Mutex<Vec<String>>,
    }

    impl Recorder {
        fn push(&self, call: String) -> VehicleResult<()> {
            self.calls.lock().unwrap().push(call);
            Ok(())
        }
    }

    #[async_trait]
    impl VehicleOps for Recorder {
        async fn set_throttle(&self, rate: f64) -> VehicleResult<()> {
            self.push(format!("throttle {}", rate))
        }
        async fn set_yaw(&self, rate: f64) -> VehicleResult<()> {
            self.push(format!("yaw {}", rate))
        }
        async fn set_lift(&self, rate: f64) -> VehicleResult<()> {
            self.push(format!("lift {}", rate))
        }
        async fn all_stop(&self) -> VehicleResult<()> {
            self.push("stop".to_string())
        }
        async fn set_depth_hold(&self, request: HoldRequest) -> VehicleResult<()> {
            self.push(format!("depth {}", request.enabled))
        }
        async fn set_heading_hold(&self, request: HoldRequest) -> VehicleResult<()> {
            self.push(format!("heading {}", request.enabled))
        }
    }

    #[tokio::test]
    async fn test_apply_command_routes_to_operation() {
        let recorder = Recorder::default();
        apply_command(&recorder, VehicleCommand::throttle(1.0)).await.unwrap();
        apply_command(&recorder, VehicleCommand::yaw(-1.0)).await.unwrap();
        apply_command(&recorder, VehicleCommand::lift(1.0)).await.unwrap();
        apply_command(&recorder, VehicleCommand::AllStop).await.unwrap();
        apply_command(&recorder, VehicleCommand::SetDepthHold(HoldRequest::release())).await.unwrap();
        apply_command(
            &recorder,
            VehicleCommand::SetHeadingHold(HoldRequest {
                enabled: true,
                target: Some(10.0),
            }),
        )
        .await
        .unwrap();

        assert_eq!(
            *recorder.calls.lock().unwrap(),
            vec!["throttle 1", "yaw -1", "lift 1", "stop", "depth false", "heading true"]
        );
    }

    #[tokio::test]
    async fn test_null_ops_accepts_everything() {
        let ops: SharedVehicleOps = Arc::new(NullVehicleOps);
        assert!(apply_command(ops.as_ref(), VehicleCommand::AllStop).await.is_ok());
    }
}
