//! Vehicle port that publishes commands on the event stream
//!
//! The bridge does not drive thrusters itself: every command becomes one
//! outbound line for the vehicle host to act on.

use crate::event::LineSink;
use async_trait::async_trait;
use rov_autopilot::{HoldRequest, OutboundMessage, VehicleCommand, VehicleOps, VehicleResult};
use std::sync::Arc;

pub struct LineVehicleOps {
    sink: Arc<LineSink>,
}

impl LineVehicleOps {
    pub fn new(sink: Arc<LineSink>) -> Self {
        Self { sink }
    }

    async fn publish(&self, command: VehicleCommand) -> VehicleResult<()> {
        tracing::debug!("Vehicle command: {:?}", command);
        self.sink
            .send(&OutboundMessage::Command(command))
            .await
            .map_err(|e| e.to_string())
    }
}

#[async_trait]
impl VehicleOps for LineVehicleOps {
    async fn set_throttle(&self, rate: f64) -> VehicleResult<()> {
        self.publish(VehicleCommand::throttle(rate)).await
    }

    async fn set_yaw(&self, rate: f64) -> VehicleResult<()> {
        self.publish(VehicleCommand::yaw(rate)).await
    }

    async fn set_lift(&self, rate: f64) -> VehicleResult<()> {
        self.publish(VehicleCommand::lift(rate)).await
    }

    async fn all_stop(&self) -> VehicleResult<()> {
        self.publish(VehicleCommand::AllStop).await
    }

    async fn set_depth_hold(&self, request: HoldRequest) -> VehicleResult<()> {
        self.publish(VehicleCommand::SetDepthHold(request)).await
    }

    async fn set_heading_hold(&self, request: HoldRequest) -> VehicleResult<()> {
        self.publish(VehicleCommand::SetHeadingHold(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;

    #[tokio::test]
    async fn test_commands_become_lines() {
        let (client, mut server) = tokio::io::duplex(4096);
        let sink = Arc::new(LineSink::new(client));
        let ops = LineVehicleOps::new(sink.clone());

        ops.set_yaw(-1.0).await.unwrap();
        ops.set_depth_hold(HoldRequest {
            enabled: true,
            target: Some(250.0),
        })
        .await
        .unwrap();
        sink.shutdown().await.unwrap();

        let mut output = String::new();
        server.read_to_string(&mut output).await.unwrap();
        assert_eq!(
            output,
            "{\"event\":\"motor.set-yaw\",\"payload\":-1.0}\n\
             {\"event\":\"hold.set-depth\",\"payload\":{\"enabled\":true,\"target\":250.0}}\n"
        );
    }
}
