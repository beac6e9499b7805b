//! Message ports
//!
//! The engine is a reactor over typed messages: [`InboundMessage`]s come in
//! from the host's event bus, [`OutboundMessage`]s go out as vehicle commands
//! or observer events. On the wire every message is
//! `{"event": <name>, "payload": <value>}`.

use crate::engine::EnginePhase;
use crate::hold::{HoldAxis, HoldRequest, HoldState};
use crate::instructions::WireInstruction;
use crate::navigation::NavigationSnapshot;
use crate::settings::Settings;
use serde::{Deserialize, Serialize};

/// Events consumed by the engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum InboundMessage {
    RouteStart(Vec<WireInstruction>),
    RouteAbort,
    NavigationUpdate(NavigationSnapshot),
    DepthHoldState(HoldState),
    HeadingHoldState(HoldState),
    SettingsChange(Settings),
}

impl InboundMessage {
    pub fn name(&self) -> &'static str {
        match self {
            Self::RouteStart(_) => "route-start",
            Self::RouteAbort => "route-abort",
            Self::NavigationUpdate(_) => "navigation-update",
            Self::DepthHoldState(_) => "depth-hold-state",
            Self::HeadingHoldState(_) => "heading-hold-state",
            Self::SettingsChange(_) => "settings-change",
        }
    }
}

/// Commands for the motor and hold controllers.
///
/// The engine is the only writer on this channel while a route runs; manual
/// motor input must not be interleaved with an active route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload")]
pub enum VehicleCommand {
    #[serde(rename = "motor.set-throttle")]
    SetThrottle(f64),
    #[serde(rename = "motor.set-yaw")]
    SetYaw(f64),
    #[serde(rename = "motor.set-lift")]
    SetLift(f64),
    #[serde(rename = "motor.all-stop")]
    AllStop,
    #[serde(rename = "hold.set-depth")]
    SetDepthHold(HoldRequest),
    #[serde(rename = "hold.set-heading")]
    SetHeadingHold(HoldRequest),
}

impl VehicleCommand {
    pub fn throttle(rate: f64) -> Self {
        Self::SetThrottle(clamp_rate(rate))
    }

    pub fn yaw(rate: f64) -> Self {
        Self::SetYaw(clamp_rate(rate))
    }

    pub fn lift(rate: f64) -> Self {
        Self::SetLift(clamp_rate(rate))
    }

    pub fn hold(axis: HoldAxis, request: HoldRequest) -> Self {
        match axis {
            HoldAxis::Depth => Self::SetDepthHold(request),
            HoldAxis::Heading => Self::SetHeadingHold(request),
        }
    }
}

/// Motor rates are normalized to [-1, 1]
fn clamp_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        0.0
    } else {
        rate.clamp(-1.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Running,
    Completed,
}

/// Progress notifications for observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "payload", rename_all = "kebab-case")]
pub enum EngineEvent {
    TaskState { state: TaskStatus, index: usize },
    #[serde(rename = "engine-state")]
    PhaseChanged { phase: EnginePhase, index: Option<usize> },
    RouteCompleted,
    RouteAborted { index: Option<usize> },
    RouteRejected { reason: String },
    SettingsRejected { reason: String },
    ConfigurationNotReady { index: usize },
    TrajectoryCorrection { index: usize, attempt: u32, time_offset_ms: u64 },
}

/// Everything the engine emits, in emission order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OutboundMessage {
    Command(VehicleCommand),
    Event(EngineEvent),
}

impl From<VehicleCommand> for OutboundMessage {
    fn from(command: VehicleCommand) -> Self {
        Self::Command(command)
    }
}

impl From<EngineEvent> for OutboundMessage {
    fn from(event: EngineEvent) -> Self {
        Self::Event(event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_inbound_events() {
        let msg: InboundMessage = serde_json::from_value(json!({
            "event": "route-start",
            "payload": [{"type": "frw", "value": "5"}, {"type": "left", "value": 90}]
        }))
        .unwrap();
        assert_eq!(
            msg,
            InboundMessage::RouteStart(vec![
                WireInstruction::new("frw", "5"),
                WireInstruction::new("left", 90),
            ])
        );

        let msg: InboundMessage = serde_json::from_value(json!({"event": "route-abort"})).unwrap();
        assert_eq!(msg, InboundMessage::RouteAbort);

        let msg: InboundMessage = serde_json::from_value(json!({
            "event": "navigation-update",
            "payload": {"heading": -12.5}
        }))
        .unwrap();
        assert_eq!(
            msg,
            InboundMessage::NavigationUpdate(NavigationSnapshot {
                heading: Some(-12.5),
                depth: None
            })
        );

        let msg: InboundMessage = serde_json::from_value(json!({
            "event": "depth-hold-state",
            "payload": {"enabled": true, "target": 250}
        }))
        .unwrap();
        assert_eq!(
            msg,
            InboundMessage::DepthHoldState(HoldState {
                enabled: true,
                target: Some(250.0)
            })
        );

        let msg: InboundMessage = serde_json::from_value(json!({
            "event": "settings-change",
            "payload": {"rovSpeed": 2.0, "pollIntervalMs": 100}
        }))
        .unwrap();
        assert!(matches!(msg, InboundMessage::SettingsChange(s) if s.rov_speed == 2.0));
    }

    #[test]
    fn test_encode_outbound_messages() {
        let throttle = OutboundMessage::from(VehicleCommand::throttle(1.0));
        assert_eq!(
            serde_json::to_value(&throttle).unwrap(),
            json!({"event": "motor.set-throttle", "payload": 1.0})
        );

        let stop = OutboundMessage::from(VehicleCommand::AllStop);
        assert_eq!(serde_json::to_value(&stop).unwrap(), json!({"event": "motor.all-stop"}));

        let hold = OutboundMessage::from(VehicleCommand::SetDepthHold(HoldRequest {
            enabled: true,
            target: Some(300.0),
        }));
        assert_eq!(
            serde_json::to_value(&hold).unwrap(),
            json!({"event": "hold.set-depth", "payload": {"enabled": true, "target": 300.0}})
        );

        let task = OutboundMessage::from(EngineEvent::TaskState {
            state: TaskStatus::Completed,
            index: 1,
        });
        assert_eq!(
            serde_json::to_value(&task).unwrap(),
            json!({"event": "task-state", "payload": {"state": "completed", "index": 1}})
        );
    }

    #[test]
    fn test_outbound_round_trips_through_untagged() {
        let original = OutboundMessage::from(VehicleCommand::yaw(-1.0));
        let text = serde_json::to_string(&original).unwrap();
        let decoded: OutboundMessage = serde_json::from_str(&text).unwrap();
        assert_eq!(decoded, original);
    }

    #[test]
    fn test_rates_are_clamped() {
        assert_eq!(VehicleCommand::throttle(3.0), VehicleCommand::SetThrottle(1.0));
        assert_eq!(VehicleCommand::lift(-7.5), VehicleCommand::SetLift(-1.0));
        assert_eq!(VehicleCommand::yaw(f64::NAN), VehicleCommand::SetYaw(0.0));
    }
}
