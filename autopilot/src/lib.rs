//! ROV autopilot instruction-execution engine
//!
//! Turns a client route (an ordered list of movement instructions) into timed
//! motor commands, polling live navigation telemetry to decide when each
//! instruction is done, when the vehicle has drifted off course, and when to
//! move on to the next instruction.
//!
//! The crate is split into a synchronous core ([`AutopilotEngine`]) that reacts
//! to typed messages at explicit instants, and a tokio actor
//! ([`AutopilotExecutor`]) that owns the core, sleeps until the next scheduled
//! timer and forwards vehicle commands to a [`VehicleOps`] implementation.

pub mod corrector;
pub mod engine;
pub mod error;
pub mod executor;
pub mod hold;
pub mod instructions;
pub mod messages;
pub mod monitor;
pub mod navigation;
pub mod queue;
pub mod settings;
pub mod timer;
pub mod vehicle_ops;

pub use corrector::TrajectoryCorrector;
pub use engine::{AutopilotEngine, EnginePhase, EngineState, ExecutionContext};
pub use error::{AutopilotError, Result};
pub use executor::{AutopilotExecutor, ExecutorCommand, ExecutorStatus, DEFAULT_EVENT_CAPACITY};
pub use hold::{HoldAxis, HoldRequest, HoldState, HoldStates};
pub use instructions::{Instruction, InstructionKind, Route, WireInstruction};
pub use messages::{EngineEvent, InboundMessage, OutboundMessage, TaskStatus, VehicleCommand};
pub use monitor::{CompletionMonitor, MonitorProgress};
pub use navigation::{heading_difference, normalize_heading, NavigationSnapshot};
pub use queue::InstructionQueue;
pub use settings::{Settings, SettingsStore};
pub use timer::{TimerId, TimerPurpose, TimerRegistry};
pub use vehicle_ops::{apply_command, NullVehicleOps, SharedVehicleOps, VehicleOps, VehicleResult};
