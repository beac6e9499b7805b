//! Route execution engine
//!
//! [`AutopilotEngine`] is a synchronous reactor. It never sleeps and never
//! spawns: every call takes the current instant, mutates the execution
//! context, and appends commands and events to an outbox that the caller
//! drains with [`AutopilotEngine::drain_outputs`]. Waiting is expressed as a
//! timer in the [`TimerRegistry`]; the caller fires due timers through
//! [`AutopilotEngine::poll_timers`].

use crate::corrector::TrajectoryCorrector;
use crate::error::{AutopilotError, Result};
use crate::hold::{HoldAxis, HoldRequest, HoldStates};
use crate::instructions::{Instruction, InstructionKind, Route};
use crate::messages::{EngineEvent, InboundMessage, OutboundMessage, TaskStatus, VehicleCommand};
use crate::monitor::{CompletionMonitor, MonitorProgress};
use crate::navigation::NavigationSnapshot;
use crate::queue::InstructionQueue;
use crate::settings::{Settings, SettingsStore};
use crate::timer::{TimerId, TimerPurpose, TimerRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::time::Instant;

/// Engine state without its payload, for observers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnginePhase {
    Idle,
    Running,
    Stabilizing,
    AwaitingSettings,
    Aborting,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum EngineState {
    Idle,
    /// Motors driving, completion monitor polling
    Running(Instruction),
    /// Motors stopped, waiting for the vehicle to settle
    Stabilizing,
    /// Dispatch parked until the first settings snapshot arrives
    AwaitingSettings(Instruction),
    Aborting,
}

impl EngineState {
    pub fn phase(&self) -> EnginePhase {
        match self {
            Self::Idle => EnginePhase::Idle,
            Self::Running(_) => EnginePhase::Running,
            Self::Stabilizing => EnginePhase::Stabilizing,
            Self::AwaitingSettings(_) => EnginePhase::AwaitingSettings,
            Self::Aborting => EnginePhase::Aborting,
        }
    }
}

/// Position of the engine within the current route
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExecutionContext {
    /// Index of the active instruction in the client route; `None` when idle
    pub current_task_index: Option<usize>,
    /// Instruction being driven, settled or waited on
    pub active_instruction: Option<Instruction>,
    pub state: EngineState,
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            current_task_index: None,
            active_instruction: None,
            state: EngineState::Idle,
        }
    }
}

pub struct AutopilotEngine {
    context: ExecutionContext,
    queue: InstructionQueue,
    timers: TimerRegistry,
    settings: SettingsStore,
    navigation: NavigationSnapshot,
    holds: HoldStates,
    corrector: TrajectoryCorrector,
    monitor: Option<CompletionMonitor>,
    poll_timer: Option<TimerId>,
    outbox: Vec<OutboundMessage>,
}

impl Default for AutopilotEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AutopilotEngine {
    /// Engine with no settings yet; movement waits for a settings-change
    pub fn new() -> Self {
        Self {
            context: ExecutionContext::default(),
            queue: InstructionQueue::new(),
            timers: TimerRegistry::new(),
            settings: SettingsStore::new(),
            navigation: NavigationSnapshot::default(),
            holds: HoldStates::default(),
            corrector: TrajectoryCorrector::new(),
            monitor: None,
            poll_timer: None,
            outbox: Vec::new(),
        }
    }

    pub fn with_settings(settings: Settings) -> Result<Self> {
        let mut engine = Self::new();
        engine.settings.replace(settings)?;
        Ok(engine)
    }

    // =========================================================================
    // ACCESSORS
    // =========================================================================

    pub fn context(&self) -> &ExecutionContext {
        &self.context
    }

    pub fn phase(&self) -> EnginePhase {
        self.context.state.phase()
    }

    pub fn current_task_index(&self) -> Option<usize> {
        self.context.current_task_index
    }

    pub fn navigation(&self) -> &NavigationSnapshot {
        &self.navigation
    }

    pub fn holds(&self) -> &HoldStates {
        &self.holds
    }

    pub fn settings(&self) -> Option<Arc<Settings>> {
        self.settings.current()
    }

    /// Instructions still queued behind the active one
    pub fn pending_instructions(&self) -> usize {
        self.queue.len()
    }

    pub fn active_timers(&self) -> usize {
        self.timers.len()
    }

    pub fn correction_attempts(&self) -> u32 {
        self.corrector.attempts()
    }

    /// Earliest instant at which [`poll_timers`](Self::poll_timers) has work
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Take everything emitted since the last drain, in emission order
    pub fn drain_outputs(&mut self) -> Vec<OutboundMessage> {
        std::mem::take(&mut self.outbox)
    }

    // =========================================================================
    // INBOUND
    // =========================================================================

    /// React to one inbound message.
    ///
    /// Rejected routes and settings are reported as events and returned as
    /// errors; the engine keeps running with its previous state.
    pub fn handle(&mut self, message: InboundMessage, now: Instant) -> Result<()> {
        tracing::debug!("Handling {}", message.name());
        match message {
            InboundMessage::RouteStart(wire) => match Route::from_wire(&wire) {
                Ok(route) => {
                    self.start(route, now);
                    Ok(())
                }
                Err(e) => {
                    tracing::warn!("Rejected route: {}", e);
                    self.emit(EngineEvent::RouteRejected { reason: e.to_string() });
                    Err(e)
                }
            },
            InboundMessage::RouteAbort => {
                self.abort();
                Ok(())
            }
            InboundMessage::NavigationUpdate(update) => {
                self.navigation.merge(update);
                Ok(())
            }
            InboundMessage::DepthHoldState(state) => {
                self.holds.update(HoldAxis::Depth, state);
                Ok(())
            }
            InboundMessage::HeadingHoldState(state) => {
                self.holds.update(HoldAxis::Heading, state);
                Ok(())
            }
            InboundMessage::SettingsChange(settings) => self.apply_settings(settings, now),
        }
    }

    fn apply_settings(&mut self, settings: Settings, now: Instant) -> Result<()> {
        if let Err(e) = self.settings.replace(settings) {
            tracing::warn!("Rejected settings change: {}", e);
            self.emit(EngineEvent::SettingsRejected { reason: e.to_string() });
            return Err(e);
        }
        tracing::info!("Settings updated");

        if let EngineState::AwaitingSettings(instruction) = &self.context.state {
            let instruction = instruction.clone();
            tracing::info!("Settings arrived, dispatching parked {}", instruction);
            self.dispatch(instruction, now);
        }
        Ok(())
    }

    // =========================================================================
    // ROUTE CONTROL
    // =========================================================================

    /// Load a route and dispatch its first instruction, interrupting any
    /// route already in flight.
    pub fn start(&mut self, route: Route, now: Instant) {
        if self.phase() != EnginePhase::Idle || !self.timers.is_empty() {
            let cancelled = self.timers.drain();
            tracing::info!("New route interrupts the active one ({} timers cancelled)", cancelled);
            self.clear_execution();
            self.command(VehicleCommand::AllStop);
        }

        if route.is_empty() {
            tracing::warn!("Starting an empty route");
        } else {
            tracing::info!("Starting route with {} instructions", route.len());
        }

        // Some hold controllers snap to a zero target when enabled while
        // already enabled, so depth hold is switched off before it is engaged.
        self.command(VehicleCommand::hold(HoldAxis::Depth, HoldRequest::release()));
        self.engage_hold(HoldAxis::Depth);
        self.engage_hold(HoldAxis::Heading);

        self.queue.load(route);
        self.context.current_task_index = None;
        self.context.active_instruction = None;
        self.advance(now);
    }

    /// Stop the vehicle and tear down the route. Safe from any state and
    /// safe to repeat.
    pub fn abort(&mut self) {
        let was_active = self.phase() != EnginePhase::Idle || !self.queue.is_empty() || !self.timers.is_empty();
        let index = self.context.current_task_index;

        if was_active {
            self.set_state(EngineState::Aborting);
        }

        let cancelled = self.timers.drain();
        self.queue.clear();
        self.clear_execution();
        self.command(VehicleCommand::AllStop);

        self.context.current_task_index = None;
        self.context.active_instruction = None;
        self.set_state(EngineState::Idle);

        if was_active {
            tracing::info!("Route aborted at task {:?} ({} timers cancelled)", index, cancelled);
            self.emit(EngineEvent::RouteAborted { index });
        } else {
            tracing::debug!("Abort with no active route");
        }
    }

    /// Final teardown before the host goes away
    pub fn shutdown(&mut self) {
        tracing::info!("Autopilot engine shutting down");
        self.abort();
    }

    // =========================================================================
    // TIMERS
    // =========================================================================

    /// Fire every timer due at `now`, earliest first
    pub fn poll_timers(&mut self, now: Instant) {
        while let Some((id, purpose)) = self.timers.take_due(now) {
            match purpose {
                TimerPurpose::Poll => {
                    if self.poll_timer == Some(id) {
                        self.on_poll(now);
                    }
                }
                TimerPurpose::Stabilize => {
                    tracing::debug!("Stabilization finished");
                    self.advance(now);
                }
                TimerPurpose::Correction => self.resume_after_correction(now),
            }
        }
    }

    // =========================================================================
    // EXECUTION
    // =========================================================================

    /// Move to the next instruction, or finish the route when none is left.
    /// Unknown kinds are consumed here without touching the vehicle.
    fn advance(&mut self, now: Instant) {
        loop {
            let Some(instruction) = self.queue.next() else {
                self.finish_route();
                return;
            };
            let index = self.context.current_task_index.map_or(0, |i| i + 1);
            self.context.current_task_index = Some(index);

            if instruction.kind.is_known() {
                self.dispatch(instruction, now);
                return;
            }
            tracing::warn!("Skipping unknown instruction '{}' at task {}", instruction.kind, index);
        }
    }

    fn dispatch(&mut self, instruction: Instruction, now: Instant) {
        let index = self.context.current_task_index.unwrap_or(0);
        self.corrector.reset();
        self.context.active_instruction = Some(instruction.clone());

        let Some(settings) = self.settings.current() else {
            tracing::warn!("{}", AutopilotError::ConfigurationNotReady { index });
            self.command(VehicleCommand::AllStop);
            self.set_state(EngineState::AwaitingSettings(instruction));
            self.emit(EngineEvent::ConfigurationNotReady { index });
            return;
        };

        let Some(monitor) = CompletionMonitor::for_instruction(&instruction, &self.navigation, now) else {
            return;
        };

        tracing::info!("Dispatching task {}: {}", index, instruction);
        self.set_state(EngineState::Running(instruction.clone()));
        self.emit(EngineEvent::TaskState {
            state: TaskStatus::Running,
            index,
        });

        match instruction.kind {
            InstructionKind::Forward => self.command(VehicleCommand::throttle(1.0)),
            InstructionKind::Left => {
                self.command(VehicleCommand::hold(HoldAxis::Heading, HoldRequest::release()));
                self.command(VehicleCommand::yaw(-1.0));
            }
            InstructionKind::Right => {
                self.command(VehicleCommand::hold(HoldAxis::Heading, HoldRequest::release()));
                self.command(VehicleCommand::yaw(1.0));
            }
            InstructionKind::Ascend => {
                self.command(VehicleCommand::hold(HoldAxis::Depth, HoldRequest::release()));
                self.command(VehicleCommand::lift(1.0));
            }
            InstructionKind::Descend => {
                self.command(VehicleCommand::hold(HoldAxis::Depth, HoldRequest::release()));
                self.command(VehicleCommand::lift(-1.0));
            }
            InstructionKind::Unknown(_) => {}
        }

        self.monitor = Some(monitor);
        self.poll_timer = Some(self.timers.schedule_interval(settings.poll_interval(), now, TimerPurpose::Poll));
    }

    fn on_poll(&mut self, now: Instant) {
        let Some(settings) = self.settings.current() else {
            return;
        };
        let Some(monitor) = self.monitor.as_mut() else {
            return;
        };

        let progress = monitor.evaluate(&self.navigation, &settings, now);
        let is_distance = monitor.is_distance();

        match progress {
            MonitorProgress::Complete => self.on_instruction_complete(&settings, now),
            _ if is_distance => {
                if TrajectoryCorrector::is_following_direction(&self.navigation, &self.holds, &settings) {
                    // Re-assert in case something reset the motor rate
                    self.command(VehicleCommand::throttle(1.0));
                } else {
                    self.begin_correction(&settings, now);
                }
            }
            _ => {}
        }
    }

    fn on_instruction_complete(&mut self, settings: &Settings, now: Instant) {
        self.cancel_poll();
        self.monitor = None;
        self.command(VehicleCommand::AllStop);

        let index = self.context.current_task_index.unwrap_or(0);
        tracing::info!("Task {} completed", index);
        self.emit(EngineEvent::TaskState {
            state: TaskStatus::Completed,
            index,
        });

        match self.context.active_instruction.as_ref().map(|i| &i.kind) {
            Some(InstructionKind::Left | InstructionKind::Right) => self.engage_hold(HoldAxis::Heading),
            Some(InstructionKind::Ascend | InstructionKind::Descend) => self.engage_hold(HoldAxis::Depth),
            _ => {}
        }

        self.timers.schedule_timeout(settings.stabilization(), now, TimerPurpose::Stabilize);
        self.set_state(EngineState::Stabilizing);
    }

    fn begin_correction(&mut self, settings: &Settings, now: Instant) {
        self.cancel_poll();
        let Some(monitor) = self.monitor.take() else {
            return;
        };
        self.command(VehicleCommand::AllStop);

        let time_offset = monitor.time_offset() + settings.correction_offset();
        let delay = self.corrector.suspend(monitor, settings);
        self.timers.schedule_timeout(delay, now, TimerPurpose::Correction);

        let index = self.context.current_task_index.unwrap_or(0);
        let attempt = self.corrector.attempts();
        tracing::warn!(
            "Task {} off course, settling before resuming (attempt {}, offset {}ms)",
            index,
            attempt,
            time_offset.as_millis()
        );
        self.set_state(EngineState::Stabilizing);
        self.emit(EngineEvent::TrajectoryCorrection {
            index,
            attempt,
            time_offset_ms: u64::try_from(time_offset.as_millis()).unwrap_or(u64::MAX),
        });
    }

    fn resume_after_correction(&mut self, now: Instant) {
        let Some(monitor) = self.corrector.resume() else {
            return;
        };
        let (Some(settings), Some(instruction)) = (self.settings.current(), self.context.active_instruction.clone())
        else {
            return;
        };

        tracing::info!("Resuming {} after correction", instruction);
        self.set_state(EngineState::Running(instruction));
        self.command(VehicleCommand::throttle(1.0));
        self.monitor = Some(monitor);
        self.poll_timer = Some(self.timers.schedule_interval(settings.poll_interval(), now, TimerPurpose::Poll));
    }

    fn finish_route(&mut self) {
        tracing::info!("Route completed");
        self.clear_execution();
        self.context.current_task_index = None;
        self.context.active_instruction = None;
        self.set_state(EngineState::Idle);
        self.emit(EngineEvent::RouteCompleted);
    }

    // =========================================================================
    // HELPERS
    // =========================================================================

    fn engage_hold(&mut self, axis: HoldAxis) {
        let request = HoldRequest::engage(axis, &self.navigation);
        self.command(VehicleCommand::hold(axis, request));
    }

    fn cancel_poll(&mut self) {
        if let Some(id) = self.poll_timer.take() {
            self.timers.cancel(id);
        }
    }

    fn clear_execution(&mut self) {
        self.monitor = None;
        self.poll_timer = None;
        self.corrector.reset();
    }

    fn set_state(&mut self, state: EngineState) {
        let changed = state.phase() != self.context.state.phase();
        self.context.state = state;
        if changed {
            let phase = self.phase();
            tracing::debug!("Engine phase -> {:?}", phase);
            self.emit(EngineEvent::PhaseChanged {
                phase,
                index: self.context.current_task_index,
            });
        }
    }

    fn command(&mut self, command: VehicleCommand) {
        self.outbox.push(command.into());
    }

    fn emit(&mut self, event: EngineEvent) {
        self.outbox.push(event.into());
    }
}
