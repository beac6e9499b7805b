//! Autopilot executor
//!
//! Single-owner actor around [`AutopilotEngine`]. One tokio task owns the
//! engine; every mutation arrives as an [`ExecutorCommand`] on an mpsc
//! channel, so engine logic never runs concurrently with itself. Between
//! messages the task sleeps until the next timer deadline.

use crate::engine::{AutopilotEngine, EnginePhase};
use crate::error::{AutopilotError, Result};
use crate::instructions::WireInstruction;
use crate::messages::{InboundMessage, OutboundMessage};
use crate::navigation::NavigationSnapshot;
use crate::settings::Settings;
use crate::vehicle_ops::{apply_command, SharedVehicleOps};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default capacity of the outbound broadcast channel
pub const DEFAULT_EVENT_CAPACITY: usize = 256;

/// Commands that can be sent to the executor
#[derive(Debug, Clone)]
pub enum ExecutorCommand {
    Input(InboundMessage),
    Shutdown,
}

/// Snapshot of the execution context for observers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutorStatus {
    pub phase: EnginePhase,
    pub current_task_index: Option<usize>,
    pub active_instruction: Option<String>,
    pub pending_instructions: usize,
    pub active_timers: usize,
    pub correction_attempts: u32,
}

impl Default for ExecutorStatus {
    fn default() -> Self {
        Self {
            phase: EnginePhase::Idle,
            current_task_index: None,
            active_instruction: None,
            pending_instructions: 0,
            active_timers: 0,
            correction_attempts: 0,
        }
    }
}

impl ExecutorStatus {
    fn from_engine(engine: &AutopilotEngine) -> Self {
        Self {
            phase: engine.phase(),
            current_task_index: engine.current_task_index(),
            active_instruction: engine.context().active_instruction.as_ref().map(|i| i.to_string()),
            pending_instructions: engine.pending_instructions(),
            active_timers: engine.active_timers(),
            correction_attempts: engine.correction_attempts(),
        }
    }
}

pub struct AutopilotExecutor {
    command_tx: mpsc::Sender<ExecutorCommand>,
    event_tx: broadcast::Sender<OutboundMessage>,
    status_rx: watch::Receiver<ExecutorStatus>,
    task: Option<JoinHandle<()>>,
}

impl AutopilotExecutor {
    /// Spawn the actor on the current tokio runtime.
    ///
    /// Without settings the engine accepts routes but parks the first
    /// movement until a settings-change arrives.
    pub fn spawn(ops: SharedVehicleOps, settings: Option<Settings>, event_capacity: usize) -> Result<Self> {
        let engine = match settings {
            Some(settings) => AutopilotEngine::with_settings(settings)?,
            None => AutopilotEngine::new(),
        };

        let (command_tx, command_rx) = mpsc::channel::<ExecutorCommand>(32);
        let (event_tx, _) = broadcast::channel(event_capacity.max(1));
        let (status_tx, status_rx) = watch::channel(ExecutorStatus::from_engine(&engine));

        let task = tokio::spawn(run(engine, ops, command_rx, event_tx.clone(), status_tx));
        tracing::info!("Autopilot executor started");

        Ok(Self {
            command_tx,
            event_tx,
            status_rx,
            task: Some(task),
        })
    }

    /// Queue an inbound message for the engine
    pub async fn send(&self, message: InboundMessage) -> Result<()> {
        self.command_tx
            .send(ExecutorCommand::Input(message))
            .await
            .map_err(|_| AutopilotError::ExecutorClosed)
    }

    pub async fn start_route(&self, route: Vec<WireInstruction>) -> Result<()> {
        self.send(InboundMessage::RouteStart(route)).await
    }

    pub async fn abort(&self) -> Result<()> {
        self.send(InboundMessage::RouteAbort).await
    }

    pub async fn update_navigation(&self, navigation: NavigationSnapshot) -> Result<()> {
        self.send(InboundMessage::NavigationUpdate(navigation)).await
    }

    pub async fn update_settings(&self, settings: Settings) -> Result<()> {
        self.send(InboundMessage::SettingsChange(settings)).await
    }

    /// Every command and event the engine emits, in emission order
    pub fn subscribe(&self) -> broadcast::Receiver<OutboundMessage> {
        self.event_tx.subscribe()
    }

    pub fn status(&self) -> ExecutorStatus {
        self.status_rx.borrow().clone()
    }

    pub fn watch_status(&self) -> watch::Receiver<ExecutorStatus> {
        self.status_rx.clone()
    }

    /// Stop the vehicle, drain all timers and wait for the actor to exit
    pub async fn shutdown(mut self) -> Result<()> {
        // A closed channel means the actor already exited
        let _ = self.command_tx.send(ExecutorCommand::Shutdown).await;
        if let Some(task) = self.task.take() {
            task.await.map_err(|_| AutopilotError::ExecutorClosed)?;
        }
        tracing::info!("Autopilot executor stopped");
        Ok(())
    }
}

async fn run(
    mut engine: AutopilotEngine,
    ops: SharedVehicleOps,
    mut command_rx: mpsc::Receiver<ExecutorCommand>,
    event_tx: broadcast::Sender<OutboundMessage>,
    status_tx: watch::Sender<ExecutorStatus>,
) {
    loop {
        let deadline = engine.next_deadline();
        let keep_running = tokio::select! {
            command = command_rx.recv() => match command {
                Some(ExecutorCommand::Input(message)) => {
                    if let Err(e) = engine.handle(message, Instant::now()) {
                        tracing::warn!("Autopilot rejected input: {}", e);
                    }
                    true
                }
                Some(ExecutorCommand::Shutdown) | None => {
                    engine.shutdown();
                    false
                }
            },
            _ = wait_until(deadline) => {
                engine.poll_timers(Instant::now());
                true
            }
        };

        flush(&mut engine, &ops, &event_tx).await;
        status_tx.send_replace(ExecutorStatus::from_engine(&engine));

        if !keep_running {
            break;
        }
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending::<()>().await,
    }
}

/// Forward commands to the vehicle and publish everything to observers
async fn flush(
    engine: &mut AutopilotEngine,
    ops: &SharedVehicleOps,
    event_tx: &broadcast::Sender<OutboundMessage>,
) {
    for output in engine.drain_outputs() {
        if let OutboundMessage::Command(command) = output {
            if let Err(e) = apply_command(ops.as_ref(), command).await {
                tracing::error!("Vehicle command {:?} failed: {}", command, e);
            }
        }
        // No subscribers is fine
        let _ = event_tx.send(output);
    }
}
