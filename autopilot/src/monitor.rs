//! Completion monitors
//!
//! Each movement instruction is watched by a monitor that is re-evaluated on
//! every poll tick. All three share one policy: the movement is complete once
//! the observed progress reaches `completion_threshold` (0.96 by default) of
//! the requested magnitude. The undershoot is intentional; the vehicle keeps
//! drifting after all-stop.

use crate::instructions::{Instruction, InstructionKind};
use crate::navigation::{signed_heading_delta, NavigationSnapshot};
use crate::settings::Settings;
use std::time::Duration;
use tokio::time::Instant;

/// Result of one monitor evaluation
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MonitorProgress {
    /// No usable navigation reading yet
    Waiting,
    /// Fraction of the requested movement observed so far
    InProgress(f64),
    Complete,
}

impl MonitorProgress {
    pub fn is_complete(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CompletionMonitor {
    /// Left/Right: degrees turned, with heading wrap-around unwrapped
    Degrees {
        requested: f64,
        last_heading: Option<f64>,
        turned: f64,
    },
    /// Ascend/Descend: meters moved from the starting depth
    Depth {
        requested: f64,
        start_depth: Option<f64>,
    },
    /// Forward: dead reckoning from elapsed time and assumed speed
    Distance {
        requested: f64,
        started_at: Instant,
        /// Dead time from trajectory corrections, not counted as progress
        time_offset: Duration,
    },
}

impl CompletionMonitor {
    /// Monitor for an instruction, latching the current readings as start.
    /// Unknown kinds have no monitor.
    pub fn for_instruction(instruction: &Instruction, nav: &NavigationSnapshot, now: Instant) -> Option<Self> {
        let monitor = match instruction.kind {
            InstructionKind::Forward => Self::Distance {
                requested: instruction.value,
                started_at: now,
                time_offset: Duration::ZERO,
            },
            InstructionKind::Left | InstructionKind::Right => Self::Degrees {
                requested: instruction.value,
                last_heading: nav.heading,
                turned: 0.0,
            },
            InstructionKind::Ascend | InstructionKind::Descend => Self::Depth {
                requested: instruction.value,
                start_depth: nav.depth,
            },
            InstructionKind::Unknown(_) => return None,
        };
        Some(monitor)
    }

    pub fn is_distance(&self) -> bool {
        matches!(self, Self::Distance { .. })
    }

    pub fn time_offset(&self) -> Duration {
        match self {
            Self::Distance { time_offset, .. } => *time_offset,
            _ => Duration::ZERO,
        }
    }

    /// Fresh distance monitor for the same move, carrying the accumulated offset
    pub fn resumed_with_offset(&self, extra: Duration) -> Self {
        match self {
            Self::Distance {
                requested,
                started_at,
                time_offset,
            } => Self::Distance {
                requested: *requested,
                started_at: *started_at,
                time_offset: *time_offset + extra,
            },
            other => other.clone(),
        }
    }

    pub fn evaluate(&mut self, nav: &NavigationSnapshot, settings: &Settings, now: Instant) -> MonitorProgress {
        let threshold = settings.completion_threshold;
        match self {
            Self::Degrees {
                requested,
                last_heading,
                turned,
            } => {
                let Some(heading) = nav.heading else {
                    return MonitorProgress::Waiting;
                };
                let Some(previous) = last_heading.replace(heading) else {
                    return MonitorProgress::Waiting;
                };
                *turned += signed_heading_delta(previous, heading);
                let degrees_turned = turned.abs();
                tracing::debug!("Turned {:.1}° of {:.1}°", degrees_turned, requested);
                progress(degrees_turned, *requested, threshold)
            }
            Self::Depth {
                requested,
                start_depth,
            } => {
                let Some(depth) = nav.depth else {
                    return MonitorProgress::Waiting;
                };
                let Some(start) = *start_depth else {
                    *start_depth = Some(depth);
                    return MonitorProgress::Waiting;
                };
                let meters_moved = (depth - start).abs();
                tracing::debug!("Moved {:.2}m of {:.2}m vertically", meters_moved, requested);
                progress(meters_moved, *requested, threshold)
            }
            Self::Distance {
                requested,
                started_at,
                time_offset,
            } => {
                let expected_ms = settings.distance_to_time_ms(*requested);
                let elapsed = now.saturating_duration_since(*started_at).saturating_sub(*time_offset);
                let elapsed_ms = elapsed.as_nanos() as f64 / 1_000_000.0;
                tracing::debug!("Forward {:.0}ms of {:.0}ms expected", elapsed_ms, expected_ms);
                progress(elapsed_ms, expected_ms, threshold)
            }
        }
    }
}

fn progress(observed: f64, requested: f64, threshold: f64) -> MonitorProgress {
    if observed >= requested * threshold {
        MonitorProgress::Complete
    } else {
        MonitorProgress::InProgress(observed / requested)
    }
}
