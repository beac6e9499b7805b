//! Trajectory corrector
//!
//! Forward moves are dead-reckoned, so drift off the held heading or depth
//! would silently spoil the route. While a forward move is in progress the
//! corrector compares navigation against the hold targets. When the vehicle
//! is out of tolerance the move is suspended, the vehicle settles, and the
//! same move resumes with the settling dead time added to its time offset.
//! There is no retry limit: correction repeats until the vehicle is back on
//! track or the route is aborted.

use crate::hold::HoldStates;
use crate::monitor::CompletionMonitor;
use crate::navigation::{heading_difference, normalize_heading, NavigationSnapshot};
use crate::settings::Settings;
use std::time::Duration;

/// Outcome of checking one axis
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AxisDeviation {
    pub observed: f64,
    pub target: f64,
    pub error: f64,
    pub margin: f64,
}

impl AxisDeviation {
    pub fn within_margin(&self) -> bool {
        self.error <= self.margin
    }
}

#[derive(Debug, Default)]
pub struct TrajectoryCorrector {
    attempts: u32,
    suspended: Option<CompletionMonitor>,
}

impl TrajectoryCorrector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Heading error against the heading hold target, both taken into [0, 360)
    pub fn heading_deviation(nav: &NavigationSnapshot, holds: &HoldStates, settings: &Settings) -> Option<AxisDeviation> {
        let observed = normalize_heading(nav.heading?);
        let target = normalize_heading(holds.heading.heading_target()?);
        Some(AxisDeviation {
            observed,
            target,
            error: heading_difference(observed, target),
            margin: settings.heading_error_margin,
        })
    }

    /// Depth error against the depth hold target, converted to meters
    pub fn depth_deviation(nav: &NavigationSnapshot, holds: &HoldStates, settings: &Settings) -> Option<AxisDeviation> {
        let observed = nav.depth?;
        let target = holds.depth.depth_target_meters()?;
        Some(AxisDeviation {
            observed,
            target,
            error: (observed - target).abs(),
            margin: settings.depth_error_margin,
        })
    }

    /// True while heading and depth are both within margin of their holds.
    /// An axis without a reading or without an active hold target cannot be
    /// judged and counts as on track.
    pub fn is_following_direction(nav: &NavigationSnapshot, holds: &HoldStates, settings: &Settings) -> bool {
        let heading_ok = Self::heading_deviation(nav, holds, settings).map_or(true, |d| d.within_margin());
        let depth_ok = Self::depth_deviation(nav, holds, settings).map_or(true, |d| d.within_margin());
        heading_ok && depth_ok
    }

    /// Park the interrupted monitor; returns the settling delay to schedule
    pub fn suspend(&mut self, monitor: CompletionMonitor, settings: &Settings) -> Duration {
        self.attempts += 1;
        self.suspended = Some(monitor.resumed_with_offset(settings.correction_offset()));
        settings.stabilization()
    }

    /// Monitor to restart once the vehicle has settled
    pub fn resume(&mut self) -> Option<CompletionMonitor> {
        self.suspended.take()
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended.is_some()
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Forget any correction state; called whenever a new instruction starts
    pub fn reset(&mut self) {
        self.attempts = 0;
        self.suspended = None;
    }
}
