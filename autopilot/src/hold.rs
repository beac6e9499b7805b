//! Depth and heading hold interface
//!
//! The hold controller is an external stabilization unit. The engine only
//! asks it to engage or release, and mirrors the state it echoes back.

use crate::navigation::NavigationSnapshot;
use serde::{Deserialize, Serialize};

/// The hold controller works in centimetres for depth targets
pub const DEPTH_HOLD_SCALE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoldAxis {
    Depth,
    Heading,
}

/// State echoed by the hold controller, stored verbatim.
///
/// Depth targets are in controller units (metres x [`DEPTH_HOLD_SCALE`]),
/// heading targets in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldState {
    pub enabled: bool,
    #[serde(default)]
    pub target: Option<f64>,
}

impl HoldState {
    /// Active depth target converted back to metres
    pub fn depth_target_meters(&self) -> Option<f64> {
        self.active_target().map(depth_from_hold_units)
    }

    /// Active heading target in degrees
    pub fn heading_target(&self) -> Option<f64> {
        self.active_target()
    }

    fn active_target(&self) -> Option<f64> {
        if self.enabled {
            self.target.filter(|t| t.is_finite())
        } else {
            None
        }
    }
}

/// Mirrored state of both hold axes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct HoldStates {
    pub depth: HoldState,
    pub heading: HoldState,
}

impl HoldStates {
    pub fn update(&mut self, axis: HoldAxis, state: HoldState) {
        match axis {
            HoldAxis::Depth => self.depth = state,
            HoldAxis::Heading => self.heading = state,
        }
    }

    pub fn get(&self, axis: HoldAxis) -> HoldState {
        match axis {
            HoldAxis::Depth => self.depth,
            HoldAxis::Heading => self.heading,
        }
    }
}

/// Request sent to the hold controller
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HoldRequest {
    pub enabled: bool,
    pub target: Option<f64>,
}

impl HoldRequest {
    /// Engage the hold on the current navigation reading
    pub fn engage(axis: HoldAxis, nav: &NavigationSnapshot) -> Self {
        let target = match axis {
            HoldAxis::Depth => nav.depth.map(depth_to_hold_units),
            HoldAxis::Heading => nav.heading,
        };
        Self {
            enabled: true,
            target,
        }
    }

    pub fn release() -> Self {
        Self {
            enabled: false,
            target: None,
        }
    }
}

pub fn depth_to_hold_units(meters: f64) -> f64 {
    meters * DEPTH_HOLD_SCALE
}

pub fn depth_from_hold_units(units: f64) -> f64 {
    units / DEPTH_HOLD_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engage_uses_current_navigation() {
        let nav = NavigationSnapshot::new(-30.0, 2.5);

        let depth = HoldRequest::engage(HoldAxis::Depth, &nav);
        assert!(depth.enabled);
        assert_eq!(depth.target, Some(250.0));

        let heading = HoldRequest::engage(HoldAxis::Heading, &nav);
        assert_eq!(heading.target, Some(-30.0));

        let empty = HoldRequest::engage(HoldAxis::Depth, &NavigationSnapshot::default());
        assert!(empty.enabled);
        assert_eq!(empty.target, None);
    }

    #[test]
    fn test_depth_target_conversion() {
        let state = HoldState {
            enabled: true,
            target: Some(320.0),
        };
        assert_eq!(state.depth_target_meters(), Some(3.2));

        let released = HoldState {
            enabled: false,
            target: Some(320.0),
        };
        assert_eq!(released.depth_target_meters(), None);
    }

    #[test]
    fn test_hold_states_update() {
        let mut holds = HoldStates::default();
        let state = HoldState {
            enabled: true,
            target: Some(90.0),
        };
        holds.update(HoldAxis::Heading, state);
        assert_eq!(holds.get(HoldAxis::Heading), state);
        assert_eq!(holds.get(HoldAxis::Depth), HoldState::default());
    }
}
