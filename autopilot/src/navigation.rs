//! Navigation snapshot and heading math

use serde::{Deserialize, Serialize};

/// Latest processed navigation telemetry.
///
/// Both readings are optional: the feed may not have reported yet, and the
/// engine never assumes the snapshot is fresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NavigationSnapshot {
    /// Degrees in (-180, 180]
    #[serde(default)]
    pub heading: Option<f64>,
    /// Meters
    #[serde(default)]
    pub depth: Option<f64>,
}

impl NavigationSnapshot {
    pub fn new(heading: f64, depth: f64) -> Self {
        Self {
            heading: Some(heading),
            depth: Some(depth),
        }
    }

    /// Apply an update. A reading absent from the update keeps its last value.
    pub fn merge(&mut self, update: NavigationSnapshot) {
        if let Some(heading) = update.heading.filter(|h| h.is_finite()) {
            self.heading = Some(heading);
        }
        if let Some(depth) = update.depth.filter(|d| d.is_finite()) {
            self.depth = Some(depth);
        }
    }
}

/// Map a heading into the [0, 360) frame
pub fn normalize_heading(heading: f64) -> f64 {
    let normalized = heading.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if normalized >= 360.0 {
        0.0
    } else {
        normalized
    }
}

/// Shortest signed rotation from `from` to `to`, in (-180, 180]
pub fn signed_heading_delta(from: f64, to: f64) -> f64 {
    let delta = normalize_heading(to) - normalize_heading(from);
    if delta > 180.0 {
        delta - 360.0
    } else if delta <= -180.0 {
        delta + 360.0
    } else {
        delta
    }
}

/// Unsigned angular distance between two headings, in [0, 180]
pub fn heading_difference(a: f64, b: f64) -> f64 {
    signed_heading_delta(a, b).abs()
}
