// Data-driven walk configuration.
//
// All tunable movement parameters live here in `WalkConfig`, loaded from
// JSON by tooling (see `scene.rs`) or built with `Default`. The walker never
// uses magic numbers for physics, tolerances, door ranges or rotation
// limits; it reads them from the config it was created with.
//
// Units: distances in blocks, velocities in blocks per tick, angles in
// degrees. Fields ending in `_sq` are squared distances.
//
// See also: `walker.rs` which reads every field, `route.rs` for the search
// parameters (`RouteOptions`), which are configured separately.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Movement and presentation parameters for one walk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WalkConfig {
    /// Requested horizontal speed in blocks per tick, before clamping.
    pub speed: f64,
    /// Lower clamp for the requested speed.
    pub min_speed: f64,
    /// Upper clamp for the requested speed.
    pub max_speed: f64,

    /// Added to vertical velocity every airborne tick (negative is down).
    pub gravity: f64,
    /// Vertical velocity given by a jump.
    pub jump_velocity: f64,
    /// Vertical velocity never drops below this.
    pub terminal_velocity: f64,
    /// Ledges up to this height are stepped up without jumping.
    pub step_height: f64,

    /// Horizontal squared distance at which a path sample counts as reached.
    pub waypoint_tolerance_sq: f64,
    /// Vertical distance at which a path sample counts as reached.
    pub vertical_tolerance: f64,
    /// Squared distance from the final waypoint at which the walk finishes.
    pub finish_tolerance_sq: f64,

    /// Doors at the next target are opened when it is this close (squared).
    pub door_probe_range_sq: f64,
    /// Opened doors are closed once the actor is this far away (squared,
    /// horizontal).
    pub door_release_range_sq: f64,

    /// Maximum yaw change per tick.
    pub max_yaw_step: f32,
    /// Pitch toward the next sample is divided by this.
    pub pitch_damping: f32,

    /// Whether the walk reports its last position as the actor's
    /// authoritative location when it stops.
    pub update_location: bool,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            speed: 0.25,
            min_speed: 0.1,
            max_speed: 1.0,
            gravity: -0.08,
            jump_velocity: 0.5,
            terminal_velocity: -0.5,
            step_height: 0.55,
            waypoint_tolerance_sq: 0.04,
            vertical_tolerance: 0.2,
            finish_tolerance_sq: 0.04,
            door_probe_range_sq: 4.0,
            door_release_range_sq: 1.69,
            max_yaw_step: 15.0,
            pitch_damping: 1.5,
            update_location: false,
        }
    }
}

impl WalkConfig {
    /// Parse a config from a JSON string. Missing fields take their default.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a config from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// `speed` clamped to `[min_speed, max_speed]`.
    pub fn clamped_speed(&self, speed: f64) -> f64 {
        speed.max(self.min_speed).min(self.max_speed)
    }
}
