// Walk events: presentation samples, lifecycle notifications and the two
// traits through which a walk talks to the outside world.
//
// This file defines two related but distinct channels:
// - `MotionSink`: fire-and-forget presentation output. One `MotionSample`
//   per moving tick, one `SnapEvent` when a walk arrives, and a
//   `DoorEvent` whenever the walk opens or closes a door (the audible cue
//   hook). Sinks never influence the simulation.
// - `WalkHooks`: synchronous two-phase notifications with mutable response
//   fields. `walk_started` may veto the walk or override its speed and
//   location-commit flag; `walk_stopped` sees the result and may override
//   the commit flag.
//
// `EventLog` is a recording `MotionSink` used by the replay binary and tests.
//
// See also: `walker.rs` which emits all of these, `schedule.rs` which
// threads sinks and hooks through every active walk.

use crate::types::{ActorId, VoxelCoord, Waypoint, WorldId};
use glam::DVec3;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Presentation output
// ---------------------------------------------------------------------------

/// Where an actor is after one tick of walking.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct MotionSample {
    pub actor: ActorId,
    pub world: WorldId,
    /// Feet position after this tick.
    pub position: DVec3,
    /// Displacement applied this tick.
    pub delta: DVec3,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
    pub vertical_velocity: f64,
}

/// Final placement of an actor that finished its route: position and
/// orientation of the terminal waypoint.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SnapEvent {
    pub actor: ActorId,
    pub world: WorldId,
    pub position: DVec3,
    pub yaw: f32,
    pub pitch: f32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DoorAction {
    Opened,
    Closed,
}

/// A door changed state because of a walk.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoorEvent {
    pub actor: ActorId,
    pub world: WorldId,
    pub coord: VoxelCoord,
    pub action: DoorAction,
}

/// Receiver for per-tick presentation output.
pub trait MotionSink {
    fn motion(&mut self, sample: &MotionSample);

    fn snap(&mut self, event: &SnapEvent);

    fn door(&mut self, event: &DoorEvent);
}

/// Discards everything.
impl MotionSink for () {
    fn motion(&mut self, _sample: &MotionSample) {}

    fn snap(&mut self, _event: &SnapEvent) {}

    fn door(&mut self, _event: &DoorEvent) {}
}

/// One recorded presentation event.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WalkEvent {
    Motion(MotionSample),
    Snap(SnapEvent),
    Door(DoorEvent),
}

/// A `MotionSink` that keeps everything it receives, in order.
#[derive(Clone, Debug, Default)]
pub struct EventLog {
    pub events: Vec<WalkEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn motions(&self) -> impl Iterator<Item = &MotionSample> {
        self.events.iter().filter_map(|e| match e {
            WalkEvent::Motion(sample) => Some(sample),
            _ => None,
        })
    }

    pub fn doors(&self) -> impl Iterator<Item = &DoorEvent> {
        self.events.iter().filter_map(|e| match e {
            WalkEvent::Door(door) => Some(door),
            _ => None,
        })
    }

    pub fn snaps(&self) -> impl Iterator<Item = &SnapEvent> {
        self.events.iter().filter_map(|e| match e {
            WalkEvent::Snap(snap) => Some(snap),
            _ => None,
        })
    }

    /// Take all recorded events, leaving the log empty.
    pub fn drain(&mut self) -> Vec<WalkEvent> {
        std::mem::take(&mut self.events)
    }
}

impl MotionSink for EventLog {
    fn motion(&mut self, sample: &MotionSample) {
        self.events.push(WalkEvent::Motion(*sample));
    }

    fn snap(&mut self, event: &SnapEvent) {
        self.events.push(WalkEvent::Snap(*event));
    }

    fn door(&mut self, event: &DoorEvent) {
        self.events.push(WalkEvent::Door(*event));
    }
}

// ---------------------------------------------------------------------------
// Lifecycle notifications
// ---------------------------------------------------------------------------

/// How a walk ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WalkResult {
    Success,
    Canceled,
}

/// Sent before a walk starts. Handlers may set `cancelled` to veto it, or
/// change `speed` and `update_location`.
#[derive(Clone, Debug, PartialEq)]
pub struct WalkStart {
    pub actor: ActorId,
    pub world: WorldId,
    /// Blocks per tick, already clamped to the configured bounds.
    pub speed: f64,
    pub update_location: bool,
    pub cancelled: bool,
}

/// Sent once when a walk stops. Handlers may change `update_location`.
#[derive(Clone, Debug, PartialEq)]
pub struct WalkStop {
    pub actor: ActorId,
    pub world: WorldId,
    pub result: WalkResult,
    pub update_location: bool,
}

/// What a stopped walk reports back to its owner.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WalkOutcome {
    pub actor: ActorId,
    pub result: WalkResult,
    /// The actor's new authoritative location, present when the stop
    /// notification left `update_location` set.
    pub location: Option<Waypoint>,
}

/// Synchronous lifecycle handlers. Both default to doing nothing.
pub trait WalkHooks {
    fn walk_started(&mut self, _event: &mut WalkStart) {}

    fn walk_stopped(&mut self, _event: &mut WalkStop) {}
}

/// No hooks.
impl WalkHooks for () {}
