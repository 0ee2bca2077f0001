// Per-tick path following for one actor.
//
// A `PathWalker` owns one walk: the composed `Path`, the actor's
// `MoverState`, and the completion callback. The external clock calls
// `tick` once per game tick; each call does a bounded amount of work and
// never blocks.
//
// Lifecycle: `Idle` --begin--> `Following` --> `Completed` | `Canceled`.
// Entering either terminal phase closes every door the walk opened, fires
// the completion callback once, and sends one `walk_stopped` notification.
// A vetoed start goes straight to `Canceled` without any of that.
//
// One tick of `Following`, in order:
// 1. Past the last target: either append the terminal waypoint as one more
//    target (when the actor is not on it yet) or snap onto it and complete.
// 2. Reached check against the current target (horizontal + vertical
//    tolerance). Reaching a target consumes the tick.
// 3. Doors at the actor and at the next target are opened; tracked doors
//    the actor has left behind are closed.
// 4. Horizontal step toward the target, capped at `speed`. A step that
//    would land exactly on the target snaps onto it instead.
// 5. Vertical physics: ground snapping, step-ups, jumps, gravity.
// 6. Rate-limited yaw and damped pitch toward the upcoming samples.
// 7. Emit one `MotionSample`.
//
// See also: `route.rs` for `Path`, `sampler.rs` for `ground_height_at`,
// `config.rs` for every constant used here, `schedule.rs` which drives many
// walkers from one clock.

use crate::config::WalkConfig;
use crate::event::{
    DoorAction, DoorEvent, MotionSample, MotionSink, SnapEvent, WalkHooks, WalkOutcome,
    WalkResult, WalkStart, WalkStop,
};
use crate::route::Path;
use crate::sampler::ground_height_at;
use crate::types::{ActorId, PathPoint, VoxelCoord, Waypoint, WorldId};
use crate::world::{BlockEdit, BlockView, WorldStore};
use glam::DVec3;
use log::{debug, trace, warn};
use smallvec::{SmallVec, smallvec};
use std::collections::BTreeSet;

/// Horizontal distances (squared) below this count as zero.
const HORIZONTAL_EPSILON_SQ: f64 = 1e-6;
/// A step within this of the remaining distance lands on the target.
const SNAP_EPSILON: f64 = 1e-6;
/// Feet within this of the ground count as standing on it.
const GROUND_EPSILON: f64 = 1e-4;
/// Grounded feet further than this from the ground are snapped onto it.
const DRIFT_EPSILON: f64 = 1e-5;
/// Rises must exceed the step height by this much before a jump is needed.
const JUMP_MARGIN: f64 = 1e-3;

/// Completion callback, invoked exactly once per started walk.
pub type EndCallback = Box<dyn FnOnce(WalkResult) + Send>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WalkPhase {
    Idle,
    Following,
    Completed,
    Canceled,
}

/// What one call to `PathWalker::tick` did.
#[derive(Clone, Debug, PartialEq)]
pub enum TickStatus {
    /// `begin` has not been called yet.
    Idle,
    /// Still following the path.
    Running,
    /// The walk ended during this tick.
    Finished(WalkOutcome),
    /// The walk had already ended before this tick.
    Stopped,
}

/// Mutable per-walk state. Owned by exactly one `PathWalker`.
#[derive(Clone, Debug, PartialEq)]
pub struct MoverState {
    pub world: WorldId,
    /// Feet position.
    pub position: DVec3,
    /// Index of the current target in the dense path.
    pub index: usize,
    pub vertical_velocity: f64,
    pub yaw: f32,
    pub pitch: f32,
    /// Last horizontal look direction, reused when the next one degenerates.
    pub move_dir: DVec3,
    pub on_ground: bool,
    /// Door cells this walk opened. Coordinates only; the world owns the
    /// blocks.
    pub open_doors: BTreeSet<VoxelCoord>,
    pub finished: bool,
}

/// Drives one actor along one composed path.
pub struct PathWalker {
    actor: ActorId,
    path: Path,
    /// The dense path, plus the terminal waypoint once it has been appended.
    targets: Vec<PathPoint>,
    terminal_appended: bool,
    config: WalkConfig,
    speed: f64,
    update_location: bool,
    phase: WalkPhase,
    state: MoverState,
    on_end: Option<EndCallback>,
}

impl PathWalker {
    /// Prepare a walk for `actor`, currently standing at `start`, along
    /// `path`. Nothing happens until `begin`.
    pub fn new(actor: ActorId, path: Path, start: Waypoint, config: WalkConfig) -> Self {
        let facing = start.direction();
        let state = MoverState {
            world: path.world(),
            position: start.position,
            index: 0,
            vertical_velocity: 0.0,
            yaw: start.yaw,
            pitch: start.pitch,
            move_dir: DVec3::new(facing.x, 0.0, facing.z),
            on_ground: false,
            open_doors: BTreeSet::new(),
            finished: false,
        };
        Self {
            actor,
            targets: path.points().to_vec(),
            path,
            terminal_appended: false,
            speed: config.clamped_speed(config.speed),
            update_location: config.update_location,
            config,
            phase: WalkPhase::Idle,
            state,
            on_end: None,
        }
    }

    /// Set the completion callback.
    pub fn on_end(mut self, callback: impl FnOnce(WalkResult) + Send + 'static) -> Self {
        self.on_end = Some(Box::new(callback));
        self
    }

    pub fn actor(&self) -> ActorId {
        self.actor
    }

    pub fn world(&self) -> WorldId {
        self.state.world
    }

    pub fn phase(&self) -> WalkPhase {
        self.phase
    }

    pub fn is_following(&self) -> bool {
        self.phase == WalkPhase::Following
    }

    pub fn state(&self) -> &MoverState {
        &self.state
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Effective speed in blocks per tick.
    pub fn speed(&self) -> f64 {
        self.speed
    }

    /// Announce the walk and start following. Returns `false` if the walk
    /// was already started or the start hook vetoed it. A vetoed walk never
    /// fires its completion callback.
    pub fn begin(&mut self, hooks: &mut dyn WalkHooks) -> bool {
        if self.phase != WalkPhase::Idle {
            return false;
        }
        let mut event = WalkStart {
            actor: self.actor,
            world: self.state.world,
            speed: self.speed,
            update_location: self.update_location,
            cancelled: false,
        };
        hooks.walk_started(&mut event);
        if event.cancelled {
            debug!("{}: walk vetoed by start hook", self.actor);
            self.phase = WalkPhase::Canceled;
            self.state.finished = true;
            self.on_end = None;
            return false;
        }
        self.speed = event.speed;
        self.update_location = event.update_location;
        self.phase = WalkPhase::Following;
        debug!(
            "{}: walking {} points in {} at {:.3} blocks/tick",
            self.actor,
            self.targets.len(),
            self.state.world,
            self.speed
        );
        true
    }

    /// Advance the walk by one tick.
    pub fn tick<S: WorldStore + ?Sized>(
        &mut self,
        store: &mut S,
        sink: &mut dyn MotionSink,
        hooks: &mut dyn WalkHooks,
    ) -> TickStatus {
        match self.phase {
            WalkPhase::Idle => return TickStatus::Idle,
            WalkPhase::Completed | WalkPhase::Canceled => return TickStatus::Stopped,
            WalkPhase::Following => {}
        }

        let Some(world) = store.world_mut(self.state.world) else {
            warn!(
                "{}: {} is no longer available, canceling walk",
                self.actor, self.state.world
            );
            self.state.open_doors.clear();
            return TickStatus::Finished(self.stop(WalkResult::Canceled, hooks));
        };

        if self.state.index >= self.targets.len() {
            let terminal = *self.path.terminal();
            if !self.terminal_appended
                && self.state.position.distance_squared(terminal.position)
                    > self.config.finish_tolerance_sq
            {
                self.targets.push(terminal.point());
                self.terminal_appended = true;
                return TickStatus::Running;
            }
            self.state.position = terminal.position;
            self.state.yaw = terminal.yaw;
            self.state.pitch = terminal.pitch;
            sink.snap(&SnapEvent {
                actor: self.actor,
                world: self.state.world,
                position: terminal.position,
                yaw: terminal.yaw,
                pitch: terminal.pitch,
            });
            self.close_all_doors(world, sink);
            return TickStatus::Finished(self.stop(WalkResult::Success, hooks));
        }

        let target = self.targets[self.state.index].position;
        let to_target = target - self.state.position;
        let horizontal = DVec3::new(to_target.x, 0.0, to_target.z);
        if horizontal.length_squared() < self.config.waypoint_tolerance_sq
            && to_target.y.abs() < self.config.vertical_tolerance
        {
            self.state.index += 1;
            return TickStatus::Running;
        }

        self.update_doors(world, target, sink);

        let before = self.state.position;
        let dist_sq = horizontal.length_squared();
        let mut step = DVec3::ZERO;
        let mut snapped = false;
        if dist_sq >= HORIZONTAL_EPSILON_SQ {
            let dist = dist_sq.sqrt();
            let length = self.speed.min(dist);
            if (dist - length).abs() < SNAP_EPSILON {
                self.state.position = target;
                self.state.index += 1;
                snapped = true;
            } else {
                step = horizontal / dist * length;
            }
        }

        if snapped {
            let ground = ground_height_at(&*world, self.state.position);
            self.state.vertical_velocity = 0.0;
            self.state.on_ground = self.state.position.y <= ground + GROUND_EPSILON;
        } else {
            self.apply_physics(&*world, step);
        }

        self.update_orientation();

        sink.motion(&MotionSample {
            actor: self.actor,
            world: self.state.world,
            position: self.state.position,
            delta: self.state.position - before,
            yaw: self.state.yaw,
            pitch: self.state.pitch,
            on_ground: self.state.on_ground,
            vertical_velocity: self.state.vertical_velocity,
        });
        TickStatus::Running
    }

    /// Cancel a walk that is following its path. Closes the doors it opened,
    /// fires the callback with `Canceled` and sends the stop notification.
    /// Returns `None` (and does nothing) for walks that are not following.
    pub fn cancel<S: WorldStore + ?Sized>(
        &mut self,
        store: &mut S,
        sink: &mut dyn MotionSink,
        hooks: &mut dyn WalkHooks,
    ) -> Option<WalkOutcome> {
        if self.phase != WalkPhase::Following {
            return None;
        }
        match store.world_mut(self.state.world) {
            Some(world) => self.close_all_doors(world, sink),
            None => self.state.open_doors.clear(),
        }
        Some(self.stop(WalkResult::Canceled, hooks))
    }

    // -----------------------------------------------------------------------
    // Tick stages
    // -----------------------------------------------------------------------

    fn update_doors<W: BlockEdit + ?Sized>(
        &mut self,
        world: &mut W,
        target: DVec3,
        sink: &mut dyn MotionSink,
    ) {
        let here = VoxelCoord::containing(self.state.position);
        let mut probes: SmallVec<[VoxelCoord; 4]> = smallvec![here, here.above()];
        if self.state.position.distance_squared(target) < self.config.door_probe_range_sq {
            let next = VoxelCoord::containing(target);
            probes.push(next);
            probes.push(next.above());
        }

        let actor = self.actor;
        let world_id = self.state.world;
        for cell in probes {
            if world.block(cell).open_state() == Some(false) && world.set_open(cell, true) {
                trace!("{actor}: opened door at {cell}");
                self.state.open_doors.insert(cell);
                sink.door(&DoorEvent {
                    actor,
                    world: world_id,
                    coord: cell,
                    action: DoorAction::Opened,
                });
            }
        }

        let position = self.state.position;
        let release_sq = self.config.door_release_range_sq;
        self.state.open_doors.retain(|&cell| {
            let block = world.block(cell);
            if !block.is_openable() {
                return false;
            }
            let dx = cell.x as f64 + 0.5 - position.x;
            let dz = cell.z as f64 + 0.5 - position.z;
            if dx * dx + dz * dz <= release_sq {
                return true;
            }
            if block.open_state() == Some(true) && world.set_open(cell, false) {
                trace!("{actor}: closed door at {cell}");
                sink.door(&DoorEvent {
                    actor,
                    world: world_id,
                    coord: cell,
                    action: DoorAction::Closed,
                });
            }
            false
        });
    }

    /// Move by the horizontal `step` and resolve the vertical motion.
    fn apply_physics<W: BlockView + ?Sized>(&mut self, world: &W, step: DVec3) {
        let config = &self.config;
        let here = self.state.position;
        let ahead = here + step;
        let ground_now = ground_height_at(world, here);
        let ground_ahead = ground_height_at(world, ahead);

        let mut y = here.y;
        let mut velocity = self.state.vertical_velocity;
        let mut grounded = y <= ground_now + GROUND_EPSILON;
        let mut airborne = !grounded;

        if grounded {
            if (y - ground_now).abs() > DRIFT_EPSILON {
                y = ground_now;
            }
            let rise = ground_ahead - ground_now;
            let moving = step.length_squared() > HORIZONTAL_EPSILON_SQ;
            velocity = 0.0;
            if moving && rise > GROUND_EPSILON && rise <= config.step_height {
                y += rise;
            } else if rise > config.step_height + JUMP_MARGIN {
                velocity = config.jump_velocity;
                airborne = true;
            } else if rise < -config.step_height {
                // Walked off an edge taller than a step.
                airborne = true;
            }
        }

        if airborne {
            velocity = (velocity + config.gravity).max(config.terminal_velocity);
            let floor = ground_now.min(ground_ahead);
            if y + velocity <= floor {
                y = floor;
                velocity = 0.0;
                grounded = true;
            } else {
                y += velocity;
                grounded = false;
            }
        }

        self.state.position = DVec3::new(ahead.x, y, ahead.z);
        self.state.vertical_velocity = velocity;
        self.state.on_ground = grounded;
    }

    fn update_orientation(&mut self) {
        let position = self.state.position;
        let last = self.targets.len() - 1;
        let index = self.state.index;

        let look = if index < last {
            (self.targets[index].position + self.targets[index + 1].position) * 0.5 - position
        } else {
            self.targets[index.min(last)].position - position
        };
        let mut horizontal = DVec3::new(look.x, 0.0, look.z);
        if horizontal.length_squared() < HORIZONTAL_EPSILON_SQ {
            horizontal = self.state.move_dir;
        }

        let target_yaw = normalize_angle(horizontal.z.atan2(horizontal.x).to_degrees() - 90.0);
        let limit = self.config.max_yaw_step as f64;
        let turn = normalize_angle(target_yaw - self.state.yaw as f64).clamp(-limit, limit);
        self.state.yaw = normalize_angle(self.state.yaw as f64 + turn) as f32;
        self.state.move_dir = horizontal;

        let next = self.targets[(index + 1).min(last)].position - position;
        let run = (next.x * next.x + next.z * next.z).sqrt();
        let pitch = -next.y.atan2(run).to_degrees() / self.config.pitch_damping as f64;
        self.state.pitch = pitch as f32;
    }

    // -----------------------------------------------------------------------
    // Termination
    // -----------------------------------------------------------------------

    fn close_all_doors<W: BlockEdit + ?Sized>(&mut self, world: &mut W, sink: &mut dyn MotionSink) {
        for cell in std::mem::take(&mut self.state.open_doors) {
            if world.block(cell).open_state() == Some(true) && world.set_open(cell, false) {
                trace!("{}: closed door at {cell}", self.actor);
                sink.door(&DoorEvent {
                    actor: self.actor,
                    world: self.state.world,
                    coord: cell,
                    action: DoorAction::Closed,
                });
            }
        }
    }

    fn stop(&mut self, result: WalkResult, hooks: &mut dyn WalkHooks) -> WalkOutcome {
        self.phase = match result {
            WalkResult::Success => WalkPhase::Completed,
            WalkResult::Canceled => WalkPhase::Canceled,
        };
        self.state.finished = true;
        if let Some(callback) = self.on_end.take() {
            callback(result);
        }

        let mut event = WalkStop {
            actor: self.actor,
            world: self.state.world,
            result,
            update_location: self.update_location,
        };
        hooks.walk_stopped(&mut event);

        let location = event.update_location.then(|| {
            Waypoint::new(self.state.world, self.state.position)
                .with_rotation(self.state.yaw, self.state.pitch)
        });
        debug!(
            "{}: walk stopped ({:?}) at {:.2?}",
            self.actor, result, self.state.position
        );
        WalkOutcome {
            actor: self.actor,
            result,
            location,
        }
    }
}

/// Wrap an angle in degrees into `(-180, 180]`.
fn normalize_angle(degrees: f64) -> f64 {
    let wrapped = degrees.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}
