// wayfarer_sim: NPC route planning and path following over voxel worlds.
//
// This crate plans walking routes for non-player actors across a block
// world and then moves them along those routes one tick at a time. It has
// no rendering or networking dependencies and can be tested, benchmarked
// and replayed headless.
//
// Module overview:
// - `types.rs`:       VoxelCoord, WorldId, ActorId, Waypoint, PathPoint.
// - `block.rs`:       Block materials and their collision sub-boxes.
// - `world.rs`:       BlockView / BlockEdit / WorldStore contracts + the dense VoxelWorld grid.
// - `sampler.rs`:     Floor, blocking and ground-height queries over a BlockView.
// - `pathfinding.rs`: Grid A* between two waypoints (one route segment).
// - `route.rs`:       Route composition over many waypoints, sync and deferred (rayon).
// - `walker.rs`:      PathWalker, per-tick path following with physics and doors.
// - `schedule.rs`:    WalkScheduler, one walk per actor, driven from one clock.
// - `event.rs`:       Motion/door/snap events, MotionSink, WalkHooks lifecycle.
// - `config.rs`:      WalkConfig, every tunable movement parameter.
// - `scene.rs`:       JSON scene files and headless replay.
// - `error.rs`:       SegmentError, PathError, ConfigError.
//
// The `wayfarer_replay` binary (`main.rs`) replays a scene file and prints
// its events as JSON lines.
//
// **Determinism.** Given the same world and waypoints, search and walking
// produce identical output: neighbour order is fixed, heap ties break on
// insertion order, and all per-walk collections are ordered (`BTreeMap`,
// `BTreeSet`). No system time, no randomness.

pub mod block;
pub mod config;
pub mod error;
pub mod event;
pub mod pathfinding;
pub mod route;
pub mod sampler;
pub mod scene;
pub mod schedule;
pub mod types;
pub mod walker;
pub mod world;
