// Scene files for offline replay.
//
// A `Scene` is a self-contained JSON description of a walk: the worlds
// (as box fills over an all-air grid), the actor, its waypoints, the search
// options and the walk configuration. `Scene::replay` composes the route,
// drives the walk through a `WalkScheduler` for at most `max_ticks` ticks,
// and forwards every presentation event to the caller's sink.
//
// Example:
//
//   {
//     "worlds": [{ "id": 0, "size": [16, 8, 16],
//                  "fills": [{ "from": {"x":0,"y":0,"z":0},
//                              "to":   {"x":15,"y":0,"z":15},
//                              "block": "Solid" }] }],
//     "waypoints": [{ "world": 0, "position": [1.5, 1.0, 1.5] },
//                   { "world": 0, "position": [9.5, 1.0, 6.5], "yaw": 90.0 }]
//   }
//
// See also: `main.rs` (the `wayfarer_replay` binary), `config.rs` for the
// `walk` section.

use crate::block::Block;
use crate::config::WalkConfig;
use crate::error::{ConfigError, PathError};
use crate::event::{MotionSink, WalkHooks, WalkOutcome};
use crate::route::{RouteOptions, compose};
use crate::schedule::WalkScheduler;
use crate::types::{ActorId, VoxelCoord, Waypoint, WorldId};
use crate::walker::PathWalker;
use crate::world::{VoxelWorld, Worlds};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// An inclusive box of identical blocks.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fill {
    pub from: VoxelCoord,
    pub to: VoxelCoord,
    pub block: Block,
}

/// One world of a scene.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SceneWorld {
    pub id: WorldId,
    #[serde(default)]
    pub origin: VoxelCoord,
    pub size: [u32; 3],
    #[serde(default)]
    pub fills: Vec<Fill>,
}

impl SceneWorld {
    pub fn build(&self) -> VoxelWorld {
        let [sx, sy, sz] = self.size;
        let mut world = VoxelWorld::with_origin(self.origin, sx, sy, sz);
        for fill in &self.fills {
            world.fill(fill.from, fill.to, fill.block);
        }
        world
    }
}

fn default_actor() -> ActorId {
    ActorId(1)
}

fn default_max_ticks() -> usize {
    10_000
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub worlds: Vec<SceneWorld>,
    #[serde(default = "default_actor")]
    pub actor: ActorId,
    /// The first waypoint is also where the actor starts.
    pub waypoints: Vec<Waypoint>,
    #[serde(default)]
    pub options: RouteOptions,
    #[serde(default)]
    pub walk: WalkConfig,
    /// Walks still running after this many ticks are canceled.
    #[serde(default = "default_max_ticks")]
    pub max_ticks: usize,
}

/// Summary of one replayed walk.
#[derive(Clone, Debug, PartialEq)]
pub struct ReplayReport {
    /// Dense path length.
    pub points: usize,
    pub ticks: usize,
    /// `None` when the start hook vetoed the walk.
    pub outcome: Option<WalkOutcome>,
}

impl Scene {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    pub fn build_worlds(&self) -> Worlds {
        let mut worlds = Worlds::new();
        for world in &self.worlds {
            worlds.insert(world.id, world.build());
        }
        worlds
    }

    /// Compose the scene's route and walk it to the end.
    pub fn replay(
        &self,
        sink: &mut dyn MotionSink,
        hooks: &mut dyn WalkHooks,
    ) -> Result<ReplayReport, PathError> {
        let mut store = self.build_worlds();
        let progress: &mut dyn FnMut(usize, usize) =
            &mut |done, total| info!("route segment {done}/{total} searched");
        let path = compose(&store, &self.waypoints, &self.options, Some(progress))?;
        let points = path.len();
        let start = *path.waypoints().first().ok_or(PathError::TooFewWaypoints(0))?;

        let walker = PathWalker::new(self.actor, path, start, self.walk.clone());
        let mut scheduler = WalkScheduler::new();
        let (_, started) = scheduler.start(walker, &mut store, sink, hooks);
        if !started {
            return Ok(ReplayReport {
                points,
                ticks: 0,
                outcome: None,
            });
        }

        for tick in 1..=self.max_ticks {
            if let Some(outcome) = scheduler.tick(&mut store, sink, hooks).pop() {
                return Ok(ReplayReport {
                    points,
                    ticks: tick,
                    outcome: Some(outcome),
                });
            }
        }

        warn!(
            "{}: walk still running after {} ticks, canceling",
            self.actor, self.max_ticks
        );
        let outcome = scheduler.cancel(self.actor, &mut store, sink, hooks);
        Ok(ReplayReport {
            points,
            ticks: self.max_ticks,
            outcome,
        })
    }
}
