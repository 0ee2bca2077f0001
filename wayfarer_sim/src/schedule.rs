// Walk registry: at most one active walk per actor, all driven from one
// external clock.
//
// `WalkScheduler` owns the `PathWalker`s. Starting a walk for an actor that
// is already walking cancels the old walk first (with its door cleanup,
// callback and stop notification), then announces the new one. Walks are
// kept in a `BTreeMap` keyed by `ActorId` so every tick visits them in the
// same order and door side effects are deterministic.
//
// See also: `walker.rs` for the per-walk state machine.

use crate::event::{MotionSink, WalkHooks, WalkOutcome};
use crate::types::{ActorId, WorldId};
use crate::walker::{PathWalker, TickStatus};
use crate::world::WorldStore;
use log::debug;
use std::collections::BTreeMap;

#[derive(Default)]
pub struct WalkScheduler {
    walks: BTreeMap<ActorId, PathWalker>,
}

impl WalkScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start `walker`, replacing any walk its actor already has. Returns the
    /// outcome of the replaced walk (if one was canceled) and whether the new
    /// walk started. A vetoed walk is dropped.
    pub fn start<S: WorldStore + ?Sized>(
        &mut self,
        mut walker: PathWalker,
        store: &mut S,
        sink: &mut dyn MotionSink,
        hooks: &mut dyn WalkHooks,
    ) -> (Option<WalkOutcome>, bool) {
        let actor = walker.actor();
        let replaced = self.cancel(actor, store, sink, hooks);
        if replaced.is_some() {
            debug!("{actor}: previous walk replaced");
        }
        let started = walker.begin(hooks);
        if started {
            self.walks.insert(actor, walker);
        }
        (replaced, started)
    }

    pub fn is_walking(&self, actor: ActorId) -> bool {
        self.walks.get(&actor).is_some_and(PathWalker::is_following)
    }

    pub fn walker(&self, actor: ActorId) -> Option<&PathWalker> {
        self.walks.get(&actor)
    }

    /// Cancel the actor's walk, if it has one in progress.
    pub fn cancel<S: WorldStore + ?Sized>(
        &mut self,
        actor: ActorId,
        store: &mut S,
        sink: &mut dyn MotionSink,
        hooks: &mut dyn WalkHooks,
    ) -> Option<WalkOutcome> {
        let mut walker = self.walks.remove(&actor)?;
        walker.cancel(store, sink, hooks)
    }

    /// Cancel every walk in `world`, e.g. before unloading it. Outcomes are
    /// returned in actor order.
    pub fn cancel_world<S: WorldStore + ?Sized>(
        &mut self,
        world: WorldId,
        store: &mut S,
        sink: &mut dyn MotionSink,
        hooks: &mut dyn WalkHooks,
    ) -> Vec<WalkOutcome> {
        let actors: Vec<ActorId> = self
            .walks
            .iter()
            .filter(|(_, walker)| walker.world() == world)
            .map(|(&actor, _)| actor)
            .collect();
        actors
            .into_iter()
            .filter_map(|actor| self.cancel(actor, store, sink, hooks))
            .collect()
    }

    /// Advance every walk by one tick. Finished walks are removed and their
    /// outcomes returned in actor order.
    pub fn tick<S: WorldStore + ?Sized>(
        &mut self,
        store: &mut S,
        sink: &mut dyn MotionSink,
        hooks: &mut dyn WalkHooks,
    ) -> Vec<WalkOutcome> {
        let mut outcomes = Vec::new();
        self.walks
            .retain(|_, walker| match walker.tick(store, sink, hooks) {
                TickStatus::Running | TickStatus::Idle => true,
                TickStatus::Finished(outcome) => {
                    outcomes.push(outcome);
                    false
                }
                TickStatus::Stopped => false,
            });
        outcomes
    }

    pub fn len(&self) -> usize {
        self.walks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.walks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::config::WalkConfig;
    use crate::event::{EventLog, WalkResult, WalkStop};
    use crate::route::{RouteOptions, compose};
    use crate::types::{VoxelCoord, Waypoint};
    use crate::world::{VoxelWorld, Worlds};
    use glam::DVec3;

    fn flat_store(ids: &[WorldId]) -> Worlds {
        let mut store = Worlds::new();
        for &id in ids {
            let mut world = VoxelWorld::new(16, 8, 16);
            world.fill(
                VoxelCoord::new(0, 0, 0),
                VoxelCoord::new(15, 0, 15),
                Block::Solid,
            );
            store.insert(id, world);
        }
        store
    }

    fn walker(store: &Worlds, actor: u64, world: WorldId, z: f64) -> PathWalker {
        let route = [
            Waypoint::new(world, DVec3::new(1.5, 1.0, z)),
            Waypoint::new(world, DVec3::new(6.5, 1.0, z)),
        ];
        let path = compose(store, &route, &RouteOptions::default(), None).unwrap();
        PathWalker::new(ActorId(actor), path, route[0], WalkConfig::default())
    }

    #[derive(Default)]
    struct StopLog(Vec<(ActorId, WalkResult)>);

    impl WalkHooks for StopLog {
        fn walk_stopped(&mut self, event: &mut WalkStop) {
            self.0.push((event.actor, event.result));
        }
    }

    #[test]
    fn starting_again_replaces_the_running_walk() {
        let w = WorldId(0);
        let mut store = flat_store(&[w]);
        let mut sched = WalkScheduler::new();
        let mut hooks = StopLog::default();

        let first = walker(&store, 1, w, 1.5);
        let (replaced, started) = sched.start(first, &mut store, &mut (), &mut hooks);
        assert!(replaced.is_none());
        assert!(started);
        assert!(sched.is_walking(ActorId(1)));

        let second = walker(&store, 1, w, 3.5);
        let (replaced, started) = sched.start(second, &mut store, &mut (), &mut hooks);
        assert_eq!(replaced.map(|o| o.result), Some(WalkResult::Canceled));
        assert!(started);
        assert_eq!(sched.len(), 1);
        assert_eq!(hooks.0, vec![(ActorId(1), WalkResult::Canceled)]);
    }

    #[test]
    fn tick_drives_all_walks_to_completion() {
        let w = WorldId(0);
        let mut store = flat_store(&[w]);
        let mut sched = WalkScheduler::new();
        let mut log = EventLog::new();
        sched.start(walker(&store, 1, w, 1.5), &mut store, &mut log, &mut ());
        sched.start(walker(&store, 2, w, 4.5), &mut store, &mut log, &mut ());

        let mut outcomes = Vec::new();
        for _ in 0..100 {
            outcomes.extend(sched.tick(&mut store, &mut log, &mut ()));
            if sched.is_empty() {
                break;
            }
        }
        assert!(sched.is_empty());
        let results: Vec<_> = outcomes.iter().map(|o| (o.actor, o.result)).collect();
        assert_eq!(
            results,
            vec![
                (ActorId(1), WalkResult::Success),
                (ActorId(2), WalkResult::Success)
            ]
        );
        assert_eq!(log.snaps().count(), 2);
    }

    #[test]
    fn cancel_world_only_touches_that_world() {
        let (a, b) = (WorldId(0), WorldId(1));
        let mut store = flat_store(&[a, b]);
        let mut sched = WalkScheduler::new();
        let mut hooks = StopLog::default();
        sched.start(walker(&store, 1, a, 1.5), &mut store, &mut (), &mut hooks);
        sched.start(walker(&store, 2, b, 1.5), &mut store, &mut (), &mut hooks);
        sched.start(walker(&store, 3, a, 4.5), &mut store, &mut (), &mut hooks);

        let outcomes = sched.cancel_world(a, &mut store, &mut (), &mut hooks);
        let actors: Vec<_> = outcomes.iter().map(|o| o.actor).collect();
        assert_eq!(actors, vec![ActorId(1), ActorId(3)]);
        assert!(sched.is_walking(ActorId(2)));
        assert!(!sched.is_walking(ActorId(1)));
        assert_eq!(sched.len(), 1);
    }

    #[test]
    fn cancel_unknown_actor_is_none() {
        let mut store = flat_store(&[WorldId(0)]);
        let mut sched = WalkScheduler::new();
        assert!(
            sched
                .cancel(ActorId(9), &mut store, &mut (), &mut ())
                .is_none()
        );
    }
}
