// Route composition: chain segment searches into one dense path.
//
// A route is an ordered list of waypoints. `compose` runs one
// `GridPathfinder::find_segment` per consecutive pair and concatenates the
// results into a `Path`. When a segment's first point coincides with the
// previous segment's last point (same world, within `SEAM_EPSILON_SQ`), it
// is dropped so the seam is not walked twice.
//
// Composition is all-or-nothing: the first failing segment aborts the whole
// route with `PathError::Segment { index, .. }` and no partial path is
// returned.
//
// `compose_deferred` runs the same composition on a rayon worker and hands
// back a `PendingPath`. The only state crossing threads is the one-shot
// result channel (same pattern as the relay client's reader thread inbox)
// and the caller's progress callback.
//
// See also: `pathfinding.rs` for the per-segment search, `walker.rs` which
// consumes a `Path`.

use crate::error::PathError;
use crate::pathfinding::GridPathfinder;
use crate::types::{PathPoint, Waypoint, WorldId};
use crate::world::WorldStore;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::mpsc::{self, Receiver, TryRecvError};

/// Consecutive segment points closer than this (squared) are one point.
const SEAM_EPSILON_SQ: f64 = 1e-6;

/// Search parameters shared by every segment of a route.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RouteOptions {
    /// Expansion budget per segment.
    pub max_iterations: usize,
    pub allow_diagonal: bool,
}

impl Default for RouteOptions {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            allow_diagonal: true,
        }
    }
}

impl RouteOptions {
    pub fn pathfinder(&self) -> GridPathfinder {
        GridPathfinder::new(self.max_iterations, self.allow_diagonal)
    }
}

/// A composed route: dense feet positions plus the waypoints it was built
/// from. Never empty once constructed.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Path {
    points: Vec<PathPoint>,
    waypoints: Vec<Waypoint>,
}

impl Path {
    pub fn points(&self) -> &[PathPoint] {
        &self.points
    }

    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// The final waypoint: where the walker snaps to at the end.
    pub fn terminal(&self) -> &Waypoint {
        // Constructors guarantee at least one waypoint.
        &self.waypoints[self.waypoints.len() - 1]
    }

    /// The world the route starts in. Composed routes never leave it.
    pub fn world(&self) -> WorldId {
        self.points[0].world
    }
}

/// Compose a route through `waypoints`.
///
/// `progress`, if given, is called as `(i + 1, total)` after segment `i`
/// finishes, whether it succeeded or not.
pub fn compose<S: WorldStore + ?Sized>(
    store: &S,
    waypoints: &[Waypoint],
    options: &RouteOptions,
    mut progress: Option<&mut dyn FnMut(usize, usize)>,
) -> Result<Path, PathError> {
    if waypoints.len() < 2 {
        return Err(PathError::TooFewWaypoints(waypoints.len()));
    }

    let finder = options.pathfinder();
    let total = waypoints.len() - 1;
    let mut points: Vec<PathPoint> = Vec::new();

    for (index, pair) in waypoints.windows(2).enumerate() {
        let result = finder.find_segment(store, &pair[0], &pair[1]);
        if let Some(report) = progress.as_deref_mut() {
            report(index + 1, total);
        }
        let segment = result.map_err(|source| PathError::Segment { index, source })?;

        let mut seg_points = segment.points.iter().map(|&position| PathPoint {
            world: segment.world,
            position,
        });
        if let (Some(last), Some(first)) = (points.last(), segment.points.first())
            && last.world == segment.world
            && last.position.distance_squared(*first) < SEAM_EPSILON_SQ
        {
            seg_points.next();
        }
        points.extend(seg_points);
    }

    debug!(
        "composed route through {} waypoints: {} points",
        waypoints.len(),
        points.len()
    );
    Ok(Path {
        points,
        waypoints: waypoints.to_vec(),
    })
}

// ---------------------------------------------------------------------------
// Deferred composition
// ---------------------------------------------------------------------------

/// Progress callback for deferred composition.
pub type ProgressFn = Box<dyn FnMut(usize, usize) + Send>;

/// Handle to a route being composed on a worker thread.
pub struct PendingPath {
    inbox: Receiver<Result<Path, PathError>>,
    delivered: bool,
}

impl PendingPath {
    /// Non-blocking check. Returns the result exactly once; `None` while the
    /// worker is still running and after the result was taken.
    pub fn poll(&mut self) -> Option<Result<Path, PathError>> {
        if self.delivered {
            return None;
        }
        let result = match self.inbox.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => Err(PathError::WorkerLost),
        };
        self.delivered = true;
        Some(result)
    }

    /// Block until the worker reports.
    pub fn wait(self) -> Result<Path, PathError> {
        if self.delivered {
            return Err(PathError::WorkerLost);
        }
        self.inbox.recv().unwrap_or(Err(PathError::WorkerLost))
    }
}

/// Compose a route on the rayon pool. All segments of one route run
/// sequentially on one worker.
pub fn compose_deferred<S>(
    store: Arc<S>,
    waypoints: Vec<Waypoint>,
    options: RouteOptions,
    progress: Option<ProgressFn>,
) -> PendingPath
where
    S: WorldStore + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel();
    rayon::spawn(move || {
        let mut progress = progress;
        let result = compose(
            store.as_ref(),
            &waypoints,
            &options,
            progress
                .as_deref_mut()
                .map(|f| f as &mut dyn FnMut(usize, usize)),
        );
        if let Err(err) = &result {
            warn!("deferred route composition failed: {err}");
        }
        // The caller may have dropped the handle; nothing to do then.
        tx.send(result).ok();
    });
    PendingPath {
        inbox: rx,
        delivered: false,
    }
}
