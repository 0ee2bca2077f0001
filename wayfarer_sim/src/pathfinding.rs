// A* search over floor cells of a single voxel world.
//
// The search space is implicit: a node is a floor cell (`VoxelCoord` whose
// `y` is the block the actor stands on) and its neighbors are the 26 cells
// around it, filtered by the reachability rules below. Nodes live in an
// arena `Vec<SearchNode>` indexed by an `FxHashMap` on the coordinate's
// packed key, so each cell is allocated once no matter how often it is
// re-discovered.
//
// The open set is a `BinaryHeap` (min-heap via reversed ordering) keyed by
// `f = g + h`, ties broken by insertion sequence. Improving a node's g-cost
// pushes a fresh entry; stale entries are skipped when popped because the
// node is already closed (lazy deletion).
//
// Reachability of `to` from `from`:
// - `to` is a walkable floor,
// - the two cells above `to` (feet and head) are not blocking,
// - for X/Z diagonals, neither corner cell at the destination's feet level
//   is blocking (no squeezing past a wall's edge).
//
// The heuristic is the straight-line distance from the cell's nominal feet
// point `(x+0.5, y+1, z+0.5)` to the goal position. A node counts as the
// goal once its actual feet point is within one block of the target.
//
// See also: `sampler.rs` for the terrain queries, `route.rs` which chains
// segment searches into a full route.
//
// **Critical constraint: determinism.** Neighbor order is fixed and ties are
// broken by insertion sequence, so identical terrain and endpoints always
// produce identical segments.

use crate::error::SegmentError;
use crate::sampler::{feet_position, is_blocking, is_walkable_floor, resolve_floor_cell};
use crate::types::{VoxelCoord, Waypoint, WorldId};
use crate::world::{BlockView, WorldStore};
use glam::DVec3;
use log::debug;
use rustc_hash::FxHashMap;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Cost of a step with more than one non-zero axis.
const DIAGONAL_COST: f64 = std::f64::consts::SQRT_2;

/// A node counts as the goal when its feet point is closer than this
/// (squared) to the target position.
const GOAL_DISTANCE_SQ: f64 = 1.0;

/// The result of a successful segment search.
#[derive(Clone, Debug, PartialEq)]
pub struct Segment {
    pub world: WorldId,
    /// Feet positions from the start cell to the goal cell (inclusive).
    pub points: Vec<DVec3>,
    /// Total g-cost of the goal node.
    pub cost: f64,
    /// Node expansions spent.
    pub iterations: usize,
}

/// Grid A* with a bounded expansion budget.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GridPathfinder {
    pub max_iterations: usize,
    /// When false, same-plane diagonal moves (`|dx| + |dz| > 1`) are skipped.
    pub allow_diagonal: bool,
}

impl Default for GridPathfinder {
    fn default() -> Self {
        Self {
            max_iterations: 10_000,
            allow_diagonal: true,
        }
    }
}

struct SearchNode {
    cell: VoxelCoord,
    g_cost: f64,
    h_cost: f64,
    parent: Option<usize>,
    closed: bool,
}

/// Entry in the A* open set (min-heap via reversed ordering).
struct OpenEntry {
    f_score: f64,
    seq: u64,
    node: usize,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed for min-heap: smallest f_score (then oldest) is "greatest".
        other
            .f_score
            .total_cmp(&self.f_score)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Per-search mutable state: node arena, key index and open heap.
struct Search {
    nodes: Vec<SearchNode>,
    index: FxHashMap<u64, usize>,
    open: BinaryHeap<OpenEntry>,
    seq: u64,
    goal: DVec3,
}

impl Search {
    fn new(goal: DVec3) -> Self {
        Self {
            nodes: Vec::new(),
            index: FxHashMap::default(),
            open: BinaryHeap::new(),
            seq: 0,
            goal,
        }
    }

    /// Arena index for `cell`, allocating the node (and its heuristic) on
    /// first discovery.
    fn node_for(&mut self, cell: VoxelCoord) -> usize {
        if let Some(&idx) = self.index.get(&cell.packed_key()) {
            return idx;
        }
        let nominal = cell.center_at(cell.y as f64 + 1.0);
        let idx = self.nodes.len();
        self.nodes.push(SearchNode {
            cell,
            g_cost: f64::INFINITY,
            h_cost: nominal.distance(self.goal),
            parent: None,
            closed: false,
        });
        self.index.insert(cell.packed_key(), idx);
        idx
    }

    fn push(&mut self, node: usize) {
        let n = &self.nodes[node];
        self.open.push(OpenEntry {
            f_score: n.g_cost + n.h_cost,
            seq: self.seq,
            node,
        });
        self.seq += 1;
    }

    /// Lower `node`'s g-cost through `parent` if that is an improvement.
    fn relax(&mut self, node: usize, parent: usize, g_cost: f64) {
        if g_cost < self.nodes[node].g_cost {
            let n = &mut self.nodes[node];
            n.g_cost = g_cost;
            n.parent = Some(parent);
            self.push(node);
        }
    }

    fn retrace<W: BlockView + ?Sized>(&self, world: &W, goal: usize) -> Vec<DVec3> {
        let mut points = Vec::new();
        let mut current = Some(goal);
        while let Some(idx) = current {
            let node = &self.nodes[idx];
            points.push(feet_position(world, node.cell));
            current = node.parent;
        }
        points.reverse();
        points
    }
}

impl GridPathfinder {
    pub fn new(max_iterations: usize, allow_diagonal: bool) -> Self {
        Self {
            max_iterations,
            allow_diagonal,
        }
    }

    /// Search for a walkable segment from `start` to `end`.
    ///
    /// Both waypoints must be in the same loaded world and stand on walkable
    /// floors. Returns `NoPath { exhausted: true }` when `max_iterations`
    /// expansions were spent, `NoPath { exhausted: false }` when the
    /// reachable area was searched completely.
    pub fn find_segment<S: WorldStore + ?Sized>(
        &self,
        store: &S,
        start: &Waypoint,
        end: &Waypoint,
    ) -> Result<Segment, SegmentError> {
        if start.world != end.world {
            return Err(SegmentError::WorldMismatch {
                start: start.world,
                end: end.world,
            });
        }
        let world = store
            .world(start.world)
            .ok_or(SegmentError::UnknownWorld(start.world))?;

        let start_cell = resolve_floor_cell(world, start.position);
        if !is_walkable_floor(world, start_cell) {
            return Err(SegmentError::InvalidStart(start_cell));
        }
        let end_cell = resolve_floor_cell(world, end.position);
        if !is_walkable_floor(world, end_cell) {
            return Err(SegmentError::InvalidEnd(end_cell));
        }

        let result = self.search(world, start_cell, end.position);
        match &result {
            Ok((points, cost, iterations)) => debug!(
                "segment {} -> {} in {}: {} points, cost {:.3}, {} iterations",
                start_cell,
                end_cell,
                start.world,
                points.len(),
                cost,
                iterations
            ),
            Err(err) => debug!(
                "segment {} -> {} in {} failed: {}",
                start_cell, end_cell, start.world, err
            ),
        }
        let (points, cost, iterations) = result?;
        Ok(Segment {
            world: start.world,
            points,
            cost,
            iterations,
        })
    }

    fn search<W: BlockView + ?Sized>(
        &self,
        world: &W,
        start: VoxelCoord,
        target: DVec3,
    ) -> Result<(Vec<DVec3>, f64, usize), SegmentError> {
        let mut search = Search::new(target);
        let root = search.node_for(start);
        search.nodes[root].g_cost = 0.0;
        search.push(root);

        let mut iterations = 0;
        while let Some(entry) = search.open.pop() {
            let current = entry.node;
            if search.nodes[current].closed {
                continue;
            }
            if iterations >= self.max_iterations {
                return Err(SegmentError::NoPath {
                    iterations,
                    exhausted: true,
                });
            }
            iterations += 1;

            let cell = search.nodes[current].cell;
            if feet_position(world, cell).distance_squared(target) < GOAL_DISTANCE_SQ {
                let points = search.retrace(world, current);
                return Ok((points, search.nodes[current].g_cost, iterations));
            }
            search.nodes[current].closed = true;

            let current_g = search.nodes[current].g_cost;
            for (dx, dy, dz) in neighbor_offsets() {
                if !self.allow_diagonal && dx.abs() + dz.abs() > 1 {
                    continue;
                }
                let to = cell.offset(dx, dy, dz);
                if !is_reachable(world, cell, to) {
                    continue;
                }
                let neighbor = search.node_for(to);
                if search.nodes[neighbor].closed {
                    continue;
                }
                search.relax(neighbor, current, current_g + step_cost(dx, dy, dz));
            }
        }

        Err(SegmentError::NoPath {
            iterations,
            exhausted: false,
        })
    }
}

/// The 26 offsets around a cell, in a fixed order.
fn neighbor_offsets() -> impl Iterator<Item = (i32, i32, i32)> {
    (-1..=1).flat_map(|dx| {
        (-1..=1).flat_map(move |dy| {
            (-1..=1)
                .map(move |dz| (dx, dy, dz))
                .filter(|&offset| offset != (0, 0, 0))
        })
    })
}

fn step_cost(dx: i32, dy: i32, dz: i32) -> f64 {
    let axes = [dx, dy, dz].iter().filter(|&&d| d != 0).count();
    if axes > 1 { DIAGONAL_COST } else { 1.0 }
}

/// Whether an actor standing on `from` can step onto floor cell `to`.
pub fn is_reachable<W: BlockView + ?Sized>(world: &W, from: VoxelCoord, to: VoxelCoord) -> bool {
    if !is_walkable_floor(world, to) {
        return false;
    }
    if is_blocking(world, to.offset(0, 1, 0)) || is_blocking(world, to.offset(0, 2, 0)) {
        return false;
    }
    if from.x != to.x && from.z != to.z {
        let corner_a = VoxelCoord::new(from.x, to.y + 1, to.z);
        let corner_b = VoxelCoord::new(to.x, to.y + 1, from.z);
        if is_blocking(world, corner_a) || is_blocking(world, corner_b) {
            return false;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::Block;
    use crate::world::{VoxelWorld, Worlds};

    const W: WorldId = WorldId(1);

    /// A 16x8x16 world with a solid floor at y = 0.
    fn flat_store() -> Worlds {
        let mut world = VoxelWorld::new(16, 8, 16);
        world.fill(
            VoxelCoord::new(0, 0, 0),
            VoxelCoord::new(15, 0, 15),
            Block::Solid,
        );
        store_with(world)
    }

    fn store_with(world: VoxelWorld) -> Worlds {
        let mut store = Worlds::new();
        store.insert(W, world);
        store
    }

    fn edit(store: &mut Worlds) -> &mut VoxelWorld {
        store.world_mut(W).unwrap()
    }

    fn wp(x: f64, y: f64, z: f64) -> Waypoint {
        Waypoint::new(W, DVec3::new(x, y, z))
    }

    #[test]
    fn straight_line_without_diagonals() {
        let store = flat_store();
        let finder = GridPathfinder::new(10_000, false);
        let seg = finder
            .find_segment(&store, &wp(2.5, 1.0, 4.5), &wp(7.5, 1.0, 4.5))
            .unwrap();
        assert_eq!(seg.points.len(), 6);
        assert_eq!(seg.cost, 5.0);
        for pair in seg.points.windows(2) {
            assert!((pair[0].distance(pair[1]) - 1.0).abs() < 1e-9);
        }
        assert_eq!(seg.points[0], DVec3::new(2.5, 1.0, 4.5));
        assert_eq!(seg.points[5], DVec3::new(7.5, 1.0, 4.5));
    }

    #[test]
    fn diagonal_line_uses_sqrt2_steps() {
        let store = flat_store();
        let seg = GridPathfinder::default()
            .find_segment(&store, &wp(1.5, 1.0, 1.5), &wp(4.5, 1.0, 4.5))
            .unwrap();
        assert_eq!(seg.points.len(), 4);
        assert!((seg.cost - 3.0 * DIAGONAL_COST).abs() < 1e-9);
    }

    #[test]
    fn start_equal_to_goal_is_a_single_point() {
        let store = flat_store();
        let seg = GridPathfinder::default()
            .find_segment(&store, &wp(3.5, 1.0, 3.5), &wp(3.5, 1.0, 3.5))
            .unwrap();
        assert_eq!(seg.points, vec![DVec3::new(3.5, 1.0, 3.5)]);
        assert_eq!(seg.cost, 0.0);
        assert_eq!(seg.iterations, 1);
    }

    #[test]
    fn detours_around_a_wall() {
        let mut store = flat_store();
        edit(&mut store).fill(
            VoxelCoord::new(5, 1, 0),
            VoxelCoord::new(5, 2, 10),
            Block::Solid,
        );
        let seg = GridPathfinder::default()
            .find_segment(&store, &wp(2.5, 1.0, 2.5), &wp(8.5, 1.0, 2.5))
            .unwrap();
        // The only gap is at z >= 11.
        assert!(seg.points.iter().any(|p| p.z >= 11.0));
        for p in &seg.points {
            assert_eq!(p.y, 1.0);
        }
        for pair in seg.points.windows(2) {
            assert!(pair[0].distance(pair[1]) <= DIAGONAL_COST + 1e-9);
        }
    }

    #[test]
    fn diagonal_does_not_cut_corners() {
        let mut store = flat_store();
        edit(&mut store).fill(
            VoxelCoord::new(2, 1, 1),
            VoxelCoord::new(2, 2, 1),
            Block::Solid,
        );
        let seg = GridPathfinder::default()
            .find_segment(&store, &wp(1.5, 1.0, 1.5), &wp(2.5, 1.0, 2.5))
            .unwrap();
        assert_eq!(
            seg.points,
            vec![
                DVec3::new(1.5, 1.0, 1.5),
                DVec3::new(1.5, 1.0, 2.5),
                DVec3::new(2.5, 1.0, 2.5),
            ]
        );
        assert_eq!(seg.cost, 2.0);
    }

    #[test]
    fn steps_up_onto_a_slab() {
        let mut store = flat_store();
        edit(&mut store).set(VoxelCoord::new(3, 1, 1), Block::Slab);
        let seg = GridPathfinder::new(10_000, false)
            .find_segment(&store, &wp(1.5, 1.0, 1.5), &wp(3.5, 1.5, 1.5))
            .unwrap();
        assert_eq!(seg.points.last(), Some(&DVec3::new(3.5, 1.5, 1.5)));
        assert_eq!(seg.points.len(), 3);
    }

    #[test]
    fn low_ceiling_blocks_passage() {
        let mut store = flat_store();
        // Head-height wall with a one-block gap at the feet: not enough room.
        edit(&mut store).fill(
            VoxelCoord::new(4, 2, 0),
            VoxelCoord::new(4, 2, 15),
            Block::Solid,
        );
        let err = GridPathfinder::new(500, false)
            .find_segment(&store, &wp(1.5, 1.0, 1.5), &wp(8.5, 1.0, 1.5))
            .unwrap_err();
        assert!(matches!(err, SegmentError::NoPath { .. }));
    }

    #[test]
    fn budget_exhaustion_is_reported() {
        let store = flat_store();
        let err = GridPathfinder::new(3, true)
            .find_segment(&store, &wp(0.5, 1.0, 0.5), &wp(15.5, 1.0, 15.5))
            .unwrap_err();
        assert_eq!(
            err,
            SegmentError::NoPath {
                iterations: 3,
                exhausted: true
            }
        );
    }

    #[test]
    fn sealed_area_empties_the_open_set() {
        let mut world = VoxelWorld::new(10, 4, 3);
        world.fill(VoxelCoord::new(0, 0, 0), VoxelCoord::new(2, 0, 2), Block::Solid);
        world.fill(VoxelCoord::new(6, 0, 0), VoxelCoord::new(9, 0, 2), Block::Solid);
        let store = store_with(world);
        let err = GridPathfinder::default()
            .find_segment(&store, &wp(1.5, 1.0, 1.5), &wp(8.5, 1.0, 1.5))
            .unwrap_err();
        assert_eq!(
            err,
            SegmentError::NoPath {
                iterations: 9,
                exhausted: false
            }
        );
    }

    #[test]
    fn invalid_endpoints_are_rejected() {
        let store = flat_store();
        let finder = GridPathfinder::default();
        // Nothing within reach below y = 20.
        let err = finder
            .find_segment(&store, &wp(1.5, 20.0, 1.5), &wp(3.5, 1.0, 3.5))
            .unwrap_err();
        assert!(matches!(err, SegmentError::InvalidStart(_)));
        assert!(err.is_invalid_input());

        let err = finder
            .find_segment(&store, &wp(1.5, 1.0, 1.5), &wp(30.5, 1.0, 3.5))
            .unwrap_err();
        assert!(matches!(err, SegmentError::InvalidEnd(_)));
    }

    #[test]
    fn world_checks_come_first() {
        let store = flat_store();
        let finder = GridPathfinder::default();
        let other = Waypoint::new(WorldId(9), DVec3::new(1.5, 1.0, 1.5));
        assert_eq!(
            finder.find_segment(&store, &wp(1.5, 1.0, 1.5), &other),
            Err(SegmentError::WorldMismatch {
                start: W,
                end: WorldId(9)
            })
        );
        assert_eq!(
            finder.find_segment(&store, &other, &other),
            Err(SegmentError::UnknownWorld(WorldId(9)))
        );
    }

    #[test]
    fn search_is_deterministic() {
        let mut store = flat_store();
        edit(&mut store).fill(
            VoxelCoord::new(6, 1, 3),
            VoxelCoord::new(6, 2, 12),
            Block::Solid,
        );
        let finder = GridPathfinder::default();
        let a = finder
            .find_segment(&store, &wp(1.5, 1.0, 7.5), &wp(12.5, 1.0, 8.5))
            .unwrap();
        let b = finder
            .find_segment(&store, &wp(1.5, 1.0, 7.5), &wp(12.5, 1.0, 8.5))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn open_entries_pop_by_f_then_sequence() {
        let mut heap = BinaryHeap::new();
        heap.push(OpenEntry {
            f_score: 2.0,
            seq: 0,
            node: 0,
        });
        heap.push(OpenEntry {
            f_score: 1.0,
            seq: 2,
            node: 1,
        });
        heap.push(OpenEntry {
            f_score: 1.0,
            seq: 1,
            node: 2,
        });
        let order: Vec<usize> = std::iter::from_fn(|| heap.pop().map(|e| e.node)).collect();
        assert_eq!(order, vec![2, 1, 0]);
    }
}
