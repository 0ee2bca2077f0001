// Terrain queries used by both the pathfinder and the walker.
//
// Everything here is a pure function of a `BlockView`: no caching, no side
// effects, safe to call from any number of concurrent searches.
//
// Vocabulary:
// - A *floor* is the block an actor stands on. Walkable floors are non-air,
//   non-liquid and not passable.
// - A cell is *blocking* when an actor's body cannot occupy it. Doors,
//   passable blocks and single carpets never block; a carpet blocks only
//   when another carpet sits directly on top of it.
// - *Feet height* of a floor cell is `y + top of its collision shape` at the
//   cell's center.
//
// See also: `block.rs` for the material flags, `pathfinding.rs` for the
// reachability rules built from these queries, `walker.rs` for the
// per-tick ground lookup.

use crate::block::{Block, CollisionBox};
use crate::types::VoxelCoord;
use crate::world::BlockView;
use glam::DVec3;

/// How many cells below the starting block a floor scan will look.
pub const FLOOR_SEARCH_DEPTH: i32 = 6;

/// True if the block at `cell` can be stood on.
pub fn is_walkable_floor<W: BlockView + ?Sized>(world: &W, cell: VoxelCoord) -> bool {
    let block = world.block(cell);
    !block.is_air() && !block.is_liquid() && !block.is_passable()
}

/// True if the block at `cell` obstructs an actor's body.
pub fn is_blocking<W: BlockView + ?Sized>(world: &W, cell: VoxelCoord) -> bool {
    let block = world.block(cell);
    if block.is_air() {
        return false;
    }
    if block.is_carpet() {
        return world.block(cell.above()).is_carpet();
    }
    !block.is_passable() && !block.is_openable()
}

/// Top surface height (in `[0, 1]`) of `block` at the local `(x, z)` offset.
///
/// Uses the highest sub-box covering the offset; if none covers it, the
/// highest sub-box overall; if the block reports no boxes, a full unit.
pub fn block_top_at(block: Block, local_x: f64, local_z: f64) -> f64 {
    boxes_top_at(&block.collision_boxes(), local_x, local_z)
}

/// `block_top_at` for an explicit list of cell-local sub-boxes.
pub fn boxes_top_at(boxes: &[CollisionBox], local_x: f64, local_z: f64) -> f64 {
    if boxes.is_empty() {
        return 1.0;
    }

    let covering = boxes
        .iter()
        .filter(|b| b.covers(local_x, local_z))
        .map(|b| b.top())
        .fold(f64::NEG_INFINITY, f64::max);

    let best = if covering.is_finite() {
        covering
    } else {
        boxes.iter().map(|b| b.top()).fold(f64::NEG_INFINITY, f64::max)
    };

    if best <= 0.0 { 1.0 } else { best }
}

/// Top surface height of the block at `cell` at the local `(x, z)` offset.
pub fn collision_top_at<W: BlockView + ?Sized>(
    world: &W,
    cell: VoxelCoord,
    local_x: f64,
    local_z: f64,
) -> f64 {
    block_top_at(world.block(cell), local_x, local_z)
}

/// Feet Y of an actor standing at the center of floor cell `cell`.
pub fn feet_height<W: BlockView + ?Sized>(world: &W, cell: VoxelCoord) -> f64 {
    cell.y as f64 + collision_top_at(world, cell, 0.5, 0.5)
}

/// Feet position of an actor standing at the center of floor cell `cell`.
pub fn feet_position<W: BlockView + ?Sized>(world: &W, cell: VoxelCoord) -> DVec3 {
    cell.center_at(feet_height(world, cell))
}

/// Scan down from the block containing `pos` for the floor under it.
///
/// Openables, liquids and anything passable or non-solid are skipped. A
/// solid block qualifies when one of its sub-boxes covers the position's
/// fractional `(x, z)`, or when it reports no sub-boxes at all.
pub fn floor_beneath<W: BlockView + ?Sized>(world: &W, pos: DVec3) -> Option<VoxelCoord> {
    let start = VoxelCoord::containing(pos);
    let local_x = pos.x - start.x as f64;
    let local_z = pos.z - start.z as f64;

    (0..=FLOOR_SEARCH_DEPTH)
        .map(|depth| start.offset(0, -depth, 0))
        .find(|&cell| {
            let block = world.block(cell);
            if block.is_openable() || block.is_liquid() {
                return false;
            }
            if !block.is_solid_material() || block.is_passable() {
                return false;
            }
            let boxes = block.collision_boxes();
            boxes.is_empty() || boxes.iter().any(|b| b.covers(local_x, local_z))
        })
}

/// The floor cell an actor at feet position `pos` stands on. Falls back to
/// the block below the one containing `pos` when the scan finds nothing.
pub fn resolve_floor_cell<W: BlockView + ?Sized>(world: &W, pos: DVec3) -> VoxelCoord {
    floor_beneath(world, pos).unwrap_or_else(|| VoxelCoord::containing(pos).offset(0, -1, 0))
}

/// Height of the ground directly under `pos`.
///
/// When no floor is found within the search depth, the world's highest
/// block in the column is used (top face). A column with no blocks at all
/// is bottomless and returns negative infinity.
pub fn ground_height_at<W: BlockView + ?Sized>(world: &W, pos: DVec3) -> f64 {
    if let Some(floor) = floor_beneath(world, pos) {
        let local_x = pos.x - floor.x as f64;
        let local_z = pos.z - floor.z as f64;
        return floor.y as f64 + collision_top_at(world, floor, local_x, local_z);
    }
    let column = VoxelCoord::containing(pos);
    match world.highest_block_y(column.x, column.z) {
        Some(y) => y as f64 + 1.0,
        None => f64::NEG_INFINITY,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::block::{Block, Facing};
    use crate::world::VoxelWorld;

    fn flat_world() -> VoxelWorld {
        let mut world = VoxelWorld::new(8, 8, 8);
        world.fill(VoxelCoord::new(0, 0, 0), VoxelCoord::new(7, 0, 7), Block::Solid);
        world
    }

    #[test]
    fn floor_rules() {
        let mut world = flat_world();
        world.set(VoxelCoord::new(1, 1, 1), Block::Water);
        world.set(VoxelCoord::new(2, 1, 1), Block::Plant);
        world.set(VoxelCoord::new(3, 1, 1), Block::Slab);
        assert!(is_walkable_floor(&world, VoxelCoord::new(0, 0, 0)));
        assert!(!is_walkable_floor(&world, VoxelCoord::new(0, 1, 0)));
        assert!(!is_walkable_floor(&world, VoxelCoord::new(1, 1, 1)));
        assert!(!is_walkable_floor(&world, VoxelCoord::new(2, 1, 1)));
        assert!(is_walkable_floor(&world, VoxelCoord::new(3, 1, 1)));
    }

    #[test]
    fn single_carpet_does_not_block_but_stacked_carpet_does() {
        let mut world = flat_world();
        world.set(VoxelCoord::new(1, 1, 1), Block::Carpet);
        assert!(!is_blocking(&world, VoxelCoord::new(1, 1, 1)));
        world.set(VoxelCoord::new(1, 2, 1), Block::Carpet);
        assert!(is_blocking(&world, VoxelCoord::new(1, 1, 1)));
        // The top carpet of the stack has air above it.
        assert!(!is_blocking(&world, VoxelCoord::new(1, 2, 1)));
    }

    #[test]
    fn doors_and_plants_never_block() {
        let mut world = flat_world();
        world.set(VoxelCoord::new(1, 1, 1), Block::Door { open: false });
        world.set(VoxelCoord::new(2, 1, 1), Block::Plant);
        world.set(VoxelCoord::new(3, 1, 1), Block::Solid);
        assert!(!is_blocking(&world, VoxelCoord::new(1, 1, 1)));
        assert!(!is_blocking(&world, VoxelCoord::new(2, 1, 1)));
        assert!(is_blocking(&world, VoxelCoord::new(3, 1, 1)));
    }

    #[test]
    fn collision_top_follows_sub_boxes() {
        assert_eq!(block_top_at(Block::Solid, 0.5, 0.5), 1.0);
        assert_eq!(block_top_at(Block::Slab, 0.5, 0.5), 0.5);
        assert_eq!(block_top_at(Block::Carpet, 0.2, 0.9), 0.0625);
        let stairs = Block::Stairs {
            facing: Facing::North,
        };
        assert_eq!(block_top_at(stairs, 0.5, 0.25), 1.0);
        assert_eq!(block_top_at(stairs, 0.5, 0.75), 0.5);
        // Non-colliding blocks are treated as full height.
        assert_eq!(block_top_at(Block::Air, 0.5, 0.5), 1.0);
    }

    #[test]
    fn uncovered_offset_uses_highest_box() {
        // An open door's panel hugs the west edge; the center is uncovered.
        assert_eq!(block_top_at(Block::Door { open: true }, 0.5, 0.5), 1.0);

        let boxes = [
            CollisionBox::new([0.0, 0.0, 0.0], [0.3, 0.75, 1.0]),
            CollisionBox::new([0.0, 0.0, 0.0], [0.5, 0.25, 1.0]),
        ];
        assert_eq!(boxes_top_at(&boxes, 0.2, 0.5), 0.75);
        assert_eq!(boxes_top_at(&boxes, 0.4, 0.5), 0.25);
        assert_eq!(boxes_top_at(&boxes, 0.9, 0.5), 0.75);
        assert_eq!(boxes_top_at(&[], 0.9, 0.5), 1.0);
    }

    #[test]
    fn feet_height_on_slab() {
        let mut world = flat_world();
        world.set(VoxelCoord::new(2, 1, 2), Block::Slab);
        assert_eq!(feet_height(&world, VoxelCoord::new(2, 1, 2)), 1.5);
        assert_eq!(feet_height(&world, VoxelCoord::new(3, 0, 2)), 1.0);
    }

    #[test]
    fn resolve_floor_skips_doors_and_water() {
        let mut world = flat_world();
        world.set(VoxelCoord::new(1, 1, 1), Block::Door { open: false });
        world.set(VoxelCoord::new(2, 1, 2), Block::Water);
        assert_eq!(
            resolve_floor_cell(&world, DVec3::new(1.5, 1.0, 1.5)),
            VoxelCoord::new(1, 0, 1)
        );
        assert_eq!(
            resolve_floor_cell(&world, DVec3::new(2.5, 1.3, 2.5)),
            VoxelCoord::new(2, 0, 2)
        );
    }

    #[test]
    fn resolve_floor_on_slab_surface() {
        let mut world = flat_world();
        world.set(VoxelCoord::new(2, 1, 2), Block::Slab);
        assert_eq!(
            resolve_floor_cell(&world, DVec3::new(2.5, 1.5, 2.5)),
            VoxelCoord::new(2, 1, 2)
        );
    }

    #[test]
    fn resolve_floor_falls_back_below_nominal_block() {
        let world = VoxelWorld::new(4, 20, 4);
        assert_eq!(
            resolve_floor_cell(&world, DVec3::new(1.5, 15.0, 1.5)),
            VoxelCoord::new(1, 14, 1)
        );
    }

    #[test]
    fn ground_height_uses_column_top_when_floor_is_deep() {
        let mut world = VoxelWorld::new(4, 20, 4);
        world.set(VoxelCoord::new(1, 2, 1), Block::Solid);
        assert_eq!(ground_height_at(&world, DVec3::new(1.5, 15.0, 1.5)), 3.0);
        assert_eq!(ground_height_at(&world, DVec3::new(1.5, 5.0, 1.5)), 3.0);
        assert_eq!(
            ground_height_at(&world, DVec3::new(2.5, 5.0, 2.5)),
            f64::NEG_INFINITY
        );
    }

    #[test]
    fn ground_height_follows_stair_profile() {
        let mut world = flat_world();
        world.set(
            VoxelCoord::new(3, 1, 3),
            Block::Stairs {
                facing: Facing::East,
            },
        );
        assert_eq!(ground_height_at(&world, DVec3::new(3.25, 1.5, 3.5)), 1.5);
        assert_eq!(ground_height_at(&world, DVec3::new(3.75, 1.5, 3.5)), 2.0);
    }
}
