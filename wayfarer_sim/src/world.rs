// Voxel terrain storage and the world-store contracts.
//
// Three traits describe what the route engine needs from terrain:
// - `BlockView`:  read a block at a coordinate (plus an optional
//                 highest-block hint used as the free-fall fallback).
// - `BlockEdit`:  write a block. The walker only ever toggles door state.
// - `WorldStore`: look up a world by `WorldId`, shared or mutable.
//
// `VoxelWorld` is the provided dense grid: a flat `Vec<Block>` indexed by
// `x + z * size_x + y * size_x * size_z` relative to an `origin`, giving O(1)
// read/write. Out-of-bounds reads return `Air`; out-of-bounds writes are
// no-ops. `Worlds` maps `WorldId`s to `VoxelWorld`s.
//
// See also: `sampler.rs` for the floor/blocking queries layered on
// `BlockView`, `walker.rs` which edits door state through `BlockEdit`.
//
// Searches only read terrain, so a `WorldStore` may be shared across
// threads (`Arc`) for deferred route composition. Mutation while a search
// is running is the caller's problem.

use crate::block::Block;
use crate::types::{VoxelCoord, WorldId};
use std::collections::BTreeMap;

// ---------------------------------------------------------------------------
// Contracts
// ---------------------------------------------------------------------------

/// Read-only access to the blocks of one world.
pub trait BlockView {
    fn block(&self, coord: VoxelCoord) -> Block;

    /// Y of the highest non-air block in the `(x, z)` column, if the world
    /// can answer that cheaply.
    fn highest_block_y(&self, _x: i32, _z: i32) -> Option<i32> {
        None
    }
}

/// Write access to the blocks of one world.
pub trait BlockEdit: BlockView {
    fn set_block(&mut self, coord: VoxelCoord, block: Block);

    /// Set the open state of an openable block. Returns `true` if the block
    /// is openable and its state actually changed.
    fn set_open(&mut self, coord: VoxelCoord, open: bool) -> bool {
        let block = self.block(coord);
        match block.open_state() {
            Some(current) if current != open => {
                self.set_block(coord, block.with_open(open));
                true
            }
            _ => false,
        }
    }
}

/// A collection of loaded worlds.
pub trait WorldStore {
    type World: BlockEdit;

    fn world(&self, id: WorldId) -> Option<&Self::World>;

    fn world_mut(&mut self, id: WorldId) -> Option<&mut Self::World>;
}

// ---------------------------------------------------------------------------
// Dense grid
// ---------------------------------------------------------------------------

/// Dense 3D block grid covering `origin .. origin + size`.
#[derive(Clone, Debug, Default)]
pub struct VoxelWorld {
    /// Flat storage: index = x + z * size_x + y * size_x * size_z (relative to origin).
    blocks: Vec<Block>,
    pub origin: VoxelCoord,
    pub size_x: u32,
    pub size_y: u32,
    pub size_z: u32,
}

impl VoxelWorld {
    /// Create a new world filled with `Air`, with its minimum corner at the
    /// grid origin.
    pub fn new(size_x: u32, size_y: u32, size_z: u32) -> Self {
        Self::with_origin(VoxelCoord::new(0, 0, 0), size_x, size_y, size_z)
    }

    /// Create a new world filled with `Air` whose minimum corner is `origin`.
    pub fn with_origin(origin: VoxelCoord, size_x: u32, size_y: u32, size_z: u32) -> Self {
        let total = (size_x as usize) * (size_y as usize) * (size_z as usize);
        Self {
            blocks: vec![Block::Air; total],
            origin,
            size_x,
            size_y,
            size_z,
        }
    }

    /// Check whether a coordinate is within bounds.
    pub fn in_bounds(&self, coord: VoxelCoord) -> bool {
        let (x, y, z) = (
            coord.x - self.origin.x,
            coord.y - self.origin.y,
            coord.z - self.origin.z,
        );
        x >= 0
            && y >= 0
            && z >= 0
            && (x as u32) < self.size_x
            && (y as u32) < self.size_y
            && (z as u32) < self.size_z
    }

    /// Convert a coordinate to a flat index. Returns `None` if out of bounds.
    fn index(&self, coord: VoxelCoord) -> Option<usize> {
        if self.in_bounds(coord) {
            let x = (coord.x - self.origin.x) as usize;
            let y = (coord.y - self.origin.y) as usize;
            let z = (coord.z - self.origin.z) as usize;
            let sx = self.size_x as usize;
            let sz = self.size_z as usize;
            Some(x + z * sx + y * sx * sz)
        } else {
            None
        }
    }

    /// Read a block. Returns `Air` for out-of-bounds coordinates.
    pub fn get(&self, coord: VoxelCoord) -> Block {
        self.index(coord)
            .map(|i| self.blocks[i])
            .unwrap_or(Block::Air)
    }

    /// Write a block. No-op for out-of-bounds coordinates.
    pub fn set(&mut self, coord: VoxelCoord, block: Block) {
        if let Some(i) = self.index(coord) {
            self.blocks[i] = block;
        }
    }

    /// Fill the inclusive box spanned by corners `a` and `b` with `block`.
    pub fn fill(&mut self, a: VoxelCoord, b: VoxelCoord, block: Block) {
        for y in a.y.min(b.y)..=a.y.max(b.y) {
            for z in a.z.min(b.z)..=a.z.max(b.z) {
                for x in a.x.min(b.x)..=a.x.max(b.x) {
                    self.set(VoxelCoord::new(x, y, z), block);
                }
            }
        }
    }
}

impl BlockView for VoxelWorld {
    fn block(&self, coord: VoxelCoord) -> Block {
        self.get(coord)
    }

    fn highest_block_y(&self, x: i32, z: i32) -> Option<i32> {
        let bottom = self.origin.y;
        let top = bottom + self.size_y as i32;
        (bottom..top)
            .rev()
            .find(|&y| !self.get(VoxelCoord::new(x, y, z)).is_air())
    }
}

impl BlockEdit for VoxelWorld {
    fn set_block(&mut self, coord: VoxelCoord, block: Block) {
        self.set(coord, block);
    }
}

// ---------------------------------------------------------------------------
// World registry
// ---------------------------------------------------------------------------

/// All loaded worlds, keyed by ID. BTreeMap for deterministic iteration.
#[derive(Clone, Debug, Default)]
pub struct Worlds {
    worlds: BTreeMap<WorldId, VoxelWorld>,
}

impl Worlds {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load (or replace) a world.
    pub fn insert(&mut self, id: WorldId, world: VoxelWorld) -> Option<VoxelWorld> {
        self.worlds.insert(id, world)
    }

    /// Unload a world. Walks in it will fail closed on their next tick.
    pub fn remove(&mut self, id: WorldId) -> Option<VoxelWorld> {
        self.worlds.remove(&id)
    }
}

impl WorldStore for Worlds {
    type World = VoxelWorld;

    fn world(&self, id: WorldId) -> Option<&VoxelWorld> {
        self.worlds.get(&id)
    }

    fn world_mut(&mut self, id: WorldId) -> Option<&mut VoxelWorld> {
        self.worlds.get_mut(&id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_world_is_all_air() {
        let world = VoxelWorld::new(4, 4, 4);
        for x in 0..4 {
            for y in 0..4 {
                for z in 0..4 {
                    assert_eq!(world.get(VoxelCoord::new(x, y, z)), Block::Air);
                }
            }
        }
    }

    #[test]
    fn set_and_get() {
        let mut world = VoxelWorld::new(8, 8, 8);
        let coord = VoxelCoord::new(3, 5, 2);
        world.set(coord, Block::Solid);
        assert_eq!(world.get(coord), Block::Solid);
        // Neighbors are still air.
        assert_eq!(world.get(VoxelCoord::new(3, 5, 3)), Block::Air);
    }

    #[test]
    fn origin_offset_allows_negative_coordinates() {
        let mut world = VoxelWorld::with_origin(VoxelCoord::new(-8, -4, -8), 16, 8, 16);
        let coord = VoxelCoord::new(-8, -4, -1);
        world.set(coord, Block::Slab);
        assert_eq!(world.get(coord), Block::Slab);
        assert!(!world.in_bounds(VoxelCoord::new(8, 0, 0)));
        assert!(world.in_bounds(VoxelCoord::new(7, 3, 7)));
    }

    #[test]
    fn out_of_bounds_read_returns_air() {
        let world = VoxelWorld::new(4, 4, 4);
        assert_eq!(world.get(VoxelCoord::new(-1, 0, 0)), Block::Air);
        assert_eq!(world.get(VoxelCoord::new(0, -1, 0)), Block::Air);
        assert_eq!(world.get(VoxelCoord::new(4, 0, 0)), Block::Air);
        assert_eq!(world.get(VoxelCoord::new(100, 100, 100)), Block::Air);
    }

    #[test]
    fn out_of_bounds_write_is_noop() {
        let mut world = VoxelWorld::new(4, 4, 4);
        // Should not panic.
        world.set(VoxelCoord::new(-1, 0, 0), Block::Solid);
        world.set(VoxelCoord::new(100, 0, 0), Block::Solid);
    }

    #[test]
    fn fill_accepts_corners_in_any_order() {
        let mut world = VoxelWorld::new(8, 8, 8);
        world.fill(VoxelCoord::new(3, 0, 3), VoxelCoord::new(1, 0, 1), Block::Solid);
        assert_eq!(world.get(VoxelCoord::new(2, 0, 2)), Block::Solid);
        assert_eq!(world.get(VoxelCoord::new(4, 0, 2)), Block::Air);
    }

    #[test]
    fn highest_block_scans_column() {
        let mut world = VoxelWorld::new(4, 10, 4);
        world.set(VoxelCoord::new(1, 2, 1), Block::Solid);
        world.set(VoxelCoord::new(1, 6, 1), Block::Carpet);
        assert_eq!(world.highest_block_y(1, 1), Some(6));
        assert_eq!(world.highest_block_y(2, 2), None);
    }

    #[test]
    fn set_open_only_changes_doors() {
        let mut world = VoxelWorld::new(4, 4, 4);
        let door = VoxelCoord::new(1, 1, 1);
        world.set(door, Block::Door { open: false });
        assert!(world.set_open(door, true));
        assert!(!world.set_open(door, true));
        assert_eq!(world.get(door), Block::Door { open: true });
        world.set(door, Block::Solid);
        assert!(!world.set_open(door, false));
    }

    #[test]
    fn registry_lookup_and_unload() {
        let mut worlds = Worlds::new();
        worlds.insert(WorldId(1), VoxelWorld::new(2, 2, 2));
        assert!(worlds.world(WorldId(1)).is_some());
        assert!(worlds.world(WorldId(2)).is_none());
        assert!(worlds.remove(WorldId(1)).is_some());
        assert!(worlds.world_mut(WorldId(1)).is_none());
    }
}
