// Block materials and their collision geometry.
//
// `Block` is a closed set of terrain materials. Each variant answers the
// material questions the sampler needs (air, liquid, passable, solid,
// openable) and reports its collision shape as a small list of axis-aligned
// sub-boxes in cell-local unit coordinates (`[0, 1]` on every axis).
//
// A block with no sub-boxes is either non-colliding (air, plants, water) or,
// for solid materials, treated as a full cube by the sampler.
//
// See also: `sampler.rs` for the queries built on these flags,
// `world.rs` for storage.

use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

/// Horizontal direction a stair's tall half faces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    North,
    South,
    East,
    West,
}

/// The material of a single block in the world grid.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Block {
    #[default]
    Air,
    /// Full cube.
    Solid,
    /// Bottom half slab (top at 0.5).
    Slab,
    /// Half-height base plus a half-height step on the `facing` side.
    Stairs { facing: Facing },
    /// Thin floor covering (top at 1/16).
    Carpet,
    /// Non-colliding vegetation: tall grass, flowers, saplings.
    Plant,
    Water,
    /// An openable panel. Never blocks movement, never counts as floor.
    Door { open: bool },
}

/// An axis-aligned box in cell-local coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CollisionBox {
    pub min: [f64; 3],
    pub max: [f64; 3],
}

impl CollisionBox {
    pub const fn new(min: [f64; 3], max: [f64; 3]) -> Self {
        Self { min, max }
    }

    /// Whether this box's footprint covers the local `(x, z)` offset.
    /// Edges are inclusive.
    pub fn covers(&self, local_x: f64, local_z: f64) -> bool {
        local_x >= self.min[0]
            && local_x <= self.max[0]
            && local_z >= self.min[2]
            && local_z <= self.max[2]
    }

    pub fn top(&self) -> f64 {
        self.max[1]
    }
}

const FULL: CollisionBox = CollisionBox::new([0.0, 0.0, 0.0], [1.0, 1.0, 1.0]);
const LOWER_HALF: CollisionBox = CollisionBox::new([0.0, 0.0, 0.0], [1.0, 0.5, 1.0]);
const CARPET: CollisionBox = CollisionBox::new([0.0, 0.0, 0.0], [1.0, 0.0625, 1.0]);
const DOOR_THICKNESS: f64 = 0.1875;

impl Block {
    pub fn is_air(self) -> bool {
        matches!(self, Block::Air)
    }

    pub fn is_liquid(self) -> bool {
        matches!(self, Block::Water)
    }

    /// Whether an actor can walk through this block as if it were air.
    pub fn is_passable(self) -> bool {
        match self {
            Block::Air | Block::Plant | Block::Water => true,
            Block::Door { open } => open,
            _ => false,
        }
    }

    /// Whether the material is solid (has real collision), regardless of
    /// whether that collision currently lets the actor through.
    pub fn is_solid_material(self) -> bool {
        matches!(
            self,
            Block::Solid | Block::Slab | Block::Stairs { .. } | Block::Carpet | Block::Door { .. }
        )
    }

    pub fn is_carpet(self) -> bool {
        matches!(self, Block::Carpet)
    }

    /// Door-like blocks that the walker opens and closes.
    pub fn is_openable(self) -> bool {
        matches!(self, Block::Door { .. })
    }

    /// Open state of an openable block, `None` for everything else.
    pub fn open_state(self) -> Option<bool> {
        match self {
            Block::Door { open } => Some(open),
            _ => None,
        }
    }

    /// This block with its open state replaced. Non-openables are returned
    /// unchanged.
    pub fn with_open(self, open: bool) -> Block {
        match self {
            Block::Door { .. } => Block::Door { open },
            other => other,
        }
    }

    /// Collision sub-boxes in cell-local coordinates.
    pub fn collision_boxes(self) -> SmallVec<[CollisionBox; 2]> {
        match self {
            Block::Air | Block::Plant | Block::Water => SmallVec::new(),
            Block::Solid => smallvec![FULL],
            Block::Slab => smallvec![LOWER_HALF],
            Block::Carpet => smallvec![CARPET],
            Block::Stairs { facing } => smallvec![LOWER_HALF, stair_step(facing)],
            Block::Door { open: false } => smallvec![CollisionBox::new(
                [0.0, 0.0, 0.0],
                [1.0, 1.0, DOOR_THICKNESS],
            )],
            Block::Door { open: true } => smallvec![CollisionBox::new(
                [0.0, 0.0, 0.0],
                [DOOR_THICKNESS, 1.0, 1.0],
            )],
        }
    }
}

fn stair_step(facing: Facing) -> CollisionBox {
    let (min_x, max_x, min_z, max_z) = match facing {
        Facing::North => (0.0, 1.0, 0.0, 0.5),
        Facing::South => (0.0, 1.0, 0.5, 1.0),
        Facing::East => (0.5, 1.0, 0.0, 1.0),
        Facing::West => (0.0, 0.5, 0.0, 1.0),
    };
    CollisionBox::new([min_x, 0.5, min_z], [max_x, 1.0, max_z])
}
