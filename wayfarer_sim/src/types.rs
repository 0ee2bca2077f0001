// Core types shared across the route engine.
//
// Defines integer grid coordinates (`VoxelCoord`, which doubles as the
// "floor cell" an actor stands on), compact identifiers for worlds and
// actors, and the caller-facing `Waypoint` / `PathPoint` values. All types
// derive `Serialize` and `Deserialize` so scenes and paths can be written to
// JSON by tooling.
//
// Positions are feet positions in world units (`glam::DVec3`). Block
// `(x, y, z)` occupies `[x, x+1) × [y, y+1) × [z, z+1)`.
//
// See also: `world.rs` for the voxel storage these coordinates index,
// `pathfinding.rs` which packs coordinates into hash keys, `route.rs` which
// stores `PathPoint`s in a `Path`.

use glam::DVec3;
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// Spatial types
// ---------------------------------------------------------------------------

/// A position in the 3D voxel grid. Each component is in block units.
///
/// The coordinate system uses right-handed conventions:
/// - X: east  (positive) / west  (negative)
/// - Y: up    (positive) / down  (negative)
/// - Z: south (positive) / north (negative)
///
/// When used as a floor cell, `y` is the block the actor stands ON, not the
/// block its feet occupy.
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct VoxelCoord {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl VoxelCoord {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// The block containing a world-space point.
    pub fn containing(pos: DVec3) -> Self {
        Self::new(
            pos.x.floor() as i32,
            pos.y.floor() as i32,
            pos.z.floor() as i32,
        )
    }

    /// Offset by `(dx, dy, dz)`.
    pub const fn offset(self, dx: i32, dy: i32, dz: i32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.z + dz)
    }

    /// The block directly above.
    pub const fn above(self) -> Self {
        self.offset(0, 1, 0)
    }

    /// Pack into a 64-bit key: 26 bits of x, 26 bits of z, 12 bits of y
    /// (in the top bits, so a negative y sets bit 63).
    ///
    /// Each component is masked to its field width, so negative coordinates
    /// wrap instead of bleeding into neighbouring fields. Keys are unique
    /// for x, z in `[-2^25, 2^25)` and y in `[-2^11, 2^11)`.
    pub const fn packed_key(self) -> u64 {
        (self.x as i64 as u64 & 0x3FF_FFFF)
            | ((self.z as i64 as u64 & 0x3FF_FFFF) << 26)
            | ((self.y as i64 as u64 & 0xFFF) << 52)
    }

    /// Center of the block's footprint at the given height.
    pub fn center_at(self, y: f64) -> DVec3 {
        DVec3::new(self.x as f64 + 0.5, y, self.z as f64 + 0.5)
    }
}

impl fmt::Display for VoxelCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

// ---------------------------------------------------------------------------
// Identifiers: simple integers for compactness.
// ---------------------------------------------------------------------------

/// Identifies one loaded world in a `WorldStore`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorldId(pub u32);

/// Identifies the actor (character) that a walk moves.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ActorId(pub u64);

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "world#{}", self.0)
    }
}

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "actor#{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Route inputs and outputs
// ---------------------------------------------------------------------------

/// A caller-supplied stop on a route: a feet position in a world plus the
/// orientation the actor should have when standing there.
///
/// Angles are in degrees. Yaw 0 faces +Z, yaw 90 faces −X; pitch is positive
/// looking down.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    pub world: WorldId,
    pub position: DVec3,
    #[serde(default)]
    pub yaw: f32,
    #[serde(default)]
    pub pitch: f32,
}

impl Waypoint {
    pub fn new(world: WorldId, position: DVec3) -> Self {
        Self {
            world,
            position,
            yaw: 0.0,
            pitch: 0.0,
        }
    }

    pub fn with_rotation(mut self, yaw: f32, pitch: f32) -> Self {
        self.yaw = yaw;
        self.pitch = pitch;
        self
    }

    /// Unit look direction for this orientation.
    pub fn direction(&self) -> DVec3 {
        let yaw = (self.yaw as f64).to_radians();
        let pitch = (self.pitch as f64).to_radians();
        let xz = pitch.cos();
        DVec3::new(-xz * yaw.sin(), -pitch.sin(), xz * yaw.cos())
    }

    pub fn point(&self) -> PathPoint {
        PathPoint {
            world: self.world,
            position: self.position,
        }
    }
}

/// One sample of a dense path: a feet position tagged with its world.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct PathPoint {
    pub world: WorldId,
    pub position: DVec3,
}
