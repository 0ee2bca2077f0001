// Error types for route planning and configuration loading.
//
// Failures fall into two families:
// - Invalid input (`TooFewWaypoints`, `WorldMismatch`, `UnknownWorld`,
//   `InvalidStart`, `InvalidEnd`): the request itself is wrong. Retrying
//   the same request can never succeed.
// - Unreachable (`NoPath`): the search ran and found nothing. When the
//   iteration budget was the limit, a retry with a larger budget may work.
//
// Searches report `SegmentError`; the route composer wraps it with the
// index of the failing segment in `PathError::Segment`.
//
// Runtime hazards during a walk (e.g. the world unloading) are not errors:
// the walker cancels the walk and reports it through `WalkHooks`.

use crate::types::{VoxelCoord, WorldId};
use thiserror::Error;

/// Why a single start→end search failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SegmentError {
    #[error("start and end lie in different worlds ({start} vs {end})")]
    WorldMismatch { start: WorldId, end: WorldId },

    #[error("{0} is not loaded")]
    UnknownWorld(WorldId),

    #[error("start is not on a walkable floor (floor cell {0})")]
    InvalidStart(VoxelCoord),

    #[error("end is not on a walkable floor (floor cell {0})")]
    InvalidEnd(VoxelCoord),

    #[error("no path found after {iterations} iterations (budget exhausted: {exhausted})")]
    NoPath { iterations: usize, exhausted: bool },
}

impl SegmentError {
    /// True for failures caused by a bad request rather than by the search.
    pub fn is_invalid_input(&self) -> bool {
        !matches!(self, SegmentError::NoPath { .. })
    }
}

/// Why route composition failed. No partial path is ever returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PathError {
    #[error("a route needs at least 2 waypoints, got {0}")]
    TooFewWaypoints(usize),

    #[error("segment {index} (waypoint {index} to {}): {source}", .index + 1)]
    Segment {
        index: usize,
        #[source]
        source: SegmentError,
    },

    #[error("route worker stopped before producing a result")]
    WorkerLost,
}

impl PathError {
    /// True when retrying with a larger iteration budget might succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            PathError::Segment {
                source: SegmentError::NoPath {
                    exhausted: true,
                    ..
                },
                ..
            }
        )
    }

    /// Index of the failing segment, if the failure belongs to one.
    pub fn segment_index(&self) -> Option<usize> {
        match self {
            PathError::Segment { index, .. } => Some(*index),
            _ => None,
        }
    }
}

/// Failure to load a JSON configuration or scene file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
