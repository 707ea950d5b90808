use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{DamId, PolygonId};

/// Which input collection a fatal error refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Dams,
    Polygons,
}

impl fmt::Display for InputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputKind::Dams => f.write_str("dam points"),
            InputKind::Polygons => f.write_str("reservoir polygons"),
        }
    }
}

/// Why a reservoir geometry was excluded from the index
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GeometryIssue {
    #[error("geometry has no polygons")]
    Empty,
    #[error("ring {ring} has {count} coordinates, at least 4 are required")]
    TooFewCoordinates { ring: usize, count: usize },
    #[error("ring {ring} contains a NaN or infinite coordinate")]
    NonFiniteCoordinate { ring: usize },
    #[error("polygon encloses zero area")]
    ZeroArea,
    #[error("ring {ring} intersects itself")]
    SelfIntersection { ring: usize },
}

/// Errors raised while retrieving reservoirs.
///
/// `EmptyInput` is fatal. Every other variant is recorded as a warning in
/// [`Diagnostics`](crate::retrieval::Diagnostics) and the offending record is skipped.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RetrievalError {
    #[error("no usable {0} supplied")]
    EmptyInput(InputKind),

    #[error("polygon {polygon} excluded: {issue}")]
    InvalidGeometry {
        polygon: PolygonId,
        issue: GeometryIssue,
    },

    #[error("dam {dam} skipped: coordinate ({lat}, {lon}) is missing or out of range")]
    CoordinateOutOfRange { dam: DamId, lat: f64, lon: f64 },

    #[error("dam {0} appears more than once, later record skipped")]
    DuplicateDam(DamId),

    #[error("polygon {0} appears more than once, later record skipped")]
    DuplicatePolygon(PolygonId),
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} must be a positive number of meters, got {value}")]
    InvalidTolerance { name: &'static str, value: f64 },

    #[error("round 1 tolerance ({round1} m) must not exceed round 2 tolerance ({round2} m)")]
    ToleranceOrder { round1: f64, round2: f64 },

    #[error("area ratio band [{min}, {max}] must satisfy 0 < min <= max")]
    InvalidAreaBand { min: f64, max: f64 },

    #[error("max_candidates_per_dam must be at least 1")]
    NoCandidates,

    #[error("failed to parse config file {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },
}
