use super::{DamId, PolygonId};

/// A dam/polygon pairing proposed for one round at one tolerance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandidatePair {
    pub dam: DamId,
    pub polygon: PolygonId,
    /// Distance from the dam to the polygon in meters, 0 when contained
    pub distance_m: f64,
    /// The dam lies inside (or on the boundary of) the polygon
    pub contained: bool,
    /// Polygon area in km², carried along for the largest-lake preference
    pub area_km2: f64,
}
