use geo::{GeodesicArea, LineString, MultiPolygon, Polygon};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RetrievalError;
use crate::geometry::validate_geometry;

/// Identifier of a water body in the water-mask dataset
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PolygonId(pub u64);

impl fmt::Display for PolygonId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A water body from the water mask.
///
/// Geometry is kept in WGS84 with `x = lon` and `y = lat`. Fragmented water bodies
/// are represented as several parts of one `MultiPolygon`.
#[derive(Debug, Clone, PartialEq)]
pub struct ReservoirPolygon {
    pub id: PolygonId,
    pub geometry: MultiPolygon<f64>,
    /// Surface area in km²
    pub area_km2: f64,
    pub name: Option<String>,
}

impl ReservoirPolygon {
    /// Create a polygon whose area is computed geodesically from its geometry
    pub fn new(id: PolygonId, geometry: MultiPolygon<f64>) -> Self {
        let area_km2 = geometry.geodesic_area_unsigned() / 1_000_000.0;
        Self {
            id,
            geometry,
            area_km2,
            name: None,
        }
    }

    /// Create a single-part polygon from an outer ring of (lat, lon) points
    pub fn from_outer(id: PolygonId, outer: &[(f64, f64)]) -> Self {
        Self::with_holes(id, outer, &[])
    }

    /// Create a single-part polygon from (lat, lon) rings
    pub fn with_holes(id: PolygonId, outer: &[(f64, f64)], holes: &[Vec<(f64, f64)>]) -> Self {
        let polygon = Polygon::new(
            ring_from_lat_lon(outer),
            holes.iter().map(|hole| ring_from_lat_lon(hole)).collect(),
        );
        Self::new(id, MultiPolygon::new(vec![polygon]))
    }

    /// Override the computed area with one supplied by the water-mask source
    pub fn with_area(mut self, area_km2: f64) -> Self {
        self.area_km2 = area_km2;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn validate(&self, check_self_intersection: bool) -> Result<(), RetrievalError> {
        validate_geometry(&self.geometry, check_self_intersection).map_err(|issue| {
            RetrievalError::InvalidGeometry {
                polygon: self.id,
                issue,
            }
        })
    }
}

fn ring_from_lat_lon(points: &[(f64, f64)]) -> LineString<f64> {
    points
        .iter()
        .map(|&(lat, lon)| geo::coord! { x: lon, y: lat })
        .collect()
}
