use geo::{Closest, ClosestPoint, Intersects, MultiPolygon, Point};

use super::Projector;

/// How close a dam is to a polygon, measured in the dam's local metric plane
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Proximity {
    /// Meters to the nearest point of the polygon, 0 when contained
    pub distance_m: f64,
    /// The point lies inside the polygon or on its boundary
    pub contained: bool,
}

/// Measure the distance from a (lat, lon) point to a WGS84 geometry
///
/// The geometry is projected onto a plane centered on the point, so the point
/// itself sits at the origin and distances come out in meters.
pub fn measure(point: (f64, f64), geometry: &MultiPolygon<f64>) -> Proximity {
    let local = Projector::new(point).project_multipolygon(geometry);
    let origin = Point::new(0.0, 0.0);

    if local.intersects(&origin) {
        return Proximity {
            distance_m: 0.0,
            contained: true,
        };
    }

    let distance_m = match local.closest_point(&origin) {
        Closest::Intersection(_) => 0.0,
        Closest::SinglePoint(nearest) => nearest.x().hypot(nearest.y()),
        Closest::Indeterminate => f64::INFINITY,
    };

    Proximity {
        distance_m,
        contained: false,
    }
}
