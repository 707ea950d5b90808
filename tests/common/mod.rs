#![allow(dead_code)]

use resmatch::domain::{PolygonId, ReservoirPolygon};
use resmatch::geometry::METERS_PER_DEGREE;

/// Meters north-south expressed in degrees of latitude
pub fn deg(meters: f64) -> f64 {
    meters / METERS_PER_DEGREE
}

/// Meters east-west expressed in degrees of longitude at `lat`
pub fn deg_lon(meters: f64, lat: f64) -> f64 {
    meters / (METERS_PER_DEGREE * lat.to_radians().cos())
}

/// Axis-aligned lake with its south-west corner at (lat, lon), sides given in meters
pub fn lake(id: u64, lat: f64, lon: f64, height_m: f64, width_m: f64) -> ReservoirPolygon {
    let north = lat + deg(height_m);
    let east = lon + deg_lon(width_m, lat);
    ReservoirPolygon::from_outer(
        PolygonId(id),
        &[(lat, lon), (lat, east), (north, east), (north, lon), (lat, lon)],
    )
}

/// Square lake of `side_m` meters near the equator
pub fn square(id: u64, lat: f64, lon: f64, side_m: f64) -> ReservoirPolygon {
    lake(id, lat, lon, side_m, side_m)
}
