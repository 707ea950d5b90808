use geo::{BoundingRect, MultiPolygon};
use rstar::AABB;

use super::projection::METERS_PER_DEGREE;

/// Bounding box in WGS84 degrees
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub min_lon: f64,
    pub max_lon: f64,
    pub min_lat: f64,
    pub max_lat: f64,
}

impl GeoBounds {
    /// Bounding box of a geometry stored as `x = lon`, `y = lat`
    pub fn of_geometry(geometry: &MultiPolygon<f64>) -> Option<Self> {
        let rect = geometry.bounding_rect()?;
        Some(Self {
            min_lon: rect.min().x,
            max_lon: rect.max().x,
            min_lat: rect.min().y,
            max_lat: rect.max().y,
        })
    }

    /// Degree boxes covering every point within `radius_m` of `center`
    ///
    /// Returns two boxes when the search area crosses the antimeridian.
    ///
    /// # Arguments
    /// * `center` - (lat, lon) point in WGS84
    /// * `radius_m` - Search radius in meters
    pub fn around(center: (f64, f64), radius_m: f64) -> Vec<Self> {
        let (lat, lon) = center;

        let lat_delta = radius_m / METERS_PER_DEGREE;
        let min_lat = (lat - lat_delta).max(-90.0);
        let max_lat = (lat + lat_delta).min(90.0);

        // Longitude degrees shrink toward the poles, so size the box for the
        // poleward edge of the band.
        let poleward_lat = (lat.abs() + lat_delta).min(90.0);
        let cos_lat = poleward_lat.to_radians().cos();
        let lon_delta = if cos_lat > 1e-9 {
            radius_m / (METERS_PER_DEGREE * cos_lat)
        } else {
            f64::INFINITY
        };

        if lon_delta >= 180.0 {
            return vec![Self {
                min_lon: -180.0,
                max_lon: 180.0,
                min_lat,
                max_lat,
            }];
        }

        let west = lon - lon_delta;
        let east = lon + lon_delta;
        let band = |min_lon: f64, max_lon: f64| Self {
            min_lon,
            max_lon,
            min_lat,
            max_lat,
        };

        if west < -180.0 {
            vec![band(west + 360.0, 180.0), band(-180.0, east)]
        } else if east > 180.0 {
            vec![band(west, 180.0), band(-180.0, east - 360.0)]
        } else {
            vec![band(west, east)]
        }
    }

    pub fn width(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    pub fn height(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Envelope for the R-tree, in (lon, lat) order
    pub fn to_aabb(&self) -> AABB<[f64; 2]> {
        AABB::from_corners([self.min_lon, self.min_lat], [self.max_lon, self.max_lat])
    }
}
