use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::RetrievalError;

/// Identifier of a dam record in the dam registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DamId(pub u64);

impl fmt::Display for DamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A dam location with its optional reported reservoir area
#[derive(Debug, Clone, PartialEq)]
pub struct DamPoint {
    pub id: DamId,
    /// Latitude in WGS84 degrees
    pub lat: f64,
    /// Longitude in WGS84 degrees
    pub lon: f64,
    /// Reservoir area reported by the registry, in km²
    pub reported_area_km2: Option<f64>,
    pub name: Option<String>,
}

impl DamPoint {
    pub fn new(id: DamId, lat: f64, lon: f64) -> Self {
        Self {
            id,
            lat,
            lon,
            reported_area_km2: None,
            name: None,
        }
    }

    pub fn with_reported_area(mut self, area_km2: f64) -> Self {
        self.reported_area_km2 = Some(area_km2);
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// (lat, lon) pair, the order used by [`Projector`](crate::geometry::Projector)
    pub fn coords(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }

    /// Reject coordinates that are not finite or fall outside WGS84 ranges
    pub fn validate(&self) -> Result<(), RetrievalError> {
        let lat_ok = self.lat.is_finite() && (-90.0..=90.0).contains(&self.lat);
        let lon_ok = self.lon.is_finite() && (-180.0..=180.0).contains(&self.lon);
        if lat_ok && lon_ok {
            Ok(())
        } else {
            Err(RetrievalError::CoordinateOutOfRange {
                dam: self.id,
                lat: self.lat,
                lon: self.lon,
            })
        }
    }

    /// Reported area usable for the plausibility check (positive and finite)
    pub fn usable_reported_area(&self) -> Option<f64> {
        self.reported_area_km2
            .filter(|area| area.is_finite() && *area > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_in_range() {
        assert!(DamPoint::new(DamId(1), 37.5, -122.3).validate().is_ok());
        assert!(DamPoint::new(DamId(2), -90.0, 180.0).validate().is_ok());
    }

    #[test]
    fn test_validate_out_of_range() {
        let err = DamPoint::new(DamId(3), 91.0, 0.0).validate().unwrap_err();
        assert!(matches!(
            err,
            RetrievalError::CoordinateOutOfRange { dam: DamId(3), .. }
        ));
        assert!(DamPoint::new(DamId(4), 0.0, -180.5).validate().is_err());
        assert!(DamPoint::new(DamId(5), f64::NAN, 0.0).validate().is_err());
    }

    #[test]
    fn test_usable_reported_area() {
        let dam = DamPoint::new(DamId(1), 0.0, 0.0);
        assert_eq!(dam.usable_reported_area(), None);
        assert_eq!(dam.clone().with_reported_area(0.0).usable_reported_area(), None);
        assert_eq!(dam.with_reported_area(12.5).usable_reported_area(), Some(12.5));
    }
}
