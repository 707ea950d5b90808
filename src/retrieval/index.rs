use rstar::RTree;
use rstar::primitives::{GeomWithData, Rectangle};
use std::collections::{BTreeMap, BTreeSet};

use crate::domain::{PolygonId, ReservoirPolygon};
use crate::error::{InputKind, RetrievalError};
use crate::geometry::{GeoBounds, Proximity, measure};

type Entry = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// A polygon found near a query point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Nearby {
    pub polygon: PolygonId,
    pub proximity: Proximity,
}

/// R-tree over reservoir bounding boxes.
///
/// Boxes are stored in WGS84 degrees; the final distance test is done in meters
/// around the query point, so a tolerance keeps its meaning at every latitude.
/// The index borrows the polygons and never modifies them.
pub struct SpatialIndex<'a> {
    polygons: Vec<&'a ReservoirPolygon>,
    by_id: BTreeMap<PolygonId, usize>,
    tree: RTree<Entry>,
}

impl<'a> SpatialIndex<'a> {
    /// Build the index over already-validated polygons
    pub fn build(
        polygons: impl IntoIterator<Item = &'a ReservoirPolygon>,
    ) -> Result<Self, RetrievalError> {
        let polygons: Vec<&ReservoirPolygon> = polygons.into_iter().collect();
        if polygons.is_empty() {
            return Err(RetrievalError::EmptyInput(InputKind::Polygons));
        }

        let entries: Vec<Entry> = polygons
            .iter()
            .enumerate()
            .filter_map(|(i, polygon)| {
                let bounds = GeoBounds::of_geometry(&polygon.geometry)?;
                Some(Entry::new(Rectangle::from_aabb(bounds.to_aabb()), i))
            })
            .collect();

        let by_id = polygons
            .iter()
            .enumerate()
            .map(|(i, polygon)| (polygon.id, i))
            .collect();

        Ok(Self {
            polygons,
            by_id,
            tree: RTree::bulk_load(entries),
        })
    }

    pub fn len(&self) -> usize {
        self.polygons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.polygons.is_empty()
    }

    pub fn get(&self, id: PolygonId) -> Option<&'a ReservoirPolygon> {
        self.by_id.get(&id).map(|&i| self.polygons[i])
    }

    /// Polygons within `tolerance_m` meters of a (lat, lon) point
    ///
    /// Results are ordered nearest first, ties broken by polygon id. An empty result
    /// means nothing qualified.
    pub fn query(&self, point: (f64, f64), tolerance_m: f64) -> Vec<Nearby> {
        let mut seen = BTreeSet::new();
        let mut found = Vec::new();

        for bounds in GeoBounds::around(point, tolerance_m) {
            for entry in self.tree.locate_in_envelope_intersecting(&bounds.to_aabb()) {
                if !seen.insert(entry.data) {
                    continue;
                }
                let polygon = self.polygons[entry.data];
                let proximity = measure(point, &polygon.geometry);
                if proximity.distance_m <= tolerance_m {
                    found.push(Nearby {
                        polygon: polygon.id,
                        proximity,
                    });
                }
            }
        }

        found.sort_by(|a, b| {
            a.proximity
                .distance_m
                .total_cmp(&b.proximity.distance_m)
                .then_with(|| a.polygon.cmp(&b.polygon))
        });
        found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::METERS_PER_DEGREE;

    fn square(id: u64, lat: f64, lon: f64, side_deg: f64) -> ReservoirPolygon {
        ReservoirPolygon::from_outer(
            PolygonId(id),
            &[
                (lat, lon),
                (lat, lon + side_deg),
                (lat + side_deg, lon + side_deg),
                (lat + side_deg, lon),
                (lat, lon),
            ],
        )
    }

    #[test]
    fn test_build_empty_fails() {
        let err = SpatialIndex::build(std::iter::empty()).err().unwrap();
        assert_eq!(err, RetrievalError::EmptyInput(InputKind::Polygons));
    }

    #[test]
    fn test_query_contained_and_near() {
        let polygons = vec![square(1, 0.0, 0.0, 0.01), square(2, 0.0, 0.02, 0.01)];
        let index = SpatialIndex::build(&polygons).unwrap();
        assert_eq!(index.len(), 2);

        let hits = index.query((0.005, 0.005), 500.0);
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].polygon, PolygonId(1));
        assert!(hits[0].proximity.contained);

        // Midway between the squares: 0.005 degrees (~557 m) from each
        let hits = index.query((0.005, 0.015), 600.0);
        assert_eq!(hits.len(), 2);
        assert!(index.query((0.005, 0.015), 500.0).is_empty());
    }

    #[test]
    fn test_query_orders_by_distance() {
        let polygons = vec![square(1, 0.0, 0.0, 0.01), square(2, 0.0, 0.0125, 0.01)];
        let index = SpatialIndex::build(&polygons).unwrap();

        // 100 m east of polygon 1's edge, ~178 m west of polygon 2
        let lon = 0.01 + 100.0 / METERS_PER_DEGREE;
        let hits = index.query((0.005, lon), 500.0);
        let ids: Vec<PolygonId> = hits.iter().map(|h| h.polygon).collect();
        assert_eq!(ids, vec![PolygonId(1), PolygonId(2)]);
    }

    #[test]
    fn test_query_across_antimeridian() {
        let polygons = vec![square(7, 0.0, -180.0, 0.01)];
        let index = SpatialIndex::build(&polygons).unwrap();

        let hits = index.query((0.005, 179.998), 500.0);
        assert_eq!(hits.len(), 1);
        assert!((hits[0].proximity.distance_m - 0.002 * METERS_PER_DEGREE).abs() < 1.0);
    }

    #[test]
    fn test_get_by_id() {
        let polygons = vec![square(5, 0.0, 0.0, 0.01)];
        let index = SpatialIndex::build(&polygons).unwrap();
        assert_eq!(index.get(PolygonId(5)).map(|p| p.id), Some(PolygonId(5)));
        assert!(index.get(PolygonId(6)).is_none());
    }
}
