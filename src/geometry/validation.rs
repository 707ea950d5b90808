//! Reservoir geometry validation
//!
//! Rejects geometries the index cannot measure against reliably:
//! - Missing polygons or rings with fewer than 4 coordinates
//! - NaN/Inf coordinates
//! - Self-intersecting rings
//! - Polygons enclosing no area

use geo::algorithm::line_intersection::{LineIntersection, line_intersection};
use geo::{Area, Coord, Line, LineString, MultiPolygon};
use rstar::primitives::{GeomWithData, Line as SegmentGeom};
use rstar::{AABB, RTree};

use crate::error::GeometryIssue;

/// Minimum number of coordinates in a closed ring (a triangle plus closure)
const MIN_RING_COORDS: usize = 4;

type Segment = GeomWithData<SegmentGeom<[f64; 2]>, usize>;

/// Validate a WGS84 reservoir geometry
///
/// Rings are numbered across all parts in order: exterior first, then interiors.
pub fn validate_geometry(
    geometry: &MultiPolygon<f64>,
    check_self_intersection: bool,
) -> Result<(), GeometryIssue> {
    if geometry.0.is_empty() {
        return Err(GeometryIssue::Empty);
    }

    let rings = geometry
        .iter()
        .flat_map(|polygon| std::iter::once(polygon.exterior()).chain(polygon.interiors()));

    for (ring_index, ring) in rings.enumerate() {
        if ring.0.len() < MIN_RING_COORDS {
            return Err(GeometryIssue::TooFewCoordinates {
                ring: ring_index,
                count: ring.0.len(),
            });
        }

        if ring.0.iter().any(|c| !c.x.is_finite() || !c.y.is_finite()) {
            return Err(GeometryIssue::NonFiniteCoordinate { ring: ring_index });
        }

        if check_self_intersection && ring_self_intersects(ring) {
            return Err(GeometryIssue::SelfIntersection { ring: ring_index });
        }
    }

    if geometry.unsigned_area() <= 0.0 {
        return Err(GeometryIssue::ZeroArea);
    }

    Ok(())
}

/// Check whether any two non-adjacent segments of a closed ring touch, or any two
/// adjacent segments overlap
fn ring_self_intersects(ring: &LineString<f64>) -> bool {
    let mut coords: Vec<Coord<f64>> = ring.0.clone();
    coords.dedup();

    let lines: Vec<Line<f64>> = coords.windows(2).map(|w| Line::new(w[0], w[1])).collect();
    let n = lines.len();
    if n < 3 {
        return false;
    }

    let tree = RTree::bulk_load(
        lines
            .iter()
            .enumerate()
            .map(|(i, line)| {
                Segment::new(
                    SegmentGeom::new([line.start.x, line.start.y], [line.end.x, line.end.y]),
                    i,
                )
            })
            .collect(),
    );

    for (i, line) in lines.iter().enumerate() {
        let envelope = AABB::from_corners(
            [line.start.x.min(line.end.x), line.start.y.min(line.end.y)],
            [line.start.x.max(line.end.x), line.start.y.max(line.end.y)],
        );

        for other in tree.locate_in_envelope_intersecting(&envelope) {
            let j = other.data;
            if j <= i {
                continue;
            }
            let adjacent = j == i + 1 || (i == 0 && j == n - 1);

            match line_intersection(*line, lines[j]) {
                None => {}
                Some(LineIntersection::Collinear { .. }) => return true,
                Some(LineIntersection::SinglePoint { is_proper, .. }) => {
                    if is_proper || !adjacent {
                        return true;
                    }
                }
            }
        }
    }

    false
}
