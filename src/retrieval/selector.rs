use std::collections::BTreeMap;

use super::SpatialIndex;
use crate::domain::{CandidatePair, DamId, DamPoint, PolygonId};

/// Candidate pairs of one round, grouped per dam
///
/// Each dam's list is ordered nearest first, ties broken by polygon id. Dams without
/// any qualifying polygon have no entry.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CandidateSet {
    by_dam: BTreeMap<DamId, Vec<CandidatePair>>,
}

impl CandidateSet {
    pub fn for_dam(&self, dam: DamId) -> &[CandidatePair] {
        self.by_dam.get(&dam).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Dams with at least one candidate, in id order
    pub fn dams(&self) -> impl Iterator<Item = DamId> + '_ {
        self.by_dam.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (DamId, &[CandidatePair])> {
        self.by_dam.iter().map(|(dam, pairs)| (*dam, pairs.as_slice()))
    }

    /// Number of candidate pairs across all dams
    pub fn len(&self) -> usize {
        self.by_dam.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_dam.is_empty()
    }

    pub fn dam_count(&self) -> usize {
        self.by_dam.len()
    }
}

/// Produces candidate pairs from the spatial index for one tolerance band
pub struct CandidateSelector<'i, 'a> {
    index: &'i SpatialIndex<'a>,
    max_per_dam: usize,
}

impl<'i, 'a> CandidateSelector<'i, 'a> {
    pub fn new(index: &'i SpatialIndex<'a>, max_per_dam: usize) -> Self {
        Self { index, max_per_dam }
    }

    pub fn select_candidates(&self, dams: &[&DamPoint], tolerance_m: f64) -> CandidateSet {
        self.select_candidates_excluding(dams, tolerance_m, |_, _| false)
    }

    /// Query every dam at `tolerance_m`, skipping pairs for which `excluded` holds
    ///
    /// At most `max_per_dam` of the nearest remaining polygons are kept per dam.
    pub fn select_candidates_excluding<F>(
        &self,
        dams: &[&DamPoint],
        tolerance_m: f64,
        excluded: F,
    ) -> CandidateSet
    where
        F: Fn(DamId, PolygonId) -> bool,
    {
        let mut by_dam = BTreeMap::new();

        for dam in dams {
            let pairs: Vec<CandidatePair> = self
                .index
                .query(dam.coords(), tolerance_m)
                .into_iter()
                .filter(|hit| !excluded(dam.id, hit.polygon))
                .filter_map(|hit| {
                    let polygon = self.index.get(hit.polygon)?;
                    Some(CandidatePair {
                        dam: dam.id,
                        polygon: hit.polygon,
                        distance_m: hit.proximity.distance_m,
                        contained: hit.proximity.contained,
                        area_km2: polygon.area_km2,
                    })
                })
                .take(self.max_per_dam)
                .collect();

            if !pairs.is_empty() {
                by_dam.insert(dam.id, pairs);
            }
        }

        CandidateSet { by_dam }
    }
}
