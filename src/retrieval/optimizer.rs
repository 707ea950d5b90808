//! Reduction of candidate pairs to a one-to-one assignment table
//!
//! Each round runs three iterations over its candidate set:
//! 1. Containment priority: a dam inside a polygon claims it (the largest one when
//!    it sits inside several). Polygons claimed this way by a single dam are settled.
//! 2. Uniqueness: every other dam claims its largest free candidate, or its nearest
//!    one when that largest candidate is wanted by another dam too. Polygons with a
//!    single claimant are settled.
//! 3. Conflict: a polygon with several claimants goes to the nearest dam. The losers
//!    fall back to their nearest still-free candidate, contested fallbacks again
//!    going to the nearest dam. Whoever is left is released to the next round.
//!
//! An optional plausibility check then reverts assignments whose polygon area is out
//! of proportion with the area reported for the dam. It runs at the end of every
//! round, not only the last one, so a later round never takes back an assignment an
//! earlier round kept.

use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use super::CandidateSet;
use crate::config::AreaRatioBand;
use crate::domain::{Assignment, AssignmentTable, CandidatePair, DamId, PolygonId, Round, Stage};

/// An assignment reverted by the area plausibility check
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AreaRejection {
    pub dam: DamId,
    pub polygon: PolygonId,
    pub polygon_area_km2: f64,
    pub reported_area_km2: f64,
    /// Polygon area divided by the reported area
    pub ratio: f64,
    pub round: Round,
}

/// Outcome of one optimizer pass
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub table: AssignmentTable,
    /// Dams with candidates that ended the pass unassigned, in id order
    pub released: Vec<DamId>,
    pub rejections: Vec<AreaRejection>,
}

type Claims = BTreeMap<PolygonId, Vec<CandidatePair>>;

pub struct AssociationOptimizer<'d> {
    round: Round,
    area_check: Option<(AreaRatioBand, &'d BTreeMap<DamId, f64>)>,
}

impl<'d> AssociationOptimizer<'d> {
    pub fn new(round: Round) -> Self {
        Self {
            round,
            area_check: None,
        }
    }

    /// Enable the plausibility check against the dams' reported areas (km²)
    pub fn with_area_check(
        mut self,
        band: AreaRatioBand,
        reported_areas: &'d BTreeMap<DamId, f64>,
    ) -> Self {
        self.area_check = Some((band, reported_areas));
        self
    }

    pub fn resolve(&self, candidates: &CandidateSet) -> Resolution {
        let mut table = AssignmentTable::new();
        let mut pending: BTreeSet<DamId> = candidates.dams().collect();

        let contested = self.containment_priority(candidates, &mut table, &mut pending);
        debug!(
            round = self.round.number(),
            settled = table.len(),
            contested = contested.len(),
            "iteration 1 (containment) done"
        );

        let contested =
            self.uniqueness_resolution(candidates, contested, &mut table, &mut pending);
        debug!(
            round = self.round.number(),
            settled = table.len(),
            contested = contested.len(),
            "iteration 2 (uniqueness) done"
        );

        self.conflict_resolution(candidates, contested, &mut table, &mut pending);
        debug!(
            round = self.round.number(),
            settled = table.len(),
            released = pending.len(),
            "iteration 3 (conflict) done"
        );

        let rejections = self.check_plausibility(candidates, &mut table, &mut pending);

        Resolution {
            table,
            released: pending.into_iter().collect(),
            rejections,
        }
    }

    fn containment_priority(
        &self,
        candidates: &CandidateSet,
        table: &mut AssignmentTable,
        pending: &mut BTreeSet<DamId>,
    ) -> Claims {
        let mut claims = Claims::new();
        for (_, pairs) in candidates.iter() {
            if let Some(best) = largest(pairs.iter().filter(|c| c.contained)) {
                claims.entry(best.polygon).or_default().push(*best);
            }
        }

        let mut contested = Claims::new();
        for (polygon, claimants) in claims {
            if claimants.len() == 1 {
                self.settle(table, pending, &claimants[0], Stage::Containment, false);
            } else {
                contested.insert(polygon, claimants);
            }
        }
        contested
    }

    fn uniqueness_resolution(
        &self,
        candidates: &CandidateSet,
        mut claims: Claims,
        table: &mut AssignmentTable,
        pending: &mut BTreeSet<DamId>,
    ) -> Claims {
        let locked: BTreeSet<DamId> = claims.values().flatten().map(|c| c.dam).collect();

        let mut first_choice = BTreeMap::new();
        for dam in pending.iter().filter(|dam| !locked.contains(*dam)) {
            let free = free_candidates(candidates, *dam, table);
            if let Some(best) = largest(free) {
                first_choice.insert(*dam, *best);
            }
        }

        let mut demand: BTreeMap<PolygonId, usize> =
            claims.iter().map(|(polygon, c)| (*polygon, c.len())).collect();
        for choice in first_choice.values() {
            *demand.entry(choice.polygon).or_default() += 1;
        }

        for (dam, choice) in first_choice {
            let claim = if demand[&choice.polygon] > 1 {
                free_candidates(candidates, dam, table)
                    .next()
                    .copied()
                    .unwrap_or(choice)
            } else {
                choice
            };
            claims.entry(claim.polygon).or_default().push(claim);
        }

        let mut contested = Claims::new();
        for (polygon, claimants) in claims {
            if claimants.len() == 1 {
                self.settle(table, pending, &claimants[0], Stage::Uniqueness, false);
            } else {
                contested.insert(polygon, claimants);
            }
        }
        contested
    }

    fn conflict_resolution(
        &self,
        candidates: &CandidateSet,
        claims: Claims,
        table: &mut AssignmentTable,
        pending: &mut BTreeSet<DamId>,
    ) {
        for claimants in claims.values() {
            if let Some(winner) = nearest_dam(claimants) {
                self.settle(table, pending, winner, Stage::Conflict, true);
            }
        }

        let mut fallback = Claims::new();
        for dam in pending.iter() {
            if let Some(nearest) = free_candidates(candidates, *dam, table).next() {
                fallback.entry(nearest.polygon).or_default().push(*nearest);
            }
        }

        for claimants in fallback.values() {
            if let Some(winner) = nearest_dam(claimants) {
                self.settle(table, pending, winner, Stage::Fallback, claimants.len() > 1);
            }
        }
    }

    fn check_plausibility(
        &self,
        candidates: &CandidateSet,
        table: &mut AssignmentTable,
        pending: &mut BTreeSet<DamId>,
    ) -> Vec<AreaRejection> {
        let Some((band, reported_areas)) = self.area_check else {
            return Vec::new();
        };

        let implausible: Vec<AreaRejection> = table
            .iter()
            .filter_map(|assignment| {
                let reported = *reported_areas.get(&assignment.dam)?;
                let polygon_area = candidates
                    .for_dam(assignment.dam)
                    .iter()
                    .find(|c| c.polygon == assignment.polygon)?
                    .area_km2;
                let ratio = polygon_area / reported;
                (!band.contains(ratio)).then_some(AreaRejection {
                    dam: assignment.dam,
                    polygon: assignment.polygon,
                    polygon_area_km2: polygon_area,
                    reported_area_km2: reported,
                    ratio,
                    round: self.round,
                })
            })
            .collect();

        for rejection in &implausible {
            warn!(
                dam = %rejection.dam,
                polygon = %rejection.polygon,
                ratio = rejection.ratio,
                "area ratio outside [{}, {}], assignment reverted",
                band.min,
                band.max
            );
            table.remove_dam(rejection.dam);
            pending.insert(rejection.dam);
        }

        implausible
    }

    fn settle(
        &self,
        table: &mut AssignmentTable,
        pending: &mut BTreeSet<DamId>,
        pair: &CandidatePair,
        stage: Stage,
        contested: bool,
    ) {
        let assignment = Assignment {
            dam: pair.dam,
            polygon: pair.polygon,
            distance_m: pair.distance_m,
            contained: pair.contained,
            contested,
            round: self.round,
            stage,
        };
        if table.insert(assignment).is_ok() {
            pending.remove(&pair.dam);
        }
    }
}

/// A dam's candidates whose polygon is not taken yet, nearest first
fn free_candidates<'c>(
    candidates: &'c CandidateSet,
    dam: DamId,
    table: &AssignmentTable,
) -> impl Iterator<Item = &'c CandidatePair> {
    candidates
        .for_dam(dam)
        .iter()
        .filter(|c| !table.is_polygon_taken(c.polygon))
}

/// Largest polygon; ties go to the nearer one, then to the lower polygon id
fn largest<'c>(pairs: impl Iterator<Item = &'c CandidatePair>) -> Option<&'c CandidatePair> {
    pairs.max_by(|a, b| {
        a.area_km2
            .total_cmp(&b.area_km2)
            .then_with(|| b.distance_m.total_cmp(&a.distance_m))
            .then_with(|| b.polygon.cmp(&a.polygon))
    })
}

/// Nearest claimant; ties go to the lower dam id
fn nearest_dam(claimants: &[CandidatePair]) -> Option<&CandidatePair> {
    claimants.iter().min_by(|a, b| match a.distance_m.total_cmp(&b.distance_m) {
        Ordering::Equal => a.dam.cmp(&b.dam),
        other => other,
    })
}
