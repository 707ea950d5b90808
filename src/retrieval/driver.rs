use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, instrument, warn};

use super::{
    AreaRejection, AssociationOptimizer, CandidateSelector, Diagnostics, SpatialIndex,
};
use crate::config::RetrievalConfig;
use crate::domain::{AssignmentTable, DamId, DamPoint, PolygonId, ReservoirPolygon, Round};
use crate::error::{ConfigError, InputKind, RetrievalError};

/// Result of a single tolerance round
#[derive(Debug, Clone, PartialEq)]
pub struct RoundOutcome {
    pub round: Round,
    pub tolerance_m: f64,
    /// Assignments made in this round only
    pub table: AssignmentTable,
    /// Dams of this round left without a polygon, in id order
    pub unassigned: Vec<DamId>,
    pub rejections: Vec<AreaRejection>,
    pub candidate_count: usize,
}

/// Final result of a retrieval run
#[derive(Debug, Clone, PartialEq)]
pub struct RetrievalOutcome {
    pub table: AssignmentTable,
    /// Every input dam without a polygon, skipped dams included
    pub unassigned: BTreeSet<DamId>,
    pub diagnostics: Diagnostics,
    dam_order: Vec<DamId>,
}

impl RetrievalOutcome {
    /// (dam id, polygon id or none) for every distinct input dam, in input order
    pub fn rows(&self) -> Vec<(DamId, Option<PolygonId>)> {
        self.table.rows(self.dam_order.iter().copied())
    }

    pub fn dam_order(&self) -> &[DamId] {
        &self.dam_order
    }

    pub fn assigned_in(&self, round: Round) -> usize {
        self.table.iter().filter(|a| a.round == round).count()
    }
}

/// Runs the two tolerance rounds over a dam set and merges their assignments
#[derive(Debug, Clone)]
pub struct Retriever {
    config: RetrievalConfig,
}

impl Retriever {
    pub fn new(config: RetrievalConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Associate dams with reservoir polygons
    ///
    /// Invalid polygons and dams are skipped and reported in the diagnostics. Fails
    /// only when no usable dam or no usable polygon remains.
    pub fn retrieve(
        &self,
        dams: &[DamPoint],
        polygons: &[ReservoirPolygon],
    ) -> Result<RetrievalOutcome, RetrievalError> {
        if dams.is_empty() {
            return Err(RetrievalError::EmptyInput(InputKind::Dams));
        }
        if polygons.is_empty() {
            return Err(RetrievalError::EmptyInput(InputKind::Polygons));
        }

        let mut diagnostics = Diagnostics::default();
        let (usable, dam_order) = usable_dams(dams, &mut diagnostics.warnings);
        let valid_polygons = usable_polygons(
            polygons,
            self.config.check_self_intersection,
            &mut diagnostics.warnings,
        );

        if usable.is_empty() {
            return Err(RetrievalError::EmptyInput(InputKind::Dams));
        }
        let index = SpatialIndex::build(valid_polygons)?;
        info!(
            dams = usable.len(),
            polygons = index.len(),
            skipped = diagnostics.warnings.len(),
            "inputs prepared"
        );

        let first = self.run_round(
            &index,
            Round::First,
            &usable,
            &AssignmentTable::new(),
            &BTreeSet::new(),
        );

        let retry: BTreeSet<DamId> = first.unassigned.iter().copied().collect();
        let second_dams: Vec<&DamPoint> = usable
            .iter()
            .copied()
            .filter(|dam| retry.contains(&dam.id))
            .collect();
        let rejected: BTreeSet<(DamId, PolygonId)> = first
            .rejections
            .iter()
            .map(|r| (r.dam, r.polygon))
            .collect();

        let second = self.run_round(&index, Round::Second, &second_dams, &first.table, &rejected);

        let mut table = first.table;
        for conflict in table.merge(second.table) {
            warn!(
                dam = %conflict.dam,
                polygon = %conflict.polygon,
                "round 2 assignment collides with round 1, dropped"
            );
        }

        diagnostics.area_rejections = first.rejections;
        diagnostics.area_rejections.extend(second.rejections);

        let unassigned: BTreeSet<DamId> = dam_order
            .iter()
            .copied()
            .filter(|dam| !table.is_dam_assigned(*dam))
            .collect();

        info!(
            assigned = table.len(),
            unassigned = unassigned.len(),
            "retrieval complete"
        );

        Ok(RetrievalOutcome {
            table,
            unassigned,
            diagnostics,
            dam_order,
        })
    }

    /// Select candidates at the round's tolerance and resolve them
    ///
    /// Polygons already present in `taken` and pairs listed in `rejected` are never
    /// offered as candidates.
    #[instrument(skip_all, fields(round = round.number()))]
    pub fn run_round(
        &self,
        index: &SpatialIndex<'_>,
        round: Round,
        dams: &[&DamPoint],
        taken: &AssignmentTable,
        rejected: &BTreeSet<(DamId, PolygonId)>,
    ) -> RoundOutcome {
        let tolerance_m = self.config.tolerance(round);
        let selector = CandidateSelector::new(index, self.config.max_candidates_per_dam);
        let candidates = selector.select_candidates_excluding(dams, tolerance_m, |dam, polygon| {
            taken.is_polygon_taken(polygon) || rejected.contains(&(dam, polygon))
        });

        let reported_areas: BTreeMap<DamId, f64> = dams
            .iter()
            .filter_map(|dam| Some((dam.id, dam.usable_reported_area()?)))
            .collect();

        let mut optimizer = AssociationOptimizer::new(round);
        if let Some(band) = self.config.area_ratio_band {
            optimizer = optimizer.with_area_check(band, &reported_areas);
        }
        let resolution = optimizer.resolve(&candidates);

        let mut unassigned: Vec<DamId> = dams
            .iter()
            .map(|dam| dam.id)
            .filter(|dam| !resolution.table.is_dam_assigned(*dam))
            .collect();
        unassigned.sort();
        unassigned.dedup();

        info!(
            tolerance_m,
            dams = dams.len(),
            candidates = candidates.len(),
            assigned = resolution.table.len(),
            unassigned = unassigned.len(),
            "round complete"
        );

        RoundOutcome {
            round,
            tolerance_m,
            table: resolution.table,
            unassigned,
            rejections: resolution.rejections,
            candidate_count: candidates.len(),
        }
    }
}

/// Dams with valid coordinates and a first-seen id, plus the distinct ids in input order
fn usable_dams<'a>(
    dams: &'a [DamPoint],
    warnings: &mut Vec<RetrievalError>,
) -> (Vec<&'a DamPoint>, Vec<DamId>) {
    let mut seen = BTreeSet::new();
    let mut usable = Vec::new();
    let mut order = Vec::new();

    for dam in dams {
        if !seen.insert(dam.id) {
            warn!(dam = %dam.id, "duplicate dam id, record skipped");
            warnings.push(RetrievalError::DuplicateDam(dam.id));
            continue;
        }
        order.push(dam.id);

        match dam.validate() {
            Ok(()) => usable.push(dam),
            Err(e) => {
                warn!("{}", e);
                warnings.push(e);
            }
        }
    }

    (usable, order)
}

fn usable_polygons<'a>(
    polygons: &'a [ReservoirPolygon],
    check_self_intersection: bool,
    warnings: &mut Vec<RetrievalError>,
) -> Vec<&'a ReservoirPolygon> {
    let mut seen = BTreeSet::new();
    let mut usable = Vec::new();

    for polygon in polygons {
        if !seen.insert(polygon.id) {
            warn!(polygon = %polygon.id, "duplicate polygon id, record skipped");
            warnings.push(RetrievalError::DuplicatePolygon(polygon.id));
            continue;
        }

        match polygon.validate(check_self_intersection) {
            Ok(()) => usable.push(polygon),
            Err(e) => {
                warn!("{}", e);
                warnings.push(e);
            }
        }
    }

    usable
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AreaRatioBand;
    use crate::domain::Stage;
    use crate::geometry::METERS_PER_DEGREE;

    fn deg(meters: f64) -> f64 {
        meters / METERS_PER_DEGREE
    }

    fn lake(id: u64, lat: f64, lon: f64, side_m: f64) -> ReservoirPolygon {
        let side = deg(side_m);
        ReservoirPolygon::from_outer(
            PolygonId(id),
            &[
                (lat, lon),
                (lat, lon + side),
                (lat + side, lon + side),
                (lat + side, lon),
                (lat, lon),
            ],
        )
    }

    fn retriever() -> Retriever {
        Retriever::new(RetrievalConfig::default()).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = RetrievalConfig::default().with_tolerances(1000.0, 500.0);
        assert!(Retriever::new(config).is_err());
    }

    #[test]
    fn test_empty_inputs_are_fatal() {
        let polygons = vec![lake(1, 0.0, 0.0, 1000.0)];
        let dams = vec![DamPoint::new(DamId(1), 0.0, 0.0)];

        assert_eq!(
            retriever().retrieve(&[], &polygons),
            Err(RetrievalError::EmptyInput(InputKind::Dams))
        );
        assert_eq!(
            retriever().retrieve(&dams, &[]),
            Err(RetrievalError::EmptyInput(InputKind::Polygons))
        );
    }

    #[test]
    fn test_all_polygons_invalid_is_fatal() {
        let sliver = ReservoirPolygon::from_outer(PolygonId(1), &[(0.0, 0.0), (0.0, 0.01)]);
        let dams = vec![DamPoint::new(DamId(1), 0.0, 0.0)];

        assert_eq!(
            retriever().retrieve(&dams, &[sliver]),
            Err(RetrievalError::EmptyInput(InputKind::Polygons))
        );
    }

    #[test]
    fn test_invalid_dam_is_skipped_not_fatal() {
        let polygons = vec![lake(1, 0.0, 0.0, 1000.0)];
        let dams = vec![
            DamPoint::new(DamId(1), 120.0, 0.0),
            DamPoint::new(DamId(2), deg(500.0), deg(500.0)),
        ];

        let outcome = retriever().retrieve(&dams, &polygons).unwrap();
        assert_eq!(outcome.table.polygon_of(DamId(2)), Some(PolygonId(1)));
        assert!(outcome.unassigned.contains(&DamId(1)));
        assert_eq!(outcome.diagnostics.invalid_dams(), 1);
        assert_eq!(
            outcome.rows(),
            vec![(DamId(1), None), (DamId(2), Some(PolygonId(1)))]
        );
    }

    #[test]
    fn test_duplicate_dam_keeps_first_record() {
        let polygons = vec![lake(1, 0.0, 0.0, 1000.0)];
        let dams = vec![
            DamPoint::new(DamId(4), deg(500.0), deg(500.0)),
            DamPoint::new(DamId(4), 10.0, 10.0),
        ];

        let outcome = retriever().retrieve(&dams, &polygons).unwrap();
        assert_eq!(outcome.dam_order(), &[DamId(4)]);
        assert_eq!(outcome.table.polygon_of(DamId(4)), Some(PolygonId(1)));
        assert_eq!(outcome.diagnostics.duplicates(), 1);
    }

    #[test]
    fn test_round_two_picks_up_far_dam() {
        let polygons = vec![lake(1, 0.0, 0.0, 1000.0)];
        let dams = vec![DamPoint::new(DamId(1), deg(-700.0), deg(500.0))];

        let outcome = retriever().retrieve(&dams, &polygons).unwrap();
        let assignment = outcome.table.get(DamId(1)).unwrap();
        assert_eq!(assignment.round, Round::Second);
        assert_eq!(outcome.assigned_in(Round::First), 0);
        assert_eq!(outcome.assigned_in(Round::Second), 1);
    }

    #[test]
    fn test_round_two_skips_polygons_taken_in_round_one() {
        let polygons = vec![lake(1, 0.0, 0.0, 1000.0)];
        let dams = vec![
            DamPoint::new(DamId(1), deg(500.0), deg(500.0)),
            DamPoint::new(DamId(2), deg(-700.0), deg(500.0)),
        ];

        let outcome = retriever().retrieve(&dams, &polygons).unwrap();
        assert_eq!(outcome.table.len(), 1);
        assert_eq!(outcome.table.get(DamId(1)).unwrap().stage, Stage::Containment);
        assert!(outcome.unassigned.contains(&DamId(2)));
    }

    #[test]
    fn test_round_one_rejection_retried_against_other_polygon() {
        // Dam sits in a huge lake but reports a small reservoir; a plausible lake lies 750 m away
        let polygons = vec![
            lake(1, 0.0, 0.0, 1000.0).with_area(100.0),
            lake(2, deg(-800.0), deg(400.0), 100.0).with_area(1.0),
        ];
        let dams = vec![DamPoint::new(DamId(1), deg(50.0), deg(500.0)).with_reported_area(1.0)];
        let config =
            RetrievalConfig::default().with_area_ratio_band(AreaRatioBand::new(0.5, 2.0));

        let outcome = Retriever::new(config).unwrap().retrieve(&dams, &polygons).unwrap();
        let assignment = outcome.table.get(DamId(1)).unwrap();
        assert_eq!(assignment.polygon, PolygonId(2));
        assert_eq!(assignment.round, Round::Second);
        assert_eq!(outcome.diagnostics.area_rejections.len(), 1);
        assert_eq!(outcome.diagnostics.area_rejections[0].round, Round::First);
    }
}
