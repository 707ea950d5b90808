mod common;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::{BTreeSet, HashSet};

use common::{deg, lake};
use resmatch::config::{AreaRatioBand, RetrievalConfig};
use resmatch::domain::{AssignmentTable, DamId, DamPoint, PolygonId, ReservoirPolygon, Round};
use resmatch::retrieval::{Retriever, RoundOutcome, SpatialIndex};

const SEEDS: u64 = 12;

/// Random lakes and dams scattered over a ~20 km window near 45°N
fn layout(seed: u64) -> (Vec<DamPoint>, Vec<ReservoirPolygon>) {
    let mut rng = StdRng::seed_from_u64(seed);
    let origin = (45.0, 7.0);

    let polygons = (0..40)
        .map(|i| {
            let lat = origin.0 + deg(rng.gen_range(0.0..20_000.0));
            let lon = origin.1 + deg(rng.gen_range(0.0..28_000.0));
            lake(
                i + 1,
                lat,
                lon,
                rng.gen_range(100.0..1500.0),
                rng.gen_range(100.0..1500.0),
            )
        })
        .collect();

    let dams = (0..60)
        .map(|i| {
            let lat = origin.0 + deg(rng.gen_range(0.0..20_000.0));
            let lon = origin.1 + deg(rng.gen_range(0.0..28_000.0));
            let dam = DamPoint::new(DamId(100 + i), lat, lon);
            if rng.gen_bool(0.5) {
                dam.with_reported_area(rng.gen_range(0.01..3.0))
            } else {
                dam
            }
        })
        .collect();

    (dams, polygons)
}

fn configs() -> Vec<RetrievalConfig> {
    vec![
        RetrievalConfig::default(),
        RetrievalConfig::default().with_area_ratio_band(AreaRatioBand::new(0.2, 5.0)),
        RetrievalConfig::default().with_max_candidates(1),
    ]
}

fn first_round_only(
    retriever: &Retriever,
    dams: &[DamPoint],
    polygons: &[ReservoirPolygon],
) -> RoundOutcome {
    let index = SpatialIndex::build(polygons).unwrap();
    let refs: Vec<&DamPoint> = dams.iter().collect();
    retriever.run_round(
        &index,
        Round::First,
        &refs,
        &AssignmentTable::new(),
        &BTreeSet::new(),
    )
}

#[test]
fn assignments_are_one_to_one() {
    for config in configs() {
        let retriever = Retriever::new(config).unwrap();
        for seed in 0..SEEDS {
            let (dams, polygons) = layout(seed);
            let outcome = retriever.retrieve(&dams, &polygons).unwrap();

            let mut polygons_seen = HashSet::new();
            let mut dams_seen = HashSet::new();
            for assignment in outcome.table.iter() {
                assert!(polygons_seen.insert(assignment.polygon), "seed {}", seed);
                assert!(dams_seen.insert(assignment.dam), "seed {}", seed);
                assert_eq!(outcome.table.dam_for(assignment.polygon), Some(assignment.dam));
            }

            for (dam, polygon) in outcome.rows() {
                assert_eq!(polygon.is_none(), outcome.unassigned.contains(&dam));
            }
            assert_eq!(outcome.rows().len(), dams.len());
        }
    }
}

#[test]
fn assignments_respect_round_tolerance() {
    let config = RetrievalConfig::default();
    let retriever = Retriever::new(config.clone()).unwrap();
    for seed in 0..SEEDS {
        let (dams, polygons) = layout(seed);
        let outcome = retriever.retrieve(&dams, &polygons).unwrap();

        for assignment in outcome.table.iter() {
            assert!(assignment.distance_m <= config.tolerance(assignment.round));
            if assignment.contained {
                assert_eq!(assignment.distance_m, 0.0);
            }
        }
    }
}

#[test]
fn second_round_only_assigns_dams_left_by_first() {
    for config in configs() {
        let retriever = Retriever::new(config).unwrap();
        for seed in 0..SEEDS {
            let (dams, polygons) = layout(seed);
            let first = first_round_only(&retriever, &dams, &polygons);
            let outcome = retriever.retrieve(&dams, &polygons).unwrap();

            for assignment in outcome.table.iter() {
                match assignment.round {
                    Round::First => {
                        assert_eq!(first.table.get(assignment.dam), Some(assignment))
                    }
                    Round::Second => {
                        assert!(!first.table.is_dam_assigned(assignment.dam));
                        assert!(first.unassigned.contains(&assignment.dam));
                    }
                }
            }
            assert_eq!(outcome.assigned_in(Round::First), first.table.len());
        }
    }
}

#[test]
fn second_round_never_loses_first_round_assignments() {
    for config in configs() {
        let retriever = Retriever::new(config).unwrap();
        for seed in 0..SEEDS {
            let (dams, polygons) = layout(seed);
            let first = first_round_only(&retriever, &dams, &polygons);
            let outcome = retriever.retrieve(&dams, &polygons).unwrap();

            let after_first: BTreeSet<DamId> = first.table.iter().map(|a| a.dam).collect();
            let after_both: BTreeSet<DamId> = outcome.table.iter().map(|a| a.dam).collect();
            assert!(after_first.is_subset(&after_both), "seed {}", seed);
        }
    }
}

#[test]
fn retrieval_is_repeatable() {
    for config in configs() {
        let retriever = Retriever::new(config).unwrap();
        for seed in 0..SEEDS {
            let (dams, polygons) = layout(seed);
            let once = retriever.retrieve(&dams, &polygons).unwrap();
            let twice = retriever.retrieve(&dams, &polygons).unwrap();
            assert_eq!(once, twice);
        }
    }
}

#[test]
fn input_order_does_not_change_assignments() {
    let retriever = Retriever::new(RetrievalConfig::default()).unwrap();
    for seed in 0..SEEDS {
        let (dams, polygons) = layout(seed);
        let outcome = retriever.retrieve(&dams, &polygons).unwrap();

        let reversed_dams: Vec<DamPoint> = dams.iter().rev().cloned().collect();
        let reversed_polygons: Vec<ReservoirPolygon> = polygons.iter().rev().cloned().collect();
        let shuffled = retriever
            .retrieve(&reversed_dams, &reversed_polygons)
            .unwrap();

        assert_eq!(outcome.table, shuffled.table);
        assert_eq!(outcome.unassigned, shuffled.unassigned);
    }
}

#[test]
fn polygons_are_never_shared_across_rounds() {
    let retriever = Retriever::new(RetrievalConfig::default()).unwrap();
    for seed in 0..SEEDS {
        let (dams, polygons) = layout(seed);
        let outcome = retriever.retrieve(&dams, &polygons).unwrap();

        let first: BTreeSet<PolygonId> = outcome
            .table
            .iter()
            .filter(|a| a.round == Round::First)
            .map(|a| a.polygon)
            .collect();
        assert!(outcome
            .table
            .iter()
            .filter(|a| a.round == Round::Second)
            .all(|a| !first.contains(&a.polygon)));
    }
}
