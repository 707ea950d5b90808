use serde::Serialize;
use std::collections::BTreeMap;

use super::{DamId, PolygonId};

/// Retrieval round that produced an assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Round {
    First,
    Second,
}

impl Round {
    pub fn number(self) -> u8 {
        match self {
            Round::First => 1,
            Round::Second => 2,
        }
    }
}

/// Optimizer step that settled an assignment
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Iteration 1: the dam lies inside the polygon
    Containment,
    /// Iteration 2: the polygon was claimed by this dam alone
    Uniqueness,
    /// Iteration 3: the dam was the nearest of several claimants
    Conflict,
    /// Iteration 3: a conflict loser took its nearest free candidate
    Fallback,
}

/// One dam paired with one reservoir polygon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Assignment {
    pub dam: DamId,
    pub polygon: PolygonId,
    pub distance_m: f64,
    pub contained: bool,
    /// More than one dam claimed this polygon before it was resolved
    pub contested: bool,
    pub round: Round,
    pub stage: Stage,
}

/// One-to-one mapping between dams and reservoir polygons.
///
/// Both directions are indexed so that a second dam can never be attached to a
/// polygon that is already taken.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssignmentTable {
    by_dam: BTreeMap<DamId, Assignment>,
    by_polygon: BTreeMap<PolygonId, DamId>,
}

impl AssignmentTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.by_dam.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_dam.is_empty()
    }

    /// Insert an assignment, handing it back if its dam or polygon is already taken
    pub fn insert(&mut self, assignment: Assignment) -> Result<(), Assignment> {
        if self.by_dam.contains_key(&assignment.dam)
            || self.by_polygon.contains_key(&assignment.polygon)
        {
            return Err(assignment);
        }
        self.by_polygon.insert(assignment.polygon, assignment.dam);
        self.by_dam.insert(assignment.dam, assignment);
        Ok(())
    }

    pub fn remove_dam(&mut self, dam: DamId) -> Option<Assignment> {
        let assignment = self.by_dam.remove(&dam)?;
        self.by_polygon.remove(&assignment.polygon);
        Some(assignment)
    }

    pub fn get(&self, dam: DamId) -> Option<&Assignment> {
        self.by_dam.get(&dam)
    }

    pub fn polygon_of(&self, dam: DamId) -> Option<PolygonId> {
        self.by_dam.get(&dam).map(|a| a.polygon)
    }

    pub fn dam_for(&self, polygon: PolygonId) -> Option<DamId> {
        self.by_polygon.get(&polygon).copied()
    }

    pub fn is_dam_assigned(&self, dam: DamId) -> bool {
        self.by_dam.contains_key(&dam)
    }

    pub fn is_polygon_taken(&self, polygon: PolygonId) -> bool {
        self.by_polygon.contains_key(&polygon)
    }

    /// Assignments ordered by dam id
    pub fn iter(&self) -> impl Iterator<Item = &Assignment> {
        self.by_dam.values()
    }

    /// Move every assignment of `other` into this table.
    ///
    /// Assignments that would break the one-to-one mapping are left out and returned.
    pub fn merge(&mut self, other: AssignmentTable) -> Vec<Assignment> {
        other
            .by_dam
            .into_values()
            .filter_map(|assignment| self.insert(assignment).err())
            .collect()
    }

    /// Output rows (dam id, polygon id or none) in the order the dams are given
    pub fn rows(&self, dams: impl IntoIterator<Item = DamId>) -> Vec<(DamId, Option<PolygonId>)> {
        dams.into_iter()
            .map(|dam| (dam, self.polygon_of(dam)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(dam: u64, polygon: u64) -> Assignment {
        Assignment {
            dam: DamId(dam),
            polygon: PolygonId(polygon),
            distance_m: 0.0,
            contained: true,
            contested: false,
            round: Round::First,
            stage: Stage::Containment,
        }
    }

    #[test]
    fn test_insert_rejects_taken_polygon() {
        let mut table = AssignmentTable::new();
        assert!(table.insert(assignment(1, 10)).is_ok());
        let rejected = table.insert(assignment(2, 10)).unwrap_err();
        assert_eq!(rejected.dam, DamId(2));
        assert_eq!(table.len(), 1);
        assert_eq!(table.dam_for(PolygonId(10)), Some(DamId(1)));
    }

    #[test]
    fn test_insert_rejects_assigned_dam() {
        let mut table = AssignmentTable::new();
        table.insert(assignment(1, 10)).unwrap();
        assert!(table.insert(assignment(1, 11)).is_err());
        assert!(!table.is_polygon_taken(PolygonId(11)));
    }

    #[test]
    fn test_remove_frees_polygon() {
        let mut table = AssignmentTable::new();
        table.insert(assignment(1, 10)).unwrap();
        let removed = table.remove_dam(DamId(1)).unwrap();
        assert_eq!(removed.polygon, PolygonId(10));
        assert!(table.is_empty());
        assert!(table.insert(assignment(2, 10)).is_ok());
    }

    #[test]
    fn test_merge_and_rows() {
        let mut first = AssignmentTable::new();
        first.insert(assignment(1, 10)).unwrap();
        let mut second = AssignmentTable::new();
        second.insert(assignment(3, 30)).unwrap();

        assert!(first.merge(second).is_empty());
        let rows = first.rows([DamId(3), DamId(2), DamId(1)]);
        assert_eq!(
            rows,
            vec![
                (DamId(3), Some(PolygonId(30))),
                (DamId(2), None),
                (DamId(1), Some(PolygonId(10))),
            ]
        );
    }

    #[test]
    fn test_merge_detects_overlap() {
        let mut first = AssignmentTable::new();
        first.insert(assignment(1, 10)).unwrap();
        let mut second = AssignmentTable::new();
        second.insert(assignment(2, 10)).unwrap();
        let conflicts = first.merge(second);
        assert_eq!(conflicts.len(), 1);
        assert_eq!(conflicts[0].dam, DamId(2));
        assert_eq!(first.len(), 1);
    }
}
