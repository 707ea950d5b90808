use super::AreaRejection;
use crate::error::RetrievalError;

/// Non-fatal issues collected during a retrieval run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Diagnostics {
    /// Records skipped before retrieval (bad geometry, bad coordinates, duplicates)
    pub warnings: Vec<RetrievalError>,
    /// Assignments reverted by the area plausibility check
    pub area_rejections: Vec<AreaRejection>,
}

impl Diagnostics {
    pub fn invalid_polygons(&self) -> usize {
        self.count(|e| matches!(e, RetrievalError::InvalidGeometry { .. }))
    }

    pub fn invalid_dams(&self) -> usize {
        self.count(|e| matches!(e, RetrievalError::CoordinateOutOfRange { .. }))
    }

    pub fn duplicates(&self) -> usize {
        self.count(|e| {
            matches!(
                e,
                RetrievalError::DuplicateDam(_) | RetrievalError::DuplicatePolygon(_)
            )
        })
    }

    /// Check if anything was skipped or reverted
    pub fn has_issues(&self) -> bool {
        !self.warnings.is_empty() || !self.area_rejections.is_empty()
    }

    pub fn summary(&self) -> String {
        if !self.has_issues() {
            "No input issues".to_string()
        } else {
            format!(
                "{} invalid polygons, {} invalid dams, {} duplicate ids, {} area rejections",
                self.invalid_polygons(),
                self.invalid_dams(),
                self.duplicates(),
                self.area_rejections.len()
            )
        }
    }

    fn count(&self, predicate: impl Fn(&RetrievalError) -> bool) -> usize {
        self.warnings.iter().filter(|e| predicate(e)).count()
    }
}
