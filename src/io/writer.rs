use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{DamId, PolygonId, Stage};
use crate::retrieval::{AreaRejection, RetrievalOutcome};

/// One output row per input dam
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputRow {
    pub dam_id: DamId,
    pub polygon_id: Option<PolygonId>,
    pub distance_m: Option<f64>,
    pub round: Option<u8>,
    pub stage: Option<Stage>,
    pub contained: bool,
    pub contested: bool,
}

/// The JSON document written for a retrieval run
#[derive(Debug, Serialize)]
pub struct OutputDocument<'a> {
    pub assignments: Vec<OutputRow>,
    pub unassigned: Vec<DamId>,
    pub warnings: Vec<String>,
    pub area_rejections: &'a [AreaRejection],
}

impl<'a> OutputDocument<'a> {
    pub fn from_outcome(outcome: &'a RetrievalOutcome) -> Self {
        let assignments = outcome
            .dam_order()
            .iter()
            .map(|&dam| match outcome.table.get(dam) {
                Some(a) => OutputRow {
                    dam_id: dam,
                    polygon_id: Some(a.polygon),
                    distance_m: Some(a.distance_m),
                    round: Some(a.round.number()),
                    stage: Some(a.stage),
                    contained: a.contained,
                    contested: a.contested,
                },
                None => OutputRow {
                    dam_id: dam,
                    polygon_id: None,
                    distance_m: None,
                    round: None,
                    stage: None,
                    contained: false,
                    contested: false,
                },
            })
            .collect();

        Self {
            assignments,
            unassigned: outcome.unassigned.iter().copied().collect(),
            warnings: outcome
                .diagnostics
                .warnings
                .iter()
                .map(ToString::to_string)
                .collect(),
            area_rejections: &outcome.diagnostics.area_rejections,
        }
    }
}

/// Write the assignment table of a run as pretty-printed JSON
pub fn write_assignments(path: &Path, outcome: &RetrievalOutcome) -> Result<()> {
    let file = File::create(path)
        .with_context(|| format!("Failed to create output file: {}", path.display()))?;
    let mut writer = BufWriter::new(file);

    serde_json::to_writer_pretty(&mut writer, &OutputDocument::from_outcome(outcome))
        .context("Failed to serialize assignments")?;
    writer.write_all(b"\n")?;
    writer.flush()?;

    Ok(())
}
