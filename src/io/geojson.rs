use anyhow::{Context, Result};
use geo::{Coord, LineString, MultiPolygon, Polygon};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use super::FieldNames;
use crate::domain::{DamId, DamPoint, PolygonId, ReservoirPolygon};

/// Raw GeoJSON feature collection
#[derive(Debug, Deserialize)]
pub struct FeatureCollection {
    pub features: Vec<Feature>,
}

/// A single GeoJSON feature
#[derive(Debug, Deserialize)]
pub struct Feature {
    #[serde(default)]
    pub id: Option<Value>,
    #[serde(default)]
    pub geometry: Option<Geometry>,
    #[serde(default)]
    pub properties: Option<Map<String, Value>>,
}

/// Geometry kinds the readers understand; positions are `[lon, lat]`
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub enum Geometry {
    Point {
        coordinates: Vec<f64>,
    },
    Polygon {
        coordinates: Vec<Vec<Vec<f64>>>,
    },
    MultiPolygon {
        coordinates: Vec<Vec<Vec<Vec<f64>>>>,
    },
    #[serde(other)]
    Other,
}

/// Records read from a collection, plus a note for every feature that was skipped
#[derive(Debug)]
pub struct ParseReport<T> {
    pub records: Vec<T>,
    pub skipped: Vec<String>,
}

impl<T> Default for ParseReport<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            skipped: Vec::new(),
        }
    }
}

pub fn read_feature_collection(path: &Path) -> Result<FeatureCollection> {
    let file =
        File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse GeoJSON from {}", path.display()))
}

pub fn load_dams(path: &Path, fields: &FieldNames) -> Result<ParseReport<DamPoint>> {
    Ok(parse_dams(&read_feature_collection(path)?, fields))
}

pub fn load_reservoirs(path: &Path, fields: &FieldNames) -> Result<ParseReport<ReservoirPolygon>> {
    Ok(parse_reservoirs(&read_feature_collection(path)?, fields))
}

/// Turn `Point` features into dam records
///
/// Coordinates are taken as they are; range checks happen during retrieval so that
/// such dams still show up as unassigned rows. A feature with an id but no readable
/// point gets NaN coordinates for the same reason. Only features without a usable id
/// are skipped.
pub fn parse_dams(collection: &FeatureCollection, fields: &FieldNames) -> ParseReport<DamPoint> {
    let mut report = ParseReport::default();

    for (i, feature) in collection.features.iter().enumerate() {
        let Some(id) = feature_id(feature, &fields.id) else {
            report.skipped.push(format!("dam feature {}: no usable '{}'", i, fields.id));
            continue;
        };

        let (lon, lat) = match &feature.geometry {
            Some(Geometry::Point { coordinates }) if coordinates.len() >= 2 => {
                (coordinates[0], coordinates[1])
            }
            _ => (f64::NAN, f64::NAN),
        };

        let mut dam = DamPoint::new(DamId(id), lat, lon);
        if let Some(area) = property_f64(feature, fields.area.as_deref()) {
            dam = dam.with_reported_area(area);
        }
        if let Some(name) = property_str(feature, fields.name.as_deref()) {
            dam = dam.with_name(name);
        }
        report.records.push(dam);
    }

    report
}

/// Turn `Polygon`/`MultiPolygon` features into reservoir records
///
/// The area property is used when it holds a positive number, otherwise the area is
/// computed from the geometry. A feature with an id but no readable polygon is kept
/// with an empty geometry, so retrieval reports it as invalid.
pub fn parse_reservoirs(
    collection: &FeatureCollection,
    fields: &FieldNames,
) -> ParseReport<ReservoirPolygon> {
    let mut report = ParseReport::default();

    for (i, feature) in collection.features.iter().enumerate() {
        let Some(id) = feature_id(feature, &fields.id) else {
            report
                .skipped
                .push(format!("polygon feature {}: no usable '{}'", i, fields.id));
            continue;
        };

        let geometry = match &feature.geometry {
            Some(Geometry::Polygon { coordinates }) => {
                to_polygon(coordinates).map(|p| MultiPolygon::new(vec![p]))
            }
            Some(Geometry::MultiPolygon { coordinates }) => coordinates
                .iter()
                .map(|rings| to_polygon(rings))
                .collect::<Option<Vec<_>>>()
                .map(MultiPolygon::new),
            _ => None,
        }
        .unwrap_or_else(|| MultiPolygon::new(Vec::new()));

        let mut polygon = ReservoirPolygon::new(PolygonId(id), geometry);
        if let Some(area) = property_f64(feature, fields.area.as_deref()).filter(|a| *a > 0.0) {
            polygon = polygon.with_area(area);
        }
        if let Some(name) = property_str(feature, fields.name.as_deref()) {
            polygon = polygon.with_name(name);
        }
        report.records.push(polygon);
    }

    report
}

/// Id from the named property, falling back to the feature's own id
fn feature_id(feature: &Feature, field: &str) -> Option<u64> {
    feature
        .properties
        .as_ref()
        .and_then(|p| p.get(field))
        .and_then(value_to_id)
        .or_else(|| feature.id.as_ref().and_then(value_to_id))
}

fn value_to_id(value: &Value) -> Option<u64> {
    match value {
        Value::Number(n) => n.as_u64().or_else(|| {
            // Shapefile exports often store integer ids as floats
            n.as_f64()
                .filter(|f| *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
                .map(|f| f as u64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn property_f64(feature: &Feature, field: Option<&str>) -> Option<f64> {
    let value = match feature.properties.as_ref()?.get(field?)? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse().ok()?,
        _ => return None,
    };
    value.is_finite().then_some(value)
}

fn property_str(feature: &Feature, field: Option<&str>) -> Option<String> {
    match feature.properties.as_ref()?.get(field?)? {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        _ => None,
    }
}

fn to_polygon(rings: &[Vec<Vec<f64>>]) -> Option<Polygon<f64>> {
    let (exterior, interiors) = rings.split_first()?;
    Some(Polygon::new(
        to_ring(exterior)?,
        interiors.iter().map(|r| to_ring(r)).collect::<Option<_>>()?,
    ))
}

fn to_ring(positions: &[Vec<f64>]) -> Option<LineString<f64>> {
    positions
        .iter()
        .map(|p| match p.as_slice() {
            [lon, lat, ..] => Some(Coord { x: *lon, y: *lat }),
            _ => None,
        })
        .collect::<Option<Vec<_>>>()
        .map(LineString::new)
}
