pub mod geojson;
pub mod writer;

pub use geojson::{
    FeatureCollection, ParseReport, load_dams, load_reservoirs, parse_dams, parse_reservoirs,
    read_feature_collection,
};
pub use writer::{OutputDocument, OutputRow, write_assignments};

/// Property names used to read a record's id, area and name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldNames {
    pub id: String,
    pub area: Option<String>,
    pub name: Option<String>,
}
