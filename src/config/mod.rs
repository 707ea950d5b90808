use serde::Deserialize;
use std::path::PathBuf;

use crate::domain::Round;
use crate::error::ConfigError;
use crate::io::FieldNames;

fn default_round1_tolerance() -> f64 {
    500.0
}
fn default_round2_tolerance() -> f64 {
    1000.0
}
fn default_max_candidates() -> usize {
    5
}
fn default_check_self_intersection() -> bool {
    true
}

/// Accepted range for `polygon area / reported dam area`
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(from = "[f64; 2]")]
pub struct AreaRatioBand {
    pub min: f64,
    pub max: f64,
}

impl AreaRatioBand {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, ratio: f64) -> bool {
        ratio >= self.min && ratio <= self.max
    }
}

impl From<[f64; 2]> for AreaRatioBand {
    fn from([min, max]: [f64; 2]) -> Self {
        Self { min, max }
    }
}

/// Options recognized by the retrieval driver
///
/// Unknown keys are rejected so that a misspelled option cannot silently fall back
/// to its default. The camelCase names used by the dam registry tooling are accepted
/// as aliases.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetrievalConfig {
    /// First, tighter tolerance band in meters
    #[serde(default = "default_round1_tolerance", alias = "round1ToleranceMeters")]
    pub round1_tolerance_m: f64,
    /// Second, looser tolerance band in meters
    #[serde(default = "default_round2_tolerance", alias = "round2ToleranceMeters")]
    pub round2_tolerance_m: f64,
    /// Plausibility band; the check is skipped when unset
    #[serde(default, alias = "areaPlausibilityRatioBand")]
    pub area_ratio_band: Option<AreaRatioBand>,
    /// Nearest candidates kept per dam and round
    #[serde(default = "default_max_candidates")]
    pub max_candidates_per_dam: usize,
    #[serde(default = "default_check_self_intersection")]
    pub check_self_intersection: bool,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            round1_tolerance_m: default_round1_tolerance(),
            round2_tolerance_m: default_round2_tolerance(),
            area_ratio_band: None,
            max_candidates_per_dam: default_max_candidates(),
            check_self_intersection: default_check_self_intersection(),
        }
    }
}

impl RetrievalConfig {
    pub fn with_tolerances(mut self, round1_m: f64, round2_m: f64) -> Self {
        self.round1_tolerance_m = round1_m;
        self.round2_tolerance_m = round2_m;
        self
    }

    pub fn with_area_ratio_band(mut self, band: AreaRatioBand) -> Self {
        self.area_ratio_band = Some(band);
        self
    }

    pub fn with_max_candidates(mut self, max: usize) -> Self {
        self.max_candidates_per_dam = max;
        self
    }

    /// Tolerance band used by a round
    pub fn tolerance(&self, round: Round) -> f64 {
        match round {
            Round::First => self.round1_tolerance_m,
            Round::Second => self.round2_tolerance_m,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("round1_tolerance_m", self.round1_tolerance_m),
            ("round2_tolerance_m", self.round2_tolerance_m),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigError::InvalidTolerance { name, value });
            }
        }

        if self.round1_tolerance_m > self.round2_tolerance_m {
            return Err(ConfigError::ToleranceOrder {
                round1: self.round1_tolerance_m,
                round2: self.round2_tolerance_m,
            });
        }

        if let Some(band) = self.area_ratio_band {
            let ordered = band.min > 0.0 && band.min <= band.max;
            if !ordered || !band.max.is_finite() {
                return Err(ConfigError::InvalidAreaBand {
                    min: band.min,
                    max: band.max,
                });
            }
        }

        if self.max_candidates_per_dam == 0 {
            return Err(ConfigError::NoCandidates);
        }

        Ok(())
    }
}

fn default_dam_id_field() -> String {
    "dam_ID".to_string()
}
fn default_polygon_id_field() -> String {
    "Hylak_id".to_string()
}
fn default_polygon_area_field() -> Option<String> {
    Some("Lake_area".to_string())
}
fn default_polygon_name_field() -> Option<String> {
    Some("Lake_name".to_string())
}

/// Settings read from `resmatch.toml`
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default)]
    pub dams: Option<PathBuf>,
    #[serde(default)]
    pub reservoirs: Option<PathBuf>,
    #[serde(default)]
    pub output: Option<PathBuf>,
    #[serde(default = "default_dam_id_field")]
    pub dam_id_field: String,
    #[serde(default)]
    pub dam_area_field: Option<String>,
    #[serde(default)]
    pub dam_name_field: Option<String>,
    #[serde(default = "default_polygon_id_field")]
    pub polygon_id_field: String,
    #[serde(default = "default_polygon_area_field")]
    pub polygon_area_field: Option<String>,
    #[serde(default = "default_polygon_name_field")]
    pub polygon_name_field: Option<String>,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub retrieval: RetrievalConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            dams: None,
            reservoirs: None,
            output: None,
            dam_id_field: default_dam_id_field(),
            dam_area_field: None,
            dam_name_field: None,
            polygon_id_field: default_polygon_id_field(),
            polygon_area_field: default_polygon_area_field(),
            polygon_name_field: default_polygon_name_field(),
            verbose: false,
            retrieval: RetrievalConfig::default(),
        }
    }
}

impl FileConfig {
    /// Load the first config file found in the standard locations
    ///
    /// Files that fail to parse are passed over and their errors returned, so the
    /// caller can report them once logging is set up.
    pub fn load() -> (Option<Self>, Vec<ConfigError>) {
        Self::load_from(&get_config_paths())
    }

    pub fn load_from(paths: &[PathBuf]) -> (Option<Self>, Vec<ConfigError>) {
        let mut errors = Vec::new();
        for path in paths {
            if path.exists()
                && let Ok(contents) = std::fs::read_to_string(path)
            {
                match toml::from_str(&contents) {
                    Ok(config) => return (Some(config), errors),
                    Err(e) => errors.push(ConfigError::Parse {
                        path: path.clone(),
                        message: e.to_string(),
                    }),
                }
            }
        }
        (None, errors)
    }

    pub fn dam_fields(&self) -> FieldNames {
        FieldNames {
            id: self.dam_id_field.clone(),
            area: self.dam_area_field.clone(),
            name: self.dam_name_field.clone(),
        }
    }

    pub fn polygon_fields(&self) -> FieldNames {
        FieldNames {
            id: self.polygon_id_field.clone(),
            area: self.polygon_area_field.clone(),
            name: self.polygon_name_field.clone(),
        }
    }
}

fn get_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    paths.push(PathBuf::from("resmatch.toml"));
    paths.push(PathBuf::from(".resmatch.toml"));

    if let Some(config_dir) = dirs::config_dir() {
        paths.push(config_dir.join("resmatch").join("config.toml"));
        paths.push(config_dir.join("resmatch.toml"));
    }

    if let Some(home) = dirs::home_dir() {
        paths.push(home.join(".resmatch.toml"));
    }

    paths
}
