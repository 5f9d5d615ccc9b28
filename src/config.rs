//! Simulation configuration.
//!
//! Loaded from JSON (`LULCC_CONFIG_PATH` or an explicit path) with the
//! embedded `data/default_config.json` as the fallback. Missing fields take
//! their defaults, so a config file only needs to list what it changes.

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::allocation::ScenarioMode;
use crate::error::{LulccError, Result};
use crate::landuse::{codes, LandUseCatalog, LandUseCode};
use crate::model::demand::DemandModel;
use crate::mplc::MplcConfig;

pub const BUILTIN_CONFIG: &str = include_str!("data/default_config.json");

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Edge length of one raster cell in metres
    pub cell_size: f32,

    /// Edge length of the neighbors-factor window in metres
    pub neighbor_window_length: f32,

    /// Upper bound of the uniform noise added to suitability before ranking
    pub tie_break_noise: f32,

    /// Which cascade of allocation pools to use
    pub scenario: ScenarioMode,

    /// Land-use codes that are never reassigned by the allocator
    pub immutable_types: Vec<LandUseCode>,

    /// Codes whose cells inside restricted areas stay allocatable on any slope
    pub sanctioned_codes: Vec<LandUseCode>,

    /// Codes counted as settlements by the distance-to-settlements factor
    pub settlement_types: Vec<LandUseCode>,

    /// Code used where no type has any probability
    pub background_code: LandUseCode,

    pub catalog: LandUseCatalog,
    pub demand: DemandModel,
    pub mplc: MplcConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            cell_size: 100.0,
            neighbor_window_length: 300.0,
            tie_break_noise: 1e-4,
            scenario: ScenarioMode::RestrictedAreas,
            immutable_types: vec![codes::BUILT_UP, codes::SNOW_AND_ICE, codes::WATER, codes::NO_DATA],
            sanctioned_codes: vec![
                codes::CROPLAND_ANNUAL,
                codes::PASTURE,
                codes::AGROFORESTRY,
                codes::CROPLAND_ABANDONED,
                codes::PASTURE_ABANDONED,
                codes::AGROFORESTRY_ABANDONED,
            ],
            settlement_types: vec![codes::BUILT_UP],
            background_code: codes::NO_DATA,
            catalog: LandUseCatalog::default_catalog(),
            demand: DemandModel::default(),
            mplc: MplcConfig::default(),
        }
    }
}

impl SimulationConfig {
    pub fn builtin() -> Result<Self> {
        let config = Self::from_json_str(BUILTIN_CONFIG)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|source| LulccError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Neighbors-factor window radius in cells.
    ///
    /// The window spans `round(length / cell_size)` cells, bumped to the next
    /// odd number so it centers on the evaluated cell.
    pub fn neighbor_radius(&self) -> usize {
        let cells = (self.neighbor_window_length / self.cell_size).round().max(1.0) as usize;
        let cells = if cells % 2 == 0 { cells + 1 } else { cells };
        (cells - 1) / 2
    }

    pub fn cell_area_m2(&self) -> f64 {
        (self.cell_size as f64) * (self.cell_size as f64)
    }

    pub fn is_immutable(&self, code: LandUseCode) -> bool {
        self.immutable_types.contains(&code)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.cell_size > 0.0) {
            return Err(LulccError::invalid("cell_size", self.cell_size, "must be positive"));
        }
        if self.neighbor_window_length < 0.0 {
            return Err(LulccError::invalid(
                "neighbor_window_length",
                self.neighbor_window_length,
                "must not be negative",
            ));
        }
        if !(self.tie_break_noise >= 0.0) {
            return Err(LulccError::invalid(
                "tie_break_noise",
                self.tie_break_noise,
                "must not be negative",
            ));
        }
        self.catalog.validate()?;
        for &code in self
            .immutable_types
            .iter()
            .chain(self.sanctioned_codes.iter())
            .chain(self.settlement_types.iter())
        {
            if !self.catalog.is_known(code) {
                return Err(LulccError::UnknownLandUseType(code));
            }
        }
        self.demand.validate(&self.catalog)?;
        self.mplc.validate(&self.catalog)?;
        Ok(())
    }
}

/// Load configuration from `LULCC_CONFIG_PATH`, falling back to the builtin.
pub fn load_config_from_env() -> Result<(SimulationConfig, Option<PathBuf>)> {
    if let Some(path) = env::var("LULCC_CONFIG_PATH").ok().map(PathBuf::from) {
        match SimulationConfig::from_file(&path) {
            Ok(config) => {
                tracing::info!(
                    target: "lulcc::config",
                    path = %path.display(),
                    "config.loaded=file"
                );
                return Ok((config, Some(path)));
            }
            Err(err) => {
                tracing::warn!(
                    target: "lulcc::config",
                    path = %path.display(),
                    error = %err,
                    "config.load_failed"
                );
            }
        }
    }

    let config = SimulationConfig::builtin()?;
    tracing::info!(target: "lulcc::config", "config.loaded=builtin");
    Ok((config, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_config_parses_and_matches_default() {
        let config = SimulationConfig::builtin().unwrap();
        assert_eq!(config, SimulationConfig::default());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let config = SimulationConfig::from_json_str(r#"{"cell_size": 30.0}"#).unwrap();
        assert_eq!(config.cell_size, 30.0);
        assert_eq!(config.catalog, LandUseCatalog::default_catalog());
        config.validate().unwrap();
    }

    #[test]
    fn test_neighbor_radius_rounds_to_odd_window() {
        let mut config = SimulationConfig::default();
        config.cell_size = 100.0;
        config.neighbor_window_length = 300.0;
        assert_eq!(config.neighbor_radius(), 1);
        config.neighbor_window_length = 400.0;
        assert_eq!(config.neighbor_radius(), 2);
        config.neighbor_window_length = 10.0;
        assert_eq!(config.neighbor_radius(), 0);
    }

    #[test]
    fn test_invalid_cell_size_rejected() {
        let config = SimulationConfig::from_json_str(r#"{"cell_size": 0.0}"#).unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_unknown_immutable_code_rejected() {
        let config = SimulationConfig::from_json_str(r#"{"immutable_types": [200]}"#).unwrap();
        assert!(matches!(config.validate(), Err(LulccError::UnknownLandUseType(200))));
    }

    /// Both env branches in one test; the variable is process-wide.
    #[test]
    fn test_config_path_from_env_with_builtin_fallback() {
        let dir = std::env::temp_dir().join(format!("lulcc_config_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("config.json");
        std::fs::write(&path, r#"{"cell_size": 30.0}"#).unwrap();

        env::set_var("LULCC_CONFIG_PATH", &path);
        let (config, source) = load_config_from_env().unwrap();
        assert_eq!(source.as_deref(), Some(path.as_path()));
        assert_eq!(config.cell_size, 30.0);

        env::set_var("LULCC_CONFIG_PATH", dir.join("missing.json"));
        let (config, source) = load_config_from_env().unwrap();
        assert_eq!(source, None);
        assert_eq!(config, SimulationConfig::default());

        env::remove_var("LULCC_CONFIG_PATH");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = SimulationConfig::from_file(Path::new("/nonexistent/lulcc.json")).unwrap_err();
        assert!(matches!(err, LulccError::ConfigRead { .. }));
    }
}
