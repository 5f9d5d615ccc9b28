//! Land-use type catalog
//!
//! Every categorical code the simulator knows about, plus the full
//! allocation configuration for the active types. Per-type behavior
//! (abandoned code, factors, slope band) is looked up by code rather than
//! branched on.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{LulccError, Result};

/// Categorical land-use code stored in the land-use raster.
pub type LandUseCode = u8;

/// Default catalog codes.
pub mod codes {
    use super::LandUseCode;

    pub const BUILT_UP: LandUseCode = 1;
    pub const CROPLAND_ANNUAL: LandUseCode = 2;
    pub const PASTURE: LandUseCode = 3;
    pub const AGROFORESTRY: LandUseCode = 4;
    pub const PLANTATION: LandUseCode = 5;
    pub const HERBACEOUS: LandUseCode = 6;
    pub const SHRUBS: LandUseCode = 7;
    pub const DISTURBED_FOREST: LandUseCode = 8;
    pub const UNDISTURBED_FOREST: LandUseCode = 9;
    pub const SPARSE_VEGETATION: LandUseCode = 10;
    pub const BARE_SOIL: LandUseCode = 11;
    pub const SNOW_AND_ICE: LandUseCode = 12;
    pub const WATER: LandUseCode = 13;
    pub const CROPLAND_ABANDONED: LandUseCode = 14;
    pub const PASTURE_ABANDONED: LandUseCode = 15;
    pub const AGROFORESTRY_ABANDONED: LandUseCode = 16;
    pub const DEFORESTED: LandUseCode = 17;
    pub const PLANTATION_HARVESTED: LandUseCode = 18;
    pub const NO_DATA: LandUseCode = 99;
}

/// Suitability factor identifiers as they appear in configuration files.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FactorId {
    /// Share of same or related types in the neighborhood window
    Neighbors,
    /// Distance to the nearest built-up cell
    DistanceToSettlements,
    /// Population density of the step
    PopulationDensity,
    /// Distance to the net forest edge
    DistanceToNetForestEdge,
    /// Lookup on the cell's current land use
    CurrentLandUse,
    /// Distance to the street network
    DistanceToStreets,
    /// Distance to freshwater
    DistanceToFreshwater,
    /// Distance to cities
    DistanceToCities,
}

impl FactorId {
    pub fn all() -> &'static [Self] {
        &[
            Self::Neighbors,
            Self::DistanceToSettlements,
            Self::PopulationDensity,
            Self::DistanceToNetForestEdge,
            Self::CurrentLandUse,
            Self::DistanceToStreets,
            Self::DistanceToFreshwater,
            Self::DistanceToCities,
        ]
    }

    pub fn id(&self) -> u8 {
        match self {
            Self::Neighbors => 1,
            Self::DistanceToSettlements => 2,
            Self::PopulationDensity => 3,
            Self::DistanceToNetForestEdge => 4,
            Self::CurrentLandUse => 5,
            Self::DistanceToStreets => 6,
            Self::DistanceToFreshwater => 7,
            Self::DistanceToCities => 8,
        }
    }

    /// Static factors do not change while a time step is being allocated.
    pub fn is_static(&self) -> bool {
        matches!(
            self,
            Self::DistanceToStreets | Self::DistanceToFreshwater | Self::DistanceToCities
        )
    }
}

impl TryFrom<u8> for FactorId {
    type Error = LulccError;

    fn try_from(id: u8) -> Result<Self> {
        Self::all()
            .iter()
            .copied()
            .find(|f| f.id() == id)
            .ok_or(LulccError::UnknownFactor(id))
    }
}

impl std::fmt::Display for FactorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Neighbors => write!(f, "neighbors"),
            Self::DistanceToSettlements => write!(f, "distance_to_settlements"),
            Self::PopulationDensity => write!(f, "population_density"),
            Self::DistanceToNetForestEdge => write!(f, "distance_to_net_forest_edge"),
            Self::CurrentLandUse => write!(f, "current_land_use"),
            Self::DistanceToStreets => write!(f, "distance_to_streets"),
            Self::DistanceToFreshwater => write!(f, "distance_to_freshwater"),
            Self::DistanceToCities => write!(f, "distance_to_cities"),
        }
    }
}

/// How a distance is turned into suitability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum RelationType {
    #[default]
    Linear,
    Exponential,
    InverselyProportional,
}

impl TryFrom<u8> for RelationType {
    type Error = String;

    fn try_from(value: u8) -> std::result::Result<Self, String> {
        match value {
            0 => Ok(Self::Linear),
            1 => Ok(Self::Exponential),
            2 => Ok(Self::InverselyProportional),
            other => Err(format!("unknown relation type {other} (expected 0, 1 or 2)")),
        }
    }
}

impl From<RelationType> for u8 {
    fn from(value: RelationType) -> u8 {
        match value {
            RelationType::Linear => 0,
            RelationType::Exponential => 1,
            RelationType::InverselyProportional => 2,
        }
    }
}

/// Parameters of one suitability factor for one land-use type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorParams {
    /// +1: larger values are more suitable, -1: smaller values are more suitable
    pub direction: f32,
    /// Cells farther than this (world units) get zero suitability
    pub max_distance: Option<f32>,
    /// Cost multiplier for distances computed by the simulator
    pub friction: f32,
    pub relation: RelationType,
    /// Current land use code -> suitability, for the current-land-use factor
    pub lookup: BTreeMap<LandUseCode, f32>,
}

impl Default for FactorParams {
    fn default() -> Self {
        Self {
            direction: -1.0,
            max_distance: None,
            friction: 1.0,
            relation: RelationType::Linear,
            lookup: BTreeMap::new(),
        }
    }
}

/// Percent-slope band separating favorable from difficult terrain.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SlopeBand {
    /// Slopes below this are favorable terrain
    pub min: f32,
    /// Slopes above this are never allocated
    pub max: f32,
}

impl Default for SlopeBand {
    fn default() -> Self {
        Self { min: 15.0, max: 45.0 }
    }
}

/// Allocation configuration of one active land-use type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandUseTypeConfig {
    pub code: LandUseCode,
    pub name: String,
    /// Code that cells of this type become when abandoned (None: cannot shrink)
    #[serde(default)]
    pub abandoned_code: Option<LandUseCode>,
    /// Types counted as "same" in the neighbors factor (the type itself is implied)
    #[serde(default)]
    pub related_types: Vec<LandUseCode>,
    pub suitability_factors: Vec<u8>,
    pub weights: Vec<f32>,
    #[serde(default)]
    pub factor_params: BTreeMap<u8, FactorParams>,
    #[serde(default)]
    pub difficult_terrain_slope: SlopeBand,
}

impl LandUseTypeConfig {
    /// Parameters of a factor, falling back to defaults when not configured.
    pub fn params(&self, factor: FactorId) -> FactorParams {
        self.factor_params
            .get(&factor.id())
            .cloned()
            .unwrap_or_default()
    }

    /// Resolved `(factor, weight)` pairs. Fails on unknown ids or mismatched lengths.
    pub fn weighted_factors(&self) -> Result<Vec<(FactorId, f32)>> {
        if self.suitability_factors.len() != self.weights.len() {
            return Err(LulccError::WeightsMismatch {
                code: self.code,
                factors: self.suitability_factors.len(),
                weights: self.weights.len(),
            });
        }
        self.suitability_factors
            .iter()
            .zip(self.weights.iter())
            .map(|(&id, &w)| Ok((FactorId::try_from(id)?, w)))
            .collect()
    }

    /// Whether `code` counts as this type in the neighbors factor.
    pub fn is_related(&self, code: LandUseCode) -> bool {
        code == self.code || self.related_types.contains(&code)
    }
}

/// All known land-use codes plus the ordered list of active types.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LandUseCatalog {
    pub names: BTreeMap<LandUseCode, String>,
    /// Active types in allocation priority order
    pub active: Vec<LandUseTypeConfig>,
}

impl LandUseCatalog {
    pub fn get(&self, code: LandUseCode) -> Option<&LandUseTypeConfig> {
        self.active.iter().find(|t| t.code == code)
    }

    /// Active type codes in priority order.
    pub fn priority(&self) -> impl Iterator<Item = LandUseCode> + '_ {
        self.active.iter().map(|t| t.code)
    }

    pub fn is_known(&self, code: LandUseCode) -> bool {
        self.names.contains_key(&code)
    }

    pub fn name(&self, code: LandUseCode) -> &str {
        self.names.get(&code).map(String::as_str).unwrap_or("unknown")
    }

    /// Check internal consistency. Called before any raster is touched.
    pub fn validate(&self) -> Result<()> {
        let mut seen = Vec::with_capacity(self.active.len());
        for config in &self.active {
            if seen.contains(&config.code) {
                return Err(LulccError::invalid(
                    "active_types",
                    config.code,
                    "land-use type listed twice in the priority order",
                ));
            }
            seen.push(config.code);

            if !self.is_known(config.code) {
                return Err(LulccError::UnknownLandUseType(config.code));
            }
            if let Some(abandoned) = config.abandoned_code {
                if !self.is_known(abandoned) {
                    return Err(LulccError::UnknownLandUseType(abandoned));
                }
            }
            if let Some(&bad) = config.related_types.iter().find(|c| !self.is_known(**c)) {
                return Err(LulccError::UnknownLandUseType(bad));
            }
            config.weighted_factors()?;
            for &id in config.factor_params.keys() {
                FactorId::try_from(id)?;
            }
            let band = config.difficult_terrain_slope;
            if !(band.min <= band.max) {
                return Err(LulccError::invalid(
                    "difficult_terrain_slope",
                    format!("[{}, {}]", band.min, band.max),
                    "min must not exceed max",
                ));
            }
            for params in config.factor_params.values() {
                if params.friction <= 0.0 {
                    return Err(LulccError::invalid("friction", params.friction, "must be positive"));
                }
            }
        }
        Ok(())
    }

    /// The built-in catalog used when no configuration file is given.
    pub fn default_catalog() -> Self {
        use codes::*;

        let names: BTreeMap<LandUseCode, String> = [
            (BUILT_UP, "built-up"),
            (CROPLAND_ANNUAL, "cropland-annual"),
            (PASTURE, "pasture"),
            (AGROFORESTRY, "agroforestry"),
            (PLANTATION, "plantation"),
            (HERBACEOUS, "herbaceous vegetation"),
            (SHRUBS, "shrubs"),
            (DISTURBED_FOREST, "disturbed forest"),
            (UNDISTURBED_FOREST, "undisturbed forest"),
            (SPARSE_VEGETATION, "sparse vegetation"),
            (BARE_SOIL, "bare soil"),
            (SNOW_AND_ICE, "permanent snow and ice"),
            (WATER, "water"),
            (CROPLAND_ABANDONED, "cropland-annual abandoned"),
            (PASTURE_ABANDONED, "pasture abandoned"),
            (AGROFORESTRY_ABANDONED, "agroforestry abandoned"),
            (DEFORESTED, "deforested net forest"),
            (PLANTATION_HARVESTED, "plantation harvested"),
            (NO_DATA, "no data"),
        ]
        .into_iter()
        .map(|(c, n)| (c, n.to_string()))
        .collect();

        fn conversion_lookup(pairs: &[(LandUseCode, f32)]) -> FactorParams {
            FactorParams {
                lookup: pairs.iter().copied().collect(),
                ..FactorParams::default()
            }
        }
        fn near(max_distance: f32, relation: RelationType) -> FactorParams {
            FactorParams {
                direction: -1.0,
                max_distance: Some(max_distance),
                relation,
                ..FactorParams::default()
            }
        }
        let dense = FactorParams {
            direction: 1.0,
            ..FactorParams::default()
        };

        let built_up = LandUseTypeConfig {
            code: BUILT_UP,
            name: "built-up".into(),
            abandoned_code: None,
            related_types: vec![],
            suitability_factors: vec![1, 3, 6, 8, 5],
            weights: vec![0.3, 0.2, 0.2, 0.2, 0.1],
            factor_params: BTreeMap::from([
                (3, dense),
                (6, near(5_000.0, RelationType::InverselyProportional)),
                (8, near(20_000.0, RelationType::Exponential)),
                (5, conversion_lookup(&[
                    (CROPLAND_ANNUAL, 1.0), (PASTURE, 0.9), (HERBACEOUS, 0.9),
                    (CROPLAND_ABANDONED, 1.0), (PASTURE_ABANDONED, 0.9),
                    (SHRUBS, 0.6), (BARE_SOIL, 0.5), (DISTURBED_FOREST, 0.3),
                ])),
            ]),
            difficult_terrain_slope: SlopeBand { min: 10.0, max: 40.0 },
        };

        let cropland = LandUseTypeConfig {
            code: CROPLAND_ANNUAL,
            name: "cropland-annual".into(),
            abandoned_code: Some(CROPLAND_ABANDONED),
            related_types: vec![CROPLAND_ABANDONED],
            suitability_factors: vec![1, 2, 6, 7, 4, 5],
            weights: vec![0.25, 0.15, 0.15, 0.2, 0.1, 0.15],
            factor_params: BTreeMap::from([
                (2, near(10_000.0, RelationType::Linear)),
                (6, near(8_000.0, RelationType::Linear)),
                (7, near(3_000.0, RelationType::Exponential)),
                (5, conversion_lookup(&[
                    (CROPLAND_ABANDONED, 1.0), (PASTURE, 0.8), (HERBACEOUS, 0.8),
                    (PASTURE_ABANDONED, 0.7), (SHRUBS, 0.5), (DISTURBED_FOREST, 0.3),
                    (UNDISTURBED_FOREST, 0.1),
                ])),
            ]),
            difficult_terrain_slope: SlopeBand { min: 15.0, max: 45.0 },
        };

        let pasture = LandUseTypeConfig {
            code: PASTURE,
            name: "pasture".into(),
            abandoned_code: Some(PASTURE_ABANDONED),
            related_types: vec![PASTURE_ABANDONED],
            suitability_factors: vec![1, 2, 6, 4, 5],
            weights: vec![0.3, 0.15, 0.2, 0.15, 0.2],
            factor_params: BTreeMap::from([
                (2, near(15_000.0, RelationType::Linear)),
                (6, near(10_000.0, RelationType::Linear)),
                (5, conversion_lookup(&[
                    (PASTURE_ABANDONED, 1.0), (HERBACEOUS, 0.9), (SHRUBS, 0.6),
                    (CROPLAND_ABANDONED, 0.7), (DISTURBED_FOREST, 0.4),
                    (UNDISTURBED_FOREST, 0.2),
                ])),
            ]),
            difficult_terrain_slope: SlopeBand { min: 20.0, max: 60.0 },
        };

        let agroforestry = LandUseTypeConfig {
            code: AGROFORESTRY,
            name: "agroforestry".into(),
            abandoned_code: Some(AGROFORESTRY_ABANDONED),
            related_types: vec![AGROFORESTRY_ABANDONED],
            suitability_factors: vec![1, 6, 7, 5],
            weights: vec![0.35, 0.2, 0.2, 0.25],
            factor_params: BTreeMap::from([
                (6, near(10_000.0, RelationType::Linear)),
                (7, near(5_000.0, RelationType::InverselyProportional)),
                (5, conversion_lookup(&[
                    (AGROFORESTRY_ABANDONED, 1.0), (SHRUBS, 0.8), (HERBACEOUS, 0.7),
                    (DISTURBED_FOREST, 0.6), (PASTURE_ABANDONED, 0.5),
                ])),
            ]),
            difficult_terrain_slope: SlopeBand { min: 20.0, max: 60.0 },
        };

        let plantation = LandUseTypeConfig {
            code: PLANTATION,
            name: "plantation".into(),
            abandoned_code: Some(PLANTATION_HARVESTED),
            related_types: vec![PLANTATION_HARVESTED],
            suitability_factors: vec![1, 6, 4, 5],
            weights: vec![0.3, 0.25, 0.2, 0.25],
            factor_params: BTreeMap::from([
                (6, near(12_000.0, RelationType::Linear)),
                (5, conversion_lookup(&[
                    (PLANTATION_HARVESTED, 1.0), (SHRUBS, 0.7), (HERBACEOUS, 0.7),
                    (DISTURBED_FOREST, 0.5), (PASTURE_ABANDONED, 0.6),
                ])),
            ]),
            difficult_terrain_slope: SlopeBand { min: 25.0, max: 70.0 },
        };

        Self {
            names,
            active: vec![built_up, cropland, pasture, agroforestry, plantation],
        }
    }
}

impl Default for LandUseCatalog {
    fn default() -> Self {
        Self::default_catalog()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_catalog_is_valid() {
        let catalog = LandUseCatalog::default_catalog();
        catalog.validate().unwrap();
        assert_eq!(catalog.priority().collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
        assert_eq!(catalog.get(2).unwrap().abandoned_code, Some(codes::CROPLAND_ABANDONED));
        assert_eq!(catalog.name(6), "herbaceous vegetation");
    }

    #[test]
    fn test_weights_mismatch_is_fatal() {
        let mut catalog = LandUseCatalog::default_catalog();
        catalog.active[1].weights.pop();
        match catalog.validate() {
            Err(LulccError::WeightsMismatch { code: 2, .. }) => {}
            other => panic!("expected weights mismatch, got {other:?}"),
        }
    }

    #[test]
    fn test_unknown_factor_is_fatal() {
        let mut catalog = LandUseCatalog::default_catalog();
        catalog.active[0].suitability_factors[0] = 42;
        assert!(matches!(catalog.validate(), Err(LulccError::UnknownFactor(42))));
    }

    #[test]
    fn test_duplicate_priority_is_fatal() {
        let mut catalog = LandUseCatalog::default_catalog();
        let dup = catalog.active[0].clone();
        catalog.active.push(dup);
        assert!(catalog.validate().is_err());
    }

    #[test]
    fn test_factor_id_roundtrip() {
        for factor in FactorId::all() {
            assert_eq!(FactorId::try_from(factor.id()).unwrap(), *factor);
        }
        assert!(FactorId::DistanceToCities.is_static());
        assert!(!FactorId::Neighbors.is_static());
    }

    #[test]
    fn test_relation_type_parses_from_number() {
        let params: FactorParams = serde_json::from_str(r#"{"relation": 2}"#).unwrap();
        assert_eq!(params.relation, RelationType::InverselyProportional);
        assert!(serde_json::from_str::<FactorParams>(r#"{"relation": 7}"#).is_err());
    }
}
