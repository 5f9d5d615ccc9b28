//! Most probable landscape configuration (mplc).
//!
//! Repeated realizations give, per code, the share of runs in which a cell
//! held that code. The mplc is the per-cell argmax of those shares, with an
//! optional corrective pass that reconciles the result with demand.

pub mod accumulator;
pub mod aggregate;
pub mod classes;
pub mod correction;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::SimulationConfig;
use crate::error::{ensure_shape, LulccError, Result};
use crate::landuse::{codes, LandUseCatalog, LandUseCode};
use crate::tilemap::Tilemap;

pub use accumulator::ProbabilityAccumulator;
pub use aggregate::{most_probable, MostProbable, ProbabilityStack};
pub use classes::{classify_map, ProbabilityClass};
pub use correction::{CorrectionKind, Corrector, MplcDemand, MplcShortfall, TypeTarget};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    /// Plain per-cell argmax
    #[default]
    Base,
    /// Argmax followed by the demand correction
    MaximumAnthropogenicImpact,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MplcConfig {
    pub mode: AggregationMode,

    /// Code of the deforestation pseudo-type
    pub deforestation_code: LandUseCode,

    /// Code a demoted cell becomes, keyed by potential natural vegetation class
    pub fallback_by_pnv: BTreeMap<u8, LandUseCode>,

    /// Fallback where no PNV raster or mapping is available
    pub default_fallback: LandUseCode,
}

impl Default for MplcConfig {
    fn default() -> Self {
        Self {
            mode: AggregationMode::Base,
            deforestation_code: codes::DEFORESTED,
            fallback_by_pnv: BTreeMap::from([
                (1, codes::DISTURBED_FOREST),
                (2, codes::SHRUBS),
                (3, codes::HERBACEOUS),
                (4, codes::SPARSE_VEGETATION),
            ]),
            default_fallback: codes::HERBACEOUS,
        }
    }
}

impl MplcConfig {
    pub fn validate(&self, catalog: &LandUseCatalog) -> Result<()> {
        let referenced = std::iter::once(self.deforestation_code)
            .chain(std::iter::once(self.default_fallback))
            .chain(self.fallback_by_pnv.values().copied());
        for code in referenced {
            if !catalog.is_known(code) {
                return Err(LulccError::UnknownLandUseType(code));
            }
        }
        Ok(())
    }
}

/// Final configuration of one time step.
#[derive(Clone, Debug, PartialEq)]
pub struct MplcOutcome {
    pub landuse: Tilemap<LandUseCode>,
    /// Probability of the code each cell ended up with
    pub probability: Tilemap<f32>,
    pub shortfalls: Vec<MplcShortfall>,
}

/// Aggregate a probability stack into one land-use raster.
///
/// `demand` is required in maximum anthropogenic impact mode and must name
/// every active type; it is ignored in base mode.
pub fn aggregate(
    stack: &ProbabilityStack,
    config: &SimulationConfig,
    demand: Option<&MplcDemand>,
    pnv: Option<&Tilemap<u8>>,
) -> Result<MplcOutcome> {
    if let Some(pnv) = pnv {
        ensure_shape("potential_natural_vegetation", pnv, stack.width, stack.height)?;
    }

    let base = most_probable(stack, config.background_code);
    let mut landuse = base.landuse;
    let mut shortfalls = Vec::new();

    if config.mplc.mode == AggregationMode::MaximumAnthropogenicImpact {
        let Some(demand) = demand else {
            return Err(LulccError::invalid(
                "mplc.mode",
                "maximum_anthropogenic_impact",
                "requires a demand record",
            ));
        };
        if let Some(code) = config.catalog.priority().find(|c| !demand.targets.contains_key(c)) {
            return Err(LulccError::MissingDemand(code));
        }

        let priority: Vec<_> = config
            .catalog
            .active
            .iter()
            .map(|tc| (tc.code, tc.abandoned_code))
            .collect();
        let mut corrector = Corrector::new(stack, &config.mplc, &config.immutable_types, pnv);
        shortfalls = corrector.apply(&mut landuse, &priority, demand);
    }

    let probability = Tilemap::from_fn(landuse.width, landuse.height, |x, y| {
        stack.get(*landuse.get(x, y)).map_or(0.0, |layer| *layer.get(x, y))
    });

    tracing::debug!(
        target: "lulcc::mplc",
        mode = ?config.mplc.mode,
        shortfalls = shortfalls.len(),
        "mplc.aggregated"
    );
    Ok(MplcOutcome {
        landuse,
        probability,
        shortfalls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strip(values: &[f32]) -> Tilemap<f32> {
        Tilemap::from_vec(values.len(), 1, values.to_vec()).unwrap()
    }

    fn stack() -> ProbabilityStack {
        let mut stack = ProbabilityStack::new(4, 1);
        stack.insert(codes::BUILT_UP, strip(&[0.6, 0.0, 0.0, 0.0])).unwrap();
        stack.insert(codes::CROPLAND_ANNUAL, strip(&[0.4, 0.45, 0.3, 0.0])).unwrap();
        stack.insert(codes::HERBACEOUS, strip(&[0.0, 0.55, 0.7, 0.0])).unwrap();
        stack
    }

    fn demand(cropland: usize) -> MplcDemand {
        let targets = [codes::BUILT_UP, codes::CROPLAND_ANNUAL, codes::PASTURE, codes::AGROFORESTRY, codes::PLANTATION]
            .into_iter()
            .map(|c| {
                let active = match c {
                    codes::BUILT_UP => 1,
                    codes::CROPLAND_ANNUAL => cropland,
                    _ => 0,
                };
                (c, TypeTarget { active, abandoned: None })
            })
            .collect();
        MplcDemand { targets, deforestation: None }
    }

    #[test]
    fn test_base_mode_is_plain_argmax() {
        let config = SimulationConfig::default();
        let outcome = aggregate(&stack(), &config, None, None).unwrap();
        assert_eq!(
            outcome.landuse.as_slice(),
            &[codes::BUILT_UP, codes::HERBACEOUS, codes::HERBACEOUS, codes::NO_DATA]
        );
        assert_eq!(outcome.probability.as_slice(), &[0.6, 0.55, 0.7, 0.0]);
        assert!(outcome.shortfalls.is_empty());
    }

    #[test]
    fn test_anthropogenic_mode_promotes_to_demand() {
        let mut config = SimulationConfig::default();
        config.mplc.mode = AggregationMode::MaximumAnthropogenicImpact;
        let outcome = aggregate(&stack(), &config, Some(&demand(2)), None).unwrap();

        assert_eq!(
            outcome.landuse.as_slice(),
            &[codes::BUILT_UP, codes::CROPLAND_ANNUAL, codes::CROPLAND_ANNUAL, codes::NO_DATA]
        );
        assert_eq!(outcome.probability.as_slice(), &[0.6, 0.45, 0.3, 0.0]);
        assert!(outcome.shortfalls.is_empty());
    }

    #[test]
    fn test_anthropogenic_mode_requires_full_demand() {
        let mut config = SimulationConfig::default();
        config.mplc.mode = AggregationMode::MaximumAnthropogenicImpact;
        assert!(aggregate(&stack(), &config, None, None).is_err());

        let mut partial = demand(1);
        partial.targets.remove(&codes::PLANTATION);
        assert!(matches!(
            aggregate(&stack(), &config, Some(&partial), None),
            Err(LulccError::MissingDemand(codes::PLANTATION))
        ));
    }

    #[test]
    fn test_default_config_codes_are_known() {
        MplcConfig::default()
            .validate(&LandUseCatalog::default_catalog())
            .unwrap();
    }
}
