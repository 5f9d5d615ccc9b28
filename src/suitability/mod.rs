//! Suitability evaluation
//!
//! Combines weighted factors into one normalized raster per land-use type:
//! - **Static part**: distance to streets, freshwater and cities. Summed
//!   once per type and cached for the time step.
//! - **Dynamic part**: neighbors, settlements, population, net forest edge
//!   and current land use. Recomputed on every evaluation because earlier
//!   allocations in the same step change the land-use raster.
//!
//! The total plus a small uniform noise map is min-max normalized; the
//! noise makes the subsequent ranking a total order.

pub mod distance;
pub mod factors;
pub mod normalize;

use std::collections::BTreeMap;

use rand::Rng;
use rand_chacha::ChaCha8Rng;

use crate::config::SimulationConfig;
use crate::error::Result;
use crate::landscape::{Landscape, StepInputs};
use crate::landuse::{FactorId, LandUseCode, LandUseTypeConfig};
use crate::tilemap::Tilemap;

pub use distance::spread_distance;
pub use normalize::{normalize_map, normalize_masked, NORMALIZATION_EPSILON};

/// Evaluates suitability for one time step.
pub struct SuitabilityEvaluator<'a> {
    config: &'a SimulationConfig,
    landscape: &'a Landscape,
    inputs: &'a StepInputs,
    static_cache: BTreeMap<LandUseCode, Tilemap<f32>>,
}

impl<'a> SuitabilityEvaluator<'a> {
    pub fn new(config: &'a SimulationConfig, landscape: &'a Landscape, inputs: &'a StepInputs) -> Self {
        Self {
            config,
            landscape,
            inputs,
            static_cache: BTreeMap::new(),
        }
    }

    /// One factor's raster for a type, before weighting.
    pub fn factor_map(
        &self,
        factor: FactorId,
        type_config: &LandUseTypeConfig,
        landuse: &Tilemap<LandUseCode>,
    ) -> Tilemap<f32> {
        let params = type_config.params(factor);
        let cell_size = self.config.cell_size;

        match factor {
            FactorId::Neighbors => {
                factors::neighbor_suitability(landuse, type_config, self.config.neighbor_radius())
            }
            FactorId::DistanceToSettlements => factors::settlement_suitability(
                landuse,
                &self.config.settlement_types,
                cell_size,
                &params,
            ),
            FactorId::PopulationDensity => {
                factors::population_suitability(&self.inputs.population_density, &params)
            }
            FactorId::DistanceToNetForestEdge => factors::net_forest_edge_suitability(
                landuse,
                &self.inputs.net_forest,
                type_config.code,
                cell_size,
                &params,
            ),
            FactorId::CurrentLandUse => factors::current_land_use_suitability(landuse, &params),
            FactorId::DistanceToStreets => {
                factors::distance_suitability(&self.landscape.distance_to_streets, &params)
            }
            FactorId::DistanceToFreshwater => {
                factors::distance_suitability(&self.landscape.distance_to_freshwater, &params)
            }
            FactorId::DistanceToCities => {
                factors::distance_suitability(&self.landscape.distance_to_cities, &params)
            }
        }
    }

    /// Weighted sum of the static factors, cached per type for the step.
    pub fn static_suitability(&mut self, type_config: &LandUseTypeConfig) -> Result<&Tilemap<f32>> {
        if !self.static_cache.contains_key(&type_config.code) {
            let mut total = Tilemap::new_with(self.landscape.width, self.landscape.height, 0.0);
            for (factor, weight) in type_config.weighted_factors()? {
                let Some(distance) = self.landscape.static_distance(factor) else {
                    continue;
                };
                let map = factors::distance_suitability(distance, &type_config.params(factor));
                total.add_scaled(&map, weight);
            }
            self.static_cache.insert(type_config.code, total);
        }
        Ok(&self.static_cache[&type_config.code])
    }

    /// Weighted sum of the dynamic factors for the current land-use raster.
    pub fn dynamic_suitability(
        &self,
        type_config: &LandUseTypeConfig,
        landuse: &Tilemap<LandUseCode>,
    ) -> Result<Tilemap<f32>> {
        let mut total = Tilemap::new_with(landuse.width, landuse.height, 0.0);
        for (factor, weight) in type_config.weighted_factors()? {
            if factor.is_static() || weight == 0.0 {
                continue;
            }
            total.add_scaled(&self.factor_map(factor, type_config, landuse), weight);
        }
        Ok(total)
    }

    /// Final suitability raster: static + dynamic + noise, normalized to `[0, 1]`.
    pub fn evaluate(
        &mut self,
        type_config: &LandUseTypeConfig,
        landuse: &Tilemap<LandUseCode>,
        rng: &mut ChaCha8Rng,
    ) -> Result<Tilemap<f32>> {
        let mut total = self.dynamic_suitability(type_config, landuse)?;
        total.add_scaled(self.static_suitability(type_config)?, 1.0);

        let noise = noise_map(total.width, total.height, self.config.tie_break_noise, rng);
        total.add_scaled(&noise, 1.0);

        tracing::trace!(
            target: "lulcc::suitability",
            code = type_config.code,
            "suitability.evaluated"
        );
        Ok(normalize_map(&total))
    }
}

/// Uniform noise in `[0, scale)`, drawn in flat index order.
pub fn noise_map(width: usize, height: usize, scale: f32, rng: &mut ChaCha8Rng) -> Tilemap<f32> {
    if scale <= 0.0 {
        return Tilemap::new_with(width, height, 0.0);
    }
    Tilemap::from_fn(width, height, |_, _| rng.gen::<f32>() * scale)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landuse::{codes, FactorParams, LandUseCatalog, SlopeBand};
    use rand::SeedableRng;

    fn city_only_type() -> LandUseTypeConfig {
        LandUseTypeConfig {
            code: codes::BUILT_UP,
            name: "built-up".into(),
            abandoned_code: None,
            related_types: vec![],
            suitability_factors: vec![8],
            weights: vec![1.0],
            factor_params: BTreeMap::from([(8, FactorParams::default())]),
            difficult_terrain_slope: SlopeBand::default(),
        }
    }

    fn inputs(width: usize, height: usize) -> StepInputs {
        StepInputs {
            population_density: Tilemap::new_with(width, height, 0.0),
            net_forest: Tilemap::new_with(width, height, false),
        }
    }

    #[test]
    fn test_static_part_is_cached() {
        let config = SimulationConfig::default();
        let mut landscape = Landscape::flat(4, 4);
        landscape.distance_to_cities = Tilemap::from_fn(4, 4, |x, y| (x + y) as f32 * 100.0);
        let step_inputs = inputs(4, 4);
        let mut evaluator = SuitabilityEvaluator::new(&config, &landscape, &step_inputs);

        let type_config = city_only_type();
        let first = evaluator.static_suitability(&type_config).unwrap().clone();
        let second = evaluator.static_suitability(&type_config).unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(*first.get(0, 0), 1.0);
        assert_eq!(*first.get(3, 3), 0.0);
    }

    #[test]
    fn test_evaluate_is_normalized_and_ordered() {
        let config = SimulationConfig::default();
        let mut landscape = Landscape::flat(5, 5);
        landscape.distance_to_cities = Tilemap::from_fn(5, 5, |x, y| (x * 5 + y) as f32 * 100.0);
        let step_inputs = inputs(5, 5);
        let mut evaluator = SuitabilityEvaluator::new(&config, &landscape, &step_inputs);
        let landuse = Tilemap::new_with(5, 5, codes::HERBACEOUS);

        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let suit = evaluator.evaluate(&city_only_type(), &landuse, &mut rng).unwrap();

        assert_eq!(suit.min_max(), Some((0.0, 1.0)));
        // Noise is far below the 100 m distance steps: order follows distance
        assert!(suit.get(0, 0) > suit.get(0, 1));
        assert!(suit.get(0, 4) > suit.get(1, 0));
    }

    #[test]
    fn test_evaluate_deterministic_for_seed() {
        let config = SimulationConfig::default();
        let landscape = Landscape::flat(6, 6);
        let step_inputs = inputs(6, 6);
        let catalog = LandUseCatalog::default_catalog();
        let landuse = Tilemap::from_fn(6, 6, |x, _| if x < 2 { codes::CROPLAND_ANNUAL } else { codes::HERBACEOUS });
        let cropland = catalog.get(codes::CROPLAND_ANNUAL).unwrap();

        let run = |seed| {
            let mut evaluator = SuitabilityEvaluator::new(&config, &landscape, &step_inputs);
            let mut rng = ChaCha8Rng::seed_from_u64(seed);
            evaluator.evaluate(cropland, &landuse, &mut rng).unwrap()
        };
        assert_eq!(run(11), run(11));
        assert_ne!(run(11), run(12));
    }

    #[test]
    fn test_noise_breaks_ties_on_uniform_input() {
        let config = SimulationConfig::default();
        let landscape = Landscape::flat(4, 4);
        let step_inputs = inputs(4, 4);
        let mut evaluator = SuitabilityEvaluator::new(&config, &landscape, &step_inputs);
        let landuse = Tilemap::new_with(4, 4, codes::HERBACEOUS);

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let suit = evaluator.evaluate(&city_only_type(), &landuse, &mut rng).unwrap();
        let mut values: Vec<f32> = suit.values().copied().collect();
        values.sort_by(f32::total_cmp);
        values.dedup();
        assert_eq!(values.len(), 16);
    }

    #[test]
    fn test_malformed_type_is_rejected() {
        let config = SimulationConfig::default();
        let landscape = Landscape::flat(2, 2);
        let step_inputs = inputs(2, 2);
        let mut evaluator = SuitabilityEvaluator::new(&config, &landscape, &step_inputs);
        let mut bad = city_only_type();
        bad.weights.push(0.5);
        let landuse = Tilemap::new_with(2, 2, codes::HERBACEOUS);
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(evaluator.evaluate(&bad, &landuse, &mut rng).is_err());
    }
}
