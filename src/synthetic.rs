//! Noise-driven synthetic scenario.
//!
//! Builds a plausible landscape without external data: fBm terrain, water
//! in the lowest basins, a jittered street grid, a few city centers with
//! built-up cores, restricted areas from a second noise field, and an
//! initial land-use map classified from elevation, slope and proximity.

use noise::{NoiseFn, Perlin, Seedable};
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::config::SimulationConfig;
use crate::error::{LulccError, Result};
use crate::landscape::{slope_from_elevation, Landscape, StepInputs};
use crate::landuse::{codes, LandUseCode};
use crate::seeds::RunSeeds;
use crate::suitability::spread_distance;
use crate::tilemap::Tilemap;

/// Parameters for synthetic scenario generation
#[derive(Clone, Debug)]
pub struct SyntheticParams {
    pub width: usize,
    pub height: usize,
    /// Base frequency for terrain noise (per cell)
    pub base_frequency: f64,
    /// Number of noise octaves
    pub octaves: u32,
    /// Amplitude decay per octave
    pub persistence: f64,
    /// Frequency multiplier per octave
    pub lacunarity: f64,
    /// Elevation difference between the lowest and highest cell, in metres
    pub relief: f32,
    /// Share of cells under water
    pub water_share: f32,
    /// Share of cells inside restricted areas
    pub restricted_share: f32,
    /// Street spacing in cells
    pub street_spacing: usize,
    pub city_count: usize,
    /// Radius of a city's built-up core, in metres
    pub city_radius: f32,
    /// Base-year inhabitants per cell; the total scales with the grid
    pub population_per_cell: f64,
}

impl Default for SyntheticParams {
    fn default() -> Self {
        Self {
            width: 128,
            height: 128,
            base_frequency: 0.02,
            octaves: 5,
            persistence: 0.5,
            lacunarity: 2.0,
            relief: 300.0,
            water_share: 0.05,
            restricted_share: 0.2,
            street_spacing: 16,
            city_count: 3,
            city_radius: 500.0,
            population_per_cell: 3.0,
        }
    }
}

/// A generated landscape plus its base-year state.
#[derive(Clone, Debug)]
pub struct SyntheticScenario {
    pub landscape: Landscape,
    pub elevation: Tilemap<f32>,
    pub initial_landuse: Tilemap<LandUseCode>,
    pub population: f64,
}

fn fbm(noise: &Perlin, x: f64, y: f64, octaves: u32, persistence: f64, lacunarity: f64) -> f64 {
    let mut total = 0.0;
    let mut amplitude = 1.0;
    let mut frequency = 1.0;
    let mut max_value = 0.0;

    for _ in 0..octaves {
        total += amplitude * noise.get([x * frequency, y * frequency]);
        max_value += amplitude;
        amplitude *= persistence;
        frequency *= lacunarity;
    }

    total / max_value
}

/// Noise field normalized to `[0, 1]`.
fn noise_field(params: &SyntheticParams, seed: u32, frequency: f64) -> Tilemap<f32> {
    let noise = Perlin::new(1).set_seed(seed);
    let raw = Tilemap::from_fn(params.width, params.height, |x, y| {
        fbm(
            &noise,
            x as f64 * frequency,
            y as f64 * frequency,
            params.octaves,
            params.persistence,
            params.lacunarity,
        ) as f32
    });
    crate::suitability::normalize_map(&raw)
}

/// Value below which `share` of the cells fall.
fn quantile(field: &Tilemap<f32>, share: f32) -> f32 {
    let mut values: Vec<f32> = field.values().copied().collect();
    values.sort_by(f32::total_cmp);
    let idx = ((values.len() as f32 * share) as usize).min(values.len() - 1);
    values[idx]
}

pub fn generate(params: &SyntheticParams, config: &SimulationConfig, seeds: &RunSeeds) -> Result<SyntheticScenario> {
    if params.width < 2 || params.height < 2 {
        return Err(LulccError::invalid(
            "synthetic size",
            format!("{}x{}", params.width, params.height),
            "needs at least 2x2 cells",
        ));
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seeds.landscape);
    let cell_size = config.cell_size;
    let (width, height) = (params.width, params.height);

    let terrain = noise_field(params, rng.gen(), params.base_frequency);
    let elevation = terrain.map(|&t| t * params.relief);
    let slope = slope_from_elevation(&elevation, cell_size);

    let water_level = quantile(&terrain, params.water_share);
    let water = terrain.map(|&t| t < water_level);
    let distance_to_freshwater = spread_distance(&water, cell_size, 1.0);

    // Street grid with a random offset per axis
    let spacing = params.street_spacing.max(2);
    let (ox, oy) = (rng.gen_range(0..spacing), rng.gen_range(0..spacing));
    let streets = Tilemap::from_fn(width, height, |x, y| {
        (x % spacing == ox || y % spacing == oy) && !*water.get(x, y)
    });
    let distance_to_streets = spread_distance(&streets, cell_size, 1.0);

    // City centers on dry, gentle land
    let mut centers = Tilemap::new_with(width, height, false);
    let mut placed = 0;
    for _ in 0..params.city_count * 50 {
        if placed == params.city_count {
            break;
        }
        let (x, y) = (rng.gen_range(0..width), rng.gen_range(0..height));
        if !*water.get(x, y) && *slope.get(x, y) < 10.0 {
            centers.set(x, y, true);
            placed += 1;
        }
    }
    if placed == 0 {
        centers.set(width / 2, height / 2, true);
    }
    let distance_to_cities = spread_distance(&centers, cell_size, 1.0);

    let protection = noise_field(params, rng.gen(), params.base_frequency * 0.7);
    let restricted_level = quantile(&protection, 1.0 - params.restricted_share);
    let restricted = protection.map(|&p| p >= restricted_level);

    let potential_natural_vegetation = terrain.map(|&t| match t {
        t if t < 0.35 => 3,
        t if t < 0.7 => 1,
        t if t < 0.9 => 2,
        _ => 4,
    });

    let vegetation = noise_field(params, rng.gen(), params.base_frequency * 2.0);
    let initial_landuse = Tilemap::from_fn(width, height, |x, y| {
        let t = *terrain.get(x, y);
        let s = *slope.get(x, y);
        let city = *distance_to_cities.get(x, y);
        let v = *vegetation.get(x, y);

        if *water.get(x, y) {
            codes::WATER
        } else if t > 0.97 {
            codes::SNOW_AND_ICE
        } else if city <= params.city_radius {
            codes::BUILT_UP
        } else if s < 15.0 && city < params.city_radius * 6.0 && v < 0.45 {
            codes::CROPLAND_ANNUAL
        } else if s < 25.0 && v < 0.35 {
            codes::PASTURE
        } else if *restricted.get(x, y) || t > 0.6 {
            if v > 0.5 { codes::UNDISTURBED_FOREST } else { codes::DISTURBED_FOREST }
        } else if v > 0.7 {
            codes::SHRUBS
        } else if t > 0.85 {
            codes::SPARSE_VEGETATION
        } else {
            codes::HERBACEOUS
        }
    });

    tracing::info!(
        target: "lulcc::synthetic",
        width,
        height,
        cities = placed,
        water = water.count_true(),
        restricted = restricted.count_true(),
        "synthetic.generated"
    );

    Ok(SyntheticScenario {
        landscape: Landscape {
            width,
            height,
            slope,
            distance_to_streets,
            distance_to_freshwater,
            distance_to_cities,
            restricted,
            potential_natural_vegetation: Some(potential_natural_vegetation),
        },
        elevation,
        initial_landuse,
        population: params.population_per_cell * (params.width * params.height) as f64,
    })
}

impl SyntheticScenario {
    /// Population spread over the map, denser in and near built-up cells.
    pub fn population_density(&self, landuse: &Tilemap<LandUseCode>, population: f64) -> Tilemap<f32> {
        let weights = landuse.zip_map(&self.landscape.distance_to_cities, |&code, &d| {
            let base = (-d / 2000.0).exp();
            match code {
                codes::BUILT_UP => base * 20.0 + 1.0,
                codes::WATER | codes::SNOW_AND_ICE => 0.0,
                _ => base,
            }
        });
        let total: f32 = weights.values().sum();
        if total <= 0.0 {
            return Tilemap::new_with(landuse.width, landuse.height, 0.0);
        }
        let scale = population as f32 / total;
        weights.map(|&w| w * scale)
    }

    /// Step rasters for the given land use and population.
    pub fn step_inputs(&self, landuse: &Tilemap<LandUseCode>, population: f64) -> StepInputs {
        StepInputs {
            population_density: self.population_density(landuse, population),
            net_forest: StepInputs::net_forest_from_codes(
                landuse,
                &[codes::DISTURBED_FOREST, codes::UNDISTURBED_FOREST],
            ),
        }
    }
}
