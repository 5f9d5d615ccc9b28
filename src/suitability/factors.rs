//! Individual suitability factors.
//!
//! Every factor returns a raster in `[0, 1]`; weighting happens in the
//! evaluator.

use crate::landuse::{FactorParams, LandUseCode, LandUseTypeConfig, RelationType};
use crate::tilemap::Tilemap;

use super::distance::spread_distance;
use super::normalize::{normalize_map, normalize_masked};

/// Share of same or related types in the `(2k+1) x (2k+1)` window around each cell.
///
/// The center cell is not counted. Windows are clipped at the map edge but
/// the divisor stays the full window size minus one.
pub fn neighbor_suitability(
    landuse: &Tilemap<LandUseCode>,
    config: &LandUseTypeConfig,
    radius: usize,
) -> Tilemap<f32> {
    let width = landuse.width;
    let height = landuse.height;
    let related = landuse.map(|&c| config.is_related(c));

    // Summed-area table with a zero border row and column
    let stride = width + 1;
    let mut sat = vec![0u32; stride * (height + 1)];
    for y in 0..height {
        let mut row_sum = 0u32;
        for x in 0..width {
            row_sum += *related.get(x, y) as u32;
            sat[(y + 1) * stride + (x + 1)] = sat[y * stride + (x + 1)] + row_sum;
        }
    }

    let side = 2 * radius + 1;
    let divisor = (side * side - 1).max(1) as f32;

    Tilemap::from_fn(width, height, |x, y| {
        let x0 = x.saturating_sub(radius);
        let y0 = y.saturating_sub(radius);
        let x1 = (x + radius + 1).min(width);
        let y1 = (y + radius + 1).min(height);

        let total = sat[y1 * stride + x1] + sat[y0 * stride + x0]
            - sat[y0 * stride + x1]
            - sat[y1 * stride + x0];
        let count = total - *related.get(x, y) as u32;
        count as f32 / divisor
    })
}

/// Turn a distance raster into suitability.
///
/// Cells beyond `max_distance` (or unreachable) get 0. Inside the cutoff
/// the configured relation is applied and the result is normalized over
/// the inside cells only:
/// - linear: `direction * d`
/// - exponential: `exp(direction * normalize(d))`
/// - inverse: `-1 / (normalize(direction * d) + 0.1)`
pub fn distance_suitability(distance: &Tilemap<f32>, params: &FactorParams) -> Tilemap<f32> {
    let within = distance.map(|&d| {
        d.is_finite() && params.max_distance.map_or(true, |max| d <= max)
    });
    let direction = params.direction;

    match params.relation {
        RelationType::Linear => {
            normalize_masked(&distance.map(|&d| direction * d), &within)
        }
        RelationType::Exponential => {
            let normalized = normalize_masked(distance, &within);
            normalize_masked(&normalized.map(|&v| (direction * v).exp()), &within)
        }
        RelationType::InverselyProportional => {
            let normalized = normalize_masked(&distance.map(|&d| direction * d), &within);
            normalize_masked(&normalized.map(|&v| -1.0 / (v + 0.1)), &within)
        }
    }
}

/// Distance to the nearest settlement cell, as suitability.
pub fn settlement_suitability(
    landuse: &Tilemap<LandUseCode>,
    settlement_types: &[LandUseCode],
    cell_size: f32,
    params: &FactorParams,
) -> Tilemap<f32> {
    let sources = landuse.map(|c| settlement_types.contains(c));
    let distance = spread_distance(&sources, cell_size, params.friction);
    distance_suitability(&distance, params)
}

/// `direction * population_density`, normalized.
pub fn population_suitability(population: &Tilemap<f32>, params: &FactorParams) -> Tilemap<f32> {
    normalize_map(&population.map(|&p| params.direction * p))
}

/// Proximity to the net forest edge.
///
/// Distance is measured to the nearest cell that is outside net forest and
/// not of the evaluated type, then transformed with `-1 / d`. Source cells
/// (distance 0) are floored at half a cell.
pub fn net_forest_edge_suitability(
    landuse: &Tilemap<LandUseCode>,
    net_forest: &Tilemap<bool>,
    code: LandUseCode,
    cell_size: f32,
    params: &FactorParams,
) -> Tilemap<f32> {
    let sources = landuse.zip_map(net_forest, |&c, &forest| c != code && !forest);
    if sources.count_true() == 0 {
        return Tilemap::new_with(landuse.width, landuse.height, 0.0);
    }

    let floor = cell_size * 0.5;
    let distance = spread_distance(&sources, cell_size, params.friction);
    normalize_map(&distance.map(|&d| -1.0 / d.max(floor)))
}

/// Direct lookup of "how suitable is a cell of type X to become this type".
///
/// Codes missing from the table score 0.
pub fn current_land_use_suitability(
    landuse: &Tilemap<LandUseCode>,
    params: &FactorParams,
) -> Tilemap<f32> {
    normalize_map(&landuse.map(|c| params.lookup.get(c).copied().unwrap_or(0.0)))
}
