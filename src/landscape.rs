//! Raster inputs supplied by the caller.
//!
//! `Landscape` holds everything fixed for a scenario run; `StepInputs`
//! holds the per-year rasters that an external demographic or forest
//! model recomputes.

use crate::error::{ensure_shape, Result};
use crate::landuse::{FactorId, LandUseCode};
use crate::tilemap::Tilemap;

/// Static rasters of a scenario run.
#[derive(Clone, Debug)]
pub struct Landscape {
    pub width: usize,
    pub height: usize,
    /// Percent slope
    pub slope: Tilemap<f32>,
    /// Distance to the nearest street, in metres
    pub distance_to_streets: Tilemap<f32>,
    /// Distance to the nearest freshwater body, in metres
    pub distance_to_freshwater: Tilemap<f32>,
    /// Distance to the nearest city, in metres
    pub distance_to_cities: Tilemap<f32>,
    /// Policy-designated restricted/protected areas
    pub restricted: Tilemap<bool>,
    /// Potential natural vegetation class, used for fallback reclassification
    pub potential_natural_vegetation: Option<Tilemap<u8>>,
}

impl Landscape {
    /// A landscape with flat terrain, no restrictions and every feature at distance zero.
    pub fn flat(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            slope: Tilemap::new_with(width, height, 0.0),
            distance_to_streets: Tilemap::new_with(width, height, 0.0),
            distance_to_freshwater: Tilemap::new_with(width, height, 0.0),
            distance_to_cities: Tilemap::new_with(width, height, 0.0),
            restricted: Tilemap::new_with(width, height, false),
            potential_natural_vegetation: None,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let (w, h) = (self.width, self.height);
        ensure_shape("slope", &self.slope, w, h)?;
        ensure_shape("distance_to_streets", &self.distance_to_streets, w, h)?;
        ensure_shape("distance_to_freshwater", &self.distance_to_freshwater, w, h)?;
        ensure_shape("distance_to_cities", &self.distance_to_cities, w, h)?;
        ensure_shape("restricted", &self.restricted, w, h)?;
        if let Some(pnv) = &self.potential_natural_vegetation {
            ensure_shape("potential_natural_vegetation", pnv, w, h)?;
        }
        Ok(())
    }

    /// The precomputed distance raster of a static factor.
    pub fn static_distance(&self, factor: FactorId) -> Option<&Tilemap<f32>> {
        match factor {
            FactorId::DistanceToStreets => Some(&self.distance_to_streets),
            FactorId::DistanceToFreshwater => Some(&self.distance_to_freshwater),
            FactorId::DistanceToCities => Some(&self.distance_to_cities),
            _ => None,
        }
    }
}

/// Rasters recomputed every time step.
#[derive(Clone, Debug)]
pub struct StepInputs {
    /// Inhabitants per cell
    pub population_density: Tilemap<f32>,
    /// Cells counted against the declared net forest baseline
    pub net_forest: Tilemap<bool>,
}

impl StepInputs {
    pub fn validate(&self, width: usize, height: usize) -> Result<()> {
        ensure_shape("population_density", &self.population_density, width, height)?;
        ensure_shape("net_forest", &self.net_forest, width, height)?;
        Ok(())
    }

    /// Net forest mask taken as every cell of the given forest codes.
    pub fn net_forest_from_codes(landuse: &Tilemap<LandUseCode>, forest_codes: &[LandUseCode]) -> Tilemap<bool> {
        landuse.map(|c| forest_codes.contains(c))
    }
}

/// Derive percent slope from an elevation raster using central differences.
///
/// Edge cells fall back to one-sided differences.
pub fn slope_from_elevation(elevation: &Tilemap<f32>, cell_size: f32) -> Tilemap<f32> {
    let width = elevation.width;
    let height = elevation.height;

    Tilemap::from_fn(width, height, |x, y| {
        let (x0, x1) = (x.saturating_sub(1), (x + 1).min(width - 1));
        let (y0, y1) = (y.saturating_sub(1), (y + 1).min(height - 1));

        let dx_cells = (x1 - x0).max(1) as f32;
        let dy_cells = (y1 - y0).max(1) as f32;

        let gx = (*elevation.get(x1, y) - *elevation.get(x0, y)) / (dx_cells * cell_size);
        let gy = (*elevation.get(x, y1) - *elevation.get(x, y0)) / (dy_cells * cell_size);

        (gx * gx + gy * gy).sqrt() * 100.0
    })
}
