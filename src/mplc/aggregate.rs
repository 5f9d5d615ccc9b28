//! Per-cell argmax over probability rasters.

use std::collections::BTreeMap;

use crate::error::{ensure_shape, LulccError, Result};
use crate::landuse::LandUseCode;
use crate::tilemap::Tilemap;

/// Probability rasters of one time step, one per land-use code.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbabilityStack {
    pub width: usize,
    pub height: usize,
    layers: BTreeMap<LandUseCode, Tilemap<f32>>,
}

impl ProbabilityStack {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            layers: BTreeMap::new(),
        }
    }

    /// Add or replace the layer of `code`. Values must lie in `[0, 1]`.
    pub fn insert(&mut self, code: LandUseCode, probability: Tilemap<f32>) -> Result<()> {
        ensure_shape("probability", &probability, self.width, self.height)?;
        if let Some(&bad) = probability.values().find(|p| !(0.0..=1.0).contains(*p)) {
            return Err(LulccError::invalid("probability", bad, "must lie in [0, 1]"));
        }
        self.layers.insert(code, probability);
        Ok(())
    }

    pub fn get(&self, code: LandUseCode) -> Option<&Tilemap<f32>> {
        self.layers.get(&code)
    }

    /// Layers in ascending code order.
    pub fn iter(&self) -> impl Iterator<Item = (LandUseCode, &Tilemap<f32>)> {
        self.layers.iter().map(|(&code, map)| (code, map))
    }

    pub fn codes(&self) -> impl Iterator<Item = LandUseCode> + '_ {
        self.layers.keys().copied()
    }

    /// Probability of `code`, or an all-zero raster when the layer is absent.
    pub fn layer_or_zero(&self, code: LandUseCode) -> Tilemap<f32> {
        self.layers
            .get(&code)
            .cloned()
            .unwrap_or_else(|| Tilemap::new_with(self.width, self.height, 0.0))
    }
}

/// Winning code and its probability per cell.
#[derive(Clone, Debug, PartialEq)]
pub struct MostProbable {
    pub landuse: Tilemap<LandUseCode>,
    pub probability: Tilemap<f32>,
}

/// Pick the most probable code per cell.
///
/// Layers are visited in ascending code order and only a strictly greater
/// probability replaces the current winner, so ties go to the lowest code.
/// Cells where every layer is zero get `background`.
pub fn most_probable(stack: &ProbabilityStack, background: LandUseCode) -> MostProbable {
    let mut landuse = Tilemap::new_with(stack.width, stack.height, background);
    let mut probability = Tilemap::new_with(stack.width, stack.height, 0.0f32);

    for (code, layer) in stack.iter() {
        for (idx, &p) in layer.values().enumerate() {
            if p > *probability.get_index(idx) {
                probability.set_index(idx, p);
                landuse.set_index(idx, code);
            }
        }
    }

    MostProbable { landuse, probability }
}
