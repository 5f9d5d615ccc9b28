//! Turning repeated realizations into probability rasters.

use std::collections::BTreeMap;

use crate::error::{ensure_shape, Result};
use crate::landuse::LandUseCode;
use crate::tilemap::Tilemap;

use super::aggregate::ProbabilityStack;

/// Counts how often each cell held each code across realizations.
#[derive(Clone, Debug, PartialEq)]
pub struct ProbabilityAccumulator {
    pub width: usize,
    pub height: usize,
    samples: u32,
    counts: BTreeMap<LandUseCode, Tilemap<u32>>,
}

impl ProbabilityAccumulator {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            samples: 0,
            counts: BTreeMap::new(),
        }
    }

    pub fn samples(&self) -> u32 {
        self.samples
    }

    /// Record one realization's land-use raster.
    pub fn add(&mut self, landuse: &Tilemap<LandUseCode>) -> Result<()> {
        ensure_shape("landuse", landuse, self.width, self.height)?;
        let (width, height) = (self.width, self.height);
        for (idx, &code) in landuse.values().enumerate() {
            let counts = self
                .counts
                .entry(code)
                .or_insert_with(|| Tilemap::new_with(width, height, 0));
            let seen = *counts.get_index(idx);
            counts.set_index(idx, seen + 1);
        }
        self.samples += 1;
        Ok(())
    }

    /// Fold another accumulator of the same shape into this one.
    pub fn merge(&mut self, other: &ProbabilityAccumulator) -> Result<()> {
        for (&code, other_counts) in &other.counts {
            ensure_shape("accumulator", other_counts, self.width, self.height)?;
            let counts = self
                .counts
                .entry(code)
                .or_insert_with(|| Tilemap::new_with(other_counts.width, other_counts.height, 0));
            *counts = counts.zip_map(other_counts, |a, b| a + b);
        }
        self.samples += other.samples;
        Ok(())
    }

    /// Share of realizations per code and cell.
    pub fn probability_stack(&self) -> Result<ProbabilityStack> {
        let mut stack = ProbabilityStack::new(self.width, self.height);
        if self.samples == 0 {
            return Ok(stack);
        }
        let samples = self.samples as f32;
        for (&code, counts) in &self.counts {
            stack.insert(code, counts.map(|&n| (n as f32 / samples).min(1.0)))?;
        }
        Ok(stack)
    }
}
