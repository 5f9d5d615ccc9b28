//! Per-step results surfaced to callers.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::allocation::{AllocationOutcome, ExhaustionEvent};
use crate::landuse::LandUseCode;
use crate::tilemap::Tilemap;

/// Everything one time step produced besides the raster itself.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StepReport {
    pub time_step: u32,
    pub sample: u32,
    /// One entry per active type, in priority order
    pub outcomes: Vec<AllocationOutcome>,
    /// Cell count of every code on the raster after the step
    pub land_use_counts: BTreeMap<LandUseCode, usize>,
}

impl StepReport {
    pub fn outcome(&self, code: LandUseCode) -> Option<&AllocationOutcome> {
        self.outcomes.iter().find(|o| o.type_code == code)
    }

    pub fn allocated(&self, code: LandUseCode) -> usize {
        self.outcome(code).map_or(0, |o| o.allocated())
    }

    pub fn unmet(&self, code: LandUseCode) -> usize {
        self.outcome(code).map_or(0, |o| o.unmet)
    }

    pub fn total_unmet(&self) -> usize {
        self.outcomes.iter().map(|o| o.unmet).sum()
    }

    pub fn exhaustion(&self) -> impl Iterator<Item = &ExhaustionEvent> {
        self.outcomes.iter().flat_map(|o| o.exhaustion.iter())
    }
}

/// Cell count per code.
pub fn land_use_counts(landuse: &Tilemap<LandUseCode>) -> BTreeMap<LandUseCode, usize> {
    let mut counts = BTreeMap::new();
    for &code in landuse.values() {
        *counts.entry(code).or_insert(0) += 1;
    }
    counts
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_land_use_counts() {
        let landuse = Tilemap::from_vec(4, 1, vec![2, 6, 2, 13]).unwrap();
        let counts = land_use_counts(&landuse);
        assert_eq!(counts.get(&2), Some(&2));
        assert_eq!(counts.get(&6), Some(&1));
        assert_eq!(counts.get(&1), None);
    }
}
