//! Cascading demand allocation for one land-use type.

use serde::Serialize;

use crate::config::SimulationConfig;
use crate::landscape::Landscape;
use crate::landuse::{LandUseCode, LandUseTypeConfig};
use crate::tilemap::Tilemap;

use super::pools::{DegreeOfLimitation, MaskInputs};
use super::ranking::{select_highest, select_lowest};

/// A pool held fewer candidate cells than the demand still missing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExhaustionEvent {
    pub type_code: LandUseCode,
    pub pool: DegreeOfLimitation,
    pub time_step: u32,
    pub sample: u32,
    /// Candidate cells the pool offered
    pub available: usize,
    /// Cells still missing when the pool was entered
    pub remaining: usize,
}

/// Cells handed out by one pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct PoolAllocation {
    pub pool: DegreeOfLimitation,
    pub allocated: usize,
}

/// Result of allocating one type in one time step.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct AllocationOutcome {
    pub type_code: LandUseCode,
    pub demand: usize,
    pub initial_count: usize,
    pub final_count: usize,
    pub added: usize,
    pub removed: usize,
    /// Demand left over after every pool was searched
    pub unmet: usize,
    /// Cells above demand that could not be abandoned
    pub surplus: usize,
    /// Cells a shrink left in place because they were claimed earlier in the step
    pub shrink_blocked: usize,
    pub pools: Vec<PoolAllocation>,
    pub exhaustion: Vec<ExhaustionEvent>,
    /// The type shrank but has no abandoned code
    pub shrink_unsupported: bool,
}

impl AllocationOutcome {
    fn new(type_code: LandUseCode, demand: usize, initial_count: usize) -> Self {
        Self {
            type_code,
            demand,
            initial_count,
            final_count: initial_count,
            added: 0,
            removed: 0,
            unmet: 0,
            surplus: 0,
            shrink_blocked: 0,
            pools: Vec::new(),
            exhaustion: Vec::new(),
            shrink_unsupported: false,
        }
    }

    /// Cells of the type after allocation.
    pub fn allocated(&self) -> usize {
        self.final_count
    }

    pub fn is_satisfied(&self) -> bool {
        self.final_count == self.demand
    }
}

/// Claim every cell of `code`, so types allocated later in the step leave them alone.
pub fn claim_type(claimed: &mut Tilemap<bool>, landuse: &Tilemap<LandUseCode>, code: LandUseCode) {
    claimed.union_with(&landuse.map(|&c| c == code));
}

/// Adds or removes cells of one type until its demand is met.
///
/// The land-use raster is the only mutable state; the caller hands it to
/// one type at a time in priority order.
pub struct CascadingAllocator<'a> {
    pools: &'a [DegreeOfLimitation],
    slope: &'a Tilemap<f32>,
    restricted: &'a Tilemap<bool>,
    immutable_types: &'a [LandUseCode],
    sanctioned_codes: &'a [LandUseCode],
    time_step: u32,
    sample: u32,
}

impl<'a> CascadingAllocator<'a> {
    pub fn new(config: &'a SimulationConfig, landscape: &'a Landscape) -> Self {
        Self {
            pools: config.scenario.cascade(),
            slope: &landscape.slope,
            restricted: &landscape.restricted,
            immutable_types: &config.immutable_types,
            sanctioned_codes: &config.sanctioned_codes,
            time_step: 0,
            sample: 0,
        }
    }

    /// Tag diagnostics with a time step and sample number.
    pub fn at(mut self, time_step: u32, sample: u32) -> Self {
        self.time_step = time_step;
        self.sample = sample;
        self
    }

    /// Use a custom pool order instead of the scenario cascade.
    pub fn with_pools(mut self, pools: &'a [DegreeOfLimitation]) -> Self {
        self.pools = pools;
        self
    }

    /// Bring the cell count of `type_config.code` to `demand`.
    ///
    /// `claimed` marks cells already reassigned in this time step; they are
    /// never touched again and every cell changed here is added to it.
    pub fn allocate(
        &self,
        type_config: &LandUseTypeConfig,
        demand: usize,
        suitability: &Tilemap<f32>,
        landuse: &mut Tilemap<LandUseCode>,
        claimed: &mut Tilemap<bool>,
    ) -> AllocationOutcome {
        let code = type_config.code;
        let current = landuse.count(|&c| c == code);
        let mut outcome = AllocationOutcome::new(code, demand, current);

        if demand > current {
            self.add(type_config, suitability, landuse, claimed, &mut outcome);
        } else if demand < current {
            self.remove(type_config, suitability, landuse, claimed, &mut outcome);
        }

        outcome.unmet = demand.saturating_sub(outcome.final_count);
        outcome.surplus = outcome.final_count.saturating_sub(demand);

        if outcome.unmet > 0 {
            tracing::warn!(
                target: "lulcc::allocation",
                code,
                time_step = self.time_step,
                sample = self.sample,
                demand,
                allocated = outcome.final_count,
                unmet = outcome.unmet,
                "allocation.unmet_demand"
            );
        }
        tracing::debug!(
            target: "lulcc::allocation",
            code,
            time_step = self.time_step,
            demand,
            initial = outcome.initial_count,
            final_count = outcome.final_count,
            added = outcome.added,
            removed = outcome.removed,
            "allocation.done"
        );
        outcome
    }

    fn add(
        &self,
        type_config: &LandUseTypeConfig,
        suitability: &Tilemap<f32>,
        landuse: &mut Tilemap<LandUseCode>,
        claimed: &mut Tilemap<bool>,
        outcome: &mut AllocationOutcome,
    ) {
        let code = type_config.code;
        let band = type_config.difficult_terrain_slope;
        // Cells this type already took in earlier pools of this call
        let mut immutable = Tilemap::new_with(landuse.width, landuse.height, false);
        let mut current = outcome.initial_count;

        for &pool in self.pools {
            if current >= outcome.demand {
                break;
            }
            let difference = outcome.demand - current;

            let no_go = pool.no_go_mask(
                &MaskInputs {
                    landuse,
                    slope: self.slope,
                    restricted: self.restricted,
                    claimed,
                    immutable_types: self.immutable_types,
                    sanctioned_codes: self.sanctioned_codes,
                },
                band,
            );
            let candidates = Tilemap::from_fn(landuse.width, landuse.height, |x, y| {
                !*immutable.get(x, y) && *landuse.get(x, y) != code && !*no_go.get(x, y)
            });

            let available = candidates.count_true();
            if available < difference {
                tracing::warn!(
                    target: "lulcc::allocation",
                    code,
                    pool = %pool,
                    time_step = self.time_step,
                    sample = self.sample,
                    available,
                    remaining = difference,
                    "allocation.pool_exhausted"
                );
                outcome.exhaustion.push(ExhaustionEvent {
                    type_code: code,
                    pool,
                    time_step: self.time_step,
                    sample: self.sample,
                    available,
                    remaining: difference,
                });
            }
            if available == 0 {
                continue;
            }

            // The whole batch flips at once
            let selected = select_highest(suitability, &candidates, difference);
            for &idx in &selected {
                landuse.set_index(idx, code);
                immutable.set_index(idx, true);
                claimed.set_index(idx, true);
            }
            outcome.pools.push(PoolAllocation { pool, allocated: selected.len() });

            current = landuse.count(|&c| c == code);
        }

        outcome.final_count = current;
        outcome.added = current - outcome.initial_count;
    }

    fn remove(
        &self,
        type_config: &LandUseTypeConfig,
        suitability: &Tilemap<f32>,
        landuse: &mut Tilemap<LandUseCode>,
        claimed: &mut Tilemap<bool>,
        outcome: &mut AllocationOutcome,
    ) {
        let code = type_config.code;
        let Some(abandoned) = type_config.abandoned_code else {
            tracing::warn!(
                target: "lulcc::allocation",
                code,
                time_step = self.time_step,
                demand = outcome.demand,
                current = outcome.initial_count,
                "allocation.shrink_unsupported"
            );
            outcome.shrink_unsupported = true;
            return;
        };

        let difference = outcome.initial_count - outcome.demand;
        let candidates = landuse.zip_map(claimed, |&c, &taken| c == code && !taken);
        let selected = select_lowest(suitability, &candidates, difference);
        for &idx in &selected {
            landuse.set_index(idx, abandoned);
            claimed.set_index(idx, true);
        }

        outcome.removed = selected.len();
        outcome.final_count = landuse.count(|&c| c == code);

        if selected.len() < difference {
            outcome.shrink_blocked = difference - selected.len();
            tracing::warn!(
                target: "lulcc::allocation",
                code,
                time_step = self.time_step,
                sample = self.sample,
                demand = outcome.demand,
                removed = outcome.removed,
                blocked = outcome.shrink_blocked,
                "allocation.shrink_short"
            );
        }
    }
}
