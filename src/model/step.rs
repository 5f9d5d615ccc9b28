//! One time step of one realization.

use rand_chacha::ChaCha8Rng;

use crate::allocation::{claim_type, CascadingAllocator};
use crate::config::SimulationConfig;
use crate::error::{ensure_shape, Result};
use crate::landscape::{Landscape, StepInputs};
use crate::landuse::LandUseCode;
use crate::suitability::SuitabilityEvaluator;
use crate::tilemap::Tilemap;

use super::demand::Demand;
use super::report::{land_use_counts, StepReport};

/// Allocate every active type, in priority order, against its demand.
///
/// All inputs are validated before the raster is touched; a malformed
/// configuration or demand record leaves `landuse` unchanged. Once a type
/// is allocated all of its cells are claimed, so types later in the
/// priority order never take them.
pub fn simulate_step(
    config: &SimulationConfig,
    landscape: &Landscape,
    inputs: &StepInputs,
    demand: &Demand,
    landuse: &mut Tilemap<LandUseCode>,
    rng: &mut ChaCha8Rng,
    time_step: u32,
    sample: u32,
) -> Result<StepReport> {
    config.validate()?;
    landscape.validate()?;
    ensure_shape("landuse", landuse, landscape.width, landscape.height)?;
    inputs.validate(landscape.width, landscape.height)?;
    demand.validate(&config.catalog)?;

    let mut evaluator = SuitabilityEvaluator::new(config, landscape, inputs);
    let allocator = CascadingAllocator::new(config, landscape).at(time_step, sample);
    let mut claimed = Tilemap::new_with(landscape.width, landscape.height, false);
    let mut outcomes = Vec::with_capacity(config.catalog.active.len());

    for type_config in &config.catalog.active {
        let target = demand.get(type_config.code).unwrap_or_default();
        let suitability = evaluator.evaluate(type_config, landuse, rng)?;
        outcomes.push(allocator.allocate(type_config, target, &suitability, landuse, &mut claimed));
        claim_type(&mut claimed, landuse, type_config.code);
    }

    let report = StepReport {
        time_step,
        sample,
        outcomes,
        land_use_counts: land_use_counts(landuse),
    };
    tracing::info!(
        target: "lulcc::model",
        time_step,
        sample,
        changed = report.outcomes.iter().map(|o| o.added + o.removed).sum::<usize>(),
        unmet = report.total_unmet(),
        exhausted_pools = report.exhaustion().count(),
        shrink_blocked = report.outcomes.iter().map(|o| o.shrink_blocked).sum::<usize>(),
        "step.done"
    );
    Ok(report)
}
