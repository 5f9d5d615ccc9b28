//! Per-realization simulation state.

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use crate::allocation::ExhaustionEvent;
use crate::config::SimulationConfig;
use crate::error::{ensure_shape, Result};
use crate::landscape::{Landscape, StepInputs};
use crate::landuse::LandUseCode;
use crate::tilemap::Tilemap;

use super::demand::Demand;
use super::report::StepReport;
use super::step::simulate_step;

/// Owns everything that carries over between the time steps of one realization.
///
/// Created at the start of a run and dropped at its end; nothing outlives it.
pub struct SimulationContext<'a> {
    config: &'a SimulationConfig,
    landscape: &'a Landscape,
    sample: u32,
    time_step: u32,
    rng: ChaCha8Rng,
    landuse: Tilemap<LandUseCode>,
    history: Vec<StepReport>,
    exhaustion_log: Vec<ExhaustionEvent>,
}

impl<'a> SimulationContext<'a> {
    pub fn new(
        config: &'a SimulationConfig,
        landscape: &'a Landscape,
        initial: Tilemap<LandUseCode>,
        seed: u64,
        sample: u32,
    ) -> Result<Self> {
        landscape.validate()?;
        ensure_shape("landuse", &initial, landscape.width, landscape.height)?;
        Ok(Self {
            config,
            landscape,
            sample,
            time_step: 0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            landuse: initial,
            history: Vec::new(),
            exhaustion_log: Vec::new(),
        })
    }

    /// Advance one time step.
    pub fn step(&mut self, inputs: &StepInputs, demand: &Demand) -> Result<&StepReport> {
        let time_step = self.time_step + 1;
        let report = simulate_step(
            self.config,
            self.landscape,
            inputs,
            demand,
            &mut self.landuse,
            &mut self.rng,
            time_step,
            self.sample,
        )?;

        self.time_step = time_step;
        self.exhaustion_log.extend(report.exhaustion().cloned());
        self.history.push(report);
        Ok(&self.history[self.history.len() - 1])
    }

    /// Run `years` steps, asking `inputs_for` for each year's rasters and demand.
    ///
    /// `on_step` sees the raster after every step, e.g. to accumulate it.
    pub fn run_years<F, G>(&mut self, years: u32, mut inputs_for: F, mut on_step: G) -> Result<()>
    where
        F: FnMut(u32, &Tilemap<LandUseCode>) -> Result<(StepInputs, Demand)>,
        G: FnMut(u32, &Tilemap<LandUseCode>) -> Result<()>,
    {
        for _ in 0..years {
            let (inputs, demand) = inputs_for(self.time_step + 1, &self.landuse)?;
            self.step(&inputs, &demand)?;
            on_step(self.time_step, &self.landuse)?;
        }
        Ok(())
    }

    pub fn landuse(&self) -> &Tilemap<LandUseCode> {
        &self.landuse
    }

    pub fn into_landuse(self) -> Tilemap<LandUseCode> {
        self.landuse
    }

    pub fn time_step(&self) -> u32 {
        self.time_step
    }

    pub fn sample(&self) -> u32 {
        self.sample
    }

    pub fn history(&self) -> &[StepReport] {
        &self.history
    }

    pub fn exhaustion_log(&self) -> &[ExhaustionEvent] {
        &self.exhaustion_log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landuse::codes;
    use crate::model::report::land_use_counts;

    fn setup() -> (SimulationConfig, Landscape, Tilemap<LandUseCode>) {
        let landuse = Tilemap::from_fn(6, 6, |x, _| if x == 0 { codes::BUILT_UP } else { codes::HERBACEOUS });
        (SimulationConfig::default(), Landscape::flat(6, 6), landuse)
    }

    fn step_inputs() -> StepInputs {
        StepInputs {
            population_density: Tilemap::new_with(6, 6, 1.0),
            net_forest: Tilemap::new_with(6, 6, false),
        }
    }

    fn demand(built_up: usize) -> Demand {
        Demand::new()
            .with(codes::BUILT_UP, built_up)
            .with(codes::CROPLAND_ANNUAL, 0)
            .with(codes::PASTURE, 0)
            .with(codes::AGROFORESTRY, 0)
            .with(codes::PLANTATION, 0)
    }

    #[test]
    fn test_run_years_accumulates_history() {
        let (config, landscape, landuse) = setup();
        let mut ctx = SimulationContext::new(&config, &landscape, landuse, 17, 0).unwrap();
        let mut seen = Vec::new();
        ctx.run_years(
            3,
            |year, _| Ok((step_inputs(), demand(6 + 2 * year as usize))),
            |year, lu| {
                seen.push((year, lu.count(|&c| c == codes::BUILT_UP)));
                Ok(())
            },
        )
        .unwrap();

        assert_eq!(ctx.time_step(), 3);
        assert_eq!(ctx.history().len(), 3);
        assert_eq!(seen, vec![(1, 8), (2, 10), (3, 12)]);
        assert_eq!(land_use_counts(ctx.landuse())[&codes::BUILT_UP], 12);
        assert!(ctx.exhaustion_log().is_empty());
    }

    #[test]
    fn test_exhaustion_is_logged_across_steps() {
        let (config, landscape, landuse) = setup();
        let mut ctx = SimulationContext::new(&config, &landscape, landuse, 3, 4).unwrap();
        ctx.step(&step_inputs(), &demand(40)).unwrap();
        ctx.step(&step_inputs(), &demand(40)).unwrap();

        assert_eq!(ctx.landuse().count(|&c| c == codes::BUILT_UP), 36);
        let steps: Vec<_> = ctx.exhaustion_log().iter().map(|e| e.time_step).collect();
        assert!(steps.contains(&1) && steps.contains(&2));
        assert!(ctx.exhaustion_log().iter().all(|e| e.sample == 4));
    }

    #[test]
    fn test_same_seed_same_history() {
        let (config, landscape, landuse) = setup();
        let run = |seed| {
            let mut ctx = SimulationContext::new(&config, &landscape, landuse.clone(), seed, 0).unwrap();
            ctx.run_years(2, |_, _| Ok((step_inputs(), demand(12))), |_, _| Ok(())).unwrap();
            ctx.into_landuse()
        };
        assert_eq!(run(5), run(5));
    }
}
