//! Profiling tool for suitability evaluation and allocation

use std::time::Instant;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use lulcc_sim::{
    allocation::{claim_type, CascadingAllocator},
    model::land_use_counts,
    seeds::RunSeeds,
    suitability::SuitabilityEvaluator,
    synthetic::{self, SyntheticParams},
    SimulationConfig, Tilemap,
};

fn main() -> lulcc_sim::Result<()> {
    let width = 512;
    let height = 512;
    let seed = 1337u64;

    println!("=== Performance Profiling ===");
    println!("Map size: {}x{} ({} cells)", width, height, width * height);
    println!();

    let config = SimulationConfig::default();
    let seeds = RunSeeds::from_master(seed);
    let params = SyntheticParams {
        width,
        height,
        city_count: 12,
        ..SyntheticParams::default()
    };

    // Profile landscape generation
    let start = Instant::now();
    let scenario = synthetic::generate(&params, &config, &seeds)?;
    let generation_time = start.elapsed();
    println!("Synthetic landscape: {:?}", generation_time);

    let mut landuse = scenario.initial_landuse.clone();
    let inputs = scenario.step_inputs(&landuse, scenario.population);
    let counts = land_use_counts(&landuse);
    let mut rng = ChaCha8Rng::seed_from_u64(seeds.sample(0));

    let mut evaluator = SuitabilityEvaluator::new(&config, &scenario.landscape, &inputs);
    let allocator = CascadingAllocator::new(&config, &scenario.landscape).at(1, 0);
    let mut claimed = Tilemap::new_with(width, height, false);

    let mut suitability_time = std::time::Duration::ZERO;
    let mut allocation_time = std::time::Duration::ZERO;

    for type_config in &config.catalog.active {
        let current = counts.get(&type_config.code).copied().unwrap_or(0);
        let demand = current + current / 10 + 50;

        let start = Instant::now();
        let suitability = evaluator.evaluate(type_config, &landuse, &mut rng)?;
        let eval = start.elapsed();

        let start = Instant::now();
        let outcome = allocator.allocate(type_config, demand, &suitability, &mut landuse, &mut claimed);
        claim_type(&mut claimed, &landuse, type_config.code);
        let alloc = start.elapsed();

        println!(
            "{:<16} suitability {:?}  allocation {:?}  {} -> {} (unmet {})",
            type_config.name, eval, alloc, outcome.initial_count, outcome.final_count, outcome.unmet
        );
        suitability_time += eval;
        allocation_time += alloc;
    }

    let total = generation_time + suitability_time + allocation_time;
    println!("\n=== Summary ===");
    println!("Generation:  {:>8.2}% ({:?})", 100.0 * generation_time.as_secs_f64() / total.as_secs_f64(), generation_time);
    println!("Suitability: {:>8.2}% ({:?})", 100.0 * suitability_time.as_secs_f64() / total.as_secs_f64(), suitability_time);
    println!("Allocation:  {:>8.2}% ({:?})", 100.0 * allocation_time.as_secs_f64() / total.as_secs_f64(), allocation_time);
    println!("─────────────────────────────────");
    println!("TOTAL:       {:>8}  {:?}", "100%", total);
    Ok(())
}
