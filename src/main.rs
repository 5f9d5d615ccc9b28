use std::fs;
use std::path::PathBuf;
use std::time::Instant;

use clap::Parser;
use rayon::prelude::*;
use tracing_subscriber::EnvFilter;

use lulcc_sim::allocation::ScenarioMode;
use lulcc_sim::config::{load_config_from_env, SimulationConfig};
use lulcc_sim::export::{self, RunReport, YearReport};
use lulcc_sim::landuse::LandUseCode;
use lulcc_sim::model::{land_use_counts, Demand, SimulationContext, StepReport};
use lulcc_sim::mplc::{self, AggregationMode, ProbabilityAccumulator};
use lulcc_sim::seeds::RunSeeds;
use lulcc_sim::suitability::normalize_map;
use lulcc_sim::synthetic::{self, SyntheticParams};
use lulcc_sim::{Result, Tilemap};

#[derive(Parser, Debug)]
#[command(name = "lulcc_sim")]
#[command(about = "Simulate land-use change on a synthetic landscape and aggregate the most probable configuration")]
struct Args {
    /// Width of the landscape in cells
    #[arg(short = 'W', long, default_value = "128")]
    width: usize,

    /// Height of the landscape in cells
    #[arg(short = 'H', long, default_value = "128")]
    height: usize,

    /// Number of simulated years
    #[arg(short, long, default_value = "10")]
    years: u32,

    /// Number of stochastic realizations
    #[arg(short = 'n', long, default_value = "8")]
    samples: u32,

    /// Random seed (uses random seed if not specified)
    #[arg(short, long)]
    seed: Option<u64>,

    /// Configuration JSON (defaults to LULCC_CONFIG_PATH, then the builtin)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Annual population growth rate
    #[arg(short, long, default_value = "0.02")]
    growth: f64,

    /// Ignore restricted areas when allocating
    #[arg(long)]
    landscape_wide: bool,

    /// Correct the aggregated map towards demand
    #[arg(long)]
    anthropogenic: bool,

    /// Output directory for maps and the run report
    #[arg(short, long, default_value = "lulcc_output")]
    output: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    if let Err(err) = run(&args) {
        tracing::error!(target: "lulcc::cli", error = %err, "run.failed");
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run(args: &Args) -> Result<()> {
    let mut config = match &args.config {
        Some(path) => SimulationConfig::from_file(path)?,
        None => load_config_from_env()?.0,
    };
    if args.landscape_wide {
        config.scenario = ScenarioMode::LandscapeWide;
    }
    if args.anthropogenic {
        config.mplc.mode = AggregationMode::MaximumAnthropogenicImpact;
    }
    config.validate()?;

    let seed = args.seed.unwrap_or_else(rand::random);
    let seeds = RunSeeds::from_master(seed);
    println!("Simulating land-use change with seed: {}", seed);
    println!("Map size: {}x{}, {} years, {} samples", args.width, args.height, args.years, args.samples);

    let params = SyntheticParams {
        width: args.width,
        height: args.height,
        ..SyntheticParams::default()
    };
    let scenario = synthetic::generate(&params, &config, &seeds)?;
    let initial = scenario.initial_landuse.clone();

    let cell_area = config.cell_area_m2();
    let demand_model = config
        .demand
        .calibrated(&land_use_counts(&initial), scenario.population, cell_area)?;
    let population = |year: u32| scenario.population * (1.0 + args.growth).powi(year as i32);
    let demands: Vec<Demand> = (1..=args.years)
        .map(|year| demand_model.demand_for(population(year), cell_area))
        .collect();

    fs::create_dir_all(&args.output)?;
    export::export_land_use_map(&initial, &args.output.join("landuse_0000.png"))?;
    export::export_scalar_map(&normalize_map(&scenario.elevation), &args.output.join("elevation.png"))?;

    let start = Instant::now();
    let realizations = (0..args.samples)
        .into_par_iter()
        .map(|sample| -> Result<(Vec<Tilemap<LandUseCode>>, Vec<StepReport>)> {
            let mut ctx = SimulationContext::new(&config, &scenario.landscape, initial.clone(), seeds.sample(sample), sample)?;
            let mut maps = Vec::with_capacity(args.years as usize);
            ctx.run_years(
                args.years,
                |year, landuse| {
                    let inputs = scenario.step_inputs(landuse, population(year));
                    Ok((inputs, demands[year as usize - 1].clone()))
                },
                |_, landuse| {
                    maps.push(landuse.clone());
                    Ok(())
                },
            )?;
            Ok((maps, ctx.history().to_vec()))
        })
        .collect::<Result<Vec<_>>>()?;
    tracing::info!(
        target: "lulcc::cli",
        samples = args.samples,
        elapsed_ms = start.elapsed().as_millis() as u64,
        "realizations.done"
    );

    let mut report = RunReport::new(seed, args.samples, args.width, args.height, config.scenario, config.mplc.mode);
    for year in 1..=args.years {
        let idx = year as usize - 1;
        let mut accumulator = ProbabilityAccumulator::new(args.width, args.height);
        for (maps, _) in &realizations {
            accumulator.add(&maps[idx])?;
        }
        let stack = accumulator.probability_stack()?;
        let mplc_demand = demand_model.mplc_demand(&demands[idx], &config.catalog, year);
        let outcome = mplc::aggregate(
            &stack,
            &config,
            Some(&mplc_demand),
            scenario.landscape.potential_natural_vegetation.as_ref(),
        )?;

        export::export_land_use_map(&outcome.landuse, &args.output.join(format!("mplc_{year:04}.png")))?;
        export::export_probability_classes(
            &outcome.probability,
            &args.output.join(format!("probability_{year:04}.png")),
        )?;

        let steps: Vec<&StepReport> = realizations.iter().map(|(_, history)| &history[idx]).collect();
        let summary = YearReport::summarize(year, population(year), demands[idx].clone(), &steps, &outcome);
        tracing::info!(
            target: "lulcc::cli",
            year,
            exhaustion_events = summary.exhaustion_events,
            shortfalls = summary.shortfalls.len(),
            "year.aggregated"
        );
        report.years.push(summary);
    }

    let report_path = args.output.join("report.json");
    export::write_report(&report, &report_path)?;
    println!("Wrote maps and report to {}", args.output.display());
    Ok(())
}
