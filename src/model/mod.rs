//! Year-by-year simulation of one realization.

pub mod context;
pub mod demand;
pub mod report;
pub mod step;

pub use context::SimulationContext;
pub use demand::{Demand, DemandModel};
pub use report::{land_use_counts, StepReport};
pub use step::simulate_step;
