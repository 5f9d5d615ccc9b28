//! Stochastic land-use change simulation library
//!
//! Re-exports modules for use by binaries and tools.

pub mod allocation;
pub mod config;
pub mod error;
pub mod export;
pub mod landscape;
pub mod landuse;
pub mod model;
pub mod mplc;
pub mod seeds;
pub mod suitability;
pub mod synthetic;
pub mod tilemap;

pub use config::SimulationConfig;
pub use error::{LulccError, Result};
pub use tilemap::Tilemap;
