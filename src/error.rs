//! Error types for the land-use change simulator.
//!
//! Only fatal conditions live here. Pool exhaustion, unmet demand and the
//! like are reported through diagnostics on the allocation outcomes.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum LulccError {
    #[error("raster `{name}` has shape {actual_width}x{actual_height}, expected {width}x{height}")]
    ShapeMismatch {
        name: &'static str,
        width: usize,
        height: usize,
        actual_width: usize,
        actual_height: usize,
    },

    #[error("land-use type {code}: {factors} suitability factors but {weights} weights")]
    WeightsMismatch { code: u8, factors: usize, weights: usize },

    #[error("unknown suitability factor id {0}")]
    UnknownFactor(u8),

    #[error("unknown land-use type {0}")]
    UnknownLandUseType(u8),

    #[error("no demand given for active land-use type {0}")]
    MissingDemand(u8),

    #[error("invalid parameter: {name} = {value} ({reason})")]
    InvalidParameter {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("failed to read config at {path}: {source}")]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("failed to write report: {0}")]
    Report(#[source] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image export failed: {0}")]
    Image(#[from] image::ImageError),
}

impl LulccError {
    pub fn invalid(name: &'static str, value: impl ToString, reason: impl Into<String>) -> Self {
        LulccError::InvalidParameter {
            name,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for simulator operations
pub type Result<T> = std::result::Result<T, LulccError>;

/// Check that a raster has the expected shape.
pub fn ensure_shape<T>(
    name: &'static str,
    raster: &crate::tilemap::Tilemap<T>,
    width: usize,
    height: usize,
) -> Result<()> {
    if raster.width != width || raster.height != height {
        return Err(LulccError::ShapeMismatch {
            name,
            width,
            height,
            actual_width: raster.width,
            actual_height: raster.height,
        });
    }
    Ok(())
}
