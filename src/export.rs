//! PNG maps and the JSON run report.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::Local;
use image::{ImageBuffer, Rgb, RgbImage};
use serde::Serialize;

use crate::allocation::ScenarioMode;
use crate::error::{LulccError, Result};
use crate::landuse::{codes, LandUseCode};
use crate::model::{Demand, StepReport};
use crate::mplc::{classify_map, AggregationMode, MplcOutcome, MplcShortfall, ProbabilityClass};
use crate::tilemap::Tilemap;

/// Display color of a land-use code.
pub fn land_use_color(code: LandUseCode) -> [u8; 3] {
    match code {
        codes::BUILT_UP => [200, 30, 30],
        codes::CROPLAND_ANNUAL => [240, 210, 60],
        codes::PASTURE => [180, 220, 100],
        codes::AGROFORESTRY => [150, 120, 40],
        codes::PLANTATION => [90, 140, 60],
        codes::HERBACEOUS => [200, 230, 160],
        codes::SHRUBS => [130, 170, 110],
        codes::DISTURBED_FOREST => [60, 130, 60],
        codes::UNDISTURBED_FOREST => [20, 80, 30],
        codes::SPARSE_VEGETATION => [215, 200, 170],
        codes::BARE_SOIL => [170, 140, 110],
        codes::SNOW_AND_ICE => [245, 245, 250],
        codes::WATER => [40, 90, 200],
        codes::CROPLAND_ABANDONED => [240, 160, 120],
        codes::PASTURE_ABANDONED => [230, 180, 170],
        codes::AGROFORESTRY_ABANDONED => [190, 140, 120],
        codes::DEFORESTED => [120, 60, 20],
        codes::PLANTATION_HARVESTED => [160, 190, 120],
        _ => [0, 0, 0],
    }
}

/// Display color of a probability class, light to dark.
pub fn probability_class_color(class: ProbabilityClass) -> [u8; 3] {
    match class {
        ProbabilityClass::Never => [255, 255, 255],
        ProbabilityClass::VeryLow => [255, 237, 160],
        ProbabilityClass::Low => [254, 178, 76],
        ProbabilityClass::Medium => [253, 141, 60],
        ProbabilityClass::High => [240, 59, 32],
        ProbabilityClass::VeryHigh => [189, 0, 38],
        ProbabilityClass::Certain => [100, 0, 30],
    }
}

fn render<T: Clone>(map: &Tilemap<T>, color: impl Fn(&T) -> [u8; 3]) -> RgbImage {
    let mut img: RgbImage = ImageBuffer::new(map.width as u32, map.height as u32);
    for (x, y, value) in map.iter() {
        img.put_pixel(x as u32, y as u32, Rgb(color(value)));
    }
    img
}

pub fn export_land_use_map(landuse: &Tilemap<LandUseCode>, path: &Path) -> Result<()> {
    render(landuse, |&code| land_use_color(code)).save(path)?;
    Ok(())
}

/// Winning probability of each cell, bucketed into the seven classes.
pub fn export_probability_classes(probability: &Tilemap<f32>, path: &Path) -> Result<()> {
    render(&classify_map(probability), |&class| probability_class_color(class)).save(path)?;
    Ok(())
}

/// A `[0, 1]` raster (suitability, normalized elevation) on the spectral colormap.
pub fn export_scalar_map(values: &Tilemap<f32>, path: &Path) -> Result<()> {
    render(values, |&v| spectral_colormap(v.clamp(0.0, 1.0))).save(path)?;
    Ok(())
}

/// Spectral colormap: dark blue -> green -> yellow -> red
fn spectral_colormap(t: f32) -> [u8; 3] {
    let colors: [[f32; 3]; 6] = [
        [0.37, 0.31, 0.64],
        [0.20, 0.53, 0.74],
        [0.67, 0.87, 0.64],
        [1.00, 1.00, 0.75],
        [0.96, 0.43, 0.26],
        [0.62, 0.00, 0.26],
    ];

    let t_scaled = t * 5.0;
    let idx = (t_scaled as usize).min(4);
    let frac = t_scaled - idx as f32;

    let c1 = colors[idx];
    let c2 = colors[idx + 1];

    [
        ((c1[0] + (c2[0] - c1[0]) * frac) * 255.0) as u8,
        ((c1[1] + (c2[1] - c1[1]) * frac) * 255.0) as u8,
        ((c1[2] + (c2[2] - c1[2]) * frac) * 255.0) as u8,
    ]
}

/// Summary of one simulated year across all realizations.
#[derive(Clone, Debug, Serialize)]
pub struct YearReport {
    pub year: u32,
    pub population: f64,
    pub demand: Demand,
    /// Cell counts of the most probable configuration
    pub mplc_counts: BTreeMap<LandUseCode, usize>,
    pub mean_allocated: BTreeMap<LandUseCode, f64>,
    pub mean_unmet: BTreeMap<LandUseCode, f64>,
    pub exhaustion_events: usize,
    pub shortfalls: Vec<MplcShortfall>,
}

impl YearReport {
    pub fn summarize(
        year: u32,
        population: f64,
        demand: Demand,
        steps: &[&StepReport],
        mplc: &MplcOutcome,
    ) -> Self {
        let samples = steps.len().max(1) as f64;
        let mut mean_allocated = BTreeMap::new();
        let mut mean_unmet = BTreeMap::new();
        for outcome in steps.iter().flat_map(|s| s.outcomes.iter()) {
            *mean_allocated.entry(outcome.type_code).or_insert(0.0) += outcome.allocated() as f64 / samples;
            *mean_unmet.entry(outcome.type_code).or_insert(0.0) += outcome.unmet as f64 / samples;
        }

        Self {
            year,
            population,
            demand,
            mplc_counts: crate::model::land_use_counts(&mplc.landuse),
            mean_allocated,
            mean_unmet,
            exhaustion_events: steps.iter().map(|s| s.exhaustion().count()).sum(),
            shortfalls: mplc.shortfalls.clone(),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct RunReport {
    pub generated: String,
    pub seed: u64,
    pub samples: u32,
    pub width: usize,
    pub height: usize,
    pub scenario: ScenarioMode,
    pub mplc_mode: AggregationMode,
    pub years: Vec<YearReport>,
}

impl RunReport {
    pub fn new(seed: u64, samples: u32, width: usize, height: usize, scenario: ScenarioMode, mplc_mode: AggregationMode) -> Self {
        Self {
            generated: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            seed,
            samples,
            width,
            height,
            scenario,
            mplc_mode,
            years: Vec::new(),
        }
    }
}

pub fn write_report(report: &RunReport, path: &Path) -> Result<()> {
    write_report_to(report, BufWriter::new(File::create(path)?))
}

pub fn write_report_to<W: Write>(report: &RunReport, mut writer: W) -> Result<()> {
    serde_json::to_writer_pretty(&mut writer, report).map_err(LulccError::Report)?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landuse::LandUseCatalog;
    use std::collections::BTreeSet;

    #[test]
    fn test_catalog_colors_are_distinct() {
        let catalog = LandUseCatalog::default_catalog();
        let colors: BTreeSet<[u8; 3]> = catalog.names.keys().map(|&c| land_use_color(c)).collect();
        assert_eq!(colors.len(), catalog.names.len());
    }

    #[test]
    fn test_land_use_png_round_trip_size() {
        let dir = std::env::temp_dir().join(format!("lulcc_export_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("landuse.png");

        let landuse = Tilemap::from_fn(7, 3, |x, _| if x < 3 { codes::WATER } else { codes::BUILT_UP });
        export_land_use_map(&landuse, &path).unwrap();

        let img = image::open(&path).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), (7, 3));
        assert_eq!(img.get_pixel(0, 0).0, land_use_color(codes::WATER));
        assert_eq!(img.get_pixel(6, 2).0, land_use_color(codes::BUILT_UP));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_report_is_valid_json() {
        let dir = std::env::temp_dir().join(format!("lulcc_report_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("report.json");

        let mut report = RunReport::new(1, 2, 3, 4, ScenarioMode::RestrictedAreas, AggregationMode::Base);
        let mplc = MplcOutcome {
            landuse: Tilemap::new_with(3, 4, codes::HERBACEOUS),
            probability: Tilemap::new_with(3, 4, 1.0),
            shortfalls: vec![],
        };
        report.years.push(YearReport::summarize(1, 100.0, Demand::new().with(codes::BUILT_UP, 2), &[], &mplc));
        write_report(&report, &path).unwrap();

        let value: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["samples"], 2);
        assert_eq!(value["scenario"], "restricted_areas");
        assert_eq!(value["years"][0]["mplc_counts"]["6"], 12);
        std::fs::remove_dir_all(&dir).ok();
    }

    struct FailingWriter;

    impl Write for FailingWriter {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_report_write_failure_is_not_a_config_error() {
        let report = RunReport::new(1, 1, 2, 2, ScenarioMode::RestrictedAreas, AggregationMode::Base);
        let err = write_report_to(&report, FailingWriter).unwrap_err();
        assert!(matches!(err, LulccError::Report(_)), "{err:?}");
        assert!(err.to_string().starts_with("failed to write report"));
    }
}
