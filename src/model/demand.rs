//! Cell demand per land-use type.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{LulccError, Result};
use crate::landuse::{codes, LandUseCatalog, LandUseCode};
use crate::mplc::{MplcDemand, TypeTarget};

/// Target cell counts for one time step, keyed by land-use code.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Demand {
    cells: BTreeMap<LandUseCode, usize>,
}

impl Demand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, code: LandUseCode, cells: usize) -> Self {
        self.cells.insert(code, cells);
        self
    }

    pub fn set(&mut self, code: LandUseCode, cells: usize) {
        self.cells.insert(code, cells);
    }

    pub fn get(&self, code: LandUseCode) -> Option<usize> {
        self.cells.get(&code).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (LandUseCode, usize)> + '_ {
        self.cells.iter().map(|(&code, &cells)| (code, cells))
    }

    /// Every active type of the catalog must have an entry.
    pub fn validate(&self, catalog: &LandUseCatalog) -> Result<()> {
        match catalog.priority().find(|code| !self.cells.contains_key(code)) {
            Some(code) => Err(LulccError::MissingDemand(code)),
            None => Ok(()),
        }
    }
}

impl FromIterator<(LandUseCode, usize)> for Demand {
    fn from_iter<I: IntoIterator<Item = (LandUseCode, usize)>>(iter: I) -> Self {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

/// Demand derived from population and per-capita land requirements.
///
/// `cells = round(population * per_capita_m2 / cell_area_m2)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandModel {
    /// Square metres of each type required per inhabitant
    pub per_capita_m2: BTreeMap<LandUseCode, f64>,

    /// Abandoned cells kept per active cell, by active type
    pub abandoned_share: BTreeMap<LandUseCode, f64>,

    /// Net forest cells converted per year, if tracked
    pub deforestation_per_year: Option<usize>,
}

impl Default for DemandModel {
    fn default() -> Self {
        Self {
            per_capita_m2: BTreeMap::from([
                (codes::BUILT_UP, 120.0),
                (codes::CROPLAND_ANNUAL, 900.0),
                (codes::PASTURE, 600.0),
                (codes::AGROFORESTRY, 150.0),
                (codes::PLANTATION, 200.0),
            ]),
            abandoned_share: BTreeMap::from([
                (codes::CROPLAND_ANNUAL, 0.05),
                (codes::PASTURE, 0.05),
            ]),
            deforestation_per_year: None,
        }
    }
}

impl DemandModel {
    /// Per-capita areas that reproduce the given cell counts at `population`.
    ///
    /// Types without cells in the base year get a zero coefficient; there is
    /// no observed area to scale from.
    pub fn calibrated(
        &self,
        counts: &BTreeMap<LandUseCode, usize>,
        population: f64,
        cell_area_m2: f64,
    ) -> Result<Self> {
        if !(population > 0.0) {
            return Err(LulccError::invalid("population", population, "must be positive"));
        }
        let mut model = self.clone();
        for (code, per_capita) in model.per_capita_m2.iter_mut() {
            let cells = counts.get(code).copied().unwrap_or(0);
            *per_capita = cells as f64 * cell_area_m2 / population;
        }
        Ok(model)
    }

    pub fn demand_for(&self, population: f64, cell_area_m2: f64) -> Demand {
        self.per_capita_m2
            .iter()
            .map(|(&code, &per_capita)| {
                let cells = (population.max(0.0) * per_capita / cell_area_m2).round();
                (code, cells as usize)
            })
            .collect()
    }

    /// Targets for the most-probable-configuration correction.
    pub fn mplc_demand(&self, demand: &Demand, catalog: &LandUseCatalog, years: u32) -> MplcDemand {
        let targets = catalog
            .active
            .iter()
            .filter_map(|tc| {
                let active = demand.get(tc.code)?;
                let abandoned = tc.abandoned_code.and_then(|_| {
                    let share = self.abandoned_share.get(&tc.code)?;
                    Some((active as f64 * share).round() as usize)
                });
                Some((tc.code, TypeTarget { active, abandoned }))
            })
            .collect();

        MplcDemand {
            targets,
            deforestation: self.deforestation_per_year.map(|d| d * years as usize),
        }
    }

    pub fn validate(&self, catalog: &LandUseCatalog) -> Result<()> {
        for (&code, &per_capita) in &self.per_capita_m2 {
            if catalog.get(code).is_none() {
                return Err(LulccError::UnknownLandUseType(code));
            }
            if !(per_capita >= 0.0) {
                return Err(LulccError::invalid("per_capita_m2", per_capita, "must not be negative"));
            }
        }
        for (&code, &share) in &self.abandoned_share {
            let Some(tc) = catalog.get(code) else {
                return Err(LulccError::UnknownLandUseType(code));
            };
            if tc.abandoned_code.is_none() {
                return Err(LulccError::invalid(
                    "abandoned_share",
                    code,
                    "land-use type has no abandoned code",
                ));
            }
            if !(0.0..=1.0).contains(&share) {
                return Err(LulccError::invalid("abandoned_share", share, "must lie in [0, 1]"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demand_from_population() {
        let model = DemandModel {
            per_capita_m2: BTreeMap::from([(codes::BUILT_UP, 100.0), (codes::PASTURE, 250.0)]),
            ..DemandModel::default()
        };
        let demand = model.demand_for(1000.0, 10_000.0);
        assert_eq!(demand.get(codes::BUILT_UP), Some(10));
        assert_eq!(demand.get(codes::PASTURE), Some(25));
        assert_eq!(demand.get(codes::CROPLAND_ANNUAL), None);
    }

    #[test]
    fn test_missing_active_type_is_fatal() {
        let catalog = LandUseCatalog::default_catalog();
        let demand = Demand::new()
            .with(codes::BUILT_UP, 1)
            .with(codes::CROPLAND_ANNUAL, 1)
            .with(codes::PASTURE, 1)
            .with(codes::AGROFORESTRY, 1);
        assert!(matches!(
            demand.validate(&catalog),
            Err(LulccError::MissingDemand(codes::PLANTATION))
        ));
        demand.with(codes::PLANTATION, 0).validate(&catalog).unwrap();
    }

    #[test]
    fn test_calibration_reproduces_counts() {
        let counts = BTreeMap::from([(codes::BUILT_UP, 40), (codes::CROPLAND_ANNUAL, 200)]);
        let model = DemandModel::default().calibrated(&counts, 5000.0, 10_000.0).unwrap();
        let demand = model.demand_for(5000.0, 10_000.0);
        assert_eq!(demand.get(codes::BUILT_UP), Some(40));
        assert_eq!(demand.get(codes::CROPLAND_ANNUAL), Some(200));

        // Growth scales demand
        let grown = model.demand_for(5500.0, 10_000.0);
        assert_eq!(grown.get(codes::BUILT_UP), Some(44));
    }

    #[test]
    fn test_calibration_zeroes_types_absent_from_base_map() {
        let counts = BTreeMap::from([(codes::BUILT_UP, 40), (codes::CROPLAND_ANNUAL, 200)]);
        let model = DemandModel::default().calibrated(&counts, 5000.0, 10_000.0).unwrap();
        assert_eq!(model.per_capita_m2[&codes::PLANTATION], 0.0);
        assert_eq!(model.per_capita_m2[&codes::AGROFORESTRY], 0.0);

        let demand = model.demand_for(50_000.0, 10_000.0);
        assert_eq!(demand.get(codes::PLANTATION), Some(0));
        assert_eq!(demand.get(codes::AGROFORESTRY), Some(0));
        assert_eq!(demand.get(codes::BUILT_UP), Some(400));
    }

    #[test]
    fn test_mplc_targets() {
        let catalog = LandUseCatalog::default_catalog();
        let model = DemandModel {
            deforestation_per_year: Some(3),
            ..DemandModel::default()
        };
        let demand = Demand::new().with(codes::BUILT_UP, 10).with(codes::CROPLAND_ANNUAL, 100);
        let targets = model.mplc_demand(&demand, &catalog, 2);

        assert_eq!(targets.targets[&codes::BUILT_UP], TypeTarget { active: 10, abandoned: None });
        assert_eq!(targets.targets[&codes::CROPLAND_ANNUAL], TypeTarget { active: 100, abandoned: Some(5) });
        assert_eq!(targets.deforestation, Some(6));
        assert!(!targets.targets.contains_key(&codes::PASTURE));
    }

    #[test]
    fn test_validate_rejects_share_without_abandoned_code() {
        let catalog = LandUseCatalog::default_catalog();
        let mut model = DemandModel::default();
        model.validate(&catalog).unwrap();
        model.abandoned_share.insert(codes::BUILT_UP, 0.1);
        assert!(model.validate(&catalog).is_err());
    }
}
