//! Demand-driven correction of the argmax configuration.
//!
//! Corrections run one target at a time. Each promotes the most probable
//! free cells or demotes the least probable cells of the target, then
//! claims every cell of the target so later corrections cannot undo it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::allocation::{select_highest, select_lowest};
use crate::landuse::LandUseCode;
use crate::tilemap::Tilemap;

use super::aggregate::ProbabilityStack;
use super::MplcConfig;

/// Cell targets of one active type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeTarget {
    pub active: usize,
    /// Target of the type's abandoned sub-type, if it is reconciled
    pub abandoned: Option<usize>,
}

/// Targets for the maximum anthropogenic impact correction.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MplcDemand {
    pub targets: BTreeMap<LandUseCode, TypeTarget>,
    /// Target of the deforestation pseudo-type
    pub deforestation: Option<usize>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CorrectionKind {
    Active,
    Abandoned,
    Deforestation,
}

/// A correction that could not reach its target.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MplcShortfall {
    pub code: LandUseCode,
    pub kind: CorrectionKind,
    pub target: usize,
    pub achieved: usize,
}

/// Shared state of one correction pass.
pub struct Corrector<'a> {
    stack: &'a ProbabilityStack,
    config: &'a MplcConfig,
    immutable_types: &'a [LandUseCode],
    pnv: Option<&'a Tilemap<u8>>,
    claimed: Tilemap<bool>,
}

impl<'a> Corrector<'a> {
    pub fn new(
        stack: &'a ProbabilityStack,
        config: &'a MplcConfig,
        immutable_types: &'a [LandUseCode],
        pnv: Option<&'a Tilemap<u8>>,
    ) -> Self {
        Self {
            stack,
            config,
            immutable_types,
            pnv,
            claimed: Tilemap::new_with(stack.width, stack.height, false),
        }
    }

    /// Code a demoted cell falls back to.
    fn fallback(&self, idx: usize) -> LandUseCode {
        self.pnv
            .and_then(|pnv| self.config.fallback_by_pnv.get(pnv.get_index(idx)))
            .copied()
            .unwrap_or(self.config.default_fallback)
    }

    /// Bring the count of `code` on `landuse` to `target`.
    pub fn correct(
        &mut self,
        landuse: &mut Tilemap<LandUseCode>,
        code: LandUseCode,
        target: usize,
        kind: CorrectionKind,
    ) -> Option<MplcShortfall> {
        let probability = self.stack.layer_or_zero(code);
        let current = landuse.count(|&c| c == code);

        if current < target {
            let candidates = Tilemap::from_fn(landuse.width, landuse.height, |x, y| {
                let c = *landuse.get(x, y);
                !*self.claimed.get(x, y)
                    && c != code
                    && !self.immutable_types.contains(&c)
                    && *probability.get(x, y) > 0.0
            });
            for idx in select_highest(&probability, &candidates, target - current) {
                landuse.set_index(idx, code);
            }
        } else if current > target {
            let candidates = landuse.zip_map(&self.claimed, |&c, &taken| c == code && !taken);
            for idx in select_lowest(&probability, &candidates, current - target) {
                let fallback = self.fallback(idx);
                landuse.set_index(idx, fallback);
            }
        }

        self.claimed.union_with(&landuse.map(|&c| c == code));

        let achieved = landuse.count(|&c| c == code);
        if achieved == target {
            return None;
        }
        tracing::warn!(
            target: "lulcc::mplc",
            code,
            ?kind,
            wanted = target,
            achieved,
            "mplc.correction_short"
        );
        Some(MplcShortfall { code, kind, target, achieved })
    }

    /// Run every correction in order: per type its active then abandoned
    /// target, deforestation last.
    pub fn apply(
        &mut self,
        landuse: &mut Tilemap<LandUseCode>,
        priority: &[(LandUseCode, Option<LandUseCode>)],
        demand: &MplcDemand,
    ) -> Vec<MplcShortfall> {
        let mut shortfalls = Vec::new();
        for &(code, abandoned_code) in priority {
            let Some(target) = demand.targets.get(&code) else {
                continue;
            };
            shortfalls.extend(self.correct(landuse, code, target.active, CorrectionKind::Active));
            if let (Some(abandoned), Some(abandoned_target)) = (abandoned_code, target.abandoned) {
                shortfalls.extend(self.correct(
                    landuse,
                    abandoned,
                    abandoned_target,
                    CorrectionKind::Abandoned,
                ));
            }
        }
        if let Some(deforestation) = demand.deforestation {
            let code = self.config.deforestation_code;
            shortfalls.extend(self.correct(landuse, code, deforestation, CorrectionKind::Deforestation));
        }
        shortfalls
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::landuse::codes;

    fn strip(values: &[f32]) -> Tilemap<f32> {
        Tilemap::from_vec(values.len(), 1, values.to_vec()).unwrap()
    }

    fn stack(layers: &[(LandUseCode, &[f32])]) -> ProbabilityStack {
        let width = layers[0].1.len();
        let mut stack = ProbabilityStack::new(width, 1);
        for (code, values) in layers {
            stack.insert(*code, strip(values)).unwrap();
        }
        stack
    }

    #[test]
    fn test_promotes_most_probable_free_cells() {
        let stack = stack(&[(codes::CROPLAND_ANNUAL, &[0.9, 0.4, 0.6, 0.0, 0.3])]);
        let config = MplcConfig::default();
        let mut corrector = Corrector::new(&stack, &config, &[codes::WATER], None);
        let mut landuse = Tilemap::from_vec(
            5,
            1,
            vec![codes::CROPLAND_ANNUAL, codes::HERBACEOUS, codes::HERBACEOUS, codes::HERBACEOUS, codes::WATER],
        )
        .unwrap();

        let shortfall = corrector.correct(&mut landuse, codes::CROPLAND_ANNUAL, 3, CorrectionKind::Active);
        assert!(shortfall.is_none());
        assert_eq!(
            landuse.as_slice(),
            &[codes::CROPLAND_ANNUAL, codes::CROPLAND_ANNUAL, codes::CROPLAND_ANNUAL, codes::HERBACEOUS, codes::WATER]
        );
    }

    #[test]
    fn test_promotion_shortfall_skips_zero_probability_and_immutable() {
        let stack = stack(&[(codes::PASTURE, &[0.5, 0.0, 0.8])]);
        let config = MplcConfig::default();
        let mut corrector = Corrector::new(&stack, &config, &[codes::WATER], None);
        let mut landuse = Tilemap::from_vec(3, 1, vec![codes::HERBACEOUS, codes::HERBACEOUS, codes::WATER]).unwrap();

        let shortfall = corrector
            .correct(&mut landuse, codes::PASTURE, 3, CorrectionKind::Active)
            .unwrap();
        assert_eq!(shortfall.achieved, 1);
        assert_eq!(landuse.as_slice(), &[codes::PASTURE, codes::HERBACEOUS, codes::WATER]);
    }

    #[test]
    fn test_demotion_uses_pnv_fallback() {
        let stack = stack(&[(codes::CROPLAND_ANNUAL, &[0.9, 0.2, 0.1, 0.7])]);
        let config = MplcConfig::default();
        let pnv = Tilemap::from_vec(4, 1, vec![1u8, 1, 2, 1]).unwrap();
        let mut corrector = Corrector::new(&stack, &config, &[], Some(&pnv));
        let mut landuse = Tilemap::new_with(4, 1, codes::CROPLAND_ANNUAL);

        corrector.correct(&mut landuse, codes::CROPLAND_ANNUAL, 2, CorrectionKind::Active);
        assert_eq!(
            landuse.as_slice(),
            &[
                codes::CROPLAND_ANNUAL,
                config.fallback_by_pnv[&1],
                config.fallback_by_pnv[&2],
                codes::CROPLAND_ANNUAL,
            ]
        );
    }

    #[test]
    fn test_later_corrections_cannot_take_claimed_cells() {
        // Cell 1 is the best cell for both types; cropland comes first and keeps it
        let stack = stack(&[
            (codes::CROPLAND_ANNUAL, &[0.1, 0.9, 0.2]),
            (codes::PASTURE, &[0.3, 0.95, 0.6]),
        ]);
        let config = MplcConfig::default();
        let mut corrector = Corrector::new(&stack, &config, &[], None);
        let mut landuse = Tilemap::new_with(3, 1, codes::HERBACEOUS);

        let demand = MplcDemand {
            targets: BTreeMap::from([
                (codes::CROPLAND_ANNUAL, TypeTarget { active: 1, abandoned: None }),
                (codes::PASTURE, TypeTarget { active: 1, abandoned: None }),
            ]),
            deforestation: None,
        };
        let priority = [
            (codes::CROPLAND_ANNUAL, Some(codes::CROPLAND_ABANDONED)),
            (codes::PASTURE, Some(codes::PASTURE_ABANDONED)),
        ];
        let shortfalls = corrector.apply(&mut landuse, &priority, &demand);

        assert!(shortfalls.is_empty());
        assert_eq!(landuse.as_slice(), &[codes::HERBACEOUS, codes::CROPLAND_ANNUAL, codes::PASTURE]);
    }

    #[test]
    fn test_abandoned_and_deforestation_reported() {
        let stack = stack(&[
            (codes::CROPLAND_ANNUAL, &[0.8, 0.0, 0.0]),
            (codes::CROPLAND_ABANDONED, &[0.0, 0.4, 0.0]),
        ]);
        let config = MplcConfig::default();
        let mut corrector = Corrector::new(&stack, &config, &[], None);
        let mut landuse = Tilemap::new_with(3, 1, codes::HERBACEOUS);

        let demand = MplcDemand {
            targets: BTreeMap::from([(codes::CROPLAND_ANNUAL, TypeTarget { active: 1, abandoned: Some(2) })]),
            deforestation: Some(1),
        };
        let shortfalls = corrector.apply(
            &mut landuse,
            &[(codes::CROPLAND_ANNUAL, Some(codes::CROPLAND_ABANDONED))],
            &demand,
        );

        assert_eq!(landuse.as_slice(), &[codes::CROPLAND_ANNUAL, codes::CROPLAND_ABANDONED, codes::HERBACEOUS]);
        let kinds: Vec<_> = shortfalls.iter().map(|s| (s.kind, s.achieved)).collect();
        assert_eq!(kinds, vec![(CorrectionKind::Abandoned, 1), (CorrectionKind::Deforestation, 0)]);
    }
}
