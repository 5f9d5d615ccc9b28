//! Allocation pools (degrees of limitation) and their no-go masks.

use serde::{Deserialize, Serialize};

use crate::landuse::{LandUseCode, SlopeBand};
use crate::tilemap::Tilemap;

/// One tier of the cascading allocation search.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegreeOfLimitation {
    FavorableTerrainInUnrestrictedAreas,
    DifficultTerrainInUnrestrictedAreas,
    FavorableTerrainInRestrictedAreas,
    DifficultTerrainInRestrictedAreas,
    FavorableTerrainLandscapeWide,
    DifficultTerrainLandscapeWide,
}

/// Terrain class a pool draws from.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Terrain {
    /// Slope below the type's band minimum
    Favorable,
    /// Slope up to the type's band maximum
    Difficult,
}

/// How a pool treats restricted areas.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AreaScope {
    /// Outside restricted areas only
    Unrestricted,
    /// Inside restricted areas only
    Restricted,
    /// Restricted areas are ignored
    LandscapeWide,
}

impl DegreeOfLimitation {
    pub fn all() -> &'static [Self] {
        &[
            Self::FavorableTerrainInUnrestrictedAreas,
            Self::DifficultTerrainInUnrestrictedAreas,
            Self::FavorableTerrainInRestrictedAreas,
            Self::DifficultTerrainInRestrictedAreas,
            Self::FavorableTerrainLandscapeWide,
            Self::DifficultTerrainLandscapeWide,
        ]
    }

    pub fn terrain(&self) -> Terrain {
        match self {
            Self::FavorableTerrainInUnrestrictedAreas
            | Self::FavorableTerrainInRestrictedAreas
            | Self::FavorableTerrainLandscapeWide => Terrain::Favorable,
            Self::DifficultTerrainInUnrestrictedAreas
            | Self::DifficultTerrainInRestrictedAreas
            | Self::DifficultTerrainLandscapeWide => Terrain::Difficult,
        }
    }

    pub fn scope(&self) -> AreaScope {
        match self {
            Self::FavorableTerrainInUnrestrictedAreas
            | Self::DifficultTerrainInUnrestrictedAreas => AreaScope::Unrestricted,
            Self::FavorableTerrainInRestrictedAreas
            | Self::DifficultTerrainInRestrictedAreas => AreaScope::Restricted,
            Self::FavorableTerrainLandscapeWide
            | Self::DifficultTerrainLandscapeWide => AreaScope::LandscapeWide,
        }
    }

    /// Whether a slope is outside this pool's terrain class.
    fn slope_excluded(&self, slope: f32, band: SlopeBand) -> bool {
        match self.terrain() {
            Terrain::Favorable => slope >= band.min,
            Terrain::Difficult => slope > band.max,
        }
    }

    /// Build the negative mask of this pool: `true` means "do not allocate here".
    pub fn no_go_mask(&self, inputs: &MaskInputs<'_>, band: SlopeBand) -> Tilemap<bool> {
        let scope = self.scope();

        Tilemap::from_fn(inputs.landuse.width, inputs.landuse.height, |x, y| {
            let code = *inputs.landuse.get(x, y);
            if inputs.immutable_types.contains(&code) || *inputs.claimed.get(x, y) {
                return true;
            }

            let restricted = *inputs.restricted.get(x, y);
            match scope {
                AreaScope::Unrestricted if restricted => return true,
                AreaScope::Restricted if !restricted => return true,
                _ => {}
            }

            if !self.slope_excluded(*inputs.slope.get(x, y), band) {
                return false;
            }

            // Sanctioned land use inside restricted areas stays allocatable on any slope
            let readmitted = scope == AreaScope::Restricted
                && inputs.sanctioned_codes.contains(&code);
            !readmitted
        })
    }
}

impl std::fmt::Display for DegreeOfLimitation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::FavorableTerrainInUnrestrictedAreas => "favorable_terrain_in_unrestricted_areas",
            Self::DifficultTerrainInUnrestrictedAreas => "difficult_terrain_in_unrestricted_areas",
            Self::FavorableTerrainInRestrictedAreas => "favorable_terrain_in_restricted_areas",
            Self::DifficultTerrainInRestrictedAreas => "difficult_terrain_in_restricted_areas",
            Self::FavorableTerrainLandscapeWide => "favorable_terrain_landscape_wide",
            Self::DifficultTerrainLandscapeWide => "difficult_terrain_landscape_wide",
        };
        write!(f, "{name}")
    }
}

/// Rasters and code lists a no-go mask is built from.
#[derive(Clone, Copy)]
pub struct MaskInputs<'a> {
    pub landuse: &'a Tilemap<LandUseCode>,
    pub slope: &'a Tilemap<f32>,
    pub restricted: &'a Tilemap<bool>,
    /// Cells already reassigned earlier in this time step
    pub claimed: &'a Tilemap<bool>,
    pub immutable_types: &'a [LandUseCode],
    pub sanctioned_codes: &'a [LandUseCode],
}

/// Scenario variant selecting the cascade of pools.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScenarioMode {
    /// Unrestricted areas first, restricted areas as a last resort
    #[default]
    RestrictedAreas,
    /// Restricted areas play no role
    LandscapeWide,
}

impl ScenarioMode {
    /// Pools in the order the allocator searches them.
    pub fn cascade(&self) -> &'static [DegreeOfLimitation] {
        use DegreeOfLimitation::*;
        match self {
            Self::RestrictedAreas => &[
                FavorableTerrainInUnrestrictedAreas,
                DifficultTerrainInUnrestrictedAreas,
                FavorableTerrainInRestrictedAreas,
                DifficultTerrainInRestrictedAreas,
            ],
            Self::LandscapeWide => &[FavorableTerrainLandscapeWide, DifficultTerrainLandscapeWide],
        }
    }
}

impl std::fmt::Display for ScenarioMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::RestrictedAreas => write!(f, "restricted_areas"),
            Self::LandscapeWide => write!(f, "landscape_wide"),
        }
    }
}
