//! Parameter loading and validation.
//!
//! Everything the engine needs for a run is gathered into one
//! [`ForcsParameters`] value, deserialized from TOML and validated as a
//! whole before the first simulated year. Validation is strict: a range
//! violation anywhere in the set is an error, not a clamp, so a run never
//! starts from a parameterisation the arithmetic would quietly distort.

pub mod disturbance;
pub mod dynamics;
pub mod roots;
pub mod snags;
pub mod soil;
pub mod species;

use forcs_core::errors::{ForcsError, ForcsResult};
use forcs_core::pools::NUM_DOM_POOLS;
use forcs_core::table::{Catalog, EcoSpeciesTable, EcoregionId, SpeciesId, SpeciesTable};
use serde::{Deserialize, Serialize};

use self::disturbance::DisturbanceMatrices;
use self::dynamics::{ClimateSeries, GrowthSeries};
use self::roots::RootAllocation;
use self::snags::InitialSnags;
use self::soil::{DomPoolParams, SoilParameters, SpinupSettings};
use self::species::SpeciesTraits;

/// The complete, validated parameter set for a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForcsParameters {
    pub catalog: Catalog,
    pub species: SpeciesTable<SpeciesTraits>,
    pub soil: SoilParameters,
    pub roots: EcoSpeciesTable<RootAllocation>,
    pub disturbances: DisturbanceMatrices,
    pub growth: GrowthSeries,
    pub climate: ClimateSeries,
    pub snags: InitialSnags,
    pub spinup: SpinupSettings,
}

impl ForcsParameters {
    /// A structurally complete set for the given catalog. The growth and
    /// climate series start empty and must be filled before validation.
    pub fn with_defaults(catalog: Catalog) -> Self {
        Self {
            species: SpeciesTable::filled(&catalog, SpeciesTraits::default()),
            soil: SoilParameters::with_defaults(&catalog),
            roots: EcoSpeciesTable::filled(&catalog, RootAllocation::default()),
            disturbances: DisturbanceMatrices::default(),
            growth: GrowthSeries::with_defaults(&catalog),
            climate: ClimateSeries::with_defaults(&catalog),
            snags: InitialSnags::default(),
            spinup: SpinupSettings::default(),
            catalog,
        }
    }

    /// Parses and validates a parameter set from TOML text.
    pub fn from_toml_str(text: &str) -> ForcsResult<Self> {
        let params: ForcsParameters =
            toml::from_str(text).map_err(|e| ForcsError::Error(e.to_string()))?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> ForcsResult<()> {
        for species in self.catalog.species() {
            self.species[species].validate(self.catalog.species_name(species))?;
        }
        self.soil.validate(&self.catalog)?;
        for ecoregion in self.catalog.ecoregions() {
            for species in self.catalog.species() {
                self.roots[(ecoregion, species)].validate(
                    self.catalog.ecoregion_name(ecoregion),
                    self.catalog.species_name(species),
                )?;
            }
        }
        self.disturbances.validate()?;
        self.growth.validate(&self.catalog)?;
        self.climate.validate(&self.catalog)?;
        self.snags.validate(&self.catalog)?;
        self.spinup.validate()?;
        Ok(())
    }

    pub fn traits(&self, species: SpeciesId) -> &SpeciesTraits {
        &self.species[species]
    }

    pub fn dom_pools(
        &self,
        ecoregion: EcoregionId,
        species: SpeciesId,
    ) -> &[DomPoolParams; NUM_DOM_POOLS] {
        &self.soil.pools[(ecoregion, species)]
    }

    pub fn root_allocation(&self, ecoregion: EcoregionId, species: SpeciesId) -> &RootAllocation {
        &self.roots[(ecoregion, species)]
    }

    /// The longest species lifespan in the catalog; bounds the litter
    /// replay history kept during spin-up.
    pub fn max_longevity(&self) -> u16 {
        self.catalog
            .species()
            .map(|s| self.species[s].longevity)
            .max()
            .unwrap_or(0)
    }
}
