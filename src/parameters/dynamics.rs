//! Year-varying growth and climate inputs.
//!
//! Maximum ANPP, maximum biomass, establishment probability and mean
//! annual temperature all arrive as sparse year-keyed series per
//! (ecoregion, species) or per ecoregion. Once a year they are resolved
//! into dense [`AnnualTables`] that the growth and decay code reads
//! without any further lookups. ANPP carries a standard deviation so the
//! host can perturb it stochastically; the engine itself only defines the
//! sampling seam.

use crate::parameters::ForcsParameters;
use forcs_core::errors::{ForcsError, ForcsResult};
use forcs_core::series::{Year, YearSeries};
use forcs_core::table::{Catalog, EcoSpeciesTable};
use serde::{Deserialize, Serialize};

/// Mean and spread of maximum ANPP for one year row.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AnppEntry {
    pub mean: f64,
    pub std_dev: f64,
}

/// Year-keyed growth inputs per (ecoregion, species) pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GrowthSeries {
    pub max_anpp: EcoSpeciesTable<YearSeries<AnppEntry>>,
    pub max_biomass: EcoSpeciesTable<YearSeries<f64>>,
    pub establish_prob: EcoSpeciesTable<YearSeries<f64>>,
}

impl GrowthSeries {
    pub fn with_defaults(catalog: &Catalog) -> Self {
        Self {
            max_anpp: EcoSpeciesTable::filled(catalog, YearSeries::new()),
            max_biomass: EcoSpeciesTable::filled(catalog, YearSeries::new()),
            establish_prob: EcoSpeciesTable::filled(catalog, YearSeries::new()),
        }
    }

    pub fn validate(&self, catalog: &Catalog) -> ForcsResult<()> {
        for ecoregion in catalog.ecoregions() {
            for species in catalog.species() {
                for (variable, first) in [
                    ("maximum ANPP", self.max_anpp[(ecoregion, species)].first_year()),
                    (
                        "maximum biomass",
                        self.max_biomass[(ecoregion, species)].first_year(),
                    ),
                    (
                        "establishment probability",
                        self.establish_prob[(ecoregion, species)].first_year(),
                    ),
                ] {
                    match first {
                        None => {
                            return Err(ForcsError::EmptySeries {
                                variable: variable.to_string(),
                                ecoregion: catalog.ecoregion_name(ecoregion).to_string(),
                                species: catalog.species_name(species).to_string(),
                            })
                        }
                        Some(year) if year > 0 => {
                            return Err(ForcsError::Error(format!(
                                "first {} entry for {} / {} is year {}; year 0 must be covered",
                                variable,
                                catalog.ecoregion_name(ecoregion),
                                catalog.species_name(species),
                                year
                            )))
                        }
                        _ => {}
                    }
                }
            }
        }
        Ok(())
    }
}

/// Year-keyed mean annual temperature per ecoregion, °C.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClimateSeries {
    pub temperature: Vec<YearSeries<f64>>,
}

impl ClimateSeries {
    pub fn with_defaults(catalog: &Catalog) -> Self {
        Self {
            temperature: vec![YearSeries::new(); catalog.n_ecoregions()],
        }
    }

    pub fn validate(&self, catalog: &Catalog) -> ForcsResult<()> {
        if self.temperature.len() != catalog.n_ecoregions() {
            return Err(ForcsError::Error(format!(
                "temperature series cover {} ecoregions, catalog has {}",
                self.temperature.len(),
                catalog.n_ecoregions()
            )));
        }
        for ecoregion in catalog.ecoregions() {
            match self.temperature[ecoregion.0].first_year() {
                None => {
                    return Err(ForcsError::EmptySeries {
                        variable: "temperature".to_string(),
                        ecoregion: catalog.ecoregion_name(ecoregion).to_string(),
                        species: "-".to_string(),
                    })
                }
                Some(year) if year > 0 => {
                    return Err(ForcsError::Error(format!(
                        "first temperature entry for {} is year {}; year 0 must be covered",
                        catalog.ecoregion_name(ecoregion),
                        year
                    )))
                }
                _ => {}
            }
        }
        Ok(())
    }
}

/// Draws a maximum-ANPP realisation from its configured mean and spread.
///
/// Random number generation belongs to the host model, so the engine only
/// defines this seam. [`MeanSampler`] is the deterministic default.
pub trait AnppSampler {
    fn sample(&mut self, mean: f64, std_dev: f64) -> f64;
}

/// Sampler that always returns the mean. Used for deterministic runs and
/// in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct MeanSampler;

impl AnppSampler for MeanSampler {
    fn sample(&mut self, mean: f64, _std_dev: f64) -> f64 {
        mean
    }
}

/// Dense per-year snapshot of the growth and climate inputs.
#[derive(Debug, Clone)]
pub struct AnnualTables {
    pub max_anpp: EcoSpeciesTable<f64>,
    /// Whole grams; fractional configured values are truncated.
    pub max_biomass: EcoSpeciesTable<f64>,
    pub establish_prob: EcoSpeciesTable<f64>,
    /// Largest per-species maximum biomass in each ecoregion.
    pub b_max: Vec<f64>,
    /// Mean annual temperature per ecoregion, °C.
    pub temperature: Vec<f64>,
    growth_fallback_logged: bool,
    temperature_fallback_logged: bool,
}

impl AnnualTables {
    pub fn new(catalog: &Catalog) -> Self {
        Self {
            max_anpp: EcoSpeciesTable::filled(catalog, 0.0),
            max_biomass: EcoSpeciesTable::filled(catalog, 0.0),
            establish_prob: EcoSpeciesTable::filled(catalog, 0.0),
            b_max: vec![0.0; catalog.n_ecoregions()],
            temperature: vec![0.0; catalog.n_ecoregions()],
            growth_fallback_logged: false,
            temperature_fallback_logged: false,
        }
    }

    /// Re-resolves every table for `year`, drawing a fresh ANPP
    /// realisation per (ecoregion, species) pair.
    ///
    /// Spin-up years before the first entry of a series fall back to the
    /// year-0 value; the first time that happens a notice is logged.
    pub fn update(
        &mut self,
        params: &ForcsParameters,
        year: Year,
        sampler: &mut dyn AnppSampler,
    ) {
        let catalog = &params.catalog;
        for ecoregion in catalog.ecoregions() {
            let mut b_max: f64 = 0.0;
            for species in catalog.species() {
                let key = (ecoregion, species);
                let anpp = self.resolve(&params.growth.max_anpp[key], year);
                self.max_anpp[key] = sampler.sample(anpp.mean, anpp.std_dev).max(0.0);

                let max_biomass = self.resolve(&params.growth.max_biomass[key], year);
                self.max_biomass[key] = max_biomass.trunc();
                b_max = b_max.max(self.max_biomass[key]);

                if year >= 0 {
                    self.establish_prob[key] =
                        self.resolve(&params.growth.establish_prob[key], year);
                }
            }
            self.b_max[ecoregion.0] = b_max;

            let series = &params.climate.temperature[ecoregion.0];
            self.temperature[ecoregion.0] = match series.latest_at(year) {
                Some(t) => *t,
                None => {
                    if !self.temperature_fallback_logged {
                        log::info!(
                            "no temperature entry at spin-up year {}; using the year-0 value",
                            year
                        );
                        self.temperature_fallback_logged = true;
                    }
                    series.latest_at(0).copied().unwrap_or_default()
                }
            };
        }
    }

    fn resolve<T: Copy + Default>(&mut self, series: &YearSeries<T>, year: Year) -> T {
        match series.latest_at(year) {
            Some(value) => *value,
            None => {
                if !self.growth_fallback_logged {
                    log::info!(
                        "no growth input at spin-up year {}; using the year-0 value",
                        year
                    );
                    self.growth_fallback_logged = true;
                }
                series.latest_at(0).copied().unwrap_or_default()
            }
        }
    }
}
