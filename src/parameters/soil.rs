//! Dead organic matter pool parameters and spin-up controls.

use forcs_core::errors::{ForcsError, ForcsResult};
use forcs_core::pools::{DomPool, NUM_DOM_POOLS};
use forcs_core::table::{Catalog, EcoSpeciesTable};
use serde::{Deserialize, Serialize};

/// Decay parameters for one DOM pool under one (ecoregion, species) pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomPoolParams {
    /// Base annual decay proportion at the 10 °C reference temperature.
    pub decay_rate: f64,
    /// Temperature sensitivity of decay (rate multiplier per 10 °C).
    pub q10: f64,
    /// Pool carbon at the start of spin-up, g C m⁻².
    pub initial_amount: f64,
}

impl Default for DomPoolParams {
    fn default() -> Self {
        Self {
            decay_rate: 0.0,
            q10: 2.0,
            initial_amount: 0.0,
        }
    }
}

/// The full DOM parameterisation: per-pool decay tables plus the fixed
/// inter-pool migration proportions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoilParameters {
    /// Decay rate, Q10 and initial amount for every
    /// (ecoregion, species, pool) cell.
    pub pools: EcoSpeciesTable<[DomPoolParams; NUM_DOM_POOLS]>,
    /// Fraction of each pool's decayed carbon respired straight to the
    /// atmosphere; the remainder feeds the slow pools.
    pub prop_to_air: [f64; NUM_DOM_POOLS],
    /// Annual fraction of SlowAG carbon mixed down into SlowBG.
    pub prop_slow_ag_to_slow_bg: f64,
    /// Annual fraction of stem snag carbon falling into the Medium pool.
    pub prop_stem_snag_to_medium: f64,
    /// Annual fraction of branch snag carbon falling into FastAG litter.
    pub prop_branch_snag_to_fast_ag: f64,
}

impl SoilParameters {
    pub fn with_defaults(catalog: &Catalog) -> Self {
        Self {
            pools: EcoSpeciesTable::filled(catalog, [DomPoolParams::default(); NUM_DOM_POOLS]),
            prop_to_air: [0.815, 0.83, 0.83, 0.83, 0.83, 1.0, 1.0, 0.83, 0.83, 1.0],
            prop_slow_ag_to_slow_bg: 0.006,
            prop_stem_snag_to_medium: 0.032,
            prop_branch_snag_to_fast_ag: 0.1,
        }
    }

    pub fn validate(&self, catalog: &Catalog) -> ForcsResult<()> {
        for ecoregion in catalog.ecoregions() {
            for species in catalog.species() {
                let cells = &self.pools[(ecoregion, species)];
                for pool in DomPool::ALL {
                    let cell = &cells[pool.index()];
                    check_proportion(
                        &format!(
                            "decay rate for {} ({}, {})",
                            pool,
                            catalog.ecoregion_name(ecoregion),
                            catalog.species_name(species)
                        ),
                        cell.decay_rate,
                    )?;
                    if cell.q10 < 1.0 || cell.q10 > 5.0 {
                        return Err(ForcsError::OutOfRange {
                            name: format!("Q10 for {}", pool),
                            value: cell.q10,
                            min: 1.0,
                            max: 5.0,
                        });
                    }
                    if cell.initial_amount < 0.0 {
                        return Err(ForcsError::OutOfRange {
                            name: format!("initial amount for {}", pool),
                            value: cell.initial_amount,
                            min: 0.0,
                            max: f64::INFINITY,
                        });
                    }
                    if cell.decay_rate == 0.0 && pool != DomPool::BlackCarbon {
                        log::warn!(
                            "{} decay rate is zero for {} / {}; the pool will only ever grow",
                            pool,
                            catalog.ecoregion_name(ecoregion),
                            catalog.species_name(species)
                        );
                    }
                }
            }
        }
        for (pool, prop) in DomPool::ALL.iter().zip(self.prop_to_air) {
            check_proportion(&format!("proportion to air for {}", pool), prop)?;
        }
        check_proportion("SlowAG to SlowBG mixing", self.prop_slow_ag_to_slow_bg)?;
        check_proportion("stem snag fall rate", self.prop_stem_snag_to_medium)?;
        check_proportion("branch snag fall rate", self.prop_branch_snag_to_fast_ag)?;
        Ok(())
    }
}

fn check_proportion(name: &str, value: f64) -> ForcsResult<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ForcsError::OutOfRange {
            name: name.to_string(),
            value,
            min: 0.0,
            max: 1.0,
        });
    }
    Ok(())
}

/// Controls for the pre-run soil spin-up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpinupSettings {
    /// Whether the iterative spin-up runs at all. When off, the DOM pools
    /// start from their configured initial amounts.
    pub enabled: bool,
    /// Convergence tolerance on the slow pools, percent change per
    /// iteration.
    pub tolerance: f64,
    /// Iteration cap; spin-up stops here even if unconverged.
    pub max_iterations: u32,
    /// Extra biomass fraction removed as mortality during the spin-up
    /// growth phase, to mimic a background disturbance regime.
    pub spinup_mortality_fraction: f64,
}

impl Default for SpinupSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            tolerance: 0.01,
            max_iterations: 50,
            spinup_mortality_fraction: 0.0,
        }
    }
}

impl SpinupSettings {
    pub fn validate(&self) -> ForcsResult<()> {
        if self.tolerance < 0.0 || self.tolerance > 100.0 {
            return Err(ForcsError::OutOfRange {
                name: "spin-up tolerance".to_string(),
                value: self.tolerance,
                min: 0.0,
                max: 100.0,
            });
        }
        if self.enabled && self.max_iterations == 0 {
            return Err(ForcsError::Error(
                "spin-up is enabled with a zero iteration cap".to_string(),
            ));
        }
        if !(0.0..=0.5).contains(&self.spinup_mortality_fraction) {
            return Err(ForcsError::OutOfRange {
                name: "spin-up mortality fraction".to_string(),
                value: self.spinup_mortality_fraction,
                min: 0.0,
                max: 0.5,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::new(["Pinus banksiana"], ["upland"])
    }

    #[test]
    fn default_soil_parameters_validate() {
        let catalog = catalog();
        SoilParameters::with_defaults(&catalog)
            .validate(&catalog)
            .unwrap();
    }

    #[test]
    fn q10_outside_range_is_rejected() {
        let catalog = catalog();
        let mut soil = SoilParameters::with_defaults(&catalog);
        soil.pools[(forcs_core::table::EcoregionId(0), forcs_core::table::SpeciesId(0))]
            [DomPool::FastAg.index()]
        .q10 = 7.0;
        assert!(soil.validate(&catalog).is_err());
    }

    #[test]
    fn negative_initial_amount_is_rejected() {
        let catalog = catalog();
        let mut soil = SoilParameters::with_defaults(&catalog);
        soil.pools[(forcs_core::table::EcoregionId(0), forcs_core::table::SpeciesId(0))]
            [DomPool::Medium.index()]
        .initial_amount = -5.0;
        assert!(soil.validate(&catalog).is_err());
    }

    #[test]
    fn spinup_defaults_validate() {
        SpinupSettings::default().validate().unwrap();
    }

    #[test]
    fn spinup_mortality_fraction_is_capped_at_half() {
        let settings = SpinupSettings {
            spinup_mortality_fraction: 0.6,
            ..SpinupSettings::default()
        };
        assert!(settings.validate().is_err());
    }
}
