//! Soil initialisation passes.
//!
//! Before year 1, the litter produced while growing the initial
//! community (recorded on the soil state's replay tape) is cycled through
//! the decay cascade until the two slow pools stop moving, with a
//! stand-replacing fire simulated at the end of each cycle. A final pass
//! then consumes the tape for good and materialises the configured
//! initial snags at the right point in the past, so they arrive in year 1
//! already partially decayed.

use crate::carbon::soil::{SoilPass, SoilState};
use crate::disturbance::DisturbanceEvent;
use crate::parameters::ForcsParameters;
use forcs_core::errors::ForcsResult;
use forcs_core::pools::{DomPool, BIOMASS_TO_CARBON};
use forcs_core::table::EcoregionId;

/// Fire severity assumed for the stand-replacing event that closes each
/// spin-up cycle.
const SPINUP_FIRE_SEVERITY: u8 = 4;

/// How the iterative spin-up ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpinupResult {
    pub iterations: u32,
    pub converged: bool,
}

/// Cycles the recorded stand history through the soil until the slow
/// pools converge.
///
/// Each cycle replays the litter tape age by age, burns the recorded
/// live biomass in a severity-4 fire at the oldest age, and runs the
/// decay dynamics. Convergence is judged on the percent change of the
/// combined slow pools between cycles.
pub fn spinup_soils(
    soil: &mut SoilState,
    params: &ForcsParameters,
    ecoregion: EcoregionId,
    temperature: f64,
) -> ForcsResult<SpinupResult> {
    let settings = &params.spinup;
    if !settings.enabled {
        return Ok(SpinupResult {
            iterations: 0,
            converged: true,
        });
    }

    let max_age = soil.last_age as usize;
    let fire = DisturbanceEvent::fire(SPINUP_FIRE_SEVERITY);

    let mut slow_before = slow_pool_c(soil);
    let mut iterations = 0;
    let mut change;

    loop {
        for age in 0..=max_age {
            for species in params.catalog.species() {
                if !soil.species_present(species) {
                    continue;
                }
                soil.replay_history(species, age, false);
                if age == max_age {
                    let wood = soil.live_wood_c(species) / BIOMASS_TO_CARBON;
                    let nonwood = soil.live_nonwood_c(species) / BIOMASS_TO_CARBON;
                    soil.disturbance_impacts_biomass(
                        params,
                        ecoregion,
                        &fire,
                        species,
                        age as u16,
                        wood,
                        nonwood,
                    )?;
                }
            }
            if age == max_age {
                soil.disturbance_impacts_dom(params, &fire);
            }
            soil.process_soils(
                params,
                ecoregion,
                temperature,
                0,
                SoilPass::Spinup,
                0.0,
                0.0,
            );
        }

        let slow_after = slow_pool_c(soil);
        let diff = slow_after - slow_before;
        change = if slow_before > 0.0 {
            100.0 * diff / slow_before
        } else if diff == 0.0 {
            0.0
        } else {
            f64::INFINITY
        };
        slow_before = slow_after;
        iterations += 1;

        if iterations >= settings.max_iterations || change.abs() <= settings.tolerance {
            break;
        }
    }

    let converged = change.abs() <= settings.tolerance;
    if !converged {
        log::warn!(
            "soil spin-up stopped after {} iterations with the slow pools still moving {:.3}% per cycle",
            iterations,
            change
        );
    }
    Ok(SpinupResult {
        iterations,
        converged,
    })
}

/// The final initialisation pass. Always runs, even when the iterative
/// spin-up is disabled.
///
/// Consumes the litter tape and, at the age matching each seeded snag's
/// time since death, replays the snag-creating disturbance so the snag
/// pools carry the right amount of decay into year 1. Because of this
/// pass the year-1 soils differ from the entered initial amounts.
pub fn last_initial_pass(
    soil: &mut SoilState,
    params: &ForcsParameters,
    ecoregion: EcoregionId,
    temperature: f64,
    total_biomass: f64,
) -> ForcsResult<()> {
    let max_age = soil.last_age as usize;
    soil.set_last_soil_pass(true);

    for age in 0..=max_age {
        let mut dom_event: Option<DisturbanceEvent> = None;
        for species in params.catalog.species() {
            if !soil.species_present(species) {
                continue;
            }
            soil.replay_history(species, age, true);

            if !soil.init_snag_present() {
                continue;
            }
            for (idx, record) in params.snags.iter().enumerate() {
                if soil.snag_seeded(idx) {
                    if age == max_age - (record.time_since_death as usize).min(max_age)
                        && species == record.species
                    {
                        let event = DisturbanceEvent::from_label(&record.disturbance);
                        let (wood, nonwood) = soil.snag_biomass(idx);
                        soil.disturbance_impacts_biomass(
                            params,
                            ecoregion,
                            &event,
                            species,
                            record.age_at_death,
                            wood,
                            nonwood,
                        )?;
                        dom_event = Some(event);
                    }
                    if record.age_at_death == 0 || record.age_at_death as usize > max_age {
                        break;
                    }
                }
            }
        }
        // One DOM-side application per year, outside the species loop.
        if let Some(event) = &dom_event {
            soil.disturbance_impacts_dom(params, event);
        }

        soil.process_soils(
            params,
            ecoregion,
            temperature,
            0,
            SoilPass::FinalInit,
            total_biomass,
            0.0,
        );
    }

    soil.clear_snag_scratch();
    soil.set_last_soil_pass(false);
    Ok(())
}

fn slow_pool_c(soil: &SoilState) -> f64 {
    soil.total_pool(DomPool::SlowAg) + soil.total_pool(DomPool::SlowBg)
}
