//! Per-site orchestration of cohorts, growth and soil.
//!
//! A [`Stand`] owns the cohort list and the soil state for one site and
//! drives the annual sequence: swap the mortality accumulators, grow
//! every cohort oldest-first, drop the dead, recompute the site biomass
//! and close the year with a soil pass. Reproduction, scheduling and
//! disturbance dispatch belong to the host; mortality it causes enters
//! through [`Stand::on_cohort_mortality`].

use crate::carbon::growth::{Cohort, GrowthContext, GrowthEngine, STANDING_NONWOODY_FRACTION};
use crate::carbon::roots::root_biomass;
use crate::carbon::soil::{AnnualFluxes, LitterDestination, SoilPass, SoilState};
use crate::carbon::spinup::{last_initial_pass, spinup_soils, SpinupResult};
use crate::disturbance::{DisturbanceEvent, TransferOutcome};
use crate::parameters::dynamics::{AnnualTables, AnppSampler};
use crate::parameters::ForcsParameters;
use forcs_core::errors::{ForcsError, ForcsResult};
use forcs_core::series::Year;
use forcs_core::table::{EcoregionId, SpeciesId};

/// External pressures on this year's growth, all host-supplied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostInfluences {
    /// Remaining site capacity after harvest, 1.0 when unharvested.
    pub capacity_remaining: f64,
    /// Growth reduction in [0, 1), 0 when none.
    pub growth_reduction: f64,
    /// Defoliation intensity in [0, 1], 0 when none.
    pub defoliation: f64,
}

impl Default for HostInfluences {
    fn default() -> Self {
        Self {
            capacity_remaining: 1.0,
            growth_reduction: 0.0,
            defoliation: 0.0,
        }
    }
}

/// One species/age entry of the community a stand is initialised from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitialCohort {
    pub species: SpeciesId,
    pub age: u16,
}

/// One site: its cohorts, its soil, and the annual bookkeeping that
/// links them.
#[derive(Debug)]
pub struct Stand {
    ecoregion: EcoregionId,
    cohorts: Vec<Cohort>,
    soil: SoilState,
    /// Site biomass excluding age-1 cohorts, as of the end of last year.
    total_biomass: f64,
    previous_year_mortality: f64,
    current_year_mortality: f64,
}

impl Stand {
    pub fn new(params: &ForcsParameters, ecoregion: EcoregionId) -> Self {
        Self {
            ecoregion,
            cohorts: Vec::new(),
            soil: SoilState::new(params, ecoregion),
            total_biomass: 0.0,
            previous_year_mortality: 0.0,
            current_year_mortality: 0.0,
        }
    }

    pub fn ecoregion(&self) -> EcoregionId {
        self.ecoregion
    }

    pub fn cohorts(&self) -> &[Cohort] {
        &self.cohorts
    }

    pub fn soil(&self) -> &SoilState {
        &self.soil
    }

    pub fn soil_mut(&mut self) -> &mut SoilState {
        &mut self.soil
    }

    /// Site biomass excluding age-1 cohorts, end of last completed year.
    pub fn total_biomass(&self) -> f64 {
        self.total_biomass
    }

    /// Current site biomass excluding cohorts in their establishment
    /// year, which have not yet claimed growing space.
    pub fn non_young_biomass(&self) -> f64 {
        self.cohorts
            .iter()
            .filter(|c| c.age > 1)
            .map(|c| c.biomass)
            .sum()
    }

    /// Adds a newly established age-1 cohort, its starting biomass set by
    /// the established biomass already on the site.
    pub fn establish(
        &mut self,
        params: &ForcsParameters,
        tables: &AnnualTables,
        species: SpeciesId,
    ) {
        let engine = GrowthEngine::new(params, tables, self.ecoregion);
        let biomass = engine.initial_biomass(species, &self.cohorts);
        self.cohorts.push(Cohort {
            species,
            age: 1,
            biomass,
        });
        self.soil.mark_present(species);
    }

    /// Runs one year for the whole site and returns its carbon budget.
    ///
    /// `year` 0 is the spin-up growth phase: litter is recorded for
    /// replay instead of decaying, and no fluxes are reported.
    pub fn grow_year(
        &mut self,
        params: &ForcsParameters,
        tables: &AnnualTables,
        year: Year,
        influences: &HostInfluences,
    ) -> ForcsResult<Option<AnnualFluxes>> {
        let pre_growth_biomass = self.total_biomass;
        self.previous_year_mortality = self.current_year_mortality;
        self.current_year_mortality = 0.0;

        for cohort in &mut self.cohorts {
            cohort.age += 1;
        }

        // Cohorts past their species' lifespan die standing before any
        // growth is computed.
        let senescent: Vec<Cohort> = self
            .cohorts
            .iter()
            .copied()
            .filter(|c| c.age > params.traits(c.species).longevity)
            .collect();
        self.cohorts
            .retain(|c| c.age <= params.traits(c.species).longevity);
        for cohort in senescent {
            self.natural_death(params, &cohort, year)?;
        }

        self.cohorts.sort_by(|a, b| b.age.cmp(&a.age));
        let neighbours = self.cohorts.clone();
        let engine = GrowthEngine::new(params, tables, self.ecoregion);
        let ctx = GrowthContext {
            year,
            site_biomass: pre_growth_biomass,
            prev_year_site_mortality: self.previous_year_mortality,
            capacity_remaining: influences.capacity_remaining,
            growth_reduction: influences.growth_reduction,
            defoliation: influences.defoliation,
        };

        for i in 0..self.cohorts.len() {
            let cohort = self.cohorts[i];
            let outcome = engine.compute_annual_change(&cohort, &neighbours, &ctx, &mut self.soil)?;
            self.current_year_mortality += outcome.age_mortality + outcome.growth_mortality;
            self.cohorts[i].biomass += outcome.delta_biomass;
        }
        // A cohort at zero has already routed its biomass through the
        // mortality accounting; it just leaves the list.
        self.cohorts.retain(|c| c.biomass > 0.0);

        self.total_biomass = self.non_young_biomass();
        Ok(self.soil.process_soils(
            params,
            self.ecoregion,
            tables.temperature[self.ecoregion.0],
            year,
            SoilPass::Normal,
            self.total_biomass,
            pre_growth_biomass,
        ))
    }

    /// Reports host-caused mortality for the cohort at `index`.
    ///
    /// `fraction_killed >= 1` removes the cohort: with no disturbance its
    /// biomass and roots enter the litter network directly, with one it
    /// goes through the event's biomass transfer matrix. A smaller
    /// fraction damages the cohort in place, scaling its wood and
    /// foliage through the matrix.
    pub fn on_cohort_mortality(
        &mut self,
        params: &ForcsParameters,
        index: usize,
        disturbance: Option<&DisturbanceEvent>,
        fraction_killed: f64,
        year: Year,
    ) -> ForcsResult<TransferOutcome> {
        if fraction_killed < 0.0 {
            return Err(ForcsError::NegativeMortality {
                wood: fraction_killed,
                nonwood: fraction_killed,
            });
        }
        let cohort = self.cohorts[index];
        let foliar = cohort.biomass * STANDING_NONWOODY_FRACTION;
        let wood = cohort.biomass - foliar;

        let outcome = if fraction_killed >= 1.0 {
            self.cohorts.remove(index);
            self.total_biomass = self.non_young_biomass();
            match disturbance {
                None => {
                    self.natural_death(params, &cohort, year)?;
                    TransferOutcome::Applied
                }
                Some(event) => self.soil.disturbance_impacts_biomass(
                    params,
                    self.ecoregion,
                    event,
                    cohort.species,
                    cohort.age,
                    wood,
                    foliar,
                )?,
            }
        } else {
            let event = disturbance.ok_or_else(|| {
                ForcsError::Error("partial mortality requires a disturbance event".to_string())
            })?;
            let outcome = self.soil.disturbance_impacts_biomass(
                params,
                self.ecoregion,
                event,
                cohort.species,
                cohort.age,
                wood * fraction_killed,
                foliar * fraction_killed,
            )?;
            self.cohorts[index].biomass -= cohort.biomass * fraction_killed;
            self.total_biomass = self.non_young_biomass();
            outcome
        };
        Ok(outcome)
    }

    /// Applies a disturbance's DOM-side transfer to the whole site. Call
    /// once per event, after the per-cohort mortality reports.
    pub fn apply_dom_disturbance(
        &mut self,
        params: &ForcsParameters,
        event: &DisturbanceEvent,
    ) -> TransferOutcome {
        self.soil.disturbance_impacts_dom(params, event)
    }

    /// Undisturbed full kill: wood and foliage to the litter network,
    /// root stocks to the below-ground pools.
    fn natural_death(
        &mut self,
        params: &ForcsParameters,
        cohort: &Cohort,
        year: Year,
    ) -> ForcsResult<()> {
        let foliar = cohort.biomass * STANDING_NONWOODY_FRACTION;
        let wood = cohort.biomass - foliar;
        self.soil.collect_biomass_mortality(
            params,
            cohort.species,
            cohort.age,
            wood,
            foliar,
            LitterDestination::Aboveground,
            year,
        )?;
        let roots = root_biomass(
            params.root_allocation(self.ecoregion, cohort.species),
            cohort.biomass,
        );
        self.soil.collect_biomass_mortality(
            params,
            cohort.species,
            cohort.age,
            roots.coarse,
            roots.fine,
            LitterDestination::Belowground,
            year,
        )
    }
}

/// Builds a stand from an initial community and brings its soil to a
/// steady state.
///
/// The community is grown from scratch: starting `oldest` years in the
/// past, each entry establishes at its birth year and grows forward to
/// the present, with the litter produced along the way recorded for the
/// soil spin-up. In the penultimate year the kill-now flag converts the
/// cohorts named by the initial snag records into seeded snags. The
/// iterative spin-up and the snag-materialising final pass then run
/// back-to-back, and the stand is ready for year 1.
///
/// `tables` is left holding the year −1 values; refresh it before the
/// first simulated year.
pub fn initialize_stand(
    params: &ForcsParameters,
    ecoregion: EcoregionId,
    community: &[InitialCohort],
    tables: &mut AnnualTables,
    sampler: &mut dyn AnppSampler,
) -> ForcsResult<(Stand, SpinupResult)> {
    let mut stand = Stand::new(params, ecoregion);
    if community.is_empty() {
        return Ok((
            stand,
            SpinupResult {
                iterations: 0,
                converged: true,
            },
        ));
    }

    let mut entries = community.to_vec();
    entries.sort_by(|a, b| b.age.cmp(&a.age));
    let oldest = entries[0].age;
    let mut next = 0;

    for time in -(Year::from(oldest))..=-1 {
        tables.update(params, time, sampler);
        stand.grow_year(params, tables, 0, &HostInfluences::default())?;

        while next < entries.len() && Year::from(entries[next].age) == -time {
            stand.establish(params, tables, entries[next].species);
            next += 1;
        }

        if time == -1 {
            // Signals both that the growth walk is done and the oldest
            // age the replay must cover.
            stand.soil.last_age = oldest;
            stand.soil.kill_now = false;
        } else if time == -2 {
            stand.soil.kill_now = !params.snags.is_empty();
        }
    }

    let temperature = tables.temperature[ecoregion.0];
    let result = spinup_soils(&mut stand.soil, params, ecoregion, temperature)?;
    last_initial_pass(
        &mut stand.soil,
        params,
        ecoregion,
        temperature,
        stand.total_biomass,
    )?;
    Ok((stand, result))
}
